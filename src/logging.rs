use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use color_eyre::Result;
use color_eyre::eyre::Context;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Console output at `console_level`, plus an optional plain-text log file
/// with its own level. Levels use `EnvFilter` directive syntax.
pub fn init_tracing(console_level: &str, log_file: Option<&Path>, file_level: &str) -> Result<()> {
    let console_filter =
        EnvFilter::try_new(console_level).wrap_err("Failed to create console tracing filter")?;
    let console_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .with_filter(console_filter);

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .wrap_err_with(|| format!("Failed to open log file: {}", path.display()))?;
            let file_filter =
                EnvFilter::try_new(file_level).wrap_err("Failed to create file tracing filter")?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(file_filter),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .wrap_err("Failed to install tracing subscriber")?;

    Ok(())
}
