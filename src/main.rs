mod config;
mod error;
mod http_server;
mod logging;
mod ports;
mod services;
mod spotify_rs;
#[cfg(test)]
mod test_utils;
mod token_file;
mod ytmusic_rs;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::Context};

use crate::{
    config::Config,
    http_server::state::AppState,
    logging::init_tracing,
    ports::source::SourceCatalog,
    services::{
        auto_sync::AutoSyncController,
        credentials::CredentialStore,
        jobs::{executor::JobExecutor, registry::JobRegistry},
    },
    spotify_rs::catalog::SpotifyCatalog,
    token_file::TokenFile,
    ytmusic_rs::client::YtMusicSessions,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "PLAYLIST_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Console log level or filter directives
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: String,

    /// File log level or filter directives
    #[arg(long, default_value = "debug", global = true)]
    log_file_level: String,

    /// Path to log file
    #[arg(long, env = "PLAYLIST_BRIDGE_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// The port to run the server on
        #[arg(short, long, default_value = "8080", env = "PLAYLIST_BRIDGE_HTTP_PORT")]
        port: u16,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_file.as_deref(), &args.log_file_level)?;

    tracing::debug!("Loading configuration");
    let config = {
        if let Some(config) = &args.config {
            Config::from_file(config)
        } else {
            Config::load()
        }
    }
    .wrap_err("Failed to load playlist-bridge config")?;

    match args.command {
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                let path = Config::create_default()?;
                tracing::info!("Default config at {}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        },
        Commands::Serve { port } => {
            let app_state = build_state(&config).await?;
            tracing::info!("Starting HTTP server on port: {}", port);
            http_server::app::start(port, app_state).await?;
        }
    }

    Ok(())
}

async fn build_state(config: &Config) -> Result<Arc<AppState>> {
    let source: Arc<dyn SourceCatalog> = Arc::new(SpotifyCatalog::new(config.spotify_settings()?));

    let token_file = TokenFile::new(config.credentials_path()?);
    tracing::debug!("Using credentials file {}", token_file.path().display());
    let credentials = Arc::new(CredentialStore::load(Arc::new(token_file), source.clone()).await?);

    let executor = JobExecutor::new(
        Arc::new(JobRegistry::new()),
        credentials,
        source,
        Arc::new(YtMusicSessions::new()),
        config.transfer_settings(),
    );
    let auto_sync = AutoSyncController::new(executor.clone(), config.auto_sync_interval());

    Ok(Arc::new(AppState {
        executor,
        auto_sync,
    }))
}
