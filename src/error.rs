/// Failures the migration core reports to its callers.
///
/// Per-item problems never surface here: they are recorded on the job item
/// and the job carries on. These are the errors a caller sees synchronously
/// (submission, status lookup, cancellation) or that end a job outright.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    #[error("Missing credentials: {0}")]
    CredentialMissing(String),
    #[error("Failed to refresh source access token: {0}")]
    RefreshFailed(String),
    #[error("No songs found on the target catalog ({attempted} searched)")]
    NoMatches { attempted: usize },
    #[error("Catalog request failed: {0}")]
    CatalogRequestFailed(String),
    #[error("Job not found: {0}")]
    JobNotFound(String),
    #[error("Job id already in use: {0}")]
    JobIdTaken(String),
    #[error("Nothing to transfer: {0}")]
    NothingToTransfer(String),
}

impl MigrationError {
    /// Wrap an adapter report, keeping its whole context chain.
    pub fn catalog(report: color_eyre::Report) -> Self {
        Self::CatalogRequestFailed(format!("{report:#}"))
    }
}
