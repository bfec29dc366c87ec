use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};

use crate::ports::credentials::{CredentialPersistence, CredentialSet};

/// Stores the credential set as a JSON file.
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl CredentialPersistence for TokenFile {
    /// A missing file means nothing has been stored yet.
    async fn load(&self) -> Result<CredentialSet> {
        if !tokio::fs::try_exists(&self.path).await? {
            tracing::debug!("No token file at {}", self.path.display());
            return Ok(CredentialSet::default());
        }

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .wrap_err_with(|| format!("Failed to read token file {}", self.path.display()))?;
        serde_json::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse token file {}", self.path.display()))
    }

    async fn save(&self, credentials: &CredentialSet) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .wrap_err("Failed to create token file directory")?;
        }

        // Replaced by rename, never written in place.
        let tmp = self.path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(credentials)?;
        tokio::fs::write(&tmp, contents)
            .await
            .wrap_err_with(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .wrap_err_with(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}
