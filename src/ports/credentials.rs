use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceTokens {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Target OAuth material. Only usable when both tokens are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOAuth {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetTokens {
    #[serde(default)]
    pub headers: Option<String>,
    #[serde(default)]
    pub oauth: Option<TargetOAuth>,
}

/// Everything persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialSet {
    #[serde(default)]
    pub source: SourceTokens,
    #[serde(default)]
    pub target: TargetTokens,
}

/// Storage boundary for the credential blob.
///
/// Implementations live in `token_file` (production) or `test_utils`.
#[async_trait::async_trait]
pub trait CredentialPersistence: Send + Sync {
    async fn load(&self) -> Result<CredentialSet>;
    async fn save(&self, credentials: &CredentialSet) -> Result<()>;
}
