use std::sync::Arc;

use chrono::{Duration, Utc};
use color_eyre::eyre::{Result, WrapErr};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::MigrationError;
use crate::ports::credentials::{CredentialPersistence, CredentialSet, SourceTokens, TargetOAuth};
use crate::ports::source::SourceCatalog;
use crate::ports::target::TargetCredential;

/// Refresh this long before the source access token actually expires.
const REFRESH_MARGIN_MINUTES: i64 = 5;

/// Target authentication a caller may attach to a request. Takes precedence
/// over anything persisted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetAuth {
    #[serde(default)]
    pub headers: Option<String>,
    #[serde(default)]
    pub oauth: Option<TargetOAuth>,
}

/// Holds the source and target credentials and hands out live source
/// access tokens.
///
/// The whole credential set sits behind one async mutex that stays locked
/// across a refresh exchange, so two callers racing on an expired token
/// trigger a single refresh and the second one sees its result.
pub struct CredentialStore {
    persistence: Arc<dyn CredentialPersistence>,
    source: Arc<dyn SourceCatalog>,
    credentials: Mutex<CredentialSet>,
}

impl CredentialStore {
    pub fn new(
        persistence: Arc<dyn CredentialPersistence>,
        source: Arc<dyn SourceCatalog>,
        credentials: CredentialSet,
    ) -> Self {
        Self {
            persistence,
            source,
            credentials: Mutex::new(credentials),
        }
    }

    /// Builds the store from whatever was persisted last.
    pub async fn load(
        persistence: Arc<dyn CredentialPersistence>,
        source: Arc<dyn SourceCatalog>,
    ) -> Result<Self> {
        let credentials = persistence
            .load()
            .await
            .wrap_err("Failed to load stored credentials")?;
        Ok(Self::new(persistence, source, credentials))
    }

    /// A source access token that is valid for at least a few more minutes.
    ///
    /// Refreshes transparently when the stored token is about to expire.
    /// Returns `None` when there is no token or the refresh failed; a stale
    /// token is never handed out.
    pub async fn source_access_token(&self) -> Option<String> {
        let mut credentials = self.credentials.lock().await;
        let access_token = credentials.source.access_token.clone()?;

        match credentials.source.expires_at {
            Some(expires_at)
                if Utc::now() >= expires_at - Duration::minutes(REFRESH_MARGIN_MINUTES) =>
            {
                tracing::info!("Source access token expired or about to expire, refreshing");
                match self.refresh_locked(&mut credentials).await {
                    Ok(token) => Some(token),
                    Err(e) => {
                        tracing::warn!("{e}");
                        None
                    }
                }
            }
            _ => Some(access_token),
        }
    }

    async fn refresh_locked(&self, credentials: &mut CredentialSet) -> Result<String, MigrationError> {
        let refresh_token = credentials
            .source
            .refresh_token
            .clone()
            .ok_or_else(|| MigrationError::CredentialMissing("no source refresh token".into()))?;

        let grant = self
            .source
            .refresh_token(&refresh_token)
            .await
            .map_err(|e| MigrationError::RefreshFailed(format!("{e:#}")))?;

        credentials.source = SourceTokens {
            access_token: Some(grant.access_token.clone()),
            refresh_token: Some(grant.refresh_token.unwrap_or(refresh_token)),
            expires_at: Some(Utc::now() + Duration::seconds(grant.expires_in as i64)),
        };

        if let Err(e) = self.persistence.save(credentials).await {
            tracing::warn!("Failed to persist refreshed source tokens: {e:#}");
        }
        tracing::info!("Source access token refreshed");

        Ok(grant.access_token)
    }

    /// Ready for unattended syncing: a source refresh token and a usable
    /// target credential are both stored. Says nothing about whether the
    /// current source access token is fresh.
    pub async fn has_valid_credentials(&self) -> bool {
        let credentials = self.credentials.lock().await;
        let has_source = credentials
            .source
            .refresh_token
            .as_deref()
            .is_some_and(|t| !t.is_empty());
        let has_target = non_empty(credentials.target.headers.as_deref()).is_some()
            || credentials
                .target
                .oauth
                .as_ref()
                .is_some_and(|oauth| oauth_credential(oauth).is_ok());
        has_source && has_target
    }

    /// Picks the credential a target session is built from.
    ///
    /// Precedence: supplied headers, supplied OAuth, stored headers, stored
    /// OAuth. An OAuth credential without a refresh token is rejected rather
    /// than skipped. Supplied headers are persisted for later runs.
    pub async fn resolve_target_credential(
        &self,
        supplied: &TargetAuth,
    ) -> Result<TargetCredential, MigrationError> {
        if let Some(headers) = non_empty(supplied.headers.as_deref()) {
            tracing::info!("Using supplied header credentials for the target catalog");
            if let Err(e) = self.store_target_headers(headers.to_string()).await {
                tracing::warn!("Failed to persist target headers: {e:#}");
            }
            return Ok(TargetCredential::Headers(headers.to_string()));
        }
        if let Some(oauth) = &supplied.oauth {
            return oauth_credential(oauth);
        }

        let credentials = self.credentials.lock().await;
        if let Some(headers) = non_empty(credentials.target.headers.as_deref()) {
            return Ok(TargetCredential::Headers(headers.to_string()));
        }
        if let Some(oauth) = &credentials.target.oauth {
            return oauth_credential(oauth);
        }

        Err(MigrationError::CredentialMissing(
            "target catalog authentication is required".into(),
        ))
    }

    pub async fn store_source_tokens(
        &self,
        access_token: String,
        refresh_token: String,
        expires_in: u64,
    ) -> Result<()> {
        let mut credentials = self.credentials.lock().await;
        credentials.source = SourceTokens {
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
            expires_at: Some(Utc::now() + Duration::seconds(expires_in as i64)),
        };
        self.persistence
            .save(&credentials)
            .await
            .wrap_err("Failed to save source tokens")
    }

    pub async fn store_target_headers(&self, headers: String) -> Result<()> {
        let mut credentials = self.credentials.lock().await;
        credentials.target.headers = Some(headers);
        self.persistence
            .save(&credentials)
            .await
            .wrap_err("Failed to save target headers")
    }

    pub async fn store_target_oauth(&self, oauth: TargetOAuth) -> Result<()> {
        let mut credentials = self.credentials.lock().await;
        credentials.target.oauth = Some(oauth);
        self.persistence
            .save(&credentials)
            .await
            .wrap_err("Failed to save target OAuth tokens")
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn oauth_credential(oauth: &TargetOAuth) -> Result<TargetCredential, MigrationError> {
    match (
        non_empty(oauth.access_token.as_deref()),
        non_empty(oauth.refresh_token.as_deref()),
    ) {
        (Some(access_token), Some(refresh_token)) => Ok(TargetCredential::OAuth {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
        }),
        (_, None) => Err(MigrationError::CredentialMissing(
            "target OAuth credential has no refresh token".into(),
        )),
        (None, _) => Err(MigrationError::CredentialMissing(
            "target OAuth credential has no access token".into(),
        )),
    }
}
