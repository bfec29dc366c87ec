use std::time::Duration;

use crate::spotify_rs::types::SpotifyTokenResponse;

const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

#[derive(Debug, thiserror::Error)]
pub enum TokenRequestError {
    #[error("Token request rejected: {reason}")]
    Rejected { reason: String },
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(reqwest::Error),
    #[error("Failed to parse response: {0}")]
    FailedToParseResponse(reqwest::Error),
}

/// Refresh a user access token using a refresh token
/// https://developer.spotify.com/documentation/web-api/tutorials/refreshing-tokens
pub async fn refresh_access_token(
    client: &reqwest::Client,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<SpotifyTokenResponse, TokenRequestError> {
    request_token(
        client,
        client_id,
        client_secret,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
        ],
    )
    .await
}

/// App-only token for reading public playlist data
/// https://developer.spotify.com/documentation/web-api/tutorials/client-credentials-flow
pub async fn request_app_token(
    client: &reqwest::Client,
    client_id: &str,
    client_secret: &str,
) -> Result<SpotifyTokenResponse, TokenRequestError> {
    request_token(
        client,
        client_id,
        client_secret,
        &[("grant_type", "client_credentials")],
    )
    .await
}

async fn request_token(
    client: &reqwest::Client,
    client_id: &str,
    client_secret: &str,
    params: &[(&str, &str)],
) -> Result<SpotifyTokenResponse, TokenRequestError> {
    let response = client
        .post(SPOTIFY_TOKEN_URL)
        // Serializes to x-www-form-urlencoded, as spotify requires
        .form(params)
        .basic_auth(client_id, Some(client_secret))
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(TokenRequestError::FailedToSendRequest)?;

    if !response.status().is_success() {
        return Err(TokenRequestError::Rejected {
            reason: response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error text".to_string()),
        });
    }

    response
        .json()
        .await
        .map_err(TokenRequestError::FailedToParseResponse)
}
