use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::ports::source::{PlaylistDetails, SourceCatalog, SourcePlaylist, SourceTrack, TokenGrant};
use crate::spotify_rs::auth::{refresh_access_token, request_app_token};
use crate::spotify_rs::client::SpotifyClient;
use crate::spotify_rs::link::playlist_id_from_link;
use crate::spotify_rs::types::SpotifyTrack;

/// Renew the app token this long before Spotify expires it.
const APP_TOKEN_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct SpotifySettings {
    pub client_id: String,
    pub client_secret: String,
    /// Market used to decide track availability.
    pub market: String,
}

struct AppToken {
    access_token: String,
    expires_at: Instant,
}

/// [`SourceCatalog`] over the Spotify Web API.
///
/// User playlists are listed with the caller's token; playlist details are
/// read with a cached client-credentials token.
pub struct SpotifyCatalog {
    http: reqwest::Client,
    client: SpotifyClient,
    settings: SpotifySettings,
    app_token: Mutex<Option<AppToken>>,
}

impl SpotifyCatalog {
    pub fn new(settings: SpotifySettings) -> Self {
        let http = reqwest::Client::new();
        Self {
            client: SpotifyClient::new(http.clone()),
            http,
            settings,
            app_token: Mutex::new(None),
        }
    }

    async fn app_token(&self) -> Result<String> {
        let mut cached = self.app_token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + APP_TOKEN_MARGIN < token.expires_at {
                return Ok(token.access_token.clone());
            }
        }

        tracing::debug!("Requesting new Spotify app token");
        let response = request_app_token(
            &self.http,
            &self.settings.client_id,
            &self.settings.client_secret,
        )
        .await
        .wrap_err("Failed to get Spotify app token")?;

        let access_token = response.access_token.clone();
        *cached = Some(AppToken {
            access_token: response.access_token,
            expires_at: Instant::now() + Duration::from_secs(response.expires_in),
        });
        Ok(access_token)
    }
}

#[async_trait::async_trait]
impl SourceCatalog for SpotifyCatalog {
    async fn list_user_playlists(&self, access_token: &str) -> Result<Vec<SourcePlaylist>> {
        let playlists = self
            .client
            .get_user_playlists(access_token)
            .await
            .wrap_err("Failed to get user playlists")?;
        tracing::debug!("Fetched {} Spotify playlists", playlists.len());
        Ok(playlists.into_iter().map(SourcePlaylist::from).collect())
    }

    async fn get_playlist_details(&self, playlist_id: &str) -> Result<PlaylistDetails> {
        let token = self.app_token().await?;
        let playlist = self
            .client
            .get_playlist(&token, playlist_id)
            .await
            .wrap_err_with(|| format!("Failed to get playlist {playlist_id}"))?;
        let tracks = self
            .client
            .get_playlist_tracks(&token, playlist_id, &self.settings.market)
            .await
            .wrap_err_with(|| format!("Failed to get tracks of playlist {playlist_id}"))?;

        Ok(PlaylistDetails {
            image: playlist.cover(),
            name: playlist.name,
            tracks: transferable_tracks(tracks),
        })
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant> {
        let response = refresh_access_token(
            &self.http,
            &self.settings.client_id,
            &self.settings.client_secret,
            refresh_token,
        )
        .await
        .wrap_err("Failed to refresh Spotify access token")?;

        Ok(TokenGrant {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_in: response.expires_in,
        })
    }

    fn playlist_id_from_link(&self, link: &str) -> Option<String> {
        playlist_id_from_link(link)
    }
}

fn transferable_tracks(tracks: Vec<SpotifyTrack>) -> Vec<SourceTrack> {
    let total = tracks.len();
    let kept: Vec<SourceTrack> = tracks
        .into_iter()
        .filter(SpotifyTrack::is_transferable)
        .map(SourceTrack::from)
        .collect();
    if kept.len() < total {
        tracing::debug!("Dropped {} local or restricted tracks", total - kept.len());
    }
    kept
}
