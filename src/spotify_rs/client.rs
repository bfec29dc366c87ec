use std::time::Duration;

use color_eyre::Result;
use serde::de::DeserializeOwned;
use url::Url;

use crate::spotify_rs::types::{Page, PlaylistTrackObject, SpotifyPlaylist, SpotifyTrack};

const API_BASE: &str = "https://api.spotify.com/v1";

/// Spotify Web API client. Tokens are passed per call because listings use
/// the user's token while playlist reads use an app token.
#[derive(Clone, Default)]
pub struct SpotifyClient {
    client: reqwest::Client,
}

impl SpotifyClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, access_token: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// Get all playlists for the user the token belongs to
    pub async fn get_user_playlists(&self, access_token: &str) -> Result<Vec<SpotifyPlaylist>> {
        let mut all_playlists = Vec::new();
        let mut next_url = Some(format!("{API_BASE}/me/playlists?limit=50"));

        while let Some(url) = next_url {
            let page: Page<SpotifyPlaylist> = self.get_json(&url, access_token).await?;
            all_playlists.extend(page.items);
            next_url = page.next;
        }

        Ok(all_playlists)
    }

    pub async fn get_playlist(&self, access_token: &str, playlist_id: &str) -> Result<SpotifyPlaylist> {
        self.get_json(&format!("{API_BASE}/playlists/{playlist_id}"), access_token)
            .await
    }

    /// Get all tracks in a playlist as seen from `market`. Removed entries
    /// (null tracks) are dropped.
    pub async fn get_playlist_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        market: &str,
    ) -> Result<Vec<SpotifyTrack>> {
        let mut all_tracks = Vec::new();
        let mut next_url = Some(
            Url::parse_with_params(
                &format!("{API_BASE}/playlists/{playlist_id}/tracks"),
                &[("market", market), ("limit", "100")],
            )?
            .to_string(),
        );

        while let Some(url) = next_url {
            let page: Page<PlaylistTrackObject> = self.get_json(&url, access_token).await?;
            all_tracks.extend(page.items.into_iter().filter_map(|item| item.track));
            next_url = page.next;
        }

        Ok(all_tracks)
    }
}
