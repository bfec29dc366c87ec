use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};

/// A playlist as listed in the user's source library.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourcePlaylist {
    pub id: String,
    pub name: String,
    pub link: Option<String>,
    pub total_tracks: u32,
    pub owner: Option<String>,
    pub image: Option<String>,
}

/// Decoupled representation of a source track.
///
/// Also the shape callers use to hand-pick tracks for a selected transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTrack {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistDetails {
    pub name: String,
    pub image: Option<String>,
    pub tracks: Vec<SourceTrack>,
}

/// Result of a refresh-token exchange. Refresh tokens do not always rotate,
/// so `refresh_token` is only set when the service issued a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

/// Port trait wrapping the source catalog capabilities used by the core.
///
/// Implementations live in `spotify_rs::catalog` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SourceCatalog: Send + Sync {
    async fn list_user_playlists(&self, access_token: &str) -> Result<Vec<SourcePlaylist>>;
    async fn get_playlist_details(&self, playlist_id: &str) -> Result<PlaylistDetails>;
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant>;
    /// The playlist id a shared playlist link points at, if it is one.
    fn playlist_id_from_link(&self, link: &str) -> Option<String>;
}
