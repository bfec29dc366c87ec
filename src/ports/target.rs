use std::sync::Arc;

use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};

/// A playlist in the target user's library.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetPlaylist {
    pub id: String,
    pub title: String,
    pub count: Option<u32>,
    pub thumbnails: Vec<String>,
}

impl TargetPlaylist {
    /// The largest thumbnail, which the catalog lists last.
    pub fn image(&self) -> Option<&str> {
        self.thumbnails.last().map(String::as_str)
    }
}

/// One song search result. The identifier is optional because the catalog
/// sometimes returns entries that cannot be added to a playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct SongHit {
    pub video_id: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    #[default]
    Private,
    Unlisted,
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "PRIVATE",
            Visibility::Unlisted => "UNLISTED",
            Visibility::Public => "PUBLIC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPlaylist {
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub track_ids: Vec<String>,
}

/// Credential a target session is established with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetCredential {
    /// Raw request headers copied from an authenticated browser session.
    Headers(String),
    OAuth {
        access_token: String,
        refresh_token: String,
    },
}

/// A target catalog session bound to one credential.
///
/// Implementations live in `ytmusic_rs::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TargetCatalog: Send + Sync {
    async fn list_library_playlists(&self) -> Result<Vec<TargetPlaylist>>;
    async fn search_songs(&self, query: &str) -> Result<Vec<SongHit>>;
    async fn get_playlist_tracks(&self, playlist_id: &str) -> Result<Vec<String>>;
    async fn create_playlist(&self, playlist: &NewPlaylist) -> Result<String>;
    async fn delete_playlist(&self, playlist_id: &str) -> Result<()>;
}

/// Opens target sessions. One session is opened per job.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TargetSessionFactory: Send + Sync {
    async fn open(&self, credential: &TargetCredential) -> Result<Arc<dyn TargetCatalog>>;
}
