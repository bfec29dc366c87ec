use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{Result, eyre};
use parking_lot::Mutex;

use crate::ports::credentials::{CredentialPersistence, CredentialSet};
use crate::ports::source::SourceTrack;
use crate::ports::target::{NewPlaylist, SongHit, TargetCatalog, TargetPlaylist};
use crate::services::jobs::model::Job;
use crate::services::jobs::registry::JobRegistry;
use crate::services::resolver::search_query;

pub fn track(name: &str, artist: &str) -> SourceTrack {
    SourceTrack {
        name: name.to_string(),
        artists: vec![artist.to_string()],
        album: None,
        image: None,
        duration_ms: None,
    }
}

/// Polls until the job reaches a terminal status.
pub async fn wait_for_job(registry: &Arc<JobRegistry>, id: &str) -> Job {
    for _ in 0..500 {
        let job = registry.snapshot(id).unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} did not finish in time");
}

/// In-memory credential persistence that remembers what was saved.
pub struct MemoryCredentials {
    stored: Mutex<CredentialSet>,
    saves: Mutex<usize>,
}

impl MemoryCredentials {
    pub fn new(credentials: CredentialSet) -> Self {
        Self {
            stored: Mutex::new(credentials),
            saves: Mutex::new(0),
        }
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }

    pub fn current(&self) -> CredentialSet {
        self.stored.lock().clone()
    }
}

#[async_trait::async_trait]
impl CredentialPersistence for MemoryCredentials {
    async fn load(&self) -> Result<CredentialSet> {
        Ok(self.current())
    }

    async fn save(&self, credentials: &CredentialSet) -> Result<()> {
        *self.stored.lock() = credentials.clone();
        *self.saves.lock() += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetCall {
    Search(String),
    ListLibrary,
    GetTracks(String),
    Create { name: String, track_ids: Vec<String> },
    Delete(String),
}

type CreateHook = Box<dyn Fn(&NewPlaylist) + Send + Sync>;

/// Stateful target catalog: created playlists show up in later listings and
/// deleted ones disappear. Every call is recorded.
#[derive(Default)]
pub struct FakeTarget {
    songs: HashMap<String, String>,
    library: Mutex<Vec<TargetPlaylist>>,
    tracks: Mutex<HashMap<String, Vec<String>>>,
    failing_deletes: Vec<String>,
    calls: Mutex<Vec<TargetCall>>,
    on_create: Mutex<Option<CreateHook>>,
    next_id: Mutex<usize>,
}

impl FakeTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes each track findable as `vid:<name>`.
    pub fn with_songs(mut self, tracks: &[SourceTrack]) -> Self {
        for t in tracks {
            self.songs.insert(search_query(t), format!("vid:{}", t.name));
        }
        self
    }

    pub fn with_playlist(self, id: &str, title: &str, track_ids: &[&str]) -> Self {
        self.library.lock().push(TargetPlaylist {
            id: id.to_string(),
            title: title.to_string(),
            count: Some(track_ids.len() as u32),
            thumbnails: vec![format!("https://thumb/{id}/small"), format!("https://thumb/{id}/large")],
        });
        self.tracks.lock().insert(
            id.to_string(),
            track_ids.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    pub fn with_failing_delete(mut self, id: &str) -> Self {
        self.failing_deletes.push(id.to_string());
        self
    }

    pub fn on_create(&self, hook: impl Fn(&NewPlaylist) + Send + Sync + 'static) {
        *self.on_create.lock() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<TargetCall> {
        self.calls.lock().clone()
    }

    pub fn playlist_by_title(&self, title: &str) -> Option<TargetPlaylist> {
        self.library.lock().iter().find(|p| p.title == title).cloned()
    }

    pub fn tracks_of(&self, id: &str) -> Vec<String> {
        self.tracks.lock().get(id).cloned().unwrap_or_default()
    }

    fn record(&self, call: TargetCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait::async_trait]
impl TargetCatalog for FakeTarget {
    async fn list_library_playlists(&self) -> Result<Vec<TargetPlaylist>> {
        self.record(TargetCall::ListLibrary);
        Ok(self.library.lock().clone())
    }

    async fn search_songs(&self, query: &str) -> Result<Vec<SongHit>> {
        self.record(TargetCall::Search(query.to_string()));
        Ok(self
            .songs
            .get(query)
            .map(|id| SongHit {
                video_id: Some(id.clone()),
                title: None,
            })
            .into_iter()
            .collect())
    }

    async fn get_playlist_tracks(&self, playlist_id: &str) -> Result<Vec<String>> {
        self.record(TargetCall::GetTracks(playlist_id.to_string()));
        self.tracks
            .lock()
            .get(playlist_id)
            .cloned()
            .ok_or_else(|| eyre!("Unknown playlist {playlist_id}"))
    }

    async fn create_playlist(&self, playlist: &NewPlaylist) -> Result<String> {
        self.record(TargetCall::Create {
            name: playlist.name.clone(),
            track_ids: playlist.track_ids.clone(),
        });
        if let Some(hook) = self.on_create.lock().as_ref() {
            hook(playlist);
        }

        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            format!("created-{}", *next)
        };
        self.library.lock().push(TargetPlaylist {
            id: id.clone(),
            title: playlist.name.clone(),
            count: Some(playlist.track_ids.len() as u32),
            thumbnails: vec![],
        });
        self.tracks.lock().insert(id.clone(), playlist.track_ids.clone());
        Ok(id)
    }

    async fn delete_playlist(&self, playlist_id: &str) -> Result<()> {
        self.record(TargetCall::Delete(playlist_id.to_string()));
        if self.failing_deletes.iter().any(|id| id == playlist_id) {
            return Err(eyre!("Playlist {playlist_id} could not be deleted"));
        }
        self.library.lock().retain(|p| p.id != playlist_id);
        self.tracks.lock().remove(playlist_id);
        Ok(())
    }
}
