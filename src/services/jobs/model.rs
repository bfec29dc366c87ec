use serde::Serialize;

use crate::services::resolver::MissedTracks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    TransferAll,
    TransferSelected,
    DeleteAll,
    DeleteSelected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    InProgress,
    Completed,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Processing,
    FetchingDetails,
    SearchingSongs,
    CheckingExisting,
    Creating,
    Updating,
    Deleting,
    Created,
    Updated,
    UpToDate,
    Skipped,
    Failed,
    Deleted,
}

impl ItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemStatus::Created
                | ItemStatus::Updated
                | ItemStatus::UpToDate
                | ItemStatus::Skipped
                | ItemStatus::Failed
                | ItemStatus::Deleted
        )
    }
}

/// One playlist's progress within a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobItem {
    pub name: String,
    pub source_id: Option<String>,
    pub image: Option<String>,
    pub status: ItemStatus,
    pub total_tracks: usize,
    pub found_tracks: usize,
    pub missed_tracks: usize,
    pub missed_tracks_list: Vec<String>,
    pub target_playlist_id: Option<String>,
    pub reason: Option<String>,
}

impl JobItem {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_id: None,
            image: None,
            status: ItemStatus::Pending,
            total_tracks: 0,
            found_tracks: 0,
            missed_tracks: 0,
            missed_tracks_list: Vec::new(),
            target_playlist_id: None,
            reason: None,
        }
    }

    pub fn with_source_id(mut self, source_id: Option<String>) -> Self {
        self.source_id = source_id;
        self
    }

    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image;
        self
    }

    pub fn with_target_playlist_id(mut self, id: Option<String>) -> Self {
        self.target_playlist_id = id;
        self
    }

    pub(crate) fn set_missed(&mut self, missed: &MissedTracks) {
        self.missed_tracks = missed.count;
        self.missed_tracks_list = missed.tracks.clone();
    }
}

/// Aggregates over terminal item outcomes. For deletion jobs `successful`
/// counts deleted playlists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounters {
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    #[serde(flatten)]
    pub counters: JobCounters,
    pub items: Vec<JobItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    pub fn new(id: String, kind: JobKind, items: Vec<JobItem>) -> Self {
        Self {
            id,
            kind,
            status: JobStatus::InProgress,
            counters: JobCounters {
                total: items.len(),
                ..JobCounters::default()
            },
            items,
            error: None,
        }
    }

    /// Moves the job to a terminal status. A job that already ended keeps
    /// its first terminal status.
    pub fn finish(&mut self, status: JobStatus, error: Option<String>) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        if status == JobStatus::Error {
            self.error = error;
        }
        true
    }
}

/// Terminal result of one item, applied together with its counter.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Created { playlist_id: String },
    Updated { playlist_id: String },
    UpToDate { playlist_id: String },
    Skipped { reason: String },
    Failed { reason: String },
    Deleted,
}

impl ItemOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        ItemOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> ItemStatus {
        match self {
            ItemOutcome::Created { .. } => ItemStatus::Created,
            ItemOutcome::Updated { .. } => ItemStatus::Updated,
            ItemOutcome::UpToDate { .. } => ItemStatus::UpToDate,
            ItemOutcome::Skipped { .. } => ItemStatus::Skipped,
            ItemOutcome::Failed { .. } => ItemStatus::Failed,
            ItemOutcome::Deleted => ItemStatus::Deleted,
        }
    }

    pub(crate) fn apply(self, item: &mut JobItem, counters: &mut JobCounters) {
        item.status = self.status();
        match self {
            ItemOutcome::Created { playlist_id } | ItemOutcome::Updated { playlist_id } => {
                item.target_playlist_id = Some(playlist_id);
                counters.successful += 1;
            }
            ItemOutcome::UpToDate { playlist_id } => {
                item.target_playlist_id = Some(playlist_id);
                counters.skipped += 1;
            }
            ItemOutcome::Skipped { reason } => {
                item.reason = Some(reason);
                counters.skipped += 1;
            }
            ItemOutcome::Failed { reason } => {
                item.reason = Some(reason);
                counters.failed += 1;
            }
            ItemOutcome::Deleted => counters.successful += 1,
        }
        counters.processed += 1;
    }
}
