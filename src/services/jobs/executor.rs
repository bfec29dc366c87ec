use std::collections::HashMap;
use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::MigrationError;
use crate::ports::source::{SourceCatalog, SourceTrack};
use crate::ports::target::{
    NewPlaylist, TargetCatalog, TargetCredential, TargetPlaylist, TargetSessionFactory,
    Visibility,
};
use crate::services::credentials::{CredentialStore, TargetAuth};
use crate::services::diff::playlists_differ;
use crate::services::jobs::model::{ItemOutcome, ItemStatus, Job, JobItem, JobKind, JobStatus};
use crate::services::jobs::registry::{JobProgress, JobRegistry};
use crate::services::resolver::{resolve_tracks, search_query};

/// A playlist with hand-picked tracks, as sent by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectedPlaylist {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tracks: Vec<SourceTrack>,
}

/// What a caller asks the executor to do.
#[derive(Debug, Clone)]
pub enum JobRequest {
    /// Every playlist in the source library, or only `playlist_ids` when
    /// that list is non-empty. Without `source_token` the stored source
    /// credential is used.
    TransferAll {
        source_token: Option<String>,
        target: TargetAuth,
        playlist_ids: Vec<String>,
    },
    TransferSelected {
        target: TargetAuth,
        playlists: Vec<SelectedPlaylist>,
    },
    /// One source playlist given by its shared link. Runs as a single-item
    /// transfer-all and needs no source user token.
    TransferLink {
        target: TargetAuth,
        link: String,
    },
    DeleteAll {
        target: TargetAuth,
    },
    DeleteSelected {
        target: TargetAuth,
        playlist_ids: Vec<String>,
    },
}

/// How created playlists are described on the target catalog.
#[derive(Debug, Clone, Default)]
pub struct TransferSettings {
    pub description: String,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetPlaylistSummary {
    pub id: String,
    pub name: String,
    pub count: Option<u32>,
    pub image: Option<String>,
}

/// Where one transfer item's tracks come from.
enum TransferSource {
    Catalog { playlist_id: String },
    Supplied { name: String, tracks: Vec<SourceTrack> },
}

enum Plan {
    Transfer(Vec<TransferSource>),
    /// Target playlist id per item; `None` when the id is unknown.
    Delete(Vec<Option<String>>),
}

enum Session {
    Open(Arc<dyn TargetCatalog>),
    Deferred(TargetCredential),
}

enum NewJobId {
    Generated,
    Exact(String),
    Prefixed(String),
}

enum RunEnd {
    Completed,
    Cancelled,
}

enum ItemFlow {
    Finished(ItemOutcome),
    Cancelled,
}

/// Runs jobs in the background and reports their progress into the
/// [`JobRegistry`].
///
/// Transfer jobs check for cancellation at exactly three points: before an
/// item starts, after its tracks are resolved, and right before a new
/// playlist is created. Deletion jobs check before each item. Nothing is
/// rolled back on cancellation.
#[derive(Clone)]
pub struct JobExecutor {
    registry: Arc<JobRegistry>,
    credentials: Arc<CredentialStore>,
    source: Arc<dyn SourceCatalog>,
    sessions: Arc<dyn TargetSessionFactory>,
    settings: TransferSettings,
}

impl JobExecutor {
    pub fn new(
        registry: Arc<JobRegistry>,
        credentials: Arc<CredentialStore>,
        source: Arc<dyn SourceCatalog>,
        sessions: Arc<dyn TargetSessionFactory>,
        settings: TransferSettings,
    ) -> Self {
        Self {
            registry,
            credentials,
            source,
            sessions,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn source(&self) -> &Arc<dyn SourceCatalog> {
        &self.source
    }

    /// Creates the job record, starts it in the background and returns its
    /// id without waiting for any item to be processed.
    pub async fn submit_job(&self, request: JobRequest) -> Result<String, MigrationError> {
        self.submit(NewJobId::Generated, request).await
    }

    /// Same as [`Self::submit_job`] with a caller-chosen job id. Fails with
    /// [`MigrationError::JobIdTaken`] when a job already has that id.
    pub async fn submit_job_as(
        &self,
        id: String,
        request: JobRequest,
    ) -> Result<String, MigrationError> {
        self.submit(NewJobId::Exact(id), request).await
    }

    /// Same as [`Self::submit_job`] with an id of `prefix` plus a random
    /// suffix that no other job holds.
    pub async fn submit_job_prefixed(
        &self,
        prefix: &str,
        request: JobRequest,
    ) -> Result<String, MigrationError> {
        self.submit(NewJobId::Prefixed(prefix.to_string()), request).await
    }

    pub fn job_status(&self, id: &str) -> Result<Job, MigrationError> {
        self.registry.snapshot(id)
    }

    pub fn cancel_job(&self, id: &str) -> Result<(), MigrationError> {
        self.registry.cancel(id)?;
        tracing::info!("Cancellation requested for job {id}");
        Ok(())
    }

    /// The target library, for callers choosing what to delete.
    pub async fn list_target_playlists(
        &self,
        auth: &TargetAuth,
    ) -> Result<Vec<TargetPlaylistSummary>, MigrationError> {
        let credential = self.credentials.resolve_target_credential(auth).await?;
        let target = self.open_session(&credential).await?;
        let playlists = target
            .list_library_playlists()
            .await
            .map_err(MigrationError::catalog)?;

        Ok(playlists
            .into_iter()
            .map(|p| TargetPlaylistSummary {
                image: p.image().map(String::from),
                id: p.id,
                name: p.title,
                count: p.count,
            })
            .collect())
    }

    async fn submit(&self, id: NewJobId, request: JobRequest) -> Result<String, MigrationError> {
        let (kind, items, plan, session) = match request {
            JobRequest::TransferAll {
                source_token,
                target,
                playlist_ids,
            } => {
                let credential = self.credentials.resolve_target_credential(&target).await?;
                let token = match source_token.filter(|t| !t.trim().is_empty()) {
                    Some(token) => token,
                    None => self.credentials.source_access_token().await.ok_or_else(|| {
                        MigrationError::CredentialMissing("source access token is required".into())
                    })?,
                };

                let mut playlists = self
                    .source
                    .list_user_playlists(&token)
                    .await
                    .map_err(MigrationError::catalog)?;
                if !playlist_ids.is_empty() {
                    playlists.retain(|p| playlist_ids.contains(&p.id));
                }
                if playlists.is_empty() {
                    return Err(MigrationError::NothingToTransfer(
                        "no playlists found in source account".into(),
                    ));
                }

                let items = playlists
                    .iter()
                    .map(|p| {
                        JobItem::pending(&p.name)
                            .with_source_id(Some(p.id.clone()))
                            .with_image(p.image.clone())
                    })
                    .collect();
                let sources = playlists
                    .into_iter()
                    .map(|p| TransferSource::Catalog { playlist_id: p.id })
                    .collect();
                (
                    JobKind::TransferAll,
                    items,
                    Plan::Transfer(sources),
                    Session::Deferred(credential),
                )
            }
            JobRequest::TransferSelected { target, playlists } => {
                let credential = self.credentials.resolve_target_credential(&target).await?;
                if playlists.is_empty() {
                    return Err(MigrationError::NothingToTransfer(
                        "no playlists with tracks provided".into(),
                    ));
                }

                let items = playlists
                    .iter()
                    .map(|p| {
                        JobItem::pending(&p.name)
                            .with_source_id(p.id.clone())
                            .with_image(p.image.clone())
                    })
                    .collect();
                let sources = playlists
                    .into_iter()
                    .map(|p| TransferSource::Supplied {
                        name: p.name,
                        tracks: p.tracks,
                    })
                    .collect();
                (
                    JobKind::TransferSelected,
                    items,
                    Plan::Transfer(sources),
                    Session::Deferred(credential),
                )
            }
            JobRequest::TransferLink { target, link } => {
                let credential = self.credentials.resolve_target_credential(&target).await?;
                let playlist_id = self.source.playlist_id_from_link(&link).ok_or_else(|| {
                    MigrationError::NothingToTransfer(format!("not a playlist link: {link}"))
                })?;

                let items =
                    vec![JobItem::pending(&playlist_id).with_source_id(Some(playlist_id.clone()))];
                (
                    JobKind::TransferAll,
                    items,
                    Plan::Transfer(vec![TransferSource::Catalog { playlist_id }]),
                    Session::Deferred(credential),
                )
            }
            JobRequest::DeleteAll { target } => {
                let credential = self.credentials.resolve_target_credential(&target).await?;
                let session = self.open_session(&credential).await?;
                let library = session
                    .list_library_playlists()
                    .await
                    .map_err(MigrationError::catalog)?;
                tracing::info!("Found {} target playlists to delete", library.len());

                let items = library
                    .iter()
                    .map(|p| {
                        JobItem::pending(&p.title)
                            .with_image(p.image().map(String::from))
                            .with_target_playlist_id(non_empty_id(&p.id))
                    })
                    .collect();
                let ids = library.iter().map(|p| non_empty_id(&p.id)).collect();
                (
                    JobKind::DeleteAll,
                    items,
                    Plan::Delete(ids),
                    Session::Open(session),
                )
            }
            JobRequest::DeleteSelected {
                target,
                playlist_ids,
            } => {
                let credential = self.credentials.resolve_target_credential(&target).await?;
                if playlist_ids.is_empty() {
                    return Err(MigrationError::NothingToTransfer(
                        "no playlists selected for deletion".into(),
                    ));
                }
                let session = self.open_session(&credential).await?;
                let library = session
                    .list_library_playlists()
                    .await
                    .map_err(MigrationError::catalog)?;
                let by_id: HashMap<&str, &TargetPlaylist> =
                    library.iter().map(|p| (p.id.as_str(), p)).collect();

                let items = playlist_ids
                    .iter()
                    .map(|id| {
                        let listed = by_id.get(id.as_str());
                        JobItem::pending(listed.map_or("Unknown", |p| p.title.as_str()))
                            .with_image(listed.and_then(|p| p.image()).map(String::from))
                            .with_target_playlist_id(non_empty_id(id))
                    })
                    .collect();
                let ids = playlist_ids.iter().map(|id| non_empty_id(id)).collect();
                (
                    JobKind::DeleteSelected,
                    items,
                    Plan::Delete(ids),
                    Session::Open(session),
                )
            }
        };

        let id = match id {
            NewJobId::Generated => self.registry.create(kind, items),
            NewJobId::Exact(id) => self.registry.create_with_id(id, kind, items)?,
            NewJobId::Prefixed(prefix) => self.registry.create_with_prefix(&prefix, kind, items),
        };
        tracing::info!("Started {kind:?} job {id}");

        let progress = JobProgress::new(self.registry.clone(), id.clone());
        let executor = self.clone();
        tokio::spawn(async move {
            let run = tokio::spawn(executor.run(progress.clone(), session, plan));
            if let Err(e) = run.await {
                tracing::error!("Job {} aborted: {}", progress.id(), e);
                progress.finish(JobStatus::Error, Some(format!("Job execution aborted: {e}")));
            }
        });

        Ok(id)
    }

    #[instrument(skip_all, fields(job_id = %progress.id()))]
    async fn run(self, progress: JobProgress, session: Session, plan: Plan) {
        match self.execute(&progress, session, plan).await {
            // A cancel that lands after the last checkpoint still wins.
            Ok(RunEnd::Completed) if !progress.is_cancelled() => {
                progress.finish(JobStatus::Completed, None)
            }
            Ok(RunEnd::Completed | RunEnd::Cancelled) => {
                tracing::info!("Job cancelled by user");
                progress.finish(JobStatus::Cancelled, None);
            }
            Err(e) => {
                tracing::error!("Job failed: {e:#}");
                progress.finish(JobStatus::Error, Some(format!("{e:#}")));
            }
        }

        if let Ok(job) = self.registry.snapshot(progress.id()) {
            tracing::info!(
                "Job {:?}: total {} | processed {} | successful {} | failed {} | skipped {}",
                job.status,
                job.counters.total,
                job.counters.processed,
                job.counters.successful,
                job.counters.failed,
                job.counters.skipped
            );
        }
    }

    async fn execute(&self, progress: &JobProgress, session: Session, plan: Plan) -> Result<RunEnd> {
        let target = match session {
            Session::Open(target) => target,
            Session::Deferred(credential) => self
                .sessions
                .open(&credential)
                .await
                .wrap_err("Failed to open target catalog session")?,
        };

        Ok(match plan {
            Plan::Transfer(sources) => self.run_transfers(progress, target.as_ref(), sources).await,
            Plan::Delete(ids) => run_deletions(progress, target.as_ref(), ids).await,
        })
    }

    async fn run_transfers(
        &self,
        progress: &JobProgress,
        target: &dyn TargetCatalog,
        sources: Vec<TransferSource>,
    ) -> RunEnd {
        let total = sources.len();
        for (index, source) in sources.into_iter().enumerate() {
            if progress.is_cancelled() {
                return RunEnd::Cancelled;
            }

            tracing::info!("[{}/{}] Processing playlist", index + 1, total);
            progress.update_item(index, |item| item.status = ItemStatus::Processing);

            match self.transfer_playlist(progress, index, source, target).await {
                Ok(ItemFlow::Finished(outcome)) => progress.finish_item(index, outcome),
                Ok(ItemFlow::Cancelled) => return RunEnd::Cancelled,
                Err(e) => {
                    tracing::warn!("Error processing playlist {}: {e:#}", index + 1);
                    progress.finish_item(index, ItemOutcome::failed(format!("{e:#}")));
                }
            }
        }
        RunEnd::Completed
    }

    async fn transfer_playlist(
        &self,
        progress: &JobProgress,
        index: usize,
        source: TransferSource,
        target: &dyn TargetCatalog,
    ) -> Result<ItemFlow> {
        let (name, tracks, empty_reason) = match source {
            TransferSource::Catalog { playlist_id } => {
                progress.update_item(index, |item| item.status = ItemStatus::FetchingDetails);
                let details = self
                    .source
                    .get_playlist_details(&playlist_id)
                    .await
                    .wrap_err("Failed to fetch playlist details")?;
                progress.update_item(index, |item| {
                    item.name = details.name.clone();
                    if details.image.is_some() {
                        item.image = details.image.clone();
                    }
                });
                (details.name, details.tracks, "Empty playlist")
            }
            TransferSource::Supplied { name, tracks } => (name, tracks, "No tracks selected"),
        };

        if tracks.is_empty() {
            tracing::info!("Playlist '{name}' has no tracks, skipping");
            return Ok(ItemFlow::Finished(ItemOutcome::Skipped {
                reason: empty_reason.to_string(),
            }));
        }

        progress.update_item(index, |item| {
            item.status = ItemStatus::SearchingSongs;
            item.total_tracks = tracks.len();
        });
        let resolution = match resolve_tracks(target, &tracks).await {
            Ok(resolution) => resolution,
            Err(e) => {
                progress.update_item(index, |item| {
                    item.missed_tracks = tracks.len();
                    item.missed_tracks_list = tracks.iter().map(search_query).collect();
                });
                return Ok(ItemFlow::Finished(ItemOutcome::failed(e.to_string())));
            }
        };

        if progress.is_cancelled() {
            return Ok(ItemFlow::Cancelled);
        }

        progress.update_item(index, |item| {
            item.status = ItemStatus::CheckingExisting;
            item.found_tracks = resolution.track_ids.len();
            item.set_missed(&resolution.missed);
        });
        let library = target
            .list_library_playlists()
            .await
            .wrap_err("Failed to list target playlists")?;

        let new_playlist = NewPlaylist {
            name: name.clone(),
            description: self.settings.description.clone(),
            visibility: self.settings.visibility,
            track_ids: resolution.track_ids,
        };

        match find_existing_playlist(&library, &name) {
            Some(existing) => {
                let current = target
                    .get_playlist_tracks(&existing.id)
                    .await
                    .wrap_err("Failed to fetch existing playlist tracks")?;

                if !playlists_differ(&current, &new_playlist.track_ids) {
                    tracing::info!("Playlist '{name}' is already up to date");
                    return Ok(ItemFlow::Finished(ItemOutcome::UpToDate {
                        playlist_id: existing.id.clone(),
                    }));
                }

                tracing::info!("Playlist '{name}' has changes, replacing it");
                progress.update_item(index, |item| {
                    item.status = ItemStatus::Updating;
                    item.target_playlist_id = Some(existing.id.clone());
                });
                if let Err(e) = target.delete_playlist(&existing.id).await {
                    tracing::warn!("Failed to delete outdated playlist '{name}': {e:#}");
                }
                let playlist_id = target
                    .create_playlist(&new_playlist)
                    .await
                    .wrap_err("Failed to create playlist")?;
                Ok(ItemFlow::Finished(ItemOutcome::Updated { playlist_id }))
            }
            None => {
                progress.update_item(index, |item| item.status = ItemStatus::Creating);
                if progress.is_cancelled() {
                    return Ok(ItemFlow::Cancelled);
                }
                let playlist_id = target
                    .create_playlist(&new_playlist)
                    .await
                    .wrap_err("Failed to create playlist")?;
                tracing::info!("Playlist '{name}' created");
                Ok(ItemFlow::Finished(ItemOutcome::Created { playlist_id }))
            }
        }
    }

    async fn open_session(
        &self,
        credential: &TargetCredential,
    ) -> Result<Arc<dyn TargetCatalog>, MigrationError> {
        self.sessions
            .open(credential)
            .await
            .map_err(MigrationError::catalog)
    }
}

async fn run_deletions(
    progress: &JobProgress,
    target: &dyn TargetCatalog,
    ids: Vec<Option<String>>,
) -> RunEnd {
    let total = ids.len();
    for (index, playlist_id) in ids.into_iter().enumerate() {
        if progress.is_cancelled() {
            return RunEnd::Cancelled;
        }

        let Some(playlist_id) = playlist_id else {
            progress.finish_item(index, ItemOutcome::failed("No playlist ID found"));
            continue;
        };

        tracing::info!("[{}/{}] Deleting playlist {playlist_id}", index + 1, total);
        progress.update_item(index, |item| item.status = ItemStatus::Deleting);
        match target.delete_playlist(&playlist_id).await {
            Ok(()) => progress.finish_item(index, ItemOutcome::Deleted),
            Err(e) => {
                tracing::warn!("Failed to delete playlist {playlist_id}: {e:#}");
                progress.finish_item(index, ItemOutcome::failed(format!("{e:#}")));
            }
        }
    }
    RunEnd::Completed
}

/// First playlist whose trimmed title equals the trimmed name.
///
/// Two target playlists with the same title are indistinguishable here; the
/// one listed first wins.
pub fn find_existing_playlist<'a>(
    library: &'a [TargetPlaylist],
    name: &str,
) -> Option<&'a TargetPlaylist> {
    let name = name.trim();
    library.iter().find(|p| p.title.trim() == name)
}

fn non_empty_id(id: &str) -> Option<String> {
    Some(id.trim())
        .filter(|id| !id.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::credentials::CredentialSet;
    use crate::ports::source::{MockSourceCatalog, PlaylistDetails, SourcePlaylist};
    use crate::ports::target::MockTargetSessionFactory;
    use crate::test_utils::{FakeTarget, MemoryCredentials, TargetCall, track, wait_for_job};

    fn headers_auth() -> TargetAuth {
        TargetAuth {
            headers: Some("cookie: SAPISID=x".into()),
            oauth: None,
        }
    }

    fn listed(id: &str, name: &str) -> SourcePlaylist {
        SourcePlaylist {
            id: id.into(),
            name: name.into(),
            link: None,
            total_tracks: 3,
            owner: None,
            image: Some(format!("https://img/{id}")),
        }
    }

    fn road_trip_tracks() -> Vec<SourceTrack> {
        vec![
            track("Highway", "Band A"),
            track("Open Road", "Band B"),
            track("Sunset", "Band C"),
        ]
    }

    fn executor_with(source: MockSourceCatalog, target: Arc<FakeTarget>) -> JobExecutor {
        let source: Arc<dyn SourceCatalog> = Arc::new(source);
        let persistence = Arc::new(MemoryCredentials::new(CredentialSet::default()));
        let credentials = Arc::new(CredentialStore::new(
            persistence,
            source.clone(),
            CredentialSet::default(),
        ));
        let mut sessions = MockTargetSessionFactory::new();
        sessions
            .expect_open()
            .returning(move |_| Ok(target.clone() as Arc<dyn TargetCatalog>));

        JobExecutor::new(
            Arc::new(JobRegistry::new()),
            credentials,
            source,
            Arc::new(sessions),
            TransferSettings::default(),
        )
    }

    fn source_with(playlists: Vec<(SourcePlaylist, Vec<SourceTrack>)>) -> MockSourceCatalog {
        let listing: Vec<SourcePlaylist> = playlists.iter().map(|(p, _)| p.clone()).collect();
        let details: HashMap<String, PlaylistDetails> = playlists
            .into_iter()
            .map(|(p, tracks)| {
                (
                    p.id.clone(),
                    PlaylistDetails {
                        name: p.name,
                        image: None,
                        tracks,
                    },
                )
            })
            .collect();

        let mut source = MockSourceCatalog::new();
        source
            .expect_list_user_playlists()
            .returning(move |_| Ok(listing.clone()));
        source
            .expect_get_playlist_details()
            .returning(move |id| Ok(details[id].clone()));
        source
    }

    fn transfer_all() -> JobRequest {
        JobRequest::TransferAll {
            source_token: Some("token".into()),
            target: headers_auth(),
            playlist_ids: vec![],
        }
    }

    fn assert_counters_consistent(job: &Job) {
        let c = job.counters;
        assert_eq!(c.processed, c.successful + c.failed + c.skipped);
        assert!(c.processed <= c.total);
        let terminal = job.items.iter().filter(|i| i.status.is_terminal()).count();
        assert_eq!(terminal, c.processed);
    }

    #[tokio::test]
    async fn test_new_playlist_is_created() {
        let target = Arc::new(FakeTarget::new().with_songs(&road_trip_tracks()));
        let source = source_with(vec![(listed("p1", "Road Trip"), road_trip_tracks())]);
        let executor = executor_with(source, target.clone());

        let id = executor.submit_job(transfer_all()).await.unwrap();
        let job = wait_for_job(executor.registry(), &id).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.counters.successful, 1);
        let item = &job.items[0];
        assert_eq!(item.status, ItemStatus::Created);
        assert!(item.target_playlist_id.is_some());
        assert_eq!(item.missed_tracks, 0);
        assert_eq!(item.total_tracks, 3);
        assert_eq!(item.found_tracks, 3);
        assert_eq!(item.source_id.as_deref(), Some("p1"));
        assert_counters_consistent(&job);

        let created = target.playlist_by_title("Road Trip").unwrap();
        assert_eq!(
            target.tracks_of(&created.id),
            vec!["vid:Highway", "vid:Open Road", "vid:Sunset"]
        );
    }

    #[tokio::test]
    async fn test_identical_playlist_is_left_alone() {
        let target = Arc::new(
            FakeTarget::new()
                .with_songs(&road_trip_tracks())
                .with_playlist("existing", "Road Trip", &["vid:Sunset", "vid:Highway", "vid:Open Road"]),
        );
        let source = source_with(vec![(listed("p1", "Road Trip"), road_trip_tracks())]);
        let executor = executor_with(source, target.clone());

        let id = executor.submit_job(transfer_all()).await.unwrap();
        let job = wait_for_job(executor.registry(), &id).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.items[0].status, ItemStatus::UpToDate);
        assert_eq!(job.items[0].target_playlist_id.as_deref(), Some("existing"));
        assert_eq!(job.counters.skipped, 1);
        assert!(!target.calls().iter().any(|c| matches!(
            c,
            TargetCall::Create { .. } | TargetCall::Delete(_)
        )));
        assert_counters_consistent(&job);
    }

    #[tokio::test]
    async fn test_changed_playlist_is_replaced() {
        let target = Arc::new(
            FakeTarget::new()
                .with_songs(&road_trip_tracks())
                .with_playlist("existing", "  Road Trip ", &["vid:Highway", "vid:Sunset"]),
        );
        let source = source_with(vec![(listed("p1", "Road Trip"), road_trip_tracks())]);
        let executor = executor_with(source, target.clone());

        let id = executor.submit_job(transfer_all()).await.unwrap();
        let job = wait_for_job(executor.registry(), &id).await;

        let item = &job.items[0];
        assert_eq!(item.status, ItemStatus::Updated);
        assert_eq!(job.counters.successful, 1);
        assert_ne!(item.target_playlist_id.as_deref(), Some("existing"));

        let calls = target.calls();
        let delete = calls
            .iter()
            .position(|c| *c == TargetCall::Delete("existing".into()))
            .unwrap();
        let create = calls
            .iter()
            .position(|c| matches!(c, TargetCall::Create { .. }))
            .unwrap();
        assert!(delete < create);
        assert_counters_consistent(&job);
    }

    #[tokio::test]
    async fn test_failed_stale_delete_still_recreates() {
        let target = Arc::new(
            FakeTarget::new()
                .with_songs(&road_trip_tracks())
                .with_playlist("existing", "Road Trip", &["vid:Highway"])
                .with_failing_delete("existing"),
        );
        let source = source_with(vec![(listed("p1", "Road Trip"), road_trip_tracks())]);
        let executor = executor_with(source, target.clone());

        let id = executor.submit_job(transfer_all()).await.unwrap();
        let job = wait_for_job(executor.registry(), &id).await;

        assert_eq!(job.items[0].status, ItemStatus::Updated);
        assert_eq!(job.counters.successful, 1);
    }

    #[tokio::test]
    async fn test_empty_playlist_is_skipped_without_target_calls() {
        let target = Arc::new(FakeTarget::new());
        let source = source_with(vec![(listed("p1", "Nothing"), vec![])]);
        let executor = executor_with(source, target.clone());

        let id = executor.submit_job(transfer_all()).await.unwrap();
        let job = wait_for_job(executor.registry(), &id).await;

        assert_eq!(job.items[0].status, ItemStatus::Skipped);
        assert_eq!(job.items[0].reason.as_deref(), Some("Empty playlist"));
        assert_eq!(job.counters.skipped, 1);
        assert!(target.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unresolvable_playlist_fails_and_job_continues() {
        let good = vec![track("Known", "Artist")];
        let target = Arc::new(FakeTarget::new().with_songs(&good));
        let source = source_with(vec![
            (listed("p1", "Obscure"), vec![track("Nobody", "Knows")]),
            (listed("p2", "Good"), good),
        ]);
        let executor = executor_with(source, target.clone());

        let id = executor.submit_job(transfer_all()).await.unwrap();
        let job = wait_for_job(executor.registry(), &id).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.items[0].status, ItemStatus::Failed);
        assert!(job.items[0].reason.as_deref().unwrap().contains("No songs found"));
        assert_eq!(job.items[0].missed_tracks_list, vec!["Nobody Knows"]);
        assert_eq!(job.items[1].status, ItemStatus::Created);
        assert_eq!(job.counters.failed, 1);
        assert_eq!(job.counters.successful, 1);
        assert_counters_consistent(&job);
    }

    #[tokio::test]
    async fn test_partial_misses_are_reported() {
        let target = Arc::new(FakeTarget::new().with_songs(&[track("Known", "Artist")]));
        let source = source_with(vec![(
            listed("p1", "Mixed"),
            vec![track("Known", "Artist"), track("Lost", "Artist")],
        )]);
        let executor = executor_with(source, target.clone());

        let id = executor.submit_job(transfer_all()).await.unwrap();
        let job = wait_for_job(executor.registry(), &id).await;

        let item = &job.items[0];
        assert_eq!(item.status, ItemStatus::Created);
        assert_eq!(item.found_tracks, 1);
        assert_eq!(item.missed_tracks, 1);
        assert_eq!(item.missed_tracks_list, vec!["Lost Artist"]);
    }

    #[tokio::test]
    async fn test_item_error_is_recorded_as_failure() {
        let target = Arc::new(FakeTarget::new().with_songs(&road_trip_tracks()));
        let mut source = MockSourceCatalog::new();
        source
            .expect_list_user_playlists()
            .returning(|_| Ok(vec![listed("broken", "Broken"), listed("p1", "Road Trip")]));
        source.expect_get_playlist_details().returning(|id| match id {
            "broken" => Err(color_eyre::eyre::eyre!("upstream 500")),
            _ => Ok(PlaylistDetails {
                name: "Road Trip".into(),
                image: None,
                tracks: road_trip_tracks(),
            }),
        });
        let executor = executor_with(source, target);

        let id = executor.submit_job(transfer_all()).await.unwrap();
        let job = wait_for_job(executor.registry(), &id).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.items[0].status, ItemStatus::Failed);
        assert!(job.items[0].reason.as_deref().unwrap().contains("upstream 500"));
        assert_eq!(job.items[1].status, ItemStatus::Created);
        assert_counters_consistent(&job);
    }

    #[tokio::test]
    async fn test_cancellation_stops_before_next_item() {
        let names = ["One", "Two", "Three", "Four", "Five"];
        let tracks = vec![track("Song", "Artist")];
        let target = Arc::new(FakeTarget::new().with_songs(&tracks));
        let source = source_with(
            names
                .iter()
                .enumerate()
                .map(|(i, name)| (listed(&format!("p{i}"), name), tracks.clone()))
                .collect(),
        );
        let executor = executor_with(source, target.clone());

        let registry = executor.registry().clone();
        target.on_create(move |playlist| {
            if playlist.name == "Two" {
                registry.cancel("job-cancel").unwrap();
            }
        });

        let id = executor
            .submit_job_as("job-cancel".into(), transfer_all())
            .await
            .unwrap();
        let job = wait_for_job(executor.registry(), &id).await;

        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(job.counters.processed, 2);
        assert_eq!(job.items[0].status, ItemStatus::Created);
        assert_eq!(job.items[1].status, ItemStatus::Created);
        for item in &job.items[2..] {
            assert_eq!(item.status, ItemStatus::Pending);
        }
        assert_counters_consistent(&job);
    }

    #[tokio::test]
    async fn test_cancel_during_last_item_ends_cancelled() {
        let target = Arc::new(FakeTarget::new().with_songs(&road_trip_tracks()));
        let source = source_with(vec![(listed("p1", "Road Trip"), road_trip_tracks())]);
        let executor = executor_with(source, target.clone());

        let registry = executor.registry().clone();
        target.on_create(move |_| registry.cancel("job-late-cancel").unwrap());

        let id = executor
            .submit_job_as("job-late-cancel".into(), transfer_all())
            .await
            .unwrap();
        let job = wait_for_job(executor.registry(), &id).await;

        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(job.items[0].status, ItemStatus::Created);
        assert_eq!(job.counters.processed, 1);
        assert_counters_consistent(&job);
    }

    #[tokio::test]
    async fn test_updating_item_points_at_existing_playlist() {
        let target = Arc::new(
            FakeTarget::new()
                .with_songs(&road_trip_tracks())
                .with_playlist("existing", "Road Trip", &["vid:Highway"]),
        );
        let source = source_with(vec![(listed("p1", "Road Trip"), road_trip_tracks())]);
        let executor = executor_with(source, target.clone());

        let seen = Arc::new(parking_lot::Mutex::new(None));
        let registry = executor.registry().clone();
        let seen_in_hook = seen.clone();
        target.on_create(move |_| {
            let job = registry.snapshot("job-update").unwrap();
            let item = &job.items[0];
            *seen_in_hook.lock() = Some((item.status, item.target_playlist_id.clone()));
        });

        let id = executor
            .submit_job_as("job-update".into(), transfer_all())
            .await
            .unwrap();
        let job = wait_for_job(executor.registry(), &id).await;

        assert_eq!(
            *seen.lock(),
            Some((ItemStatus::Updating, Some("existing".to_string())))
        );
        assert_eq!(job.items[0].status, ItemStatus::Updated);
        assert_ne!(job.items[0].target_playlist_id.as_deref(), Some("existing"));
    }

    #[tokio::test]
    async fn test_transfer_by_link_runs_one_playlist() {
        let target = Arc::new(FakeTarget::new().with_songs(&road_trip_tracks()[..2]));
        let mut source = source_with(vec![(listed("p1", "Road Trip"), road_trip_tracks())]);
        source.expect_playlist_id_from_link().returning(|link| {
            link.strip_prefix("https://open.spotify.com/playlist/")
                .map(String::from)
        });
        let executor = executor_with(source, target.clone());

        let id = executor
            .submit_job(JobRequest::TransferLink {
                target: headers_auth(),
                link: "https://open.spotify.com/playlist/p1".into(),
            })
            .await
            .unwrap();
        let job = wait_for_job(executor.registry(), &id).await;

        assert_eq!(job.kind, JobKind::TransferAll);
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.items.len(), 1);
        let item = &job.items[0];
        assert_eq!(item.name, "Road Trip");
        assert_eq!(item.source_id.as_deref(), Some("p1"));
        assert_eq!(item.status, ItemStatus::Created);
        assert_eq!(item.missed_tracks, 1);
        assert_eq!(item.missed_tracks_list, vec!["Sunset Band C".to_string()]);
        assert!(target.playlist_by_title("Road Trip").is_some());
    }

    #[tokio::test]
    async fn test_transfer_by_link_rejects_other_links() {
        let target = Arc::new(FakeTarget::new());
        let mut source = MockSourceCatalog::new();
        source.expect_playlist_id_from_link().returning(|_| None);
        let executor = executor_with(source, target);

        let result = executor
            .submit_job(JobRequest::TransferLink {
                target: headers_auth(),
                link: "https://example.com/album/1".into(),
            })
            .await;

        assert!(matches!(result, Err(MigrationError::NothingToTransfer(_))));
        assert!(executor.registry().is_empty());
    }

    #[tokio::test]
    async fn test_taken_job_id_is_rejected() {
        let target = Arc::new(FakeTarget::new().with_songs(&road_trip_tracks()));
        let source = source_with(vec![(listed("p1", "Road Trip"), road_trip_tracks())]);
        let executor = executor_with(source, target);

        let first = executor
            .submit_job_as("job-fixed".into(), transfer_all())
            .await
            .unwrap();
        wait_for_job(executor.registry(), &first).await;

        let second = executor.submit_job_as("job-fixed".into(), transfer_all()).await;
        assert_eq!(second, Err(MigrationError::JobIdTaken("job-fixed".into())));
        assert_eq!(executor.registry().len(), 1);
    }

    #[tokio::test]
    async fn test_transfer_all_filters_by_ids() {
        let target = Arc::new(FakeTarget::new().with_songs(&road_trip_tracks()));
        let source = source_with(vec![
            (listed("p1", "Road Trip"), road_trip_tracks()),
            (listed("p2", "Other"), road_trip_tracks()),
        ]);
        let executor = executor_with(source, target);

        let id = executor
            .submit_job(JobRequest::TransferAll {
                source_token: Some("token".into()),
                target: headers_auth(),
                playlist_ids: vec!["p2".into()],
            })
            .await
            .unwrap();
        let job = wait_for_job(executor.registry(), &id).await;

        assert_eq!(job.counters.total, 1);
        assert_eq!(job.items[0].name, "Other");
    }

    #[tokio::test]
    async fn test_transfer_all_rejects_empty_source() {
        let executor = executor_with(source_with(vec![]), Arc::new(FakeTarget::new()));

        let result = executor.submit_job(transfer_all()).await;
        assert!(matches!(result, Err(MigrationError::NothingToTransfer(_))));
    }

    #[tokio::test]
    async fn test_submission_without_target_credential_is_rejected() {
        let executor = executor_with(source_with(vec![]), Arc::new(FakeTarget::new()));

        let result = executor
            .submit_job(JobRequest::TransferAll {
                source_token: Some("token".into()),
                target: TargetAuth::default(),
                playlist_ids: vec![],
            })
            .await;
        assert!(matches!(result, Err(MigrationError::CredentialMissing(_))));
    }

    #[tokio::test]
    async fn test_transfer_all_without_source_token_is_rejected() {
        let executor = executor_with(source_with(vec![]), Arc::new(FakeTarget::new()));

        let result = executor
            .submit_job(JobRequest::TransferAll {
                source_token: None,
                target: headers_auth(),
                playlist_ids: vec![],
            })
            .await;
        assert!(matches!(result, Err(MigrationError::CredentialMissing(_))));
    }

    #[tokio::test]
    async fn test_transfer_selected_uses_supplied_tracks() {
        let target = Arc::new(FakeTarget::new().with_songs(&road_trip_tracks()));
        let mut source = MockSourceCatalog::new();
        source.expect_get_playlist_details().never();
        let executor = executor_with(source, target.clone());

        let id = executor
            .submit_job(JobRequest::TransferSelected {
                target: headers_auth(),
                playlists: vec![
                    SelectedPlaylist {
                        id: Some("p1".into()),
                        name: "Picked".into(),
                        image: None,
                        tracks: road_trip_tracks()[..2].to_vec(),
                    },
                    SelectedPlaylist {
                        id: None,
                        name: "Empty pick".into(),
                        image: None,
                        tracks: vec![],
                    },
                ],
            })
            .await
            .unwrap();
        let job = wait_for_job(executor.registry(), &id).await;

        assert_eq!(job.kind, JobKind::TransferSelected);
        assert_eq!(job.items[0].status, ItemStatus::Created);
        assert_eq!(job.items[1].status, ItemStatus::Skipped);
        assert_eq!(job.items[1].reason.as_deref(), Some("No tracks selected"));
        let created = target.playlist_by_title("Picked").unwrap();
        assert_eq!(target.tracks_of(&created.id), vec!["vid:Highway", "vid:Open Road"]);
    }

    #[tokio::test]
    async fn test_session_failure_sets_job_error() {
        let source: Arc<dyn SourceCatalog> = Arc::new(source_with(vec![(
            listed("p1", "Road Trip"),
            road_trip_tracks(),
        )]));
        let credentials = Arc::new(CredentialStore::new(
            Arc::new(MemoryCredentials::new(CredentialSet::default())),
            source.clone(),
            CredentialSet::default(),
        ));
        let mut sessions = MockTargetSessionFactory::new();
        sessions
            .expect_open()
            .returning(|_| Err(color_eyre::eyre::eyre!("bad headers")));
        let executor = JobExecutor::new(
            Arc::new(JobRegistry::new()),
            credentials,
            source,
            Arc::new(sessions),
            TransferSettings::default(),
        );

        let id = executor.submit_job(transfer_all()).await.unwrap();
        let job = wait_for_job(executor.registry(), &id).await;

        assert_eq!(job.status, JobStatus::Error);
        assert!(job.error.as_deref().unwrap().contains("bad headers"));
        assert_eq!(job.items[0].status, ItemStatus::Pending);
    }

    #[tokio::test]
    async fn test_delete_all() {
        let target = Arc::new(
            FakeTarget::new()
                .with_playlist("a", "First", &[])
                .with_playlist("b", "Second", &[])
                .with_failing_delete("b"),
        );
        let executor = executor_with(MockSourceCatalog::new(), target.clone());

        let id = executor
            .submit_job(JobRequest::DeleteAll {
                target: headers_auth(),
            })
            .await
            .unwrap();
        let job = wait_for_job(executor.registry(), &id).await;

        assert_eq!(job.kind, JobKind::DeleteAll);
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.items[0].status, ItemStatus::Deleted);
        assert_eq!(job.items[1].status, ItemStatus::Failed);
        assert_eq!(job.counters.successful, 1);
        assert_eq!(job.counters.failed, 1);
        assert_counters_consistent(&job);
        assert!(target.playlist_by_title("First").is_none());
    }

    #[tokio::test]
    async fn test_delete_selected_labels_and_missing_ids() {
        let target = Arc::new(FakeTarget::new().with_playlist("a", "First", &[]));
        let executor = executor_with(MockSourceCatalog::new(), target.clone());

        let id = executor
            .submit_job(JobRequest::DeleteSelected {
                target: headers_auth(),
                playlist_ids: vec!["a".into(), "".into(), "zzz".into()],
            })
            .await
            .unwrap();
        let job = wait_for_job(executor.registry(), &id).await;

        assert_eq!(job.items[0].name, "First");
        assert_eq!(job.items[0].status, ItemStatus::Deleted);
        assert_eq!(job.items[1].status, ItemStatus::Failed);
        assert_eq!(job.items[1].reason.as_deref(), Some("No playlist ID found"));
        assert_eq!(job.items[2].name, "Unknown");
        assert_eq!(target.calls().iter().filter(|c| matches!(c, TargetCall::Delete(_))).count(), 2);
        assert_counters_consistent(&job);
    }

    #[tokio::test]
    async fn test_delete_selected_rejects_empty_selection() {
        let executor = executor_with(MockSourceCatalog::new(), Arc::new(FakeTarget::new()));

        let result = executor
            .submit_job(JobRequest::DeleteSelected {
                target: headers_auth(),
                playlist_ids: vec![],
            })
            .await;
        assert!(matches!(result, Err(MigrationError::NothingToTransfer(_))));
    }

    #[tokio::test]
    async fn test_status_and_cancel_unknown_job() {
        let executor = executor_with(MockSourceCatalog::new(), Arc::new(FakeTarget::new()));

        assert!(matches!(
            executor.job_status("nope"),
            Err(MigrationError::JobNotFound(_))
        ));
        assert!(matches!(
            executor.cancel_job("nope"),
            Err(MigrationError::JobNotFound(_))
        ));
    }

    #[test]
    fn test_find_existing_playlist_first_match_wins() {
        let library = vec![
            TargetPlaylist {
                id: "1".into(),
                title: "Other".into(),
                count: None,
                thumbnails: vec![],
            },
            TargetPlaylist {
                id: "2".into(),
                title: " Road Trip".into(),
                count: None,
                thumbnails: vec![],
            },
            TargetPlaylist {
                id: "3".into(),
                title: "Road Trip".into(),
                count: None,
                thumbnails: vec![],
            },
        ];

        assert_eq!(find_existing_playlist(&library, "Road Trip ").unwrap().id, "2");
        assert!(find_existing_playlist(&library, "road trip").is_none());
    }
}
