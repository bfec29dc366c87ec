use std::collections::{HashMap, HashSet, hash_map::Entry};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::MigrationError;
use crate::services::jobs::model::{ItemOutcome, Job, JobItem, JobKind, JobStatus};

/// Process-wide store of job records.
///
/// Each job sits behind its own lock so a status poll on one job never waits
/// on writes to another; the outer map lock is only held to look a job up or
/// insert one. Records are never removed.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Arc<RwLock<Job>>>>,
    cancelled: Mutex<HashSet<String>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record with a freshly generated id.
    pub fn create(&self, kind: JobKind, items: Vec<JobItem>) -> String {
        self.insert_generated(|| uuid::Uuid::new_v4().simple().to_string(), kind, items)
    }

    /// Creates a record whose id is `prefix` followed by 8 random hex
    /// characters, drawing again while the id is taken.
    pub fn create_with_prefix(&self, prefix: &str, kind: JobKind, items: Vec<JobItem>) -> String {
        self.insert_generated(
            || {
                let suffix = uuid::Uuid::new_v4().simple().to_string();
                format!("{prefix}{}", &suffix[..8])
            },
            kind,
            items,
        )
    }

    /// Creates a record under a caller-chosen id. An existing record is
    /// never replaced.
    pub fn create_with_id(
        &self,
        id: String,
        kind: JobKind,
        items: Vec<JobItem>,
    ) -> Result<String, MigrationError> {
        match self.jobs.write().entry(id.clone()) {
            Entry::Occupied(_) => Err(MigrationError::JobIdTaken(id)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(RwLock::new(Job::new(id.clone(), kind, items))));
                Ok(id)
            }
        }
    }

    fn insert_generated(
        &self,
        mut next_id: impl FnMut() -> String,
        kind: JobKind,
        items: Vec<JobItem>,
    ) -> String {
        let mut jobs = self.jobs.write();
        loop {
            let id = next_id();
            match jobs.entry(id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(RwLock::new(Job::new(id.clone(), kind, items))));
                    return id;
                }
                Entry::Occupied(_) => tracing::warn!("Job id {id} is taken, drawing another"),
            }
        }
    }

    /// A consistent copy of the job as of now.
    pub fn snapshot(&self, id: &str) -> Result<Job, MigrationError> {
        let job = self.entry(id)?;
        let snapshot = job.read().clone();
        Ok(snapshot)
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.jobs.read().contains_key(id)
    }

    /// Marks a job as cancelled. The owning execution notices at its next
    /// checkpoint.
    pub fn cancel(&self, id: &str) -> Result<(), MigrationError> {
        if !self.contains(id) {
            return Err(MigrationError::JobNotFound(id.to_string()));
        }
        self.cancelled.lock().insert(id.to_string());
        Ok(())
    }

    pub fn is_cancelled(&self, id: &str) -> bool {
        self.cancelled.lock().contains(id)
    }

    /// Applies `f` to the job while holding its write lock, so readers see
    /// either none or all of the change.
    pub fn update<R>(&self, id: &str, f: impl FnOnce(&mut Job) -> R) -> Result<R, MigrationError> {
        let job = self.entry(id)?;
        let mut guard = job.write();
        Ok(f(&mut *guard))
    }

    fn entry(&self, id: &str) -> Result<Arc<RwLock<Job>>, MigrationError> {
        self.jobs
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| MigrationError::JobNotFound(id.to_string()))
    }
}

/// Write handle the owning execution uses to report progress on one job.
#[derive(Clone)]
pub struct JobProgress {
    registry: Arc<JobRegistry>,
    id: String,
}

impl JobProgress {
    pub fn new(registry: Arc<JobRegistry>, id: String) -> Self {
        Self { registry, id }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.registry.is_cancelled(&self.id)
    }

    /// Updates one item in place. Out-of-range indexes are ignored.
    pub fn update_item(&self, index: usize, f: impl FnOnce(&mut JobItem)) {
        let _ = self.registry.update(&self.id, |job| {
            if let Some(item) = job.items.get_mut(index) {
                f(item);
            }
        });
    }

    /// Records an item's terminal outcome and its counter in one step.
    pub fn finish_item(&self, index: usize, outcome: ItemOutcome) {
        let _ = self.registry.update(&self.id, |job| {
            let Job {
                items, counters, ..
            } = job;
            if let Some(item) = items.get_mut(index) {
                if !item.status.is_terminal() {
                    outcome.apply(item, counters);
                }
            }
        });
    }

    pub fn finish(&self, status: JobStatus, error: Option<String>) {
        let _ = self.registry.update(&self.id, |job| job.finish(status, error));
    }
}
