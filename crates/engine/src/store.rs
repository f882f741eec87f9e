//! Job snapshot store and the observable view derived from it.
//!
//! [`JobStore`] holds either the last authoritative snapshot or,
//! transiently, that snapshot with optimistic local removals applied.

use reelwatch_core::{Job, JobsSnapshot};
use serde::Serialize;

/// What the host UI renders: the current jobs plus load state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobsView {
    pub jobs: Vec<Job>,
    pub active_count: u32,
    pub active_limit: u32,
    /// No snapshot has been applied yet for the current scope.
    pub loading: bool,
    /// User-facing message for a failed initial load.
    pub error: Option<String>,
}

impl JobsView {
    pub fn job(&self, job_id: &str) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == job_id)
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.job(job_id).is_some()
    }
}

/// Ordered in-memory job collection plus aggregate counters.
#[derive(Debug, Default)]
pub struct JobStore {
    snapshot: JobsSnapshot,
}

impl JobStore {
    /// Swap in a complete snapshot.
    pub fn replace(&mut self, snapshot: JobsSnapshot) {
        self.snapshot = snapshot;
    }

    pub fn clear(&mut self) {
        self.snapshot = JobsSnapshot::default();
    }

    pub fn get(&self, job_id: &str) -> Option<&Job> {
        self.snapshot.jobs.iter().find(|job| job.id == job_id)
    }

    /// Remove a job, returning its former position and the record.
    pub fn remove(&mut self, job_id: &str) -> Option<(usize, Job)> {
        let index = self.snapshot.jobs.iter().position(|job| job.id == job_id)?;
        Some((index, self.snapshot.jobs.remove(index)))
    }

    /// Put back a job removed by [`remove`](Self::remove).
    ///
    /// No-op if a job with the same id is present again.
    pub fn restore(&mut self, index: usize, job: Job) {
        if self.get(&job.id).is_some() {
            return;
        }
        let index = index.min(self.snapshot.jobs.len());
        self.snapshot.jobs.insert(index, job);
    }

    pub fn jobs(&self) -> &[Job] {
        &self.snapshot.jobs
    }

    pub fn len(&self) -> usize {
        self.snapshot.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.jobs.is_empty()
    }

    pub fn active_count(&self) -> u32 {
        self.snapshot.active_count
    }

    pub fn active_limit(&self) -> u32 {
        self.snapshot.active_limit
    }
}
