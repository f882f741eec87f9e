//! Optimistic mutation reconciler.
//!
//! Every user mutation runs as a small state machine:
//!
//! ```text
//! Applied ──► Confirmed                 (request succeeded)
//!    └──────► Reconciling ──► Resynced  (request failed)
//! ```
//!
//! `Applied` is entered synchronously: preconditions are checked against the
//! local snapshot and, for deletes, the job is removed from the store before
//! any I/O. On failure the reconciler forces an authoritative refresh; if
//! that refresh cannot run, the removed job is put back where it was.

use std::collections::HashMap;
use std::sync::Mutex;

use reelwatch_core::{CoreError, Job, JobAction, JobId, VideoJobStatus};

use crate::error::EngineError;
use crate::scheduler::Generation;
use crate::tracker::{PollOutcome, TrackerCore};

/// Where a mutation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    /// Local change applied, request in flight.
    Applied,
    /// The server accepted the request.
    Confirmed,
    /// The request failed; the compensating refresh is running.
    Reconciling,
    /// The store was brought back in line with the server.
    Resynced,
}

impl MutationPhase {
    pub fn can_advance_to(self, next: MutationPhase) -> bool {
        matches!(
            (self, next),
            (MutationPhase::Applied, MutationPhase::Confirmed)
                | (MutationPhase::Applied, MutationPhase::Reconciling)
                | (MutationPhase::Reconciling, MutationPhase::Resynced)
        )
    }
}

/// Check `action` against the local copy of the job.
///
/// Delete needs the job present and not uploading; approve and reject need
/// it `ready`.
pub fn check_preconditions(
    action: JobAction,
    job: Option<&Job>,
    job_id: &str,
) -> Result<(), CoreError> {
    let job = job.ok_or_else(|| CoreError::NotFound {
        entity: "Job",
        id: job_id.to_string(),
    })?;

    match action {
        JobAction::Delete if job.status == VideoJobStatus::Uploading => Err(
            CoreError::Validation("Cannot delete a video while it is uploading".into()),
        ),
        JobAction::Approve | JobAction::Reject if job.status != VideoJobStatus::Ready => {
            let verb = match action {
                JobAction::Approve => "approved",
                _ => "rejected",
            };
            Err(CoreError::Validation(format!(
                "Only ready videos can be {verb}, this one is {}",
                job.status,
            )))
        }
        _ => Ok(()),
    }
}

/// What the `Applied` step did to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalChange {
    /// The job was removed from position `index` while `generation` was
    /// current.
    Removed {
        index: usize,
        job: Job,
        generation: Generation,
    },
    Unchanged,
}

// ---------------------------------------------------------------------------
// In-flight guard
// ---------------------------------------------------------------------------

/// Per-job "mutation in flight" markers.
///
/// At most one mutation per job id runs at a time; a second one is refused
/// with [`EngineError::MutationInFlight`].
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    entries: Mutex<HashMap<JobId, (JobAction, MutationPhase)>>,
}

impl InFlightRegistry {
    pub fn begin(&self, job_id: &str, action: JobAction) -> Result<InFlightGuard<'_>, EngineError> {
        let mut entries = self.lock();
        if let Some((running, _)) = entries.get(job_id) {
            return Err(EngineError::MutationInFlight {
                job_id: job_id.to_string(),
                action: *running,
            });
        }
        entries.insert(job_id.to_string(), (action, MutationPhase::Applied));
        Ok(InFlightGuard {
            registry: self,
            job_id: job_id.to_string(),
            action,
        })
    }

    pub fn phase(&self, job_id: &str) -> Option<MutationPhase> {
        self.lock().get(job_id).map(|(_, phase)| *phase)
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.lock().contains_key(job_id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<JobId, (JobAction, MutationPhase)>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Clears the job's in-flight marker when dropped.
pub struct InFlightGuard<'a> {
    registry: &'a InFlightRegistry,
    job_id: JobId,
    action: JobAction,
}

impl InFlightGuard<'_> {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn action(&self) -> JobAction {
        self.action
    }

    fn advance(&self, next: MutationPhase) {
        let mut entries = self.registry.lock();
        if let Some((_, phase)) = entries.get_mut(&self.job_id) {
            debug_assert!(phase.can_advance_to(next), "{phase:?} -> {next:?}");
            *phase = next;
        }
        tracing::debug!(job_id = %self.job_id, action = %self.action, phase = ?next, "Mutation phase");
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.job_id);
    }
}

// ---------------------------------------------------------------------------
// Mutation driver
// ---------------------------------------------------------------------------

/// Run one mutation end to end under `guard`.
pub(crate) async fn run_mutation(
    core: &TrackerCore,
    guard: &InFlightGuard<'_>,
    payload: Option<serde_json::Value>,
) -> Result<(), EngineError> {
    let job_id = guard.job_id();
    let action = guard.action();

    let change = core.apply_optimistic(job_id, action)?;
    tracing::debug!(job_id, action = %action, removed = matches!(change, LocalChange::Removed { .. }), "Applied locally");

    match core.mutator.mutate_job(job_id, action, payload.as_ref()).await {
        Ok(()) => {
            guard.advance(MutationPhase::Confirmed);
            tracing::info!(job_id, action = %action, "Mutation confirmed");
            Ok(())
        }
        Err(e) => {
            tracing::error!(job_id, action = %action, error = %e, "Mutation failed, resyncing");
            guard.advance(MutationPhase::Reconciling);

            let outcome = core.refresh().await;
            if matches!(outcome, PollOutcome::Failed | PollOutcome::Inactive) {
                core.restore(change);
            }
            guard.advance(MutationPhase::Resynced);

            Err(EngineError::Network {
                job_id: job_id.to_string(),
                action,
                message: e.user_message(),
                source: e,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
