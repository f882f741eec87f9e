//! The tracker engine: polling, diffing, dispatch and optimistic mutations
//! wired together behind one host-facing facade.
//!
//! [`TrackerEngine`] owns a [`TrackerCore`] shared with the poll task. All
//! store and previous-status updates happen under the core's state lock
//! without awaiting, so a poll's diff-and-replace is atomic with respect to
//! user mutations. The lock order is state, then scheduler; the scheduler
//! never calls back into the core while holding its own lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use reelwatch_client::{ClientError, JobMutator, JobSource, PushRegistrar};
use reelwatch_core::{
    JobAction, JobScope, JobsSnapshot, NotificationSettings, SettingsHandle, TransitionEvent,
};
use reelwatch_events::{
    BrowserChannel, NotificationCenter, NotificationQueue, PermissionGate, QueueStats,
    SoundChannel, SoundPlayer, TransitionBus,
};
use tokio::sync::{broadcast, watch};

use crate::config::EngineConfig;
use crate::diff::PreviousStatusMap;
use crate::error::EngineError;
use crate::reconciler::{self, check_preconditions, InFlightRegistry, LocalChange, MutationPhase};
use crate::scheduler::{Generation, PollScheduler};
use crate::settings::{MemorySettingsStore, SettingsStore};
use crate::store::{JobStore, JobsView};

mod toggles;

/// Upper bound on how long [`TrackerEngine::shutdown`] waits for the poll task.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Host callback invoked for every detected transition.
pub type TransitionObserver = Arc<dyn Fn(&TransitionEvent) + Send + Sync>;

/// Result of one fetch-and-apply cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The snapshot replaced the store.
    Applied { transitions: usize },
    /// The response arrived after a scope change or a newer response and
    /// was discarded.
    Stale,
    /// The fetch failed; the store is unchanged.
    Failed,
    /// No scope is active.
    Inactive,
}

// ---------------------------------------------------------------------------
// Core
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TrackerState {
    store: JobStore,
    previous: PreviousStatusMap,
    loading: bool,
    error: Option<String>,
    /// A snapshot has been applied for the current scope.
    loaded: bool,
    /// Sequence number of the last applied response.
    applied_seq: u64,
}

impl TrackerState {
    fn reset_for_scope(&mut self) {
        self.store.clear();
        self.loading = true;
        self.error = None;
        self.loaded = false;
        self.applied_seq = 0;
    }

    fn view(&self) -> JobsView {
        JobsView {
            jobs: self.store.jobs().to_vec(),
            active_count: self.store.active_count(),
            active_limit: self.store.active_limit(),
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

pub(crate) struct TrackerCore {
    config: EngineConfig,
    state: Mutex<TrackerState>,
    view_tx: watch::Sender<JobsView>,
    source: Arc<dyn JobSource>,
    pub(crate) mutator: Arc<dyn JobMutator>,
    scheduler: PollScheduler<JobScope>,
    queue: NotificationQueue,
    bus: TransitionBus,
    observer: Option<TransitionObserver>,
    request_seq: AtomicU64,
    in_flight: InFlightRegistry,
}

impl TrackerCore {
    fn lock_state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, state: &TrackerState) {
        self.view_tx.send_replace(state.view());
    }

    /// Fetch a snapshot for `scope` and apply it if still wanted.
    async fn poll(&self, scope: JobScope, generation: Generation) -> PollOutcome {
        let seq = self.request_seq.fetch_add(1, Ordering::SeqCst) + 1;

        match self.source.fetch_jobs(&scope).await {
            Ok(snapshot) => self.apply_snapshot(&scope, generation, seq, snapshot),
            Err(e) => self.record_failure(&scope, generation, &e),
        }
    }

    fn apply_snapshot(
        &self,
        scope: &JobScope,
        generation: Generation,
        seq: u64,
        snapshot: JobsSnapshot,
    ) -> PollOutcome {
        let transitions = {
            let mut state = self.lock_state();
            if !self.scheduler.is_current(generation) {
                tracing::debug!(
                    scope = %scope,
                    generation = generation.value(),
                    "Discarding snapshot from a previous scope",
                );
                return PollOutcome::Stale;
            }
            if seq <= state.applied_seq {
                tracing::debug!(
                    scope = %scope,
                    seq,
                    applied_seq = state.applied_seq,
                    "Discarding out-of-order snapshot",
                );
                return PollOutcome::Stale;
            }

            let transitions = state.previous.observe(&snapshot.jobs);
            state.store.replace(snapshot);
            state.applied_seq = seq;
            state.loading = false;
            state.loaded = true;
            state.error = None;
            self.publish(&state);
            transitions
        };

        let count = transitions.len();
        self.dispatch(transitions);
        PollOutcome::Applied { transitions: count }
    }

    fn record_failure(
        &self,
        scope: &JobScope,
        generation: Generation,
        err: &ClientError,
    ) -> PollOutcome {
        let mut state = self.lock_state();
        if !self.scheduler.is_current(generation) {
            tracing::debug!(scope = %scope, error = %err, "Ignoring failure from a previous scope");
            return PollOutcome::Stale;
        }

        tracing::warn!(scope = %scope, error = %err, "Job poll failed");
        if !state.loaded {
            state.loading = false;
            state.error = Some(err.user_message());
            self.publish(&state);
        }
        PollOutcome::Failed
    }

    /// Hand transitions to the observer, the notification queue and the bus.
    fn dispatch(&self, transitions: Vec<TransitionEvent>) {
        for event in transitions {
            tracing::info!(
                job_id = %event.job_id,
                from = %event.from,
                to = %event.to,
                "Job status changed",
            );

            if let Some(observer) = &self.observer {
                observer(&event);
            }
            if let Some(request) = event.notification() {
                self.queue.enqueue(request);
            }
            self.bus.publish(event);
        }
    }

    /// Poll the active scope right now.
    pub(crate) async fn refresh(&self) -> PollOutcome {
        let Some((scope, generation)) = self.scheduler.current() else {
            return PollOutcome::Inactive;
        };
        self.poll(scope, generation).await
    }

    pub(crate) fn apply_optimistic(
        &self,
        job_id: &str,
        action: JobAction,
    ) -> Result<LocalChange, EngineError> {
        let mut state = self.lock_state();
        check_preconditions(action, state.store.get(job_id), job_id)?;

        if action != JobAction::Delete {
            return Ok(LocalChange::Unchanged);
        }

        let (index, job) = state.store.remove(job_id).ok_or_else(|| EngineError::NotFound {
            job_id: job_id.to_string(),
        })?;
        self.publish(&state);
        Ok(LocalChange::Removed {
            index,
            job,
            generation: self.scheduler.generation(),
        })
    }

    /// Undo an optimistic removal, unless the scope changed since.
    pub(crate) fn restore(&self, change: LocalChange) {
        let LocalChange::Removed {
            index,
            job,
            generation,
        } = change
        else {
            return;
        };

        let mut state = self.lock_state();
        if !self.scheduler.is_current(generation) {
            return;
        }
        tracing::info!(job_id = %job.id, "Restoring job after failed mutation");
        state.store.restore(index, job);
        self.publish(&state);
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct TrackerEngineBuilder {
    source: Arc<dyn JobSource>,
    mutator: Arc<dyn JobMutator>,
    config: EngineConfig,
    settings_store: Arc<dyn SettingsStore>,
    sound_players: Vec<Arc<dyn SoundPlayer>>,
    notification_center: Option<Arc<dyn NotificationCenter>>,
    permission_gate: Option<Arc<dyn PermissionGate>>,
    push_registrar: Option<Arc<dyn PushRegistrar>>,
    on_transition: Option<TransitionObserver>,
}

impl TrackerEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = store;
        self
    }

    /// Add a sound player. The first one added is the primary player, later
    /// ones are fallbacks.
    pub fn sound_player(mut self, player: Arc<dyn SoundPlayer>) -> Self {
        self.sound_players.push(player);
        self
    }

    pub fn notification_center(mut self, center: Arc<dyn NotificationCenter>) -> Self {
        self.notification_center = Some(center);
        self
    }

    pub fn permission_gate(mut self, gate: Arc<dyn PermissionGate>) -> Self {
        self.permission_gate = Some(gate);
        self
    }

    pub fn push_registrar(mut self, registrar: Arc<dyn PushRegistrar>) -> Self {
        self.push_registrar = Some(registrar);
        self
    }

    pub fn on_transition(
        mut self,
        observer: impl Fn(&TransitionEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_transition = Some(Arc::new(observer));
        self
    }

    /// Load settings and assemble the engine. Polling stays inactive until
    /// [`TrackerEngine::activate`].
    pub async fn build(self) -> TrackerEngine {
        let loaded = match self.settings_store.load().await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load notification settings, using defaults");
                NotificationSettings::default()
            }
        };
        let settings = SettingsHandle::new(loaded);

        let dispatch = self.config.dispatch();
        let queue = NotificationQueue::new(
            settings.clone(),
            SoundChannel::new(self.sound_players, dispatch.sound_cooldown),
            BrowserChannel::new(self.notification_center, dispatch.dismiss_after),
            dispatch.pacing_delay,
        );

        let (view_tx, _) = watch::channel(JobsView::default());
        let core = Arc::new(TrackerCore {
            config: self.config,
            state: Mutex::new(TrackerState::default()),
            view_tx,
            source: self.source,
            mutator: self.mutator,
            scheduler: PollScheduler::new(),
            queue,
            bus: TransitionBus::default(),
            observer: self.on_transition,
            request_seq: AtomicU64::new(0),
            in_flight: InFlightRegistry::default(),
        });

        TrackerEngine {
            core,
            settings,
            settings_store: self.settings_store,
            settings_lock: tokio::sync::Mutex::new(()),
            permission_gate: self.permission_gate,
            push_registrar: self.push_registrar,
        }
    }
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

/// Host-facing job tracker.
///
/// Exposes the observable [`JobsView`], the transition hooks, the imperative
/// refresh and mutation operations, and the notification settings toggles.
pub struct TrackerEngine {
    core: Arc<TrackerCore>,
    settings: SettingsHandle,
    settings_store: Arc<dyn SettingsStore>,
    /// Serialises toggles so saves land in the order they were applied.
    settings_lock: tokio::sync::Mutex<()>,
    permission_gate: Option<Arc<dyn PermissionGate>>,
    push_registrar: Option<Arc<dyn PushRegistrar>>,
}

impl TrackerEngine {
    /// Start building an engine. Settings default to an in-memory store.
    pub fn builder(source: Arc<dyn JobSource>, mutator: Arc<dyn JobMutator>) -> TrackerEngineBuilder {
        TrackerEngineBuilder {
            source,
            mutator,
            config: EngineConfig::default(),
            settings_store: Arc::new(MemorySettingsStore::default()),
            sound_players: Vec::new(),
            notification_center: None,
            permission_gate: None,
            push_registrar: None,
            on_transition: None,
        }
    }

    // -- polling --------------------------------------------------------

    /// Start polling `scope`. Returns `false` if it was already active.
    ///
    /// Switching scope clears the view and marks it loading until the first
    /// snapshot for the new scope lands. Must be called within a Tokio
    /// runtime.
    pub fn activate(&self, scope: JobScope) -> bool {
        let weak = Arc::downgrade(&self.core);
        let mut state = self.core.lock_state();

        let started = self.core.scheduler.start(
            scope.clone(),
            self.core.config.poll_interval,
            move |scope, generation| {
                let weak = weak.clone();
                async move {
                    if let Some(core) = weak.upgrade() {
                        core.poll(scope, generation).await;
                    }
                }
            },
        );
        let Some(generation) = started else {
            return false;
        };

        state.reset_for_scope();
        self.core.publish(&state);
        tracing::info!(scope = %scope, generation = generation.value(), "Polling activated");
        true
    }

    /// Stop polling. The view keeps its last contents.
    pub fn deactivate(&self) {
        if self.stop_polling().is_some() {
            tracing::info!("Polling deactivated");
        }
    }

    /// Apply an external activation key: `"all"`, `"none"`/empty, or a
    /// channel id.
    pub fn activate_key(&self, key: &str) -> bool {
        match JobScope::parse_activation_key(key) {
            Some(scope) => self.activate(scope),
            None => {
                self.deactivate();
                false
            }
        }
    }

    /// Fetch the active scope immediately, outside the regular schedule.
    pub async fn refresh(&self) -> PollOutcome {
        self.core.refresh().await
    }

    pub fn scope(&self) -> Option<JobScope> {
        self.core.scheduler.current().map(|(scope, _)| scope)
    }

    fn stop_polling(&self) -> Option<tokio::task::JoinHandle<()>> {
        let mut state = self.core.lock_state();
        let handle = self.core.scheduler.stop();
        if state.loading {
            state.loading = false;
            self.core.publish(&state);
        }
        handle
    }

    // -- observation ----------------------------------------------------

    pub fn view(&self) -> JobsView {
        self.core.view_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<JobsView> {
        self.core.view_tx.subscribe()
    }

    pub fn subscribe_transitions(&self) -> broadcast::Receiver<TransitionEvent> {
        self.core.bus.subscribe()
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.core.queue.stats()
    }

    // -- mutations ------------------------------------------------------

    /// Optimistically remove a job and delete it on the server.
    pub async fn remove(&self, job_id: &str) -> Result<(), EngineError> {
        self.mutate(job_id, JobAction::Delete, None).await
    }

    /// Approve a ready job, optionally with edited metadata.
    pub async fn approve(
        &self,
        job_id: &str,
        payload: Option<serde_json::Value>,
    ) -> Result<(), EngineError> {
        self.mutate(job_id, JobAction::Approve, payload).await
    }

    pub async fn reject(&self, job_id: &str, reason: Option<&str>) -> Result<(), EngineError> {
        let payload = reason.map(|reason| serde_json::json!({ "reason": reason }));
        self.mutate(job_id, JobAction::Reject, payload).await
    }

    pub fn is_mutating(&self, job_id: &str) -> bool {
        self.core.in_flight.contains(job_id)
    }

    pub fn mutation_phase(&self, job_id: &str) -> Option<MutationPhase> {
        self.core.in_flight.phase(job_id)
    }

    async fn mutate(
        &self,
        job_id: &str,
        action: JobAction,
        payload: Option<serde_json::Value>,
    ) -> Result<(), EngineError> {
        let guard = self.core.in_flight.begin(job_id, action)?;
        reconciler::run_mutation(&self.core, &guard, payload).await
    }

    // -- lifecycle ------------------------------------------------------

    /// Stop polling and wait, bounded, for the poll task to exit.
    ///
    /// Already queued notifications keep draining in the background.
    pub async fn shutdown(&self) {
        let Some(handle) = self.stop_polling() else {
            return;
        };

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
            Ok(Ok(())) => tracing::info!("Poll task stopped"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Poll task ended abnormally"),
            Err(_) => tracing::warn!(
                timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
                "Poll task did not stop in time",
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use reelwatch_core::{Job, VideoJobStatus};

    use super::*;

    /// Source that always returns the same snapshot.
    struct StagedSource {
        snapshot: JobsSnapshot,
    }

    #[async_trait::async_trait]
    impl JobSource for StagedSource {
        async fn fetch_jobs(&self, _scope: &JobScope) -> Result<JobsSnapshot, ClientError> {
            Ok(self.snapshot.clone())
        }
    }

    struct NoopMutator;

    #[async_trait::async_trait]
    impl JobMutator for NoopMutator {
        async fn mutate_job(
            &self,
            _job_id: &str,
            _action: JobAction,
            _payload: Option<&serde_json::Value>,
        ) -> Result<(), ClientError> {
            Ok(())
        }
    }

    async fn engine_with(jobs: Vec<Job>) -> TrackerEngine {
        let source = Arc::new(StagedSource {
            snapshot: JobsSnapshot::new(jobs),
        });
        TrackerEngine::builder(source, Arc::new(NoopMutator)).build().await
    }

    fn snapshot(status: VideoJobStatus) -> JobsSnapshot {
        JobsSnapshot::new(vec![Job::new("a", status)])
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_from_previous_generation_is_discarded() {
        let engine = engine_with(vec![]).await;
        engine.activate(JobScope::Channel("c1".into()));
        let (_, old) = engine.core.scheduler.current().unwrap();

        engine.activate(JobScope::Channel("c2".into()));

        let outcome = engine
            .core
            .apply_snapshot(&JobScope::Channel("c1".into()), old, 1_000, snapshot(VideoJobStatus::Ready));
        assert_eq!(outcome, PollOutcome::Stale);
        assert!(!engine.view().contains("a"));
        assert!(engine.core.lock_state().previous.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn older_response_cannot_overwrite_newer_one() {
        let engine = engine_with(vec![]).await;
        engine.activate(JobScope::All);
        let (scope, generation) = engine.core.scheduler.current().unwrap();

        let newer = engine
            .core
            .apply_snapshot(&scope, generation, 1_001, snapshot(VideoJobStatus::Uploading));
        assert_eq!(newer, PollOutcome::Applied { transitions: 0 });

        let older = engine
            .core
            .apply_snapshot(&scope, generation, 1_000, snapshot(VideoJobStatus::Ready));
        assert_eq!(older, PollOutcome::Stale);
        assert_eq!(engine.view().job("a").unwrap().status, VideoJobStatus::Uploading);
    }

    #[tokio::test(start_paused = true)]
    async fn activating_same_scope_keeps_view() {
        let engine = engine_with(vec![Job::new("a", VideoJobStatus::Queued)]).await;
        assert!(engine.activate(JobScope::All));
        assert_eq!(engine.refresh().await, PollOutcome::Applied { transitions: 0 });

        assert!(!engine.activate(JobScope::All));
        assert!(engine.view().contains("a"));
        assert!(!engine.view().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn scope_change_clears_view_and_sets_loading() {
        let engine = engine_with(vec![Job::new("a", VideoJobStatus::Queued)]).await;
        engine.activate(JobScope::All);
        engine.refresh().await;
        assert!(engine.view().contains("a"));

        engine.activate(JobScope::Channel("c2".into()));
        let view = engine.view();
        assert!(view.jobs.is_empty());
        assert!(view.loading);
        assert_eq!(engine.scope(), Some(JobScope::Channel("c2".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_without_scope_is_inactive() {
        let engine = engine_with(vec![]).await;
        assert_eq!(engine.refresh().await, PollOutcome::Inactive);
        assert!(!engine.activate_key("none"));
        assert!(engine.scope().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn restore_skipped_after_scope_change() {
        let engine = engine_with(vec![Job::new("a", VideoJobStatus::Error)]).await;
        engine.activate(JobScope::All);
        engine.refresh().await;

        let change = engine.core.apply_optimistic("a", JobAction::Delete).unwrap();
        engine.activate(JobScope::Channel("c9".into()));
        engine.core.restore(change);

        assert!(!engine.view().contains("a"));
    }
}
