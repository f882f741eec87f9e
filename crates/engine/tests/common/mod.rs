use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reelwatch_client::{ClientError, JobMutator, JobSource, PushRegistrar};
use reelwatch_core::{Job, JobAction, JobScope, JobsSnapshot, VideoJobStatus};
use reelwatch_engine::{EngineConfig, TrackerEngine, TrackerEngineBuilder};
use reelwatch_events::{DeliveryError, NotificationCenter, PermissionGate, SoundPlayer};
use tokio::sync::Notify;

/// Let spawned tasks run without reaching the next poll tick.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

pub fn snapshot(jobs: &[(&str, VideoJobStatus)]) -> JobsSnapshot {
    JobsSnapshot::new(jobs.iter().map(|(id, status)| Job::new(*id, *status)).collect())
        .with_counts(1, 3)
}

pub fn server_error() -> ClientError {
    ClientError::Api {
        status: 503,
        body: String::new(),
    }
}

pub fn builder(source: &Arc<MockSource>, mutator: &Arc<MockMutator>) -> TrackerEngineBuilder {
    TrackerEngine::builder(source.clone(), mutator.clone()).config(EngineConfig::default())
}

// ---------------------------------------------------------------------------
// Job source
// ---------------------------------------------------------------------------

pub enum Step {
    Jobs(JobsSnapshot),
    Fail,
    /// Resolve with the snapshot only after the notify fires.
    Hold(JobsSnapshot, Arc<Notify>),
}

/// Plays scripted steps in order, then keeps serving `steady`.
pub struct MockSource {
    script: Mutex<VecDeque<Step>>,
    steady: Mutex<JobsSnapshot>,
    failing: AtomicBool,
    scopes: Mutex<Vec<JobScope>>,
}

impl MockSource {
    pub fn new(steady: JobsSnapshot) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            steady: Mutex::new(steady),
            failing: AtomicBool::new(false),
            scopes: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, step: Step) {
        self.script.lock().unwrap().push_back(step);
    }

    pub fn set_steady(&self, snapshot: JobsSnapshot) {
        *self.steady.lock().unwrap() = snapshot;
    }

    /// Make unscripted fetches fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.scopes.lock().unwrap().len()
    }

    pub fn scopes(&self) -> Vec<JobScope> {
        self.scopes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl JobSource for MockSource {
    async fn fetch_jobs(&self, scope: &JobScope) -> Result<JobsSnapshot, ClientError> {
        self.scopes.lock().unwrap().push(scope.clone());

        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Jobs(snapshot)) => Ok(snapshot),
            Some(Step::Fail) => Err(server_error()),
            Some(Step::Hold(snapshot, release)) => {
                release.notified().await;
                Ok(snapshot)
            }
            None if self.failing.load(Ordering::SeqCst) => Err(server_error()),
            None => Ok(self.steady.lock().unwrap().clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Job mutator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MutationCall {
    pub job_id: String,
    pub action: JobAction,
    pub payload: Option<serde_json::Value>,
}

/// Records calls; optionally holds each request until released and fails it.
pub struct MockMutator {
    calls: Mutex<Vec<MutationCall>>,
    fail: AtomicBool,
    gate: Option<Arc<Notify>>,
}

impl MockMutator {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            gate: None,
        })
    }

    pub fn failing() -> Arc<Self> {
        let mutator = Self::ok();
        mutator.fail.store(true, Ordering::SeqCst);
        mutator
    }

    /// Requests wait for `gate` before answering.
    pub fn gated(gate: Arc<Notify>, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail: AtomicBool::new(fail),
            gate: Some(gate),
        })
    }

    pub fn calls(&self) -> Vec<MutationCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl JobMutator for MockMutator {
    async fn mutate_job(
        &self,
        job_id: &str,
        action: JobAction,
        payload: Option<&serde_json::Value>,
    ) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(MutationCall {
            job_id: job_id.to_string(),
            action,
            payload: payload.cloned(),
        });

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Delivery collaborators
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct CountingPlayer {
    plays: AtomicUsize,
}

impl CountingPlayer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SoundPlayer for CountingPlayer {
    async fn play(&self) -> Result<(), DeliveryError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shown {
    pub tag: String,
    pub title: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingCenter {
    shown: Mutex<Vec<Shown>>,
    dismissed: Mutex<Vec<String>>,
}

impl RecordingCenter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn shown(&self) -> Vec<Shown> {
        self.shown.lock().unwrap().clone()
    }

    pub fn dismissed(&self) -> Vec<String> {
        self.dismissed.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl NotificationCenter for RecordingCenter {
    async fn show(&self, tag: &str, title: &str, body: &str) -> Result<(), DeliveryError> {
        self.shown.lock().unwrap().push(Shown {
            tag: tag.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn dismiss(&self, tag: &str) -> Result<(), DeliveryError> {
        self.dismissed.lock().unwrap().push(tag.to_string());
        Ok(())
    }
}

pub struct StaticGate {
    granted: bool,
    requests: AtomicUsize,
}

impl StaticGate {
    pub fn new(granted: bool) -> Arc<Self> {
        Arc::new(Self {
            granted,
            requests: AtomicUsize::new(0),
        })
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PermissionGate for StaticGate {
    async fn request_permission(&self) -> bool {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.granted
    }
}

pub struct MockRegistrar {
    fail_register: bool,
    fail_unregister: bool,
    registers: AtomicUsize,
    unregisters: AtomicUsize,
}

impl MockRegistrar {
    pub fn new(fail_register: bool, fail_unregister: bool) -> Arc<Self> {
        Arc::new(Self {
            fail_register,
            fail_unregister,
            registers: AtomicUsize::new(0),
            unregisters: AtomicUsize::new(0),
        })
    }

    pub fn registers(&self) -> usize {
        self.registers.load(Ordering::SeqCst)
    }

    pub fn unregisters(&self) -> usize {
        self.unregisters.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PushRegistrar for MockRegistrar {
    async fn register(&self) -> Result<(), ClientError> {
        self.registers.fetch_add(1, Ordering::SeqCst);
        if self.fail_register {
            return Err(server_error());
        }
        Ok(())
    }

    async fn unregister(&self) -> Result<(), ClientError> {
        self.unregisters.fetch_add(1, Ordering::SeqCst);
        if self.fail_unregister {
            return Err(server_error());
        }
        Ok(())
    }
}
