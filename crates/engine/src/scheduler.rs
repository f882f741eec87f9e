//! Polling scheduler with generation-based staleness detection.
//!
//! [`PollScheduler`] runs at most one repeating tick task at a time, keyed
//! by an activation key (the polling scope). Every `start` and `stop` bumps
//! a generation counter; a tick callback receives the generation it was
//! started under, so work that resolves after a scope change can check
//! [`PollScheduler::is_current`] and discard its result.
//!
//! The first tick fires immediately. Ticks never overlap: if a callback runs
//! longer than the interval, the next tick is delayed rather than bunched.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Prevent accidental zero/near-zero intervals from creating a busy loop.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Identifies one activation of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

pub struct PollScheduler<K> {
    generation: AtomicU64,
    active: Mutex<Option<ActivePoll<K>>>,
}

struct ActivePoll<K> {
    key: K,
    generation: Generation,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl<K> PollScheduler<K>
where
    K: Clone + PartialEq + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    /// Start ticking for `key` every `interval`.
    ///
    /// Returns `None` without side effects when `key` is already active.
    /// Otherwise cancels any previous task and returns the new generation.
    /// Must be called from within a Tokio runtime.
    pub fn start<F, Fut>(&self, key: K, interval: Duration, on_tick: F) -> Option<Generation>
    where
        F: Fn(K, Generation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut active = self.lock_active();
        if active.as_ref().is_some_and(|poll| poll.key == key) {
            return None;
        }
        if let Some(previous) = active.take() {
            previous.cancel.cancel();
        }

        let generation = self.bump();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_ticker(
            key.clone(),
            generation,
            interval.max(MIN_POLL_INTERVAL),
            cancel.clone(),
            on_tick,
        ));

        *active = Some(ActivePoll {
            key,
            generation,
            cancel,
            handle,
        });
        Some(generation)
    }

    /// Cancel the running task, if any, and invalidate its generation.
    ///
    /// A tick that is mid-flight runs to completion; its generation is no
    /// longer current. The returned handle resolves once the task exits.
    pub fn stop(&self) -> Option<JoinHandle<()>> {
        let mut active = self.lock_active();
        self.bump();
        active.take().map(|poll| {
            poll.cancel.cancel();
            poll.handle
        })
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation() == generation
    }

    /// The latest generation handed out, whether or not a task is running.
    pub fn generation(&self) -> Generation {
        Generation(self.generation.load(Ordering::SeqCst))
    }

    /// Key and generation of the running task.
    pub fn current(&self) -> Option<(K, Generation)> {
        self.lock_active()
            .as_ref()
            .map(|poll| (poll.key.clone(), poll.generation))
    }

    pub fn is_active(&self) -> bool {
        self.lock_active().is_some()
    }

    fn bump(&self) -> Generation {
        Generation(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<ActivePoll<K>>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<K> Default for PollScheduler<K>
where
    K: Clone + PartialEq + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Drop for PollScheduler<K> {
    fn drop(&mut self) {
        let active = self.active.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(poll) = active.take() {
            poll.cancel.cancel();
        }
    }
}

async fn run_ticker<K, F, Fut>(
    key: K,
    generation: Generation,
    interval: Duration,
    cancel: CancellationToken,
    on_tick: F,
) where
    K: Clone,
    F: Fn(K, Generation) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => on_tick(key.clone(), generation).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
