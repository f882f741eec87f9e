//! Notification dispatch queue.
//!
//! [`NotificationQueue`] is a FIFO drained by at most one worker task. The
//! first [`enqueue`](NotificationQueue::enqueue) on an idle queue spawns the
//! worker; later calls only grow the queue. The worker reads the live
//! [`NotificationSettings`](reelwatch_core::NotificationSettings) for every
//! request, delivers to the enabled channels, then waits a fixed pacing
//! delay before taking the next request so sounds and OS notifications
//! never overlap.
//!
//! Enqueued requests are never cancelled: each one is either delivered or
//! dropped by policy (no local channel enabled). A channel that panics
//! costs only the request being delivered; the worker moves on.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use reelwatch_core::{NotificationRequest, SettingsHandle};

use crate::delivery::browser::{BrowserChannel, DEFAULT_DISMISS_AFTER};
use crate::delivery::sound::{SoundChannel, SoundOutcome, DEFAULT_SOUND_COOLDOWN};

/// Gap between two processed requests.
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// DispatchConfig
// ---------------------------------------------------------------------------

/// Timing parameters of the dispatch queue and its channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    pub sound_cooldown: Duration,
    pub dismiss_after: Duration,
    pub pacing_delay: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            sound_cooldown: DEFAULT_SOUND_COOLDOWN,
            dismiss_after: DEFAULT_DISMISS_AFTER,
            pacing_delay: DEFAULT_PACING_DELAY,
        }
    }
}

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Requests delivered to at least one enabled channel.
    pub processed: u64,
    /// Requests dropped because no local channel was enabled.
    pub dropped: u64,
}

// ---------------------------------------------------------------------------
// NotificationQueue
// ---------------------------------------------------------------------------

/// Serialising, single-worker notification queue.
///
/// Cheap to clone; clones share the same queue and worker.
#[derive(Clone)]
pub struct NotificationQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    state: Mutex<QueueState>,
    settings: SettingsHandle,
    sound: SoundChannel,
    browser: BrowserChannel,
    pacing_delay: Duration,
    processed: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<NotificationRequest>,
    /// A worker task is alive and will keep popping until `pending` is empty.
    draining: bool,
}

impl NotificationQueue {
    pub fn new(
        settings: SettingsHandle,
        sound: SoundChannel,
        browser: BrowserChannel,
        pacing_delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::default()),
                settings,
                sound,
                browser,
                pacing_delay,
                processed: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Append `request` and make sure a worker is draining the queue.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn enqueue(&self, request: NotificationRequest) {
        let spawn_worker = {
            let mut state = self.inner.lock_state();
            state.pending.push_back(request);
            !std::mem::replace(&mut state.draining, true)
        };

        if spawn_worker {
            tokio::spawn(drain(Arc::clone(&self.inner)));
        }
    }

    pub fn pending_len(&self) -> usize {
        self.inner.lock_state().pending.len()
    }

    pub fn is_draining(&self) -> bool {
        self.inner.lock_state().draining
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            processed: self.inner.processed.load(Ordering::Relaxed),
            dropped: self.inner.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Worker loop: pop, process, pace, repeat until empty.
async fn drain(inner: Arc<QueueInner>) {
    loop {
        // Clearing `draining` under the same lock as the empty check means an
        // `enqueue` racing with shutdown either lands before (and is drained
        // here) or after (and spawns a fresh worker).
        let request = {
            let mut state = inner.lock_state();
            match state.pending.pop_front() {
                Some(request) => request,
                None => {
                    state.draining = false;
                    return;
                }
            }
        };

        let delivered = match AssertUnwindSafe(inner.process(&request)).catch_unwind().await {
            Ok(delivered) => delivered,
            Err(_) => {
                tracing::error!(job_id = %request.job_id, "Notification channel panicked");
                true
            }
        };
        if delivered {
            tokio::time::sleep(inner.pacing_delay).await;
        }
    }
}

impl QueueInner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Deliver one request; returns `false` when it was dropped by policy.
    async fn process(&self, request: &NotificationRequest) -> bool {
        let settings = self.settings.current();
        if !settings.any_local_channel_enabled() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                job_id = %request.job_id,
                "No notification channel enabled, dropping request"
            );
            return false;
        }

        if settings.sound_enabled {
            match self.sound.play().await {
                SoundOutcome::Played { player_index } => {
                    tracing::debug!(job_id = %request.job_id, player_index, "Played sound");
                }
                outcome => {
                    tracing::debug!(job_id = %request.job_id, ?outcome, "Sound not played");
                }
            }
        }

        if settings.browser_deliverable() {
            match self.browser.deliver(request).await {
                Ok(true) => {
                    tracing::debug!(job_id = %request.job_id, "Showed notification");
                }
                Ok(false) => {
                    tracing::debug!(job_id = %request.job_id, "No notification center available");
                }
                Err(e) => {
                    tracing::warn!(
                        job_id = %request.job_id,
                        error = %e,
                        "Notification delivery failed"
                    );
                }
            }
        }

        self.processed.fetch_add(1, Ordering::Relaxed);
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
