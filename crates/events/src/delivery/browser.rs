//! OS notification channel with tag-based dedup and auto-dismissal.
//!
//! Every notification is shown under the job's dedup tag, so the
//! notification center coalesces repeats for the same job. A dismissal is
//! scheduled for each show; if the same tag is shown again before the
//! timer fires, only the newest timer dismisses it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reelwatch_core::NotificationRequest;

use super::{DeliveryError, NotificationCenter};

/// How long a notification stays up when the user ignores it.
pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_millis(5000);

pub struct BrowserChannel {
    center: Option<Arc<dyn NotificationCenter>>,
    dismiss_after: Duration,
    /// Tag -> number of times it has been shown; lets stale timers bow out.
    shows: Arc<Mutex<HashMap<String, u64>>>,
}

impl BrowserChannel {
    pub fn new(center: Option<Arc<dyn NotificationCenter>>, dismiss_after: Duration) -> Self {
        Self {
            center,
            dismiss_after,
            shows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn is_available(&self) -> bool {
        self.center.is_some()
    }

    /// Show `request` and schedule its dismissal.
    ///
    /// Returns `Ok(false)` when no notification center is configured.
    pub async fn deliver(&self, request: &NotificationRequest) -> Result<bool, DeliveryError> {
        let Some(center) = &self.center else {
            return Ok(false);
        };

        let tag = request.dedup_key();
        center.show(&tag, &request.title, &request.body).await?;

        let show_count = {
            let mut shows = self.shows.lock().unwrap_or_else(|e| e.into_inner());
            let count = shows.entry(tag.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let center = Arc::clone(center);
        let shows = Arc::clone(&self.shows);
        let delay = self.dismiss_after;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let latest = {
                let mut shows = shows.lock().unwrap_or_else(|e| e.into_inner());
                let latest = shows.get(&tag).copied() == Some(show_count);
                if latest {
                    shows.remove(&tag);
                }
                latest
            };
            if !latest {
                return;
            }

            if let Err(e) = center.dismiss(&tag).await {
                tracing::warn!(tag = %tag, error = %e, "Failed to dismiss notification");
            }
        });

        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
