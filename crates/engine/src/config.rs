use std::time::Duration;

use reelwatch_events::delivery::browser::DEFAULT_DISMISS_AFTER;
use reelwatch_events::delivery::sound::DEFAULT_SOUND_COOLDOWN;
use reelwatch_events::queue::{DispatchConfig, DEFAULT_PACING_DELAY};

/// Time between two scheduled snapshot refreshes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Timing configuration for one tracker engine.
///
/// `Default` yields the production values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub poll_interval: Duration,
    /// Minimum gap between two "video ready" sounds.
    pub sound_cooldown: Duration,
    /// How long an ignored OS notification stays visible.
    pub notification_dismiss_after: Duration,
    /// Pause between two processed notification requests.
    pub pacing_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            sound_cooldown: DEFAULT_SOUND_COOLDOWN,
            notification_dismiss_after: DEFAULT_DISMISS_AFTER,
            pacing_delay: DEFAULT_PACING_DELAY,
        }
    }
}

impl EngineConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn dispatch(&self) -> DispatchConfig {
        DispatchConfig {
            sound_cooldown: self.sound_cooldown,
            dismiss_after: self.notification_dismiss_after,
            pacing_delay: self.pacing_delay,
        }
    }
}
