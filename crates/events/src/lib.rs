//! Transition fan-out and notification delivery for ReelWatch.
//!
//! - [`TransitionBus`]: in-process publish/subscribe hub for transition
//!   events, backed by `tokio::sync::broadcast`.
//! - [`NotificationQueue`]: the single-worker FIFO that serialises
//!   "video ready" notifications across channels.
//! - [`delivery`]: sound and OS notification channels plus the traits the
//!   host implements for its platform.

pub mod bus;
pub mod delivery;
pub mod queue;

pub use bus::TransitionBus;
pub use delivery::browser::BrowserChannel;
pub use delivery::sound::{SoundChannel, SoundOutcome};
pub use delivery::{DeliveryError, NotificationCenter, PermissionGate, SoundPlayer};
pub use queue::{DispatchConfig, NotificationQueue, QueueStats};
