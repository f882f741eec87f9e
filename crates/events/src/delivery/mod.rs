//! Delivery channels used by the notification dispatch queue.
//!
//! The OS-facing pieces (audio output, notification center, permission
//! prompt) are external collaborators behind the traits in this module.
//! Channel failures are reported as [`DeliveryError`] and never abort the
//! queue worker.

pub mod browser;
pub mod sound;

/// Errors raised by a single delivery channel.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Audio playback failed.
    #[error("Sound playback failed: {0}")]
    Sound(String),

    /// The notification center refused or failed to show/close a notification.
    #[error("Notification delivery failed: {0}")]
    Notification(String),
}

/// Plays the "video ready" sound.
#[async_trait::async_trait]
pub trait SoundPlayer: Send + Sync {
    async fn play(&self) -> Result<(), DeliveryError>;

    /// Human-readable name for logs (e.g. `"command"`, `"bell"`).
    fn name(&self) -> &str;
}

/// OS-level notification center.
///
/// Showing a notification with a tag that is already visible replaces it
/// instead of stacking a second one. Dismissing a notification the user
/// already interacted with is a no-op.
#[async_trait::async_trait]
pub trait NotificationCenter: Send + Sync {
    async fn show(&self, tag: &str, title: &str, body: &str) -> Result<(), DeliveryError>;

    async fn dismiss(&self, tag: &str) -> Result<(), DeliveryError>;
}

/// Gate for the OS notification permission prompt.
#[async_trait::async_trait]
pub trait PermissionGate: Send + Sync {
    /// Ask for permission; `true` when granted.
    async fn request_permission(&self) -> bool;
}
