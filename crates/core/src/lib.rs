//! Domain types for the ReelWatch video job tracker.
//!
//! - [`jobs`]: job records, polling scopes, snapshots and user actions.
//! - [`status`]: the [`VideoJobStatus`] lifecycle.
//! - [`notifications`]: transition events, notification requests and the
//!   dedup tag function.
//! - [`settings`]: notification channel settings and their shared handle.

pub mod error;
pub mod jobs;
pub mod notifications;
pub mod settings;
pub mod status;

pub use error::CoreError;
pub use jobs::{Job, JobAction, JobId, JobScope, JobsSnapshot};
pub use notifications::{dedup_key, NotificationRequest, TransitionEvent};
pub use settings::{NotificationSettings, SettingsHandle, SettingsPatch};
pub use status::VideoJobStatus;
