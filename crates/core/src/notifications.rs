//! Transition events and the notification requests derived from them.

use serde::{Deserialize, Serialize};

use crate::jobs::JobId;
use crate::status::VideoJobStatus;

/// Prefix of the OS-level dedup tag for "video ready" notifications.
pub const VIDEO_READY_TAG_PREFIX: &str = "video-ready-";

/// Title used for every "video ready" notification.
pub const VIDEO_READY_TITLE: &str = "Video ready";

/// Tag under which the notification center coalesces notifications for
/// the same job.
pub fn dedup_key(job_id: &str) -> String {
    format!("{VIDEO_READY_TAG_PREFIX}{job_id}")
}

/// Whether a status change should raise a "video ready" notification.
///
/// First observations (`from == None`) never notify: the job may have
/// become ready before the tracker attached.
pub fn triggers_video_ready(from: Option<VideoJobStatus>, to: VideoJobStatus) -> bool {
    to == VideoJobStatus::Ready && from.is_some_and(VideoJobStatus::is_generating)
}

// ---------------------------------------------------------------------------
// TransitionEvent
// ---------------------------------------------------------------------------

/// A job's status changed between two successive snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionEvent {
    pub job_id: JobId,
    pub from: VideoJobStatus,
    pub to: VideoJobStatus,
    pub title: Option<String>,
}

impl TransitionEvent {
    pub fn is_video_ready(&self) -> bool {
        triggers_video_ready(Some(self.from), self.to)
    }

    /// The notification this transition should raise, if any.
    pub fn notification(&self) -> Option<NotificationRequest> {
        self.is_video_ready()
            .then(|| NotificationRequest::video_ready(&self.job_id, self.title.as_deref()))
    }
}

// ---------------------------------------------------------------------------
// NotificationRequest
// ---------------------------------------------------------------------------

/// A notification waiting in the dispatch queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub job_id: JobId,
}

impl NotificationRequest {
    pub fn video_ready(job_id: &str, job_title: Option<&str>) -> Self {
        let body = match job_title {
            Some(title) if !title.trim().is_empty() => format!("\"{title}\" is ready for review"),
            _ => "Your video is ready for review".to_string(),
        };
        Self {
            title: VIDEO_READY_TITLE.to_string(),
            body,
            job_id: job_id.to_string(),
        }
    }

    pub fn dedup_key(&self) -> String {
        dedup_key(&self.job_id)
    }
}
