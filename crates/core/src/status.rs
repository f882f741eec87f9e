//! Video job lifecycle status.
//!
//! The happy path runs `queued -> sending -> waiting_video -> downloading ->
//! ready -> uploading -> uploaded`. `rejected`, `error` and `timeout` are
//! terminal failure states reachable from any non-terminal state.
//! Statuses this client does not know yet deserialize as `unknown`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Server-reported status of a video generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoJobStatus {
    Queued,
    Sending,
    WaitingVideo,
    Downloading,
    Ready,
    Uploading,
    Uploaded,
    Rejected,
    Error,
    Timeout,
    /// A status newer than this client. Never generating, never ready.
    #[serde(other)]
    Unknown,
}

impl VideoJobStatus {
    /// Every known status, in lifecycle order followed by the failure states.
    pub const ALL: [VideoJobStatus; 10] = [
        VideoJobStatus::Queued,
        VideoJobStatus::Sending,
        VideoJobStatus::WaitingVideo,
        VideoJobStatus::Downloading,
        VideoJobStatus::Ready,
        VideoJobStatus::Uploading,
        VideoJobStatus::Uploaded,
        VideoJobStatus::Rejected,
        VideoJobStatus::Error,
        VideoJobStatus::Timeout,
    ];

    /// Wire name, as used in JSON payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            VideoJobStatus::Queued => "queued",
            VideoJobStatus::Sending => "sending",
            VideoJobStatus::WaitingVideo => "waiting_video",
            VideoJobStatus::Downloading => "downloading",
            VideoJobStatus::Ready => "ready",
            VideoJobStatus::Uploading => "uploading",
            VideoJobStatus::Uploaded => "uploaded",
            VideoJobStatus::Rejected => "rejected",
            VideoJobStatus::Error => "error",
            VideoJobStatus::Timeout => "timeout",
            VideoJobStatus::Unknown => "unknown",
        }
    }

    /// The video is still being produced.
    ///
    /// Only arrivals at [`Ready`](Self::Ready) from one of these states
    /// raise a "video ready" notification.
    pub fn is_generating(self) -> bool {
        matches!(
            self,
            VideoJobStatus::Queued
                | VideoJobStatus::Sending
                | VideoJobStatus::WaitingVideo
                | VideoJobStatus::Downloading
        )
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            VideoJobStatus::Rejected | VideoJobStatus::Error | VideoJobStatus::Timeout
        )
    }
}

impl fmt::Display for VideoJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoJobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VideoJobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("unknown video job status '{s}'")))
    }
}
