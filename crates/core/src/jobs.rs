//! Job records, polling scopes and snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::VideoJobStatus;

/// Opaque, immutable server-assigned job identifier.
pub type JobId = String;

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One server-tracked video generation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub status: VideoJobStatus,
    /// The Unix epoch when the server omits it.
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Where the finished video can be previewed before approval.
    #[serde(default)]
    pub preview_url: Option<String>,
    /// Where the video was published after upload.
    #[serde(default)]
    pub upload_url: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub channel_name: Option<String>,
    /// Created by an automation schedule rather than a user.
    #[serde(default)]
    pub is_automated: bool,
}

impl Job {
    /// Create a job with only the required fields; timestamps are set to now.
    pub fn new(id: impl Into<JobId>, status: VideoJobStatus) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status,
            created_at: now,
            updated_at: now,
            title: None,
            error_message: None,
            preview_url: None,
            upload_url: None,
            channel_id: None,
            channel_name: None,
            is_automated: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

// ---------------------------------------------------------------------------
// JobScope
// ---------------------------------------------------------------------------

/// Which jobs a snapshot covers.
///
/// "No scope" is modelled as the absence of a `JobScope` (polling is
/// inactive), see [`JobScope::parse_activation_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobScope {
    /// Jobs across every channel.
    All,
    /// Jobs for a single channel.
    Channel(String),
}

impl JobScope {
    /// Parse an externally supplied activation key.
    ///
    /// `"all"` selects every channel, an empty key or `"none"` means
    /// inactive (`None`), anything else is a channel id.
    pub fn parse_activation_key(key: &str) -> Option<JobScope> {
        match key.trim() {
            "" | "none" => None,
            "all" => Some(JobScope::All),
            channel_id => Some(JobScope::Channel(channel_id.to_string())),
        }
    }
}

impl fmt::Display for JobScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobScope::All => f.write_str("all"),
            JobScope::Channel(id) => write!(f, "channel:{id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// JobsSnapshot
// ---------------------------------------------------------------------------

/// One complete, internally consistent listing of jobs for a scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobsSnapshot {
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub active_count: u32,
    #[serde(default)]
    pub active_limit: u32,
}

impl JobsSnapshot {
    pub fn new(jobs: Vec<Job>) -> Self {
        Self {
            jobs,
            ..Default::default()
        }
    }

    pub fn with_counts(mut self, active_count: u32, active_limit: u32) -> Self {
        self.active_count = active_count;
        self.active_limit = active_limit;
        self
    }
}

// ---------------------------------------------------------------------------
// JobAction
// ---------------------------------------------------------------------------

/// A user-initiated mutation on a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobAction {
    Delete,
    Approve,
    Reject,
}

impl JobAction {
    pub fn as_str(self) -> &'static str {
        match self {
            JobAction::Delete => "delete",
            JobAction::Approve => "approve",
            JobAction::Reject => "reject",
        }
    }
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
