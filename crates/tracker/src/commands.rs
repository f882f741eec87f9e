//! Line-oriented control commands read from stdin.
//!
//! ```text
//! delete <job-id>
//! approve <job-id> [json-payload]
//! reject <job-id> [reason...]
//! refresh
//! scope <all|none|channel-id>
//! sound|browser|push <on|off>
//! status
//! ```

use reelwatch_engine::{EngineError, TrackerEngine};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Delete(String),
    Approve {
        job_id: String,
        payload: Option<serde_json::Value>,
    },
    Reject {
        job_id: String,
        reason: Option<String>,
    },
    Refresh,
    Scope(String),
    Sound(bool),
    Browser(bool),
    Push(bool),
    Status,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid JSON payload: {0}")]
    InvalidPayload(String),
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let line = line.trim();
        let Some((verb, rest)) = split_word(line) else {
            return Ok(None);
        };

        let command = match verb {
            "delete" | "rm" => Command::Delete(job_id(rest, "delete <job-id>")?),
            "approve" => {
                let (job_id, payload) =
                    split_word(rest).ok_or(CommandError::Usage("approve <job-id> [json]"))?;
                let payload = if payload.is_empty() {
                    None
                } else {
                    Some(
                        serde_json::from_str(payload)
                            .map_err(|e| CommandError::InvalidPayload(e.to_string()))?,
                    )
                };
                Command::Approve {
                    job_id: job_id.to_string(),
                    payload,
                }
            }
            "reject" => {
                let (job_id, reason) =
                    split_word(rest).ok_or(CommandError::Usage("reject <job-id> [reason]"))?;
                Command::Reject {
                    job_id: job_id.to_string(),
                    reason: (!reason.is_empty()).then(|| reason.to_string()),
                }
            }
            "refresh" => Command::Refresh,
            "scope" => Command::Scope(job_id(rest, "scope <all|none|channel-id>")?),
            "sound" => Command::Sound(switch(rest, "sound <on|off>")?),
            "browser" => Command::Browser(switch(rest, "browser <on|off>")?),
            "push" => Command::Push(switch(rest, "push <on|off>")?),
            "status" => Command::Status,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }

    /// Run the command against `engine`, logging the outcome.
    pub async fn execute(self, engine: &TrackerEngine) {
        let result: Result<(), EngineError> = match self {
            Command::Delete(job_id) => engine.remove(&job_id).await,
            Command::Approve { job_id, payload } => engine.approve(&job_id, payload).await,
            Command::Reject { job_id, reason } => engine.reject(&job_id, reason.as_deref()).await,
            Command::Refresh => {
                let outcome = engine.refresh().await;
                tracing::info!(?outcome, "Refreshed");
                Ok(())
            }
            Command::Scope(key) => {
                engine.activate_key(&key);
                tracing::info!(scope = ?engine.scope(), "Scope set");
                Ok(())
            }
            Command::Sound(on) => engine.set_sound_enabled(on).await.map(log_settings),
            Command::Browser(on) => engine.set_browser_enabled(on).await.map(log_settings),
            Command::Push(on) => engine.set_push_enabled(on).await.map(log_settings),
            Command::Status => {
                let view = engine.view();
                tracing::info!(
                    scope = ?engine.scope(),
                    jobs = view.jobs.len(),
                    active = view.active_count,
                    limit = view.active_limit,
                    loading = view.loading,
                    error = ?view.error,
                    "Status",
                );
                for job in &view.jobs {
                    tracing::info!(job_id = %job.id, status = %job.status, title = ?job.title, "Job");
                }
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::error!(error = %e, "{}", e.user_message());
        }
    }
}

fn log_settings(settings: reelwatch_core::NotificationSettings) {
    tracing::info!(
        sound = settings.sound_enabled,
        browser = settings.browser_enabled,
        permission = settings.permission_granted,
        push = settings.push_enabled,
        "Notification settings",
    );
}

/// Split off the first whitespace-delimited word.
fn split_word(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => Some((word, rest.trim())),
        None => Some((input, "")),
    }
}

fn job_id(rest: &str, usage: &'static str) -> Result<String, CommandError> {
    match split_word(rest) {
        Some((id, "")) => Ok(id.to_string()),
        _ => Err(CommandError::Usage(usage)),
    }
}

fn switch(rest: &str, usage: &'static str) -> Result<bool, CommandError> {
    match rest {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(CommandError::Usage(usage)),
    }
}
