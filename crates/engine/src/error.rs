use reelwatch_client::ClientError;
use reelwatch_core::{CoreError, JobAction, JobId};

use crate::settings::SettingsStoreError;

/// Errors surfaced by the tracker engine to its host.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A precondition on the local snapshot was not met. Nothing was sent.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Another mutation on the same job has not finished yet.
    #[error("A {action} is already in progress for job {job_id}")]
    MutationInFlight { job_id: JobId, action: JobAction },

    #[error("Job not found: {job_id}")]
    NotFound { job_id: JobId },

    /// The mutation request failed. The store was resynced (or restored)
    /// before this error was returned.
    #[error("Failed to {action} job {job_id}: {message}")]
    Network {
        job_id: JobId,
        action: JobAction,
        message: String,
        #[source]
        source: ClientError,
    },

    #[error(transparent)]
    Settings(#[from] SettingsStoreError),
}

impl EngineError {
    /// A message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Validation(msg) => msg.clone(),
            EngineError::MutationInFlight { .. } => {
                "This job is already being updated".to_string()
            }
            EngineError::NotFound { .. } => "The job no longer exists".to_string(),
            EngineError::Network { message, .. } => message.clone(),
            EngineError::Settings(_) => "Could not save notification settings".to_string(),
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { id, .. } => EngineError::NotFound { job_id: id },
            CoreError::Validation(msg) => EngineError::Validation(msg),
        }
    }
}
