//! Collaborator seams the tracking engine is written against.

use reelwatch_core::{JobAction, JobScope, JobsSnapshot};

use crate::error::ClientError;

/// Read side: one complete listing of jobs for a scope.
#[async_trait::async_trait]
pub trait JobSource: Send + Sync {
    async fn fetch_jobs(&self, scope: &JobScope) -> Result<JobsSnapshot, ClientError>;
}

/// Write side: user-initiated job mutations.
#[async_trait::async_trait]
pub trait JobMutator: Send + Sync {
    async fn mutate_job(
        &self,
        job_id: &str,
        action: JobAction,
        payload: Option<&serde_json::Value>,
    ) -> Result<(), ClientError>;
}

/// Push-channel enrollment with the external messaging service.
#[async_trait::async_trait]
pub trait PushRegistrar: Send + Sync {
    async fn register(&self) -> Result<(), ClientError>;

    async fn unregister(&self) -> Result<(), ClientError>;
}
