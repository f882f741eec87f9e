//! Push enrollment through the job API.
//!
//! The device token itself comes from the host's messaging SDK; this type
//! only tells the job API to start or stop pushing to it.

use std::sync::Arc;

use crate::api::JobsApi;
use crate::error::ClientError;
use crate::traits::PushRegistrar;

pub struct PushEnrollment {
    api: Arc<JobsApi>,
    device_token: Option<String>,
}

impl PushEnrollment {
    /// `device_token` is `None` when the host has no push transport.
    pub fn new(api: Arc<JobsApi>, device_token: Option<String>) -> Self {
        Self { api, device_token }
    }

    fn token(&self) -> Result<&str, ClientError> {
        self.device_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Unavailable("Push notifications are not available".into()))
    }
}

#[async_trait::async_trait]
impl PushRegistrar for PushEnrollment {
    async fn register(&self) -> Result<(), ClientError> {
        let token = self.token()?;
        self.api.register_push_token(token).await?;
        tracing::info!("Push token registered");
        Ok(())
    }

    async fn unregister(&self) -> Result<(), ClientError> {
        let token = self.token()?;
        self.api.unregister_push_token(token).await?;
        tracing::info!("Push token unregistered");
        Ok(())
    }
}
