//! REST client for the video job API.
//!
//! Wraps the job listing, job mutation and push-token endpoints using
//! [`reqwest`].

use std::time::Duration;

use reelwatch_core::{JobAction, JobScope, JobsSnapshot};
use reqwest::{Method, Url};

use crate::error::ClientError;
use crate::traits::{JobMutator, JobSource};

/// HTTP request timeout for a single call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for one job API server.
pub struct JobsApi {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl JobsApi {
    /// Create a client for `base_url` (e.g. `https://studio.example.com`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(client, base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// List jobs for `scope`.
    ///
    /// Sends `GET /api/video-jobs?channelId=<id>` for a channel scope and
    /// `GET /api/video-jobs?scope=all` otherwise.
    pub async fn list_jobs(&self, scope: &JobScope) -> Result<JobsSnapshot, ClientError> {
        let mut request = self.request(Method::GET, &["api", "video-jobs"]);
        request = match scope {
            JobScope::All => request.query(&[("scope", "all")]),
            JobScope::Channel(id) => request.query(&[("channelId", id.as_str())]),
        };

        let response = request.send().await?;
        Self::parse_response(response).await
    }

    /// Delete a job (`DELETE /api/video-jobs/{id}`).
    pub async fn delete_job(&self, job_id: &str) -> Result<(), ClientError> {
        let response = self
            .request(Method::DELETE, &["api", "video-jobs", job_id])
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// Approve a ready job for upload (`POST /api/video-jobs/{id}/approve`).
    ///
    /// `payload` may carry upload metadata edits (title, description).
    pub async fn approve_job(
        &self,
        job_id: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<(), ClientError> {
        self.post_action(job_id, "approve", payload).await
    }

    /// Reject a ready job (`POST /api/video-jobs/{id}/reject`).
    pub async fn reject_job(
        &self,
        job_id: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<(), ClientError> {
        self.post_action(job_id, "reject", payload).await
    }

    /// Enroll a device token for push delivery (`POST /api/push-tokens`).
    pub async fn register_push_token(&self, token: &str) -> Result<(), ClientError> {
        let response = self
            .request(Method::POST, &["api", "push-tokens"])
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// Remove a device token (`DELETE /api/push-tokens/{token}`).
    pub async fn unregister_push_token(&self, token: &str) -> Result<(), ClientError> {
        let response = self
            .request(Method::DELETE, &["api", "push-tokens", token])
            .send()
            .await?;
        Self::check_status(response).await
    }

    // ---- private helpers ----

    async fn post_action(
        &self,
        job_id: &str,
        action: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<(), ClientError> {
        let body = payload
            .cloned()
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
        let response = self
            .request(Method::POST, &["api", "video-jobs", job_id, action])
            .json(&body)
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// Build a request for the endpoint made of `segments`.
    ///
    /// Segments are percent-encoded, so opaque job ids are safe to embed.
    fn request(&self, method: Method, segments: &[&str]) -> reqwest::RequestBuilder {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }

        let request = self.client.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Ensure the response has a success status code, returning a
    /// [`ClientError::Api`] with the status and body text otherwise.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<(), ClientError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl JobSource for JobsApi {
    async fn fetch_jobs(&self, scope: &JobScope) -> Result<JobsSnapshot, ClientError> {
        self.list_jobs(scope).await
    }
}

#[async_trait::async_trait]
impl JobMutator for JobsApi {
    async fn mutate_job(
        &self,
        job_id: &str,
        action: JobAction,
        payload: Option<&serde_json::Value>,
    ) -> Result<(), ClientError> {
        match action {
            JobAction::Delete => self.delete_job(job_id).await,
            JobAction::Approve => self.approve_job(job_id, payload).await,
            JobAction::Reject => self.reject_job(job_id, payload).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
