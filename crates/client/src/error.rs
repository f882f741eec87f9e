use serde::Deserialize;

/// Errors from the job API layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The configured base URL cannot be used to build endpoint URLs.
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    /// The operation needs something the host did not configure.
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

/// Error body shape returned by the job API (`{"error": "...", "code": "..."}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "message")]
    error: String,
}

impl ClientError {
    /// A message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Request(e) if e.is_timeout() => {
                "The server took too long to respond".to_string()
            }
            ClientError::Request(_) => "Could not reach the server".to_string(),
            ClientError::Api { status, body } => {
                if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
                    if !parsed.error.trim().is_empty() {
                        return parsed.error;
                    }
                }
                match status {
                    404 => "The job no longer exists".to_string(),
                    409 => "The job changed on the server, try again".to_string(),
                    _ => format!("Request failed with status {status}"),
                }
            }
            ClientError::InvalidUrl(_) => "The server address is misconfigured".to_string(),
            ClientError::Unavailable(msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_prefers_server_error_text() {
        let err = ClientError::Api {
            status: 422,
            body: r#"{"error":"Job is not ready","code":"VALIDATION_ERROR"}"#.into(),
        };
        assert_eq!(err.user_message(), "Job is not ready");
    }

    #[test]
    fn user_message_accepts_message_field() {
        let err = ClientError::Api {
            status: 500,
            body: r#"{"message":"Upload quota exceeded"}"#.into(),
        };
        assert_eq!(err.user_message(), "Upload quota exceeded");
    }

    #[test]
    fn user_message_falls_back_to_status() {
        let err = ClientError::Api {
            status: 502,
            body: "<html>bad gateway</html>".into(),
        };
        assert_eq!(err.user_message(), "Request failed with status 502");

        let gone = ClientError::Api {
            status: 404,
            body: String::new(),
        };
        assert_eq!(gone.user_message(), "The job no longer exists");
    }

    #[test]
    fn display_includes_status_and_body() {
        let err = ClientError::Api {
            status: 503,
            body: "maintenance".into(),
        };
        assert_eq!(err.to_string(), "API error (503): maintenance");
    }
}
