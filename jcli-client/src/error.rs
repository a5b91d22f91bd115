//! Error types for the Jenkins client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to Jenkins
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Jenkins returned an error status code
    #[error("Jenkins error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body, trimmed
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// A queued build was cancelled before it started
    #[error("Queue item {0} was cancelled before the build started")]
    QueueItemCancelled(u64),
}

impl ClientError {
    /// Create an API error from status code and message
    ///
    /// Jenkins answers errors with full HTML pages, so only the first line of
    /// the body is kept.
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = message
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("no response body")
            .to_string();
        Self::ApiError { status, message }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if Jenkins rejected the credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::ApiError { status: 401 | 403, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_keeps_first_line() {
        let err = ClientError::api_error(500, "\n  <html>\n<body>oops</body>");
        match err {
            ClientError::ApiError { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "<html>");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_error_classification() {
        assert!(ClientError::api_error(404, "Not Found").is_not_found());
        assert!(ClientError::api_error(401, "").is_unauthorized());
        assert!(ClientError::api_error(403, "").is_unauthorized());
        assert!(!ClientError::api_error(500, "").is_not_found());
    }
}
