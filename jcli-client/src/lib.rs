//! Jenkins HTTP Client
//!
//! A small, typed client for the parts of the Jenkins JSON API that `j`
//! needs: listing the jobs of one folder, triggering parameterized builds,
//! following queue items to build numbers, reading build status and
//! streaming console text.
//!
//! [`JenkinsClient`] implements [`jcli_core::RemoteCi`], which is how the
//! rest of the workspace uses it.
//!
//! # Example
//!
//! ```no_run
//! use jcli_client::JenkinsClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = JenkinsClient::new("https://jenkins.example.com", "test-collateral")
//!         .with_credentials("me", "api-token");
//!
//!     for job in client.list_folder_jobs().await? {
//!         println!("{}", job.name);
//!     }
//!     Ok(())
//! }
//! ```

mod builds;
pub mod error;
mod jobs;
mod remote;

pub use error::{ClientError, Result};

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

/// HTTP client for one Jenkins job folder
#[derive(Debug, Clone)]
pub struct JenkinsClient {
    /// Base URL of the Jenkins server (e.g., "https://jenkins.example.com")
    base_url: String,
    /// Folder holding the jobs (e.g., "test-collateral")
    folder: String,
    /// User name and API token for basic auth
    credentials: Option<(String, String)>,
    /// HTTP client instance
    client: Client,
}

impl JenkinsClient {
    /// Create a new Jenkins client
    ///
    /// # Arguments
    /// * `base_url` - The Jenkins base URL
    /// * `folder` - The folder whose jobs this client works with
    ///
    /// # Example
    /// ```
    /// use jcli_client::JenkinsClient;
    ///
    /// let client = JenkinsClient::new("https://jenkins.example.com", "test-collateral");
    /// ```
    pub fn new(base_url: impl Into<String>, folder: impl Into<String>) -> Self {
        Self::with_client(base_url, folder, Client::new())
    }

    /// Create a new Jenkins client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Arguments
    /// * `base_url` - The Jenkins base URL
    /// * `folder` - The folder whose jobs this client works with
    /// * `client` - A configured reqwest Client
    pub fn with_client(
        base_url: impl Into<String>,
        folder: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        let folder = folder.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            folder: folder.trim_matches('/').to_string(),
            credentials: None,
            client,
        }
    }

    /// Authenticate every request with a user name and API token
    pub fn with_credentials(mut self, user: impl Into<String>, token: impl Into<String>) -> Self {
        self.credentials = Some((user.into(), token.into()));
        self
    }

    /// Get the base URL of the Jenkins server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the job folder
    pub fn folder(&self) -> &str {
        &self.folder
    }

    // =============================================================================
    // URLs
    // =============================================================================

    /// URL of the job folder; nested folders are written `a/b`
    fn folder_url(&self) -> String {
        let mut url = self.base_url.clone();
        for segment in self.folder.split('/').filter(|s| !s.is_empty()) {
            url.push_str("/job/");
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    /// URL of a job inside the folder
    pub fn job_url(&self, job_name: &str) -> String {
        format!("{}/job/{}", self.folder_url(), urlencoding::encode(job_name))
    }

    // =============================================================================
    // Requests
    // =============================================================================

    fn get(&self, url: &str) -> RequestBuilder {
        debug!("GET {}", url);
        self.authorize(self.client.get(url))
    }

    fn post(&self, url: &str) -> RequestBuilder {
        debug!("POST {}", url);
        self.authorize(self.client.post(url))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((user, token)) => request.basic_auth(user, Some(token)),
            None => request,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code of a response
    async fn check_status(&self, response: Response) -> Result<Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let response = self.check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Like [`Self::handle_response`], but a 404 yields `None`
    async fn handle_optional_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<Option<T>> {
        match self.handle_response(response).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Encode query parameters, leaving `/` unescaped (`GIT_REVISION=origin/feature/x`)
pub(crate) fn encode_query(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value).replace("%2F", "/")
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = JenkinsClient::new("https://jenkins.example.com", "test-collateral");
        assert_eq!(client.base_url(), "https://jenkins.example.com");
        assert_eq!(client.folder(), "test-collateral");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = JenkinsClient::new("https://jenkins.example.com/", "/test-collateral/");
        assert_eq!(client.base_url(), "https://jenkins.example.com");
        assert_eq!(client.folder(), "test-collateral");
    }

    #[test]
    fn test_job_url() {
        let client = JenkinsClient::new("https://ci", "test-collateral");
        assert_eq!(
            client.job_url("test-collateral-api-build"),
            "https://ci/job/test-collateral/job/test-collateral-api-build"
        );
    }

    #[test]
    fn test_nested_folder_url() {
        let client = JenkinsClient::with_client("https://ci", "team/qa env", Client::new());
        assert_eq!(client.folder_url(), "https://ci/job/team/job/qa%20env");
    }

    #[test]
    fn test_encode_query_keeps_slashes() {
        let query = encode_query(&[
            ("SERVICENAME", "api"),
            ("GIT_REVISION", "origin/feature/x y"),
        ]);
        assert_eq!(query, "SERVICENAME=api&GIT_REVISION=origin/feature/x%20y");
    }
}
