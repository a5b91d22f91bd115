//! Configuration module
//!
//! Settings come from command-line flags with environment fallbacks
//! (a `.env` file in the working directory is loaded first).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use jcli_client::JenkinsClient;
use jcli_core::poll::PollConfig;

/// Job cache file name inside the cache directory
pub const JOB_CACHE_FILE: &str = ".jenkins_cli_cache.json";

/// Branch cache file name inside the cache directory
pub const BRANCH_CACHE_FILE: &str = ".jenkins_cli_branch_cache.json";

/// Timeout for a single Jenkins request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Jenkins base URL
    pub jenkins_url: Option<String>,
    pub user: Option<String>,
    pub token: Option<String>,
    /// Folder holding the jobs
    pub folder: String,
    /// Services that can be scaled and deployed
    pub services: Vec<String>,
    /// How long a fetched job list is trusted
    pub cache_ttl: Duration,
    /// Directory holding the cache files
    pub cache_dir: PathBuf,
    pub poll_interval: Duration,
    /// Consecutive failed status checks tolerated while waiting
    pub max_unknown_polls: u32,
}

impl Config {
    /// Check settings every command relies on
    pub fn validate(&self) -> Result<()> {
        if self.folder.trim_matches('/').is_empty() {
            bail!("Jenkins folder must not be empty");
        }
        if self.cache_ttl.is_zero() {
            bail!("Cache TTL must be at least one minute");
        }
        if self.poll_interval.is_zero() {
            bail!("Poll interval must be at least one second");
        }
        if let Some(url) = &self.jenkins_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("JENKINS_URL must start with http:// or https:// (got '{}')", url);
            }
        }
        Ok(())
    }

    /// Build a client for the configured Jenkins server
    ///
    /// # Errors
    /// Returns an error naming the missing settings when the URL, user or
    /// token is not configured
    pub fn jenkins_client(&self) -> Result<JenkinsClient> {
        let (Some(url), Some(user), Some(token)) = (
            non_empty(&self.jenkins_url),
            non_empty(&self.user),
            non_empty(&self.token),
        ) else {
            let missing: Vec<&str> = [
                ("JENKINS_URL", &self.jenkins_url),
                ("JENKINS_USER", &self.user),
                ("JENKINS_TOKEN", &self.token),
            ]
            .into_iter()
            .filter(|(_, value)| non_empty(value).is_none())
            .map(|(name, _)| name)
            .collect();
            bail!(
                "Jenkins connection details not found (missing {}).\n\
                 Create a .env file or export them, for example:\n  \
                 JENKINS_URL=https://jenkins.your-org.com\n  \
                 JENKINS_USER=your-username\n  \
                 JENKINS_TOKEN=your-api-token",
                missing.join(", ")
            );
        };

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(JenkinsClient::with_client(url, &self.folder, http).with_credentials(user, token))
    }

    pub fn job_cache_path(&self) -> PathBuf {
        self.cache_dir.join(JOB_CACHE_FILE)
    }

    pub fn branch_cache_path(&self) -> PathBuf {
        self.cache_dir.join(BRANCH_CACHE_FILE)
    }

    /// Name of the scale-up job, e.g. `test-collateral-Scale-up`
    pub fn scale_job(&self) -> String {
        format!("{}-Scale-up", self.folder_leaf())
    }

    /// Name of the deploy job, e.g. `test-collateral-Deploy-services`
    pub fn deploy_job(&self) -> String {
        format!("{}-Deploy-services", self.folder_leaf())
    }

    /// Prefix shared by the folder's job names, e.g. `test-collateral-`
    pub fn job_prefix(&self) -> String {
        format!("{}-", self.folder_leaf())
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig::default()
            .with_interval(self.poll_interval)
            .with_max_unknown(self.max_unknown_polls)
    }

    fn folder_leaf(&self) -> &str {
        self.folder
            .trim_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.folder)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Split a comma-separated service list, dropping blanks and duplicates
pub fn parse_services(raw: &[String]) -> Vec<String> {
    let mut services: Vec<String> = Vec::new();
    for service in raw.iter().flat_map(|s| s.split(',')).map(str::trim) {
        if !service.is_empty() && !services.iter().any(|s| s == service) {
            services.push(service.to_string());
        }
    }
    services
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            jenkins_url: Some("https://ci.example.com".to_string()),
            user: Some("me".to_string()),
            token: Some("secret".to_string()),
            folder: "test-collateral".to_string(),
            services: vec!["api".to_string()],
            cache_ttl: Duration::from_secs(1440 * 60),
            cache_dir: PathBuf::from("/tmp/j"),
            poll_interval: Duration::from_secs(5),
            max_unknown_polls: 5,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
        assert!(config().jenkins_client().is_ok());
    }

    #[test]
    fn test_rejects_bad_url() {
        let mut config = config();
        config.jenkins_url = Some("ci.example.com".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_credentials_are_named() {
        let mut config = config();
        config.user = None;
        config.token = Some("  ".to_string());

        let err = config.jenkins_client().unwrap_err().to_string();
        assert!(err.contains("JENKINS_USER, JENKINS_TOKEN"));
        assert!(!err.contains("missing JENKINS_URL"));
    }

    #[test]
    fn test_job_names_follow_folder() {
        let mut config = config();
        assert_eq!(config.scale_job(), "test-collateral-Scale-up");
        assert_eq!(config.deploy_job(), "test-collateral-Deploy-services");

        config.folder = "teams/perf".to_string();
        assert_eq!(config.job_prefix(), "perf-");
    }

    #[test]
    fn test_cache_paths() {
        let config = config();
        assert_eq!(
            config.job_cache_path(),
            PathBuf::from("/tmp/j/.jenkins_cli_cache.json")
        );
        assert_eq!(
            config.branch_cache_path(),
            PathBuf::from("/tmp/j/.jenkins_cli_branch_cache.json")
        );
    }

    #[test]
    fn test_parse_services() {
        let raw = vec![" api, worker ,,".to_string(), "api,gateway".to_string()];
        assert_eq!(parse_services(&raw), vec!["api", "worker", "gateway"]);
    }
}
