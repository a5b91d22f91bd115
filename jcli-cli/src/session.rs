//! Per-invocation state shared by the remote commands

use anyhow::Result;
use colored::*;
use jcli_client::JenkinsClient;
use jcli_core::RemoteCi;
use jcli_core::cache::{BranchCache, JobCache, JobListing};
use tracing::{debug, warn};

use crate::config::Config;

/// Jenkins client plus the caches, opened once per command
pub struct Session {
    config: Config,
    client: JenkinsClient,
    job_cache: JobCache,
    branch_cache: BranchCache,
}

impl Session {
    /// Open a session
    ///
    /// # Errors
    /// Returns an error if the Jenkins connection details are incomplete
    pub fn open(config: &Config) -> Result<Self> {
        let client = config.jenkins_client()?;
        let job_cache = JobCache::load(config.job_cache_path(), config.cache_ttl);
        let branch_cache = BranchCache::load(config.branch_cache_path());
        debug!(
            "Session for {} (folder {})",
            client.base_url(),
            client.folder()
        );

        Ok(Self {
            config: config.clone(),
            client,
            job_cache,
            branch_cache,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &JenkinsClient {
        &self.client
    }

    pub fn branch_cache(&self) -> &BranchCache {
        &self.branch_cache
    }

    pub fn branch_cache_mut(&mut self) -> &mut BranchCache {
        &mut self.branch_cache
    }

    /// Jobs of the folder, from the cache when it is fresh
    pub async fn jobs(&mut self, refresh: bool) -> Result<JobListing> {
        let listing = self.job_cache.get(&self.client, refresh).await?;
        if listing.is_stale() {
            eprintln!(
                "{}",
                "Warning: Jenkins is unreachable, using an expired job list.".yellow()
            );
        }
        Ok(listing)
    }

    /// Services that can be scaled or deployed
    ///
    /// Uses the configured list, or the `SERVICES` choices of the scale job
    /// when none is configured.
    pub async fn service_names(&self) -> Result<Vec<String>> {
        if !self.config.services.is_empty() {
            return Ok(self.config.services.clone());
        }

        let scale_job = self.config.scale_job();
        debug!("No services configured, reading choices of {}", scale_job);
        match self.client.get_parameter_definitions(&scale_job).await {
            Ok(definitions) => Ok(definitions
                .into_iter()
                .find(|d| d.name == "SERVICES")
                .map(|d| d.choices)
                .unwrap_or_default()),
            Err(e) => {
                warn!("Could not read services from {}: {:#}", scale_job, e);
                Ok(Vec::new())
            }
        }
    }
}
