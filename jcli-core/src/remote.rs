//! Remote CI interface
//!
//! The core never talks HTTP itself. Everything it needs from the CI server
//! goes through [`RemoteCi`], which `jcli-client` implements for Jenkins and
//! tests implement with scripted fakes.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::job::{
    BuildInfo, BuildReference, ConsoleChunk, JobDefinition, JobStatus, ParameterDefinition,
};

/// Operations the core needs from the remote CI service
#[async_trait]
pub trait RemoteCi: Send + Sync {
    /// Lists the jobs in the configured job folder
    async fn list_jobs(&self) -> Result<Vec<JobDefinition>>;

    /// Triggers a build job for a branch
    ///
    /// # Arguments
    /// * `job_name` - The build job to run
    /// * `service_name` - Service the job builds
    /// * `branch` - Branch to build, without any `origin/` prefix
    /// * `quality_checks` - Run tests and code quality analysis
    async fn trigger_build(
        &self,
        job_name: &str,
        service_name: &str,
        branch: &str,
        quality_checks: bool,
    ) -> Result<BuildReference>;

    /// Triggers the scale-up job for a service
    async fn trigger_scale(
        &self,
        job_name: &str,
        service_name: &str,
        ttl_hours: u32,
    ) -> Result<BuildReference>;

    /// Triggers the deploy job for a service build
    async fn trigger_deploy(
        &self,
        job_name: &str,
        service_name: &str,
        build_number: u64,
    ) -> Result<BuildReference>;

    /// Finds the build number behind a reference
    ///
    /// Returns `None` while a triggered build is still waiting in the queue.
    async fn resolve_build_number(&self, build: &BuildReference) -> Result<Option<u64>>;

    /// Current status of a numbered build
    async fn get_status(&self, job_name: &str, build_number: u64) -> Result<JobStatus>;

    /// Console output of a build starting at `from_offset`
    async fn get_console_output(
        &self,
        job_name: &str,
        build_number: u64,
        from_offset: u64,
    ) -> Result<ConsoleChunk>;

    /// Parameter values used by the job's most recent build
    async fn get_last_parameters(&self, job_name: &str) -> Result<BTreeMap<String, String>>;

    /// Details of a single build
    async fn get_build_info(&self, job_name: &str, build_number: u64) -> Result<BuildInfo>;

    /// Parameters the job declares
    async fn get_parameter_definitions(&self, job_name: &str) -> Result<Vec<ParameterDefinition>>;
}
