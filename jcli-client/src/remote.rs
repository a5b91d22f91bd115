//! [`RemoteCi`] implementation for Jenkins

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use jcli_core::RemoteCi;
use jcli_core::domain::job::{
    BuildInfo, BuildReference, ConsoleChunk, JobDefinition, JobStatus, ParameterDefinition,
};

use crate::JenkinsClient;

/// `GIT_REVISION` value for a branch
fn git_revision(branch: &str) -> String {
    if branch.starts_with("origin/") {
        branch.to_string()
    } else {
        format!("origin/{}", branch)
    }
}

fn yes_no(enabled: bool) -> &'static str {
    if enabled { "Yes" } else { "No" }
}

#[async_trait]
impl RemoteCi for JenkinsClient {
    async fn list_jobs(&self) -> Result<Vec<JobDefinition>> {
        self.list_folder_jobs()
            .await
            .with_context(|| format!("Failed to list jobs in folder '{}'", self.folder()))
    }

    async fn trigger_build(
        &self,
        job_name: &str,
        service_name: &str,
        branch: &str,
        quality_checks: bool,
    ) -> Result<BuildReference> {
        let revision = git_revision(branch);
        let params = [
            ("SERVICENAME", service_name),
            ("EnableTests", yes_no(quality_checks)),
            ("EnableCodequality", yes_no(quality_checks)),
            ("GIT_REVISION", revision.as_str()),
        ];
        self.build_with_parameters(job_name, &params)
            .await
            .with_context(|| format!("Failed to trigger build '{}' for {}", job_name, revision))
    }

    async fn trigger_scale(
        &self,
        job_name: &str,
        service_name: &str,
        ttl_hours: u32,
    ) -> Result<BuildReference> {
        let ttl = ttl_hours.to_string();
        let params = [("SERVICES", service_name), ("TIME_TO_LIVE", ttl.as_str())];
        self.build_with_parameters(job_name, &params)
            .await
            .with_context(|| format!("Failed to trigger scale-up of '{}'", service_name))
    }

    async fn trigger_deploy(
        &self,
        job_name: &str,
        service_name: &str,
        build_number: u64,
    ) -> Result<BuildReference> {
        let build_no = build_number.to_string();
        let params = [("SERVICENAME", service_name), ("BUILD_NO", build_no.as_str())];
        self.build_with_parameters(job_name, &params)
            .await
            .with_context(|| {
                format!(
                    "Failed to trigger deploy of '{}' build #{}",
                    service_name, build_number
                )
            })
    }

    async fn resolve_build_number(&self, build: &BuildReference) -> Result<Option<u64>> {
        self.build_number(build)
            .await
            .with_context(|| format!("Failed to find build number for {}", build))
    }

    async fn get_status(&self, job_name: &str, build_number: u64) -> Result<JobStatus> {
        Ok(self.build_status(job_name, build_number).await?)
    }

    async fn get_console_output(
        &self,
        job_name: &str,
        build_number: u64,
        from_offset: u64,
    ) -> Result<ConsoleChunk> {
        self.progressive_text(job_name, build_number, from_offset)
            .await
            .with_context(|| format!("Failed to read console of {} #{}", job_name, build_number))
    }

    async fn get_last_parameters(&self, job_name: &str) -> Result<BTreeMap<String, String>> {
        Ok(self.last_build_parameters(job_name).await?)
    }

    async fn get_build_info(&self, job_name: &str, build_number: u64) -> Result<BuildInfo> {
        self.build_details(job_name, build_number)
            .await
            .with_context(|| format!("Failed to get {} #{}", job_name, build_number))
    }

    async fn get_parameter_definitions(&self, job_name: &str) -> Result<Vec<ParameterDefinition>> {
        self.parameter_definitions(job_name)
            .await
            .with_context(|| format!("Failed to get parameters of '{}'", job_name))
    }
}
