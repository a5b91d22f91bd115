//! Scripted [`RemoteCi`] fake shared by the unit tests

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::job::{
    BuildInfo, BuildReference, ConsoleChunk, JobDefinition, JobStatus, ParameterDefinition,
};
use crate::remote::RemoteCi;

#[derive(Default)]
struct Inner {
    jobs: Vec<JobDefinition>,
    fail_listing: bool,
    list_calls: usize,
    /// `None` entries simulate a failed status request
    statuses: VecDeque<Option<JobStatus>>,
    last_status: Option<JobStatus>,
    build_numbers: VecDeque<Option<u64>>,
    pending_console: VecDeque<String>,
    console_log: String,
    cancel_after_status_calls: Option<(usize, CancellationToken)>,
    cancel_on_resolve: Option<CancellationToken>,
    status_calls: usize,
    resolve_calls: usize,
    console_calls: usize,
}

/// In-memory CI server driven by a script
#[derive(Default)]
pub(crate) struct FakeRemote {
    inner: Mutex<Inner>,
}

impl FakeRemote {
    pub fn with_jobs(self, jobs: Vec<JobDefinition>) -> Self {
        self.inner.lock().unwrap().jobs = jobs;
        self
    }

    /// Status responses in order; `None` is a failed request
    pub fn with_statuses(self, statuses: Vec<Option<JobStatus>>) -> Self {
        self.inner.lock().unwrap().statuses = statuses.into();
        self
    }

    /// Answers to build number lookups in order
    pub fn with_build_numbers(self, numbers: Vec<Option<u64>>) -> Self {
        self.inner.lock().unwrap().build_numbers = numbers.into();
        self
    }

    /// Console output, one chunk appended per console request
    pub fn with_console(self, chunks: &[&str]) -> Self {
        self.inner.lock().unwrap().pending_console = chunks.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Cancels `token` while answering the `n`th status request
    pub fn cancel_on_status_call(self, n: usize, token: CancellationToken) -> Self {
        self.inner.lock().unwrap().cancel_after_status_calls = Some((n, token));
        self
    }

    /// Cancels `token` while answering a build number lookup
    pub fn cancel_on_resolve(self, token: CancellationToken) -> Self {
        self.inner.lock().unwrap().cancel_on_resolve = Some(token);
        self
    }

    pub fn fail_listing(&self) {
        self.inner.lock().unwrap().fail_listing = true;
    }

    pub fn list_calls(&self) -> usize {
        self.inner.lock().unwrap().list_calls
    }

    pub fn status_calls(&self) -> usize {
        self.inner.lock().unwrap().status_calls
    }

    pub fn resolve_calls(&self) -> usize {
        self.inner.lock().unwrap().resolve_calls
    }

    pub fn console_calls(&self) -> usize {
        self.inner.lock().unwrap().console_calls
    }

    /// Every request the executor can make during a wait
    pub fn poll_calls(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.status_calls + inner.resolve_calls + inner.console_calls
    }
}

#[async_trait]
impl RemoteCi for FakeRemote {
    async fn list_jobs(&self) -> Result<Vec<JobDefinition>> {
        let mut inner = self.inner.lock().unwrap();
        inner.list_calls += 1;
        if inner.fail_listing {
            return Err(anyhow!("connection refused"));
        }
        Ok(inner.jobs.clone())
    }

    async fn trigger_build(
        &self,
        job_name: &str,
        _service_name: &str,
        _branch: &str,
        _quality_checks: bool,
    ) -> Result<BuildReference> {
        Ok(BuildReference::queued(job_name, Some(1)))
    }

    async fn trigger_scale(
        &self,
        job_name: &str,
        _service_name: &str,
        _ttl_hours: u32,
    ) -> Result<BuildReference> {
        Ok(BuildReference::queued(job_name, Some(1)))
    }

    async fn trigger_deploy(
        &self,
        job_name: &str,
        _service_name: &str,
        _build_number: u64,
    ) -> Result<BuildReference> {
        Ok(BuildReference::queued(job_name, Some(1)))
    }

    async fn resolve_build_number(&self, _build: &BuildReference) -> Result<Option<u64>> {
        let mut inner = self.inner.lock().unwrap();
        inner.resolve_calls += 1;
        if let Some(token) = &inner.cancel_on_resolve {
            token.cancel();
        }
        Ok(inner.build_numbers.pop_front().unwrap_or(Some(1)))
    }

    async fn get_status(&self, _job_name: &str, _build_number: u64) -> Result<JobStatus> {
        let mut inner = self.inner.lock().unwrap();
        inner.status_calls += 1;

        if let Some((n, token)) = &inner.cancel_after_status_calls {
            if inner.status_calls == *n {
                token.cancel();
            }
        }

        let next = match inner.statuses.pop_front() {
            Some(next) => next,
            None => inner.last_status,
        };
        match next {
            Some(status) => {
                inner.last_status = Some(status);
                Ok(status)
            }
            None => Err(anyhow!("status request timed out")),
        }
    }

    async fn get_console_output(
        &self,
        _job_name: &str,
        _build_number: u64,
        from_offset: u64,
    ) -> Result<ConsoleChunk> {
        let mut inner = self.inner.lock().unwrap();
        inner.console_calls += 1;
        if let Some(chunk) = inner.pending_console.pop_front() {
            inner.console_log.push_str(&chunk);
        }

        let start = (from_offset as usize).min(inner.console_log.len());
        Ok(ConsoleChunk {
            text: inner.console_log[start..].to_string(),
            next_offset: inner.console_log.len() as u64,
            more: !inner.pending_console.is_empty(),
        })
    }

    async fn get_last_parameters(&self, _job_name: &str) -> Result<BTreeMap<String, String>> {
        Ok(BTreeMap::new())
    }

    async fn get_build_info(&self, _job_name: &str, build_number: u64) -> Result<BuildInfo> {
        Ok(BuildInfo {
            number: build_number,
            status: JobStatus::Succeeded,
            timestamp_ms: 0,
            duration_ms: 0,
            url: None,
            parameters: BTreeMap::new(),
        })
    }

    async fn get_parameter_definitions(&self, _job_name: &str) -> Result<Vec<ParameterDefinition>> {
        Ok(Vec::new())
    }
}
