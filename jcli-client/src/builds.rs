//! Build-level API endpoints

use jcli_core::domain::job::{BuildInfo, BuildReference, ConsoleChunk, JobStatus};
use reqwest::header::LOCATION;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ClientError, Result};
use crate::jobs::ActionsResponse;
use crate::{JenkinsClient, encode_query};

#[derive(Debug, Deserialize)]
struct QueueItem {
    #[serde(default)]
    cancelled: bool,
    executable: Option<Executable>,
    why: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Executable {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct BuildNumber {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct BuildState {
    #[serde(default)]
    building: bool,
    result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BuildDetails {
    number: u64,
    #[serde(default)]
    building: bool,
    result: Option<String>,
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    duration: u64,
    url: Option<String>,
    #[serde(flatten)]
    actions: ActionsResponse,
}

impl JenkinsClient {
    // =============================================================================
    // Triggers
    // =============================================================================

    /// Queue a build with parameters
    ///
    /// # Arguments
    /// * `job_name` - The job inside the folder
    /// * `params` - Build parameters, in order
    ///
    /// # Returns
    /// A reference carrying the queue item id, when Jenkins reports one
    pub async fn build_with_parameters(
        &self,
        job_name: &str,
        params: &[(&str, &str)],
    ) -> Result<BuildReference> {
        let url = format!(
            "{}/buildWithParameters?{}",
            self.job_url(job_name),
            encode_query(params)
        );
        let response = self.post(&url).send().await?;
        let response = self.check_status(response).await?;

        let queue_id = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(queue_id_from_location);
        info!("Triggered {} (queue item {:?})", job_name, queue_id);

        Ok(BuildReference::queued(job_name, queue_id))
    }

    // =============================================================================
    // Build numbers
    // =============================================================================

    /// Fetch a queue item; `None` once Jenkins has forgotten it
    async fn queue_item(&self, queue_id: u64) -> Result<Option<QueueItem>> {
        let url = format!("{}/queue/item/{}/api/json", self.base_url, queue_id);
        let response = self.get(&url).send().await?;
        let Some(item) = self.handle_optional_response::<QueueItem>(response).await? else {
            debug!("Queue item {} is gone", queue_id);
            return Ok(None);
        };

        if item.cancelled {
            return Err(ClientError::QueueItemCancelled(queue_id));
        }
        if item.executable.is_none() {
            debug!(
                "Queue item {} waiting: {}",
                queue_id,
                item.why.as_deref().unwrap_or("unknown reason")
            );
        }
        Ok(Some(item))
    }

    /// Build number assigned to a queue item
    ///
    /// # Returns
    /// `None` while the item is still waiting, or once Jenkins has forgotten it
    pub async fn queue_item_build(&self, queue_id: u64) -> Result<Option<u64>> {
        let item = self.queue_item(queue_id).await?;
        Ok(item.and_then(|i| i.executable).map(|e| e.number))
    }

    /// Number of the job's most recent build, `None` if it was never built
    pub async fn last_build_number(&self, job_name: &str) -> Result<Option<u64>> {
        let url = format!("{}/lastBuild/api/json?tree=number", self.job_url(job_name));
        let response = self.get(&url).send().await?;
        let build: Option<BuildNumber> = self.handle_optional_response(response).await?;
        Ok(build.map(|b| b.number))
    }

    /// Find the number of the build behind a reference
    ///
    /// Queue items expire a few minutes after the build starts; an expired
    /// item falls back to the job's last build.
    pub async fn build_number(&self, build: &BuildReference) -> Result<Option<u64>> {
        if let Some(number) = build.build_number {
            return Ok(Some(number));
        }

        if let Some(queue_id) = build.queue_id {
            if let Some(item) = self.queue_item(queue_id).await? {
                return Ok(item.executable.map(|e| e.number));
            }
        }

        self.last_build_number(&build.job_name).await
    }

    // =============================================================================
    // Status and details
    // =============================================================================

    /// Status of a build; a build Jenkins does not know yet is `Queued`
    pub async fn build_status(&self, job_name: &str, build_number: u64) -> Result<JobStatus> {
        let url = format!(
            "{}/{}/api/json?tree=building,result",
            self.job_url(job_name),
            build_number
        );
        let response = self.get(&url).send().await?;
        let state: Option<BuildState> = self.handle_optional_response(response).await?;

        Ok(match state {
            Some(state) => JobStatus::from_jenkins(state.building, state.result.as_deref()),
            None => JobStatus::Queued,
        })
    }

    /// Details of a single build
    pub async fn build_details(&self, job_name: &str, build_number: u64) -> Result<BuildInfo> {
        let url = format!(
            "{}/{}/api/json?tree=number,building,result,timestamp,duration,url,actions[parameters[name,value]]",
            self.job_url(job_name),
            build_number
        );
        let response = self.get(&url).send().await?;
        let details: BuildDetails = self.handle_response(response).await?;

        Ok(BuildInfo {
            number: details.number,
            status: JobStatus::from_jenkins(details.building, details.result.as_deref()),
            timestamp_ms: details.timestamp,
            duration_ms: details.duration,
            url: details.url,
            parameters: details.actions.parameters(),
        })
    }

    // =============================================================================
    // Console
    // =============================================================================

    /// Console text of a build from a byte offset
    ///
    /// Uses the progressive text endpoint: `X-Text-Size` is the offset to ask
    /// for next and `X-More-Data` tells whether the build is still writing.
    pub async fn progressive_text(
        &self,
        job_name: &str,
        build_number: u64,
        start: u64,
    ) -> Result<ConsoleChunk> {
        let url = format!(
            "{}/{}/logText/progressiveText?start={}",
            self.job_url(job_name),
            build_number,
            start
        );
        let response = self.get(&url).send().await?;
        let response = self.check_status(response).await?;

        let headers = response.headers();
        let next_offset = headers
            .get("X-Text-Size")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let more = headers
            .get("X-More-Data")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

        let text = response.text().await?;
        let next_offset = next_offset.unwrap_or(start + text.len() as u64);

        Ok(ConsoleChunk {
            text,
            next_offset,
            more,
        })
    }
}

/// Extract the queue item id from a `Location` like `.../queue/item/42/`
fn queue_id_from_location(location: &str) -> Option<u64> {
    let mut segments = location.trim_end_matches('/').rsplit('/');
    let id = segments.next()?.parse().ok()?;
    match (segments.next(), segments.next()) {
        (Some("item"), Some("queue")) => Some(id),
        _ => None,
    }
}
