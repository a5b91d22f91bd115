//! Job and build domain types

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of job, derived from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Scale,
    Build,
    Deploy,
    Other,
}

impl JobType {
    /// Classify a job by the keyword in its name
    ///
    /// `scale` wins over `build`, which wins over `deploy`, so
    /// `svc-build-deploy` counts as a build job.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("scale") {
            JobType::Scale
        } else if lower.contains("build") {
            JobType::Build
        } else if lower.contains("deploy") {
            JobType::Deploy
        } else {
            JobType::Other
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobType::Scale => "scale",
            JobType::Build => "build",
            JobType::Deploy => "deploy",
            JobType::Other => "other",
        };
        f.write_str(s)
    }
}

/// Whether an entry in the job folder is a runnable job or a nested folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    #[default]
    Job,
    Folder,
}

/// A job enumerated from the remote job folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub name: String,
    pub job_type: JobType,
    /// Jenkins ball color (`blue`, `red_anime`, ...), if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub kind: JobKind,
}

impl JobDefinition {
    /// Create a plain job, deriving its type from the name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            job_type: JobType::from_name(&name),
            name,
            color: None,
            kind: JobKind::Job,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_kind(mut self, kind: JobKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_folder(&self) -> bool {
        self.kind == JobKind::Folder || self.name.ends_with('/')
    }

    /// Build jobs eligible for `j build`: report jobs are excluded
    pub fn is_buildable(&self) -> bool {
        self.job_type == JobType::Build && !self.name.to_lowercase().ends_with("-report")
    }

    /// Human-readable status derived from the job color
    pub fn color_status(&self) -> String {
        let Some(color) = self.color.as_deref() else {
            return "Unknown".to_string();
        };

        let (base, running) = match color.strip_suffix("_anime") {
            Some(base) => (base, true),
            None => (color, false),
        };

        let status = match base {
            "blue" | "green" => "Success",
            "red" => "Failed",
            "yellow" => "Unstable",
            "grey" | "notbuilt" | "nobuilt" => "Not Built",
            "disabled" => "Disabled",
            "aborted" => "Aborted",
            _ => "Unknown",
        };

        if running {
            format!("{} (Running)", status)
        } else {
            status.to_string()
        }
    }
}

/// Build execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Aborted,
    /// The last status query failed; transient
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Aborted
        )
    }

    /// Map a Jenkins build `building`/`result` pair onto a status
    pub fn from_jenkins(building: bool, result: Option<&str>) -> Self {
        if building {
            return JobStatus::Running;
        }
        match result {
            Some("SUCCESS") => JobStatus::Succeeded,
            Some("FAILURE") | Some("UNSTABLE") => JobStatus::Failed,
            Some("ABORTED") | Some("NOT_BUILT") => JobStatus::Aborted,
            // Finished builds always carry a result; a missing one means the
            // executor has not picked the build up yet.
            None => JobStatus::Queued,
            Some(_) => JobStatus::Unknown,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Running => "RUNNING",
            JobStatus::Succeeded => "SUCCESS",
            JobStatus::Failed => "FAILURE",
            JobStatus::Aborted => "ABORTED",
            JobStatus::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Handle to a (possibly not yet started) build of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReference {
    pub job_name: String,
    /// `None` until the build has been assigned a number
    pub build_number: Option<u64>,
    /// Queue item created by a trigger, used to find the build number
    pub queue_id: Option<u64>,
}

impl BuildReference {
    /// Reference to a known build
    pub fn numbered(job_name: impl Into<String>, build_number: u64) -> Self {
        Self {
            job_name: job_name.into(),
            build_number: Some(build_number),
            queue_id: None,
        }
    }

    /// Reference to the build produced by a queue item
    pub fn queued(job_name: impl Into<String>, queue_id: Option<u64>) -> Self {
        Self {
            job_name: job_name.into(),
            build_number: None,
            queue_id,
        }
    }

    /// Reference to the most recent build of a job
    pub fn latest(job_name: impl Into<String>) -> Self {
        Self::queued(job_name, None)
    }
}

impl fmt::Display for BuildReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.build_number {
            Some(n) => write!(f, "{} #{}", self.job_name, n),
            None => write!(f, "{} #pending", self.job_name),
        }
    }
}

/// Details of a single build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub number: u64,
    pub status: JobStatus,
    /// Start time, milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    pub duration_ms: u64,
    pub url: Option<String>,
    pub parameters: BTreeMap<String, String>,
}

/// A parameter declared by a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    pub param_type: Option<String>,
    pub default_value: Option<String>,
    pub description: Option<String>,
    pub choices: Vec<String>,
}

/// A slice of console output starting at a byte offset
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConsoleChunk {
    pub text: String,
    /// Offset to request next
    pub next_offset: u64,
    /// The server still has more output to produce
    pub more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_from_name() {
        assert_eq!(JobType::from_name("test-collateral-Scale-up"), JobType::Scale);
        assert_eq!(JobType::from_name("test-collateral-api-build"), JobType::Build);
        assert_eq!(
            JobType::from_name("test-collateral-Deploy-services"),
            JobType::Deploy
        );
        assert_eq!(JobType::from_name("nightly-report"), JobType::Other);
    }

    #[test]
    fn test_report_jobs_are_not_buildable() {
        assert!(JobDefinition::new("svc-build").is_buildable());
        assert!(!JobDefinition::new("svc-build-report").is_buildable());
        assert!(!JobDefinition::new("svc-deploy").is_buildable());
    }

    #[test]
    fn test_color_status() {
        let job = JobDefinition::new("a").with_color("blue_anime");
        assert_eq!(job.color_status(), "Success (Running)");
        assert_eq!(JobDefinition::new("a").with_color("red").color_status(), "Failed");
        assert_eq!(JobDefinition::new("a").color_status(), "Unknown");
    }

    #[test]
    fn test_status_from_jenkins() {
        assert_eq!(JobStatus::from_jenkins(true, None), JobStatus::Running);
        assert_eq!(
            JobStatus::from_jenkins(false, Some("SUCCESS")),
            JobStatus::Succeeded
        );
        assert_eq!(
            JobStatus::from_jenkins(false, Some("UNSTABLE")),
            JobStatus::Failed
        );
        assert_eq!(
            JobStatus::from_jenkins(false, Some("ABORTED")),
            JobStatus::Aborted
        );
        assert!(JobStatus::Aborted.is_terminal());
        assert!(!JobStatus::Unknown.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
    }
}
