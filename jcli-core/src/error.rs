//! Error types for jcli core operations

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::job::JobStatus;
use crate::domain::name::Namespace;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to the command layer
#[derive(Debug, Error)]
pub enum Error {
    /// Nothing matched the operator's input
    #[error("no {namespace} matching '{input}'")]
    NoMatch {
        namespace: Namespace,
        input: String,
        /// Closest known names, best first
        suggestions: Vec<String>,
    },

    /// More than one name matched the operator's input
    #[error("'{input}' matches multiple {namespace}s: {}", .candidates.join(", "))]
    Ambiguous {
        namespace: Namespace,
        input: String,
        candidates: Vec<String>,
    },

    /// The remote CI service call failed
    #[error("remote CI request failed: {0:#}")]
    Remote(anyhow::Error),

    /// A cache file could not be written
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Too many consecutive status queries failed
    #[error(
        "gave up polling {build} after {attempts} failed status checks (last known status: {last_status}); the build may still be running"
    )]
    PollingTimeout {
        build: String,
        attempts: u32,
        last_status: JobStatus,
    },
}

impl Error {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Remote(_) | Error::Cache(_) => 1,
            Error::NoMatch { .. } => 2,
            Error::Ambiguous { .. } => 3,
            Error::PollingTimeout { .. } => 4,
        }
    }
}

/// Errors reading or writing a persisted cache file
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file exists but does not hold a valid snapshot
    #[error("cache file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
