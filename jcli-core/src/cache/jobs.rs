//! Job cache
//!
//! Listing the Jenkins job folder is slow, so the job list is kept on disk
//! and only refetched once it is older than its TTL or a refresh is forced.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::store::{load_json, remove, save_json_atomic};
use super::{Clock, system_clock};
use crate::domain::job::JobDefinition;
use crate::domain::name::Namespace;
use crate::error::{CacheError, Error, Result};
use crate::remote::RemoteCi;
use crate::resolve::NameStore;

/// Default time a fetched job list is trusted
pub const DEFAULT_JOB_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A job list as fetched at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobCacheSnapshot {
    pub jobs: Vec<JobDefinition>,
    pub fetched_at: DateTime<Utc>,
    /// TTL in effect when the snapshot was written
    pub ttl_secs: u64,
}

impl JobCacheSnapshot {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Where a job listing came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSource {
    /// A fresh snapshot from disk
    Cache,
    /// Fetched from the server during this call
    Remote,
    /// The server could not be reached; an expired snapshot was used
    StaleCache,
}

/// Jobs returned by [`JobCache::get`]
#[derive(Debug, Clone)]
pub struct JobListing {
    pub snapshot: JobCacheSnapshot,
    pub source: JobSource,
}

impl JobListing {
    pub fn jobs(&self) -> &[JobDefinition] {
        &self.snapshot.jobs
    }

    pub fn is_stale(&self) -> bool {
        self.source == JobSource::StaleCache
    }

    /// Names of the jobs accepted by `filter`, as a Job-namespace store
    pub fn store(&self, filter: impl Fn(&JobDefinition) -> bool) -> NameStore {
        NameStore::new(
            Namespace::Job,
            self.snapshot
                .jobs
                .iter()
                .filter(|job| filter(job))
                .map(|job| job.name.clone()),
        )
    }
}

/// Summary shown by `j cache --info`
#[derive(Debug, Clone, PartialEq)]
pub struct CacheInfo {
    pub path: PathBuf,
    pub count: usize,
    pub fetched_at: DateTime<Utc>,
    pub age: TimeDelta,
    pub ttl: Duration,
    pub is_stale: bool,
}

impl CacheInfo {
    /// Time until the snapshot expires, if it has not already
    pub fn remaining(&self) -> Option<TimeDelta> {
        let ttl = TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::MAX);
        match ttl.checked_sub(&self.age) {
            Some(remaining) => (remaining > TimeDelta::zero()).then_some(remaining),
            // A snapshot stamped in the future with a huge TTL never expires.
            None if self.age < TimeDelta::zero() => Some(TimeDelta::MAX),
            None => None,
        }
    }
}

/// TTL-bound, persisted cache of the job folder listing
pub struct JobCache {
    path: PathBuf,
    ttl: Duration,
    snapshot: Option<JobCacheSnapshot>,
    clock: Clock,
}

impl JobCache {
    /// Loads the cache from `path`
    ///
    /// A corrupt file is logged and ignored; the next fetch replaces it.
    pub fn load(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self::load_with_clock(path, ttl, system_clock())
    }

    pub fn load_with_clock(path: impl Into<PathBuf>, ttl: Duration, clock: Clock) -> Self {
        let path = path.into();
        let snapshot = match load_json::<JobCacheSnapshot>(&path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Ignoring unreadable job cache: {}", e);
                None
            }
        };

        Self {
            path,
            ttl,
            snapshot,
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn age(&self, snapshot: &JobCacheSnapshot) -> TimeDelta {
        (self.clock)() - snapshot.fetched_at
    }

    fn is_stale(&self, snapshot: &JobCacheSnapshot) -> bool {
        let ttl = TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::MAX);
        self.age(snapshot) > ttl
    }

    /// Returns the job list, fetching it if needed
    ///
    /// A fresh snapshot is returned without contacting the server. Otherwise
    /// the list is fetched and persisted. If that fetch fails and an expired
    /// snapshot exists, the expired snapshot is returned as
    /// [`JobSource::StaleCache`], unless `force_refresh` was requested.
    ///
    /// # Arguments
    /// * `remote` - The CI server to fetch from
    /// * `force_refresh` - Ignore any cached snapshot
    ///
    /// # Errors
    /// Returns [`Error::Remote`] if the fetch fails and no fallback applies
    pub async fn get<R: RemoteCi + ?Sized>(
        &mut self,
        remote: &R,
        force_refresh: bool,
    ) -> Result<JobListing> {
        if !force_refresh {
            if let Some(snapshot) = self.snapshot.as_ref().filter(|s| !self.is_stale(s)) {
                debug!("Using {} cached jobs", snapshot.jobs.len());
                return Ok(JobListing {
                    snapshot: snapshot.clone(),
                    source: JobSource::Cache,
                });
            }
        }

        match remote.list_jobs().await {
            Ok(jobs) => {
                info!("Fetched {} jobs from the server", jobs.len());
                let snapshot = JobCacheSnapshot {
                    jobs,
                    fetched_at: (self.clock)(),
                    ttl_secs: self.ttl.as_secs(),
                };
                if let Err(e) = save_json_atomic(&self.path, &snapshot) {
                    warn!("Failed to write job cache: {}", e);
                }
                self.snapshot = Some(snapshot.clone());
                Ok(JobListing {
                    snapshot,
                    source: JobSource::Remote,
                })
            }
            Err(e) if !force_refresh => match &self.snapshot {
                Some(snapshot) => {
                    warn!("Failed to refresh job list, using expired cache: {:#}", e);
                    Ok(JobListing {
                        snapshot: snapshot.clone(),
                        source: JobSource::StaleCache,
                    })
                }
                None => Err(Error::Remote(e)),
            },
            Err(e) => Err(Error::Remote(e)),
        }
    }

    /// Summary of the stored snapshot, if any
    pub fn info(&self) -> Option<CacheInfo> {
        self.snapshot.as_ref().map(|snapshot| CacheInfo {
            path: self.path.clone(),
            count: snapshot.jobs.len(),
            fetched_at: snapshot.fetched_at,
            age: self.age(snapshot),
            ttl: self.ttl,
            is_stale: self.is_stale(snapshot),
        })
    }

    /// Drops the snapshot and its file
    ///
    /// Returns whether a cache file existed.
    pub fn clear(&mut self) -> std::result::Result<bool, CacheError> {
        self.snapshot = None;
        remove(&self.path)
    }
}
