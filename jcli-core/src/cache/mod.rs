//! Persisted caches
//!
//! Two caches survive between invocations of `j`:
//! - [`BranchCache`]: branches recently passed to `j build`, most recent first
//! - [`JobCache`]: the job list of the Jenkins folder, refreshed after a TTL
//!
//! Both are plain JSON files loaded when the command starts and rewritten
//! atomically after each mutation. A corrupt file is treated as empty.

mod branch;
mod jobs;
mod store;

pub use branch::{BranchCache, BranchCacheEntry, DEFAULT_BRANCH, MAX_BRANCHES};
pub use jobs::{CacheInfo, DEFAULT_JOB_TTL, JobCache, JobCacheSnapshot, JobListing, JobSource};

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of the current time, injectable for tests
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Clock backed by the system time
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}
