//! Branch cache
//!
//! Remembers the branches passed to `j build` so later invocations can
//! resolve a fragment like `123` to `feature-123-my-awesome-feature`.
//! The default branch is never cached since it is what an empty `-b`
//! means anyway.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::store::{load_json, remove, save_json_atomic};
use super::{Clock, system_clock};
use crate::domain::name::Namespace;
use crate::error::CacheError;
use crate::resolve::NameStore;

/// Branch used when none is given; never cached
pub const DEFAULT_BRANCH: &str = "dev";

/// Maximum number of cached branches
pub const MAX_BRANCHES: usize = 50;

/// A cached branch name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchCacheEntry {
    pub name: String,
    pub last_used_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BranchFile {
    branches: Vec<StoredBranch>,
}

/// Older cache files hold bare names, most recent first
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredBranch {
    Entry(BranchCacheEntry),
    Legacy(String),
}

/// Bounded, recency-ordered cache of branch names
pub struct BranchCache {
    path: PathBuf,
    /// Ordered by `last_used_at`, most recent first
    entries: Vec<BranchCacheEntry>,
    clock: Clock,
}

impl BranchCache {
    /// Loads the cache from `path`
    ///
    /// A missing file yields an empty cache. A corrupt file is logged and
    /// also treated as empty; it is overwritten on the next `record`.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        Self::load_with_clock(path, system_clock())
    }

    pub fn load_with_clock(path: impl Into<PathBuf>, clock: Clock) -> Self {
        let path = path.into();
        let file = match load_json::<BranchFile>(&path) {
            Ok(file) => file.unwrap_or_default(),
            Err(e) => {
                warn!("Ignoring unreadable branch cache: {}", e);
                BranchFile::default()
            }
        };

        let now = clock();
        let mut entries: Vec<BranchCacheEntry> = Vec::new();
        for (idx, stored) in file.branches.into_iter().enumerate() {
            let entry = match stored {
                StoredBranch::Entry(entry) => entry,
                // Keep the legacy order by spacing the timestamps one second apart.
                StoredBranch::Legacy(name) => BranchCacheEntry {
                    name,
                    last_used_at: now - Duration::seconds(idx as i64),
                },
            };
            if Self::is_reserved(&entry.name) || entries.iter().any(|e| e.name == entry.name) {
                continue;
            }
            entries.push(entry);
        }

        let mut cache = Self {
            path,
            entries,
            clock,
        };
        cache.normalize();
        debug!(
            "Loaded {} cached branches from {}",
            cache.entries.len(),
            cache.path.display()
        );
        cache
    }

    /// Whether `name` is the reserved default branch
    pub fn is_reserved(name: &str) -> bool {
        name.trim().eq_ignore_ascii_case(DEFAULT_BRANCH)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records a use of `name` and persists the cache
    ///
    /// Names are stored without a leading `origin/`. Returns `false` without
    /// touching the cache for the default branch or an empty name.
    pub fn record(&mut self, name: &str) -> Result<bool, CacheError> {
        let name = name.trim();
        let name = name.strip_prefix("origin/").unwrap_or(name);
        if name.is_empty() || Self::is_reserved(name) {
            return Ok(false);
        }

        let now = (self.clock)();
        self.entries.retain(|e| e.name != name);
        self.entries.insert(
            0,
            BranchCacheEntry {
                name: name.to_string(),
                last_used_at: now,
            },
        );
        self.normalize();
        self.save()?;
        Ok(true)
    }

    /// Cached entries, most recent first
    ///
    /// # Arguments
    /// * `filter` - Keep only names containing this text, ignoring case
    pub fn list(&self, filter: Option<&str>) -> Vec<BranchCacheEntry> {
        let filter = filter.map(str::to_lowercase);
        self.entries
            .iter()
            .filter(|e| match &filter {
                Some(f) => e.name.to_lowercase().contains(f),
                None => true,
            })
            .cloned()
            .collect()
    }

    /// Branch names as a recency-ranked store for resolution
    pub fn store(&self) -> NameStore {
        NameStore::with_recency(
            Namespace::Branch,
            self.entries.iter().map(|e| e.name.clone()),
        )
    }

    /// Removes every entry and the cache file
    ///
    /// Returns whether a cache file existed.
    pub fn clear(&mut self) -> Result<bool, CacheError> {
        self.entries.clear();
        remove(&self.path)
    }

    /// Restores ordering and capacity
    ///
    /// The sort is stable, so among equal timestamps the entry nearer the
    /// front (the later insert) stays ahead and the oldest is evicted.
    fn normalize(&mut self) {
        self.entries
            .sort_by(|a, b| b.last_used_at.cmp(&a.last_used_at));
        if self.entries.len() > MAX_BRANCHES {
            for evicted in self.entries.drain(MAX_BRANCHES..) {
                debug!("Evicting branch '{}' from cache", evicted.name);
            }
        }
    }

    fn save(&self) -> Result<(), CacheError> {
        let file = BranchFile {
            branches: self
                .entries
                .iter()
                .cloned()
                .map(StoredBranch::Entry)
                .collect(),
        };
        save_json_atomic(&self.path, &file)
    }
}
