//! jcli Core
//!
//! Name resolution, caching and build polling for the `j` Jenkins CLI.
//!
//! This crate contains:
//! - Domain types: jobs, builds, statuses and name namespaces
//! - Resolver: turns partial operator input into canonical names
//! - Caches: the persisted branch and job caches
//! - Poll: the wait-for-completion state machine
//!
//! Note: the HTTP transport lives in `jcli-client`, rendering in `jcli-cli`.

pub mod cache;
pub mod domain;
pub mod error;
pub mod poll;
pub mod remote;
pub mod resolve;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use remote::RemoteCi;
