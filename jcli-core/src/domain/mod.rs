//! Core domain types
//!
//! These types describe what the remote CI service exposes (jobs, builds,
//! parameters, console output) and are shared between the client crate,
//! which produces them, and the CLI, which renders them.

pub mod job;
pub mod name;
