//! Name namespaces

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of thing a name refers to
///
/// A single resolution never mixes namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    Service,
    Job,
    Branch,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Namespace::Service => "service",
            Namespace::Job => "job",
            Namespace::Branch => "branch",
        };
        f.write_str(s)
    }
}
