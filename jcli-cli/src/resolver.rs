//! Name resolver module
//!
//! Turns the operator's partial input into canonical job, service and branch
//! names. Matching itself lives in `jcli_core::resolve`; this module picks
//! the name source for each namespace and tells the operator what matched.

use anyhow::Result;
use colored::*;
use jcli_core::cache::{BranchCache, DEFAULT_BRANCH, JobSource};
use jcli_core::domain::job::JobDefinition;
use jcli_core::domain::name::Namespace;
use jcli_core::resolve::{NameStore, Resolution, ResolvePolicy, resolve, resolve_with};
use tokio::process::Command;
use tokio::time::{Duration, timeout};
use tracing::debug;

use crate::session::Session;

/// Time allowed for `git branch -a`
const GIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Resolve a job name against the folder's jobs
///
/// A name missing from a cached job list triggers one refresh before giving
/// up, since the job may have been created after the list was cached.
///
/// # Arguments
/// * `session` - The session providing the job list
/// * `input` - Partial job name as typed
/// * `filter` - Jobs eligible for this command
/// * `accept_best` - Take the best ranked candidate instead of failing on ambiguity
///
/// # Errors
/// Returns a [`jcli_core::Error::NoMatch`] or [`jcli_core::Error::Ambiguous`]
/// when the input does not identify one job
pub async fn resolve_job(
    session: &mut Session,
    input: &str,
    filter: impl Fn(&JobDefinition) -> bool,
    accept_best: bool,
) -> Result<String> {
    let policy = ResolvePolicy::for_namespace(Namespace::Job)
        .with_ignored_prefix(session.config().job_prefix());

    let listing = session.jobs(false).await?;
    let mut resolution = resolve_with(input, &listing.store(&filter), &policy);

    if matches!(resolution, Resolution::NoMatch(_)) && listing.source == JobSource::Cache {
        debug!("'{}' not in cached job list, refreshing", input);
        let listing = session.jobs(true).await?;
        resolution = resolve_with(input, &listing.store(&filter), &policy);
    }

    finish(resolution, Namespace::Job, input, accept_best)
}

/// Resolve a service name
///
/// # Errors
/// Fails when no services are known or the input does not identify one
pub fn resolve_service(services: &[String], input: &str, accept_best: bool) -> Result<String> {
    if services.is_empty() {
        anyhow::bail!(
            "No services configured. Set AVAILABLE_SERVICES (comma-separated) in your environment or .env file."
        );
    }
    let store = NameStore::new(Namespace::Service, services.iter().cloned());
    finish(resolve(input, &store), Namespace::Service, input, accept_best)
}

fn finish(
    resolution: Resolution,
    namespace: Namespace,
    input: &str,
    accept_best: bool,
) -> Result<String> {
    let picked_best = matches!(resolution, Resolution::Ambiguous(_));
    let name = resolution.into_name(namespace, input, accept_best)?;

    if picked_best {
        println!(
            "{}",
            format!("Multiple {}s match '{}'. Using: {}", namespace, input, name).yellow()
        );
    } else if name != input {
        println!("{}", format!("Matched '{}' to '{}'", input, name).dimmed());
    }
    Ok(name)
}

/// Where a resolved branch name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchSource {
    Default,
    Cache,
    Git,
    /// Nothing matched; the input is used as typed
    Verbatim,
}

/// A resolved branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchChoice {
    pub name: String,
    pub source: BranchSource,
}

/// Resolve a branch name
///
/// Tries the branch cache (most recently used match wins), then the local
/// `git branch -a` output, and finally uses the input verbatim.
pub async fn resolve_branch(cache: &BranchCache, input: &str) -> BranchChoice {
    let input = input.trim();
    if input.is_empty() || BranchCache::is_reserved(input) {
        return BranchChoice {
            name: DEFAULT_BRANCH.to_string(),
            source: BranchSource::Default,
        };
    }

    if let Some(name) = best_branch(input, &cache.store()) {
        return BranchChoice {
            name,
            source: BranchSource::Cache,
        };
    }

    let local = NameStore::new(Namespace::Branch, git_branches().await);
    if let Some(name) = best_branch(input, &local) {
        return BranchChoice {
            name,
            source: BranchSource::Git,
        };
    }

    BranchChoice {
        name: input.to_string(),
        source: BranchSource::Verbatim,
    }
}

/// Best branch match in a store; branches never fail on ambiguity
fn best_branch(input: &str, store: &NameStore) -> Option<String> {
    match resolve(input, store) {
        Resolution::Exact(name) | Resolution::Unique(name) => Some(name),
        Resolution::Ambiguous(candidates) => candidates.into_iter().next(),
        Resolution::NoMatch(_) => None,
    }
}

/// Branch names known to the local git checkout
///
/// Returns an empty list outside a repository or if git is unavailable.
async fn git_branches() -> Vec<String> {
    let output = timeout(GIT_TIMEOUT, Command::new("git").args(["branch", "-a"]).output()).await;
    match output {
        Ok(Ok(output)) if output.status.success() => {
            parse_git_branches(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(Ok(output)) => {
            debug!("git branch failed with {}", output.status);
            Vec::new()
        }
        Ok(Err(e)) => {
            debug!("Could not run git: {}", e);
            Vec::new()
        }
        Err(_) => {
            debug!("git branch timed out");
            Vec::new()
        }
    }
}

/// Parse `git branch -a` output into unique branch names
fn parse_git_branches(output: &str) -> Vec<String> {
    let mut branches: Vec<String> = Vec::new();
    for line in output.lines() {
        let mut branch = line.trim();
        branch = branch.strip_prefix('*').unwrap_or(branch).trim();
        branch = branch.strip_prefix("remotes/origin/").unwrap_or(branch);
        if branch.is_empty() || branch.contains(" -> ") || branch.ends_with("/HEAD") {
            continue;
        }
        if branch.starts_with("(HEAD detached") {
            continue;
        }
        if !branches.iter().any(|b| b == branch) {
            branches.push(branch.to_string());
        }
    }
    branches
}

/// Value for the `SERVICENAME` parameter of a build job
///
/// The longest configured service contained in the job name wins;
/// otherwise the job prefix and `-build` are stripped from the job name.
pub fn service_for_job(job_name: &str, services: &[String], job_prefix: &str) -> String {
    if let Some(service) = services
        .iter()
        .filter(|s| job_name.contains(s.as_str()))
        .max_by_key(|s| s.len())
    {
        return service.clone();
    }

    match job_name.strip_prefix(job_prefix) {
        Some(rest) => rest.replace("-build", ""),
        None => job_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn services(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_service_for_job_prefers_longest_service() {
        let services = services(&["collateral", "collateral-api", "eurex"]);
        assert_eq!(
            service_for_job("test-collateral-collateral-api-build", &services, "test-collateral-"),
            "collateral-api"
        );
        assert_eq!(
            service_for_job("test-collateral-eurex-build", &services, "test-collateral-"),
            "eurex"
        );
    }

    #[test]
    fn test_service_for_job_falls_back_to_job_name() {
        assert_eq!(
            service_for_job("test-collateral-pricing-build", &[], "test-collateral-"),
            "pricing"
        );
        assert_eq!(service_for_job("other-build", &[], "test-collateral-"), "other-build");
    }

    #[test]
    fn test_resolve_service() {
        let services = services(&["euronext-collateral-service", "eurex-service", "api"]);
        assert_eq!(resolve_service(&services, "api", false).unwrap(), "api");
        assert_eq!(
            resolve_service(&services, "euronext", false).unwrap(),
            "euronext-collateral-service"
        );

        let err = resolve_service(&services, "eur", false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<jcli_core::Error>(),
            Some(jcli_core::Error::Ambiguous { .. })
        ));
        assert_eq!(
            resolve_service(&services, "eur", true).unwrap(),
            "eurex-service"
        );
    }

    #[test]
    fn test_resolve_service_without_services() {
        let err = resolve_service(&[], "api", false).unwrap_err();
        assert!(err.to_string().contains("AVAILABLE_SERVICES"));
    }

    #[test]
    fn test_parse_git_branches() {
        let output = "\
* feature/login
  dev
  remotes/origin/HEAD -> origin/dev
  remotes/origin/dev
  remotes/origin/feature-123-my-awesome-feature
  (HEAD detached at 1a2b3c)
";
        assert_eq!(
            parse_git_branches(output),
            vec!["feature/login", "dev", "feature-123-my-awesome-feature"]
        );
    }

    #[tokio::test]
    async fn test_default_branch_short_circuits() {
        let dir = tempdir().unwrap();
        let cache = BranchCache::load(dir.path().join("branches.json"));

        for input in ["", "dev", "DEV"] {
            let choice = resolve_branch(&cache, input).await;
            assert_eq!(choice.name, "dev");
            assert_eq!(choice.source, BranchSource::Default);
        }
    }

    #[tokio::test]
    async fn test_cached_branch_wins() {
        let dir = tempdir().unwrap();
        let mut cache = BranchCache::load(dir.path().join("branches.json"));
        cache.record("feature-123-old").unwrap();
        cache.record("feature-123-my-awesome-feature").unwrap();

        let choice = resolve_branch(&cache, "123").await;
        assert_eq!(choice.source, BranchSource::Cache);
        assert_eq!(choice.name, "feature-123-my-awesome-feature");
    }

    #[test]
    fn test_best_branch_takes_first_ranked_candidate() {
        let store = NameStore::new(
            Namespace::Branch,
            ["release/2024-feature", "feature-x", "feature"],
        );
        assert_eq!(best_branch("feat", &store).as_deref(), Some("feature"));
        assert_eq!(best_branch("nothing-like-it", &store), None);
    }
}
