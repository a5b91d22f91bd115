//! `j build`

use anyhow::Result;
use clap::Args;
use colored::*;
use jcli_core::RemoteCi;
use jcli_core::cache::DEFAULT_BRANCH;
use jcli_core::domain::job::JobDefinition;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::watch::wait_for_build;
use crate::config::Config;
use crate::resolver::{BranchSource, resolve_branch, resolve_job, service_for_job};
use crate::session::Session;

#[derive(Args)]
pub struct BuildArgs {
    /// Build job name or a unique part of it
    job: String,

    /// Enable tests and code quality checks
    #[arg(short, long)]
    quality: bool,

    /// Branch to build; partial names are matched against recent branches
    #[arg(short, long, default_value = DEFAULT_BRANCH)]
    branch: String,

    /// Wait for the job to complete
    #[arg(short, long)]
    wait: bool,

    /// Use the best match when the name is ambiguous
    #[arg(long)]
    suggest: bool,
}

/// Run a build job for a branch
pub async fn handle_build_command(
    args: BuildArgs,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut session = Session::open(config)?;

    let job_name = resolve_job(
        &mut session,
        &args.job,
        |job: &JobDefinition| job.is_buildable() && !job.is_folder(),
        args.suggest,
    )
    .await?;
    let service = service_for_job(&job_name, &config.services, &config.job_prefix());

    let branch = resolve_branch(session.branch_cache(), &args.branch).await;
    match branch.source {
        BranchSource::Cache | BranchSource::Git if branch.name != args.branch => println!(
            "{}",
            format!("Matched branch '{}' to '{}'", args.branch, branch.name).dimmed()
        ),
        BranchSource::Verbatim => println!(
            "{}",
            format!("No known branch matches '{}', using it as given", branch.name).yellow()
        ),
        _ => {}
    }

    let build = session
        .client()
        .trigger_build(&job_name, &service, &branch.name, args.quality)
        .await?;

    if let Err(e) = session.branch_cache_mut().record(&branch.name) {
        warn!("Could not cache branch '{}': {}", branch.name, e);
    }

    println!(
        "{}",
        format!("Build job '{}' triggered successfully.", job_name).green()
    );
    if let Some(queue_id) = build.queue_id {
        println!("Queue ID: {}", queue_id);
    }
    println!("Service: {}", service);
    println!("Branch: origin/{}", branch.name.trim_start_matches("origin/"));
    println!(
        "Quality: {}",
        if args.quality { "Enabled" } else { "Disabled" }
    );

    if args.wait {
        let report = wait_for_build(&session, &build, cancel, config.poll_config()).await?;
        if let Some(number) = report.build_number {
            println!(
                "{}",
                format!("Build #{} completed successfully.", number).green()
            );
            println!("You can deploy this build with: j deploy {} {}", service, number);
        }
    }
    Ok(())
}
