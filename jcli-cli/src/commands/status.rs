//! `j status`

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use colored::*;
use jcli_core::RemoteCi;
use jcli_core::domain::job::{BuildInfo, BuildReference, JobDefinition};
use tokio_util::sync::CancellationToken;

use super::watch::wait_for_build;
use crate::config::Config;
use crate::output::{colorize_status, format_duration, format_timestamp};
use crate::resolver::resolve_job;
use crate::session::Session;

#[derive(Args)]
pub struct StatusArgs {
    /// Job name or a unique part of it
    job: String,

    /// Build number; defaults to the latest build
    build: Option<u64>,

    /// Wait for the build to complete if it is still running
    #[arg(short, long)]
    wait: bool,
}

/// Show the status of a build
pub async fn handle_status_command(
    args: StatusArgs,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut session = Session::open(config)?;
    let job_name = resolve_job(
        &mut session,
        &args.job,
        |job: &JobDefinition| !job.is_folder(),
        false,
    )
    .await?;

    let Some(number) = build_number(&session, &job_name, args.build).await? else {
        println!("{}", format!("Job '{}' has no builds yet.", job_name).yellow());
        return Ok(());
    };

    let info = session.client().get_build_info(&job_name, number).await?;
    print_build_info(&job_name, &info);

    if args.wait && !info.status.is_terminal() {
        println!();
        wait_for_build(
            &session,
            &BuildReference::numbered(&job_name, number),
            cancel,
            config.poll_config(),
        )
        .await?;
    }
    Ok(())
}

/// The requested build number, or the job's latest
pub(crate) async fn build_number(
    session: &Session,
    job_name: &str,
    requested: Option<u64>,
) -> Result<Option<u64>> {
    match requested {
        Some(number) => Ok(Some(number)),
        None => Ok(session
            .client()
            .resolve_build_number(&BuildReference::latest(job_name))
            .await?),
    }
}

fn print_build_info(job_name: &str, info: &BuildInfo) {
    println!("Job: {}", job_name.bold());
    println!("Build: #{}", info.number);
    println!("Status: {}", colorize_status(info.status));
    println!("Started: {}", format_timestamp(info.timestamp_ms));

    if info.status.is_terminal() {
        println!("Duration: {}", format_duration(info.duration_ms));
    } else {
        let elapsed = (Utc::now().timestamp_millis() - info.timestamp_ms).max(0);
        println!("Running for: {}", format_duration(elapsed as u64));
    }

    println!("URL: {}", info.url.as_deref().unwrap_or("N/A"));

    if !info.parameters.is_empty() {
        println!("\n{}", "Parameters:".bold());
        for (name, value) in &info.parameters {
            println!("  {}: {}", name.cyan(), value);
        }
    }
}
