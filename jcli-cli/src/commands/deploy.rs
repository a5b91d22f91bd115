//! `j deploy`

use anyhow::Result;
use clap::Args;
use colored::*;
use jcli_core::RemoteCi;
use tokio_util::sync::CancellationToken;

use super::watch::wait_for_build;
use crate::config::Config;
use crate::resolver::resolve_service;
use crate::session::Session;

#[derive(Args)]
pub struct DeployArgs {
    /// Service name or a unique part of it
    service: String,

    /// Build number to deploy
    build: u64,

    /// Wait for the job to complete
    #[arg(short, long)]
    wait: bool,

    /// Use the best match when the name is ambiguous
    #[arg(long)]
    suggest: bool,
}

/// Deploy a build of a service
pub async fn handle_deploy_command(
    args: DeployArgs,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<()> {
    let session = Session::open(config)?;
    let services = session.service_names().await?;
    let service = resolve_service(&services, &args.service, args.suggest)?;

    let deploy_job = config.deploy_job();
    let build = session
        .client()
        .trigger_deploy(&deploy_job, &service, args.build)
        .await?;

    println!(
        "{}",
        format!(
            "Deploy job for '{}' build #{} triggered successfully.",
            service, args.build
        )
        .green()
    );
    if let Some(queue_id) = build.queue_id {
        println!("Queue ID: {}", queue_id);
    }

    if args.wait {
        wait_for_build(&session, &build, cancel, config.poll_config()).await?;
    }
    Ok(())
}
