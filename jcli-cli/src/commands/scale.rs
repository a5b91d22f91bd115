//! `j scale`

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
pub struct ScaleArgs {
    /// Service name or a unique part of it
    service: String,

    /// Time to live in hours
    #[arg(short, long, default_value_t = 5)]
    ttl: u32,

    /// Wait for the job to complete
    #[arg(short, long)]
    wait: bool,

    /// Use the best match when the name is ambiguous
    #[arg(long)]
    suggest: bool,
}

/// Scale up a service
pub async fn handle_scale_command(
    args: ScaleArgs,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<()> {
    let session = Session::open(config)?;
    let services = session.service_names().await?;
    let service = resolve_service(&services, &args.service, args.suggest)?;

    let scale_job = config.scale_job();
    let build = session
        .client()
        .trigger_scale(&scale_job, &service, args.ttl)
        .await?;

    println!(
        "{}",
        format!("Scale up job for '{}' triggered successfully.", service).green()
    );
    if let Some(queue_id) = build.queue_id {
        println!("Queue ID: {}", queue_id);
    }
    println!("Time to live: {} hours", args.ttl);

    if args.wait {
        wait_for_build(&session, &build, cancel, config.poll_config()).await?;
    }
    Ok(())
}
