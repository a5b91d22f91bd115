//! `j console`

use anyhow::Result;
use clap::Args;
use colored::*;
use jcli_core::RemoteCi;
use jcli_core::domain::job::{BuildReference, JobDefinition};
use tokio_util::sync::CancellationToken;

use super::status::build_number;
use super::watch::wait_for_build;
use crate::config::Config;
use crate::output::{rule, tail_lines};
use crate::resolver::resolve_job;
use crate::session::Session;

#[derive(Args)]
pub struct ConsoleArgs {
    /// Job name or a unique part of it
    job: String,

    /// Build number; defaults to the latest build
    build: Option<u64>,

    /// Show only the last lines of the output
    #[arg(short, long)]
    tail: bool,

    /// Number of lines shown with --tail
    #[arg(short = 'n', long, default_value_t = 50)]
    lines: usize,

    /// Keep printing output until the build completes
    #[arg(short, long)]
    follow: bool,
}

/// Print the console output of a build
pub async fn handle_console_command(
    args: ConsoleArgs,
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

    let chunk = session
        .client()
        .get_console_output(&job_name, number, 0)
        .await?;

    let (text, truncated) = if args.tail {
        tail_lines(&chunk.text, args.lines)
    } else {
        (chunk.text.as_str(), false)
    };

    if truncated {
        println!(
            "Console output for {} #{} (last {} lines):",
            job_name, number, args.lines
        );
    } else {
        println!("Console output for {} #{}:", job_name, number);
    }
    rule();
    print!("{}", text);
    if !text.is_empty() && !text.ends_with('\n') {
        println!();
    }

    if args.follow && chunk.more {
        let poll = config.poll_config().with_console_from(chunk.next_offset);
        wait_for_build(
            &session,
            &BuildReference::numbered(&job_name, number),
            cancel,
            poll,
        )
        .await?;
    }
    Ok(())
}
