//! Waiting for triggered builds

use std::io::Write;

use anyhow::Result;
use colored::*;
use jcli_core::domain::job::{BuildReference, JobStatus};
use jcli_core::poll::{PollConfig, PollEvent, PollOutcome, PollReport, PollingExecutor};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::output::{colorize_status, format_duration};
use crate::session::Session;

/// The operator stopped the wait; the build was left alone
#[derive(Debug, Error)]
#[error("stopped waiting for {build} (last status: {last_status}); the job may still be running remotely")]
pub struct Interrupted {
    pub build: String,
    pub last_status: JobStatus,
}

/// A waited-for build finished without succeeding
#[derive(Debug, Error)]
#[error("{build} finished with status {status}")]
pub struct BuildUnsuccessful {
    pub build: String,
    pub status: JobStatus,
}

/// Wait for `build` to finish, printing progress
///
/// # Arguments
/// * `session` - The session whose client is polled
/// * `build` - The build to wait for
/// * `cancel` - Cancelled on Ctrl-C
/// * `config` - Polling settings; console streaming prints the log as it grows
///
/// # Returns
/// The report of a successful build
///
/// # Errors
/// [`Interrupted`] on cancellation, [`BuildUnsuccessful`] when the build
/// fails or is aborted, or a polling timeout
pub async fn wait_for_build(
    session: &Session,
    build: &BuildReference,
    cancel: &CancellationToken,
    config: PollConfig,
) -> Result<PollReport> {
    let streaming = config.stream_console;
    let executor = PollingExecutor::new(session.client(), config);

    if !streaming {
        println!("Waiting for job to complete... (Ctrl-C stops waiting)");
    }

    let outcome = executor
        .wait(build, cancel, |event| match event {
            PollEvent::BuildNumber(number) => {
                if !streaming {
                    println!("Build #{}", number);
                }
            }
            PollEvent::Status(status) => {
                if !streaming {
                    println!("Status: {}", colorize_status(status));
                }
            }
            PollEvent::Console(text) => {
                print!("{}", text);
                let _ = std::io::stdout().flush();
            }
            PollEvent::Waiting { status, elapsed, .. } => {
                if !streaming && status == JobStatus::Running {
                    println!(
                        "{}",
                        format!(
                            "Still running... (elapsed: {})",
                            format_duration(elapsed.as_millis() as u64)
                        )
                        .dimmed()
                    );
                }
            }
        })
        .await?;

    let report = match outcome {
        PollOutcome::Finished(report) => report,
        PollOutcome::Cancelled(report) => {
            return Err(Interrupted {
                build: describe(build, &report),
                last_status: report.status,
            }
            .into());
        }
    };

    println!();
    println!("Job completed with result: {}", colorize_status(report.status));
    if report.status != JobStatus::Succeeded {
        return Err(BuildUnsuccessful {
            build: describe(build, &report),
            status: report.status,
        }
        .into());
    }
    Ok(report)
}

fn describe(build: &BuildReference, report: &PollReport) -> String {
    match report.build_number {
        Some(number) => format!("{} #{}", build.job_name, number),
        None => build.to_string(),
    }
}
