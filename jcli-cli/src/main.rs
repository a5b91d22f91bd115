//! j
//!
//! Command-line interface for running and inspecting Jenkins jobs with
//! short, partial names.

mod commands;
mod config;
mod output;
mod resolver;
mod session;

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use commands::watch::Interrupted;
use commands::{Commands, handle_command};
use config::{Config, parse_services};
use jcli_core::domain::name::Namespace;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Exit code after Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

/// Ctrl-C arrived while a command was not waiting for a build
#[derive(Debug, Error)]
#[error("interrupted")]
struct Aborted;

#[derive(Parser)]
#[command(name = "j", version)]
#[command(about = "Run and manage test-collateral Jenkins jobs", long_about = None)]
struct Cli {
    /// Jenkins base URL
    #[arg(long, env = "JENKINS_URL", global = true)]
    jenkins_url: Option<String>,

    /// Jenkins user name
    #[arg(long, env = "JENKINS_USER", global = true)]
    user: Option<String>,

    /// Jenkins API token
    #[arg(long, env = "JENKINS_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Jenkins folder holding the jobs
    #[arg(long, env = "JENKINS_FOLDER", default_value = "test-collateral", global = true)]
    folder: String,

    /// Services that can be scaled and deployed (comma-separated)
    #[arg(long, env = "AVAILABLE_SERVICES", value_delimiter = ',', global = true)]
    services: Vec<String>,

    /// Minutes a fetched job list is trusted
    #[arg(long, env = "J_CACHE_TTL_MINUTES", default_value_t = 1440, global = true)]
    cache_ttl_minutes: u64,

    /// Directory for the cache files (defaults to the home directory)
    #[arg(long, env = "J_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,

    /// Seconds between status checks while waiting
    #[arg(long, env = "J_POLL_INTERVAL_SECS", default_value_t = 5, global = true)]
    poll_interval: u64,

    /// Consecutive failed status checks tolerated while waiting
    #[arg(long, env = "J_MAX_UNKNOWN_POLLS", default_value_t = 5, global = true)]
    max_unknown_polls: u32,

    /// Show debug information
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let cache_dir = match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => dirs::home_dir()
                .context("Could not determine the home directory; set J_CACHE_DIR")?,
        };

        let config = Config {
            jenkins_url: self.jenkins_url.clone(),
            user: self.user.clone(),
            token: self.token.clone(),
            folder: self.folder.clone(),
            services: parse_services(&self.services),
            cache_ttl: Duration::from_secs(self.cache_ttl_minutes.saturating_mul(60)),
            cache_dir,
            poll_interval: Duration::from_secs(self.poll_interval),
            max_unknown_polls: self.max_unknown_polls,
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => eprintln!("{} could not load .env: {}", "Warning:".yellow(), e),
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let result = match cli.config() {
        Ok(config) => {
            until_cancelled(handle_command(cli.command, &config, &cancel), &cancel).await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Run `command` unless Ctrl-C comes first
///
/// The command is polled first, so a wait that reacts to the same
/// cancellation reports its own outcome.
async fn until_cancelled<F>(command: F, cancel: &CancellationToken) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    tokio::select! {
        biased;
        result = command => result,
        _ = cancel.cancelled() => Err(Aborted.into()),
    }
}

/// Log to stderr so command output on stdout stays clean
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("j=debug,jcli_core=debug,jcli_client=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "j=warn,jcli_core=warn,jcli_client=warn".into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(core) = err.downcast_ref::<jcli_core::Error>() {
        core.exit_code()
    } else if err.downcast_ref::<Interrupted>().is_some()
        || err.downcast_ref::<Aborted>().is_some()
    {
        EXIT_INTERRUPTED
    } else {
        1
    }
}

fn report_error(err: &anyhow::Error) {
    if let Some(interrupted) = err.downcast_ref::<Interrupted>() {
        eprintln!("\n{}", interrupted.to_string().yellow());
        return;
    }
    if err.downcast_ref::<Aborted>().is_some() {
        eprintln!("\n{}", "Interrupted.".yellow());
        return;
    }
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    match err.downcast_ref::<jcli_core::Error>() {
        Some(jcli_core::Error::NoMatch {
            namespace,
            suggestions,
            ..
        }) => {
            if suggestions.is_empty() {
                eprintln!("No similar {}s found.", namespace);
            } else {
                eprintln!("\nDid you mean one of these?");
                for (i, suggestion) in suggestions.iter().enumerate() {
                    eprintln!("  {}. {}", i + 1, suggestion);
                }
            }
            eprintln!("\n{}", list_hint(*namespace).dimmed());
        }
        Some(jcli_core::Error::Ambiguous { candidates, .. }) => {
            eprintln!("\nMatching names:");
            for candidate in candidates {
                eprintln!("  - {}", candidate);
            }
            eprintln!(
                "\n{}",
                "Use a longer name to pick one; build, scale and deploy also accept --suggest.".dimmed()
            );
        }
        _ => {}
    }
}

fn list_hint(namespace: Namespace) -> &'static str {
    match namespace {
        Namespace::Service => "Use 'j services' to see all available services.",
        Namespace::Job => "Use 'j jobs' to see all jobs.",
        Namespace::Branch => "Use 'j branches' to see recently used branches.",
    }
}
