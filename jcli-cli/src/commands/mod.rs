//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod branches;
mod build;
mod cache;
mod console;
mod deploy;
mod job_params;
mod jobs;
mod scale;
mod services;
mod status;
pub mod watch;

pub use branches::BranchesArgs;
pub use build::BuildArgs;
pub use cache::CacheArgs;
pub use console::ConsoleArgs;
pub use deploy::DeployArgs;
pub use job_params::JobParamsArgs;
pub use jobs::JobsArgs;
pub use scale::ScaleArgs;
pub use services::ServicesArgs;
pub use status::StatusArgs;

use anyhow::Result;
use clap::Subcommand;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List the services that can be scaled and deployed
    Services(ServicesArgs),
    /// List recently used branches
    Branches(BranchesArgs),
    /// List jobs in the Jenkins folder
    Jobs(JobsArgs),
    /// Manage the job and branch caches
    Cache(CacheArgs),
    /// Scale up a service
    Scale(ScaleArgs),
    /// Run a build job for a branch (quality checks disabled by default)
    Build(BuildArgs),
    /// Deploy a build of a service
    Deploy(DeployArgs),
    /// Show the status of a build
    Status(StatusArgs),
    /// Show the console output of a build
    Console(ConsoleArgs),
    /// Show the parameters of a job
    JobParams(JobParamsArgs),
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
/// * `cancel` - Cancelled on Ctrl-C; stops any wait for a build
///
/// # Returns
/// Result indicating success or failure
pub async fn handle_command(
    command: Commands,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<()> {
    match command {
        Commands::Services(args) => services::handle_services_command(args, config),
        Commands::Branches(args) => branches::handle_branches_command(args, config),
        Commands::Jobs(args) => jobs::handle_jobs_command(args, config).await,
        Commands::Cache(args) => cache::handle_cache_command(args, config),
        Commands::Scale(args) => scale::handle_scale_command(args, config, cancel).await,
        Commands::Build(args) => build::handle_build_command(args, config, cancel).await,
        Commands::Deploy(args) => deploy::handle_deploy_command(args, config, cancel).await,
        Commands::Status(args) => status::handle_status_command(args, config, cancel).await,
        Commands::Console(args) => console::handle_console_command(args, config, cancel).await,
        Commands::JobParams(args) => job_params::handle_job_params_command(args, config).await,
    }
}
