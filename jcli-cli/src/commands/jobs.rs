//! `j jobs`

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::*;
use jcli_core::domain::job::{JobDefinition, JobType};

use crate::config::Config;
use crate::output::Table;
use crate::session::Session;

/// Job type filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JobTypeArg {
    Scale,
    Build,
    Deploy,
}

impl From<JobTypeArg> for JobType {
    fn from(arg: JobTypeArg) -> Self {
        match arg {
            JobTypeArg::Scale => JobType::Scale,
            JobTypeArg::Build => JobType::Build,
            JobTypeArg::Deploy => JobType::Deploy,
        }
    }
}

#[derive(Args)]
pub struct JobsArgs {
    /// Show only jobs of this type
    #[arg(short = 't', long = "type", value_enum)]
    job_type: Option<JobTypeArg>,

    /// Ignore the cached job list
    #[arg(short, long)]
    refresh: bool,

    /// Include folders
    #[arg(short, long)]
    all: bool,
}

/// List the jobs of the configured folder
pub async fn handle_jobs_command(args: JobsArgs, config: &Config) -> Result<()> {
    let mut session = Session::open(config)?;
    let listing = session.jobs(args.refresh).await?;

    if listing.jobs().is_empty() {
        println!(
            "{}",
            format!("No jobs found in {} folder.", config.folder).yellow()
        );
        return Ok(());
    }

    let rows = job_rows(listing.jobs(), args.job_type.map(JobType::from), args.all);
    if rows.is_empty() {
        println!("{}", "No jobs found matching the filter.".yellow());
        return Ok(());
    }

    let mut table = Table::new(["Job Name", "Status"]);
    for (name, status) in rows {
        table.row([name, status]);
    }
    println!("{}", table.render());
    Ok(())
}

/// `(name, status)` rows for the jobs to show
fn job_rows(jobs: &[JobDefinition], job_type: Option<JobType>, all: bool) -> Vec<(String, String)> {
    jobs.iter()
        .filter(|job| job_type.is_none_or(|t| job.job_type == t))
        .filter(|job| all || !job.is_folder())
        .map(|job| {
            let status = if job.is_folder() {
                "Folder".to_string()
            } else {
                job.color_status()
            };
            (job.name.clone(), status)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jcli_core::domain::job::JobKind;

    fn jobs() -> Vec<JobDefinition> {
        vec![
            JobDefinition::new("test-collateral-api-build").with_color("blue"),
            JobDefinition::new("test-collateral-Scale-up").with_color("red_anime"),
            JobDefinition::new("archive").with_kind(JobKind::Folder),
        ]
    }

    #[test]
    fn test_folders_hidden_unless_all() {
        let rows = job_rows(&jobs(), None, false);
        assert_eq!(rows.len(), 2);

        let rows = job_rows(&jobs(), None, true);
        assert_eq!(rows[2], ("archive".to_string(), "Folder".to_string()));
    }

    #[test]
    fn test_type_filter_and_status() {
        let rows = job_rows(&jobs(), Some(JobType::Scale), false);
        assert_eq!(
            rows,
            vec![(
                "test-collateral-Scale-up".to_string(),
                "Failed (Running)".to_string()
            )]
        );
    }
}
