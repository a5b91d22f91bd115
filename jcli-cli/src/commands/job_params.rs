//! `j job-params`

use anyhow::Result;
use clap::Args;
use colored::*;
use jcli_core::RemoteCi;
use jcli_core::domain::job::{JobDefinition, ParameterDefinition};

use crate::config::Config;
use crate::resolver::resolve_job;
use crate::session::Session;

#[derive(Args)]
pub struct JobParamsArgs {
    /// Job name or a unique part of it
    job: String,
}

/// Show the parameters a job declares and their last used values
pub async fn handle_job_params_command(args: JobParamsArgs, config: &Config) -> Result<()> {
    let mut session = Session::open(config)?;
    let job_name = resolve_job(
        &mut session,
        &args.job,
        |job: &JobDefinition| !job.is_folder(),
        false,
    )
    .await?;

    let definitions = session.client().get_parameter_definitions(&job_name).await?;
    let last_used = session.client().get_last_parameters(&job_name).await?;

    println!("Job: {}", job_name.bold());
    println!("Path: {}/{}", config.folder, job_name);

    if definitions.is_empty() {
        println!("  No parameters defined for this job.");
        return Ok(());
    }

    println!("{}", "Parameters:".bold());
    for definition in &definitions {
        print_definition(definition, last_used.get(&definition.name).map(String::as_str));
    }
    Ok(())
}

fn print_definition(definition: &ParameterDefinition, last_used: Option<&str>) {
    println!(
        "  - {} ({})",
        definition.name.cyan(),
        short_type(definition.param_type.as_deref())
    );
    println!(
        "    Default: {}",
        definition.default_value.as_deref().unwrap_or("None")
    );
    if let Some(value) = last_used {
        println!("    Last used: {}", value);
    }
    println!(
        "    Description: {}",
        definition
            .description
            .as_deref()
            .unwrap_or("No description")
    );
    if !definition.choices.is_empty() {
        println!("    Choices: {}", definition.choices.join(", "));
    }
    println!();
}

/// `ChoiceParameterDefinition` -> `Choice`
fn short_type(param_type: Option<&str>) -> &str {
    match param_type {
        Some(t) => t.strip_suffix("ParameterDefinition").unwrap_or(t),
        None => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_type() {
        assert_eq!(short_type(Some("ChoiceParameterDefinition")), "Choice");
        assert_eq!(short_type(Some("PT_SINGLE_SELECT")), "PT_SINGLE_SELECT");
        assert_eq!(short_type(None), "Unknown");
    }
}
