//! `j services`

use anyhow::Result;
use clap::Args;
use colored::*;

use crate::config::Config;
use crate::output::{ListFormat, Table};

#[derive(Args)]
pub struct ServicesArgs {
    /// Show only services containing this text
    #[arg(short, long)]
    filter: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = ListFormat::List)]
    format: ListFormat,
}

/// List the configured services
pub fn handle_services_command(args: ServicesArgs, config: &Config) -> Result<()> {
    if config.services.is_empty() {
        println!("{}", "No services configured.".yellow());
        println!("Set AVAILABLE_SERVICES (comma-separated) in your environment or .env file.");
        return Ok(());
    }

    let services = filter_names(&config.services, args.filter.as_deref());
    if services.is_empty() {
        println!(
            "{}",
            format!(
                "No services found matching '{}'",
                args.filter.as_deref().unwrap_or_default()
            )
            .yellow()
        );
        return Ok(());
    }

    match args.format {
        ListFormat::Table => {
            let mut table = Table::new(["#", "Service Name"]);
            for (i, service) in services.iter().enumerate() {
                table.row([(i + 1).to_string(), service.to_string()]);
            }
            println!("{}", table.render());
        }
        ListFormat::List => {
            println!("{}", "Available services:".bold());
            for service in &services {
                println!("  {}", service);
            }
        }
    }

    println!("\nTotal: {} services", services.len());
    println!("{}", "Usage: j scale <service-name>".dimmed());
    Ok(())
}

/// Names containing `filter`, ignoring case
pub(crate) fn filter_names<'a>(names: &'a [String], filter: Option<&str>) -> Vec<&'a str> {
    let filter = filter.map(str::to_lowercase);
    names
        .iter()
        .filter(|name| match &filter {
            Some(f) => name.to_lowercase().contains(f),
            None => true,
        })
        .map(String::as_str)
        .collect()
}
