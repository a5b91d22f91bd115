//! `j branches`

use anyhow::Result;
use chrono::Local;
use clap::Args;
use colored::*;
use jcli_core::cache::{BranchCache, DEFAULT_BRANCH};

use crate::config::Config;
use crate::output::{ListFormat, Table};

#[derive(Args)]
pub struct BranchesArgs {
    /// Show only branches containing this text
    #[arg(short, long)]
    filter: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = ListFormat::List)]
    format: ListFormat,
}

/// List cached branch names, most recently used first
pub fn handle_branches_command(args: BranchesArgs, config: &Config) -> Result<()> {
    let cache = BranchCache::load(config.branch_cache_path());

    if cache.is_empty() {
        println!("{}", "No branches cached yet.".yellow());
        println!("Branches are cached when you use them with 'j build -b <branch>'.");
        return Ok(());
    }

    let entries = cache.list(args.filter.as_deref());
    if entries.is_empty() {
        println!(
            "{}",
            format!(
                "No cached branches match '{}'.",
                args.filter.as_deref().unwrap_or_default()
            )
            .yellow()
        );
        return Ok(());
    }

    match args.format {
        ListFormat::Table => {
            let mut table = Table::new(["#", "Branch Name", "Last Used"]);
            for (i, entry) in entries.iter().enumerate() {
                table.row([
                    (i + 1).to_string(),
                    entry.name.clone(),
                    entry
                        .last_used_at
                        .with_timezone(&Local)
                        .format("%Y-%m-%d %H:%M")
                        .to_string(),
                ]);
            }
            println!("{}", table.render());
        }
        ListFormat::List => {
            println!("{}", "Cached branches:".bold());
            for (i, entry) in entries.iter().enumerate() {
                println!("  {}. {}", i + 1, entry.name);
            }
        }
    }

    println!("\nTotal: {} branches", entries.len());
    println!("{}", "Usage: j build <job> -b <branch-name>".dimmed());
    println!(
        "{}",
        format!("Note: '{}' is never cached", DEFAULT_BRANCH).dimmed()
    );
    Ok(())
}
