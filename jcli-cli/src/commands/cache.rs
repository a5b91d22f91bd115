//! `j cache`

use anyhow::Result;
use chrono::{Local, TimeDelta};
use clap::Args;
use colored::*;
use jcli_core::cache::{BranchCache, JobCache};

use crate::config::Config;

/// Branches listed by `--info`
const RECENT_BRANCHES: usize = 10;

#[derive(Args)]
pub struct CacheArgs {
    /// Show cache information
    #[arg(short, long)]
    info: bool,

    /// Clear the job cache
    #[arg(short, long)]
    clear: bool,

    /// Clear the branch cache
    #[arg(long)]
    clear_branches: bool,
}

/// Inspect or clear the job and branch caches
pub fn handle_cache_command(args: CacheArgs, config: &Config) -> Result<()> {
    if !args.info && !args.clear && !args.clear_branches {
        println!("{}", "Cache management commands:".bold());
        println!("  j cache --clear           Clear the job cache");
        println!("  j cache --clear-branches  Clear the branch cache");
        println!("  j cache --info            Show cache information");
        return Ok(());
    }

    if args.clear {
        let mut cache = JobCache::load(config.job_cache_path(), config.cache_ttl);
        if cache.clear()? {
            println!("{}", "Job cache cleared successfully.".green());
        } else {
            println!("No job cache file found.");
        }
    }

    if args.clear_branches {
        let mut cache = BranchCache::load(config.branch_cache_path());
        if cache.clear()? {
            println!("{}", "Branch cache cleared successfully.".green());
        } else {
            println!("No branch cache file found.");
        }
    }

    if args.info {
        print_job_cache_info(config);
        println!();
        print_branch_cache_info(config);
    }

    Ok(())
}

fn print_job_cache_info(config: &Config) {
    let cache = JobCache::load(config.job_cache_path(), config.cache_ttl);
    println!("{}", "=== Job Cache ===".bold());

    let Some(info) = cache.info() else {
        println!("No job cache file found.");
        return;
    };

    println!("Cache file: {}", info.path.display());
    println!(
        "Created: {}",
        info.fetched_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    println!("Age: {}", format_delta(info.age));
    println!("Jobs cached: {}", info.count);
    println!("Cache duration: {}", format_delta(TimeDelta::from_std(info.ttl).unwrap_or(TimeDelta::MAX)));

    match info.remaining() {
        Some(remaining) if !info.is_stale => println!(
            "Status: {} (expires in {})",
            "VALID".green(),
            format_delta(remaining)
        ),
        _ => println!("Status: {}", "EXPIRED".red()),
    }
}

fn print_branch_cache_info(config: &Config) {
    let cache = BranchCache::load(config.branch_cache_path());
    println!("{}", "=== Branch Cache ===".bold());
    println!("Cache file: {}", cache.path().display());
    println!("Branches cached: {}", cache.len());

    let entries = cache.list(None);
    if entries.is_empty() {
        println!("No branches cached yet.");
        return;
    }

    println!("Recent branches:");
    for (i, entry) in entries.iter().take(RECENT_BRANCHES).enumerate() {
        println!("  {}. {}", i + 1, entry.name);
    }
    if entries.len() > RECENT_BRANCHES {
        println!("  ... and {} more", entries.len() - RECENT_BRANCHES);
    }
}

/// Format a span as `3h 12m`, `12m` or `40s`
fn format_delta(delta: TimeDelta) -> String {
    let secs = delta.num_seconds().max(0);
    let (h, m) = (secs / 3600, (secs % 3600) / 60);
    if h > 0 {
        format!("{}h {}m", h, m)
    } else if m > 0 {
        format!("{}m", m)
    } else {
        format!("{}s", secs)
    }
}
