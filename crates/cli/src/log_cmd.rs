use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;

use crate::config::{load_config, open_log_store};

#[derive(Debug, Clone, Args)]
pub struct LogsArgs {
    /// Number of records to show, newest first (default: log.view_limit)
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Truncate the log file
    #[arg(long, conflicts_with_all = ["limit", "json"])]
    pub clear: bool,

    /// Print records as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(config_path: &Path, args: LogsArgs) -> Result<()> {
    let cfg = load_config(config_path)?;
    let store = open_log_store(&cfg)?;

    if args.clear {
        if store.clear().context("Failed to clear log file")? {
            println!("Log file cleared.");
        } else {
            println!("No log file to clear.");
        }
        return Ok(());
    }

    if !store.is_enabled() {
        eprintln!("Event logging is disabled (log.enabled = false); showing existing entries.");
    }

    let limit = args.limit.unwrap_or(cfg.log.view_limit);
    let records = store.last(limit).context("Failed to read log file")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No log entries found.");
        return Ok(());
    }
    for record in &records {
        println!("{}  {:<7}  {}", record.timestamp, record.level, record.message);
    }
    Ok(())
}
