//! Config command: print the effective configuration
//! Usage: soft-verify config [--json]

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::VerifyConfig;

/// Execute the config command
///
/// Prints one `name: type=<kind>, val=<value>` line per option followed by
/// the enabled debug flags, or the whole configuration as JSON.
pub fn execute(config: &VerifyConfig, json: bool) -> Result<()> {
    if json {
        let rendered =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        println!("{rendered}");
        return Ok(());
    }

    println!("{}", "[general]".bold());
    for line in config.describe() {
        println!("  {line}");
    }

    let enabled: Vec<&str> = config
        .debug
        .entries()
        .into_iter()
        .filter(|(_, on)| *on)
        .map(|(flag, _)| flag)
        .collect();
    println!("{}", "[debug]".bold());
    if enabled.is_empty() {
        println!("  {}", "no debug flags enabled".dimmed());
    } else {
        println!("  {}", enabled.join(", "));
    }
    Ok(())
}
