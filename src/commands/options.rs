//! Options command: list every option with its help text
//! Usage: soft-verify options

use anyhow::Result;
use colored::Colorize;

use crate::config::{DEBUG_FLAGS, OPTIONS};

pub fn execute() -> Result<()> {
    for spec in OPTIONS {
        println!("--{} <{}>", spec.name.cyan(), spec.kind);
        println!("    {}", spec.help_text());
    }

    println!();
    println!("Debug flags ({}):", "[debug] table or --debug <flag>".dimmed());
    for flag in DEBUG_FLAGS {
        println!("  {flag}");
    }
    Ok(())
}
