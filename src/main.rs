use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use soft_verify::commands::{config, demo, options};
use soft_verify::{init_logging, Session, VerifyArgs, VerifyConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "soft-verify")]
#[command(
    about = "Soft assertions with consolidated, phase-aware verification reports",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Config file (default: ./soft-verify.toml, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable a debug flag (repeatable): print-saved, verify, not-plugin,
    /// phases, scopes, summary
    #[arg(long = "debug", global = true, value_name = "FLAG")]
    debug: Vec<String>,

    #[command(flatten)]
    overrides: VerifyArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the effective configuration
    Config {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every option with its help text
    Options,

    /// Run a sample suite and print its report
    Demo {
        /// Also write the session report as JSON
        #[arg(long, value_name = "PATH")]
        json: Option<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> Result<VerifyConfig> {
    let mut config = VerifyConfig::discover(cli.config.as_deref())?;
    config
        .apply_overrides(&cli.overrides)
        .context("Invalid command-line option")?;
    for flag in &cli.debug {
        config
            .set_option(&format!("debug.{flag}"), "true")
            .context("Invalid debug flag")?;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config);

    match cli.command {
        Commands::Config { json } => config::execute(&config, json),
        Commands::Options => options::execute(),
        Commands::Demo { json } => {
            let session = Session::new(config);
            demo::execute(&session, json.as_deref())
        }
    }
}
