//! # Witnet Tasks
//!
//! Command line entry point for the Witnet configuration tasks.
//!
//! ## Usage
//!
//! ```bash
//! # Print the signer addresses
//! cargo run --bin witnet -- accounts
//!
//! # Verify or register the Radon descriptors and the request template
//! cargo run --bin witnet -- --config Config.toml configure
//! ```
//!
//! `configure` exits with status 2 when the run left cache fields without a value.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fmt::Debug;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::signal;
use witnet_radon_sdk::{settings::Settings, tasks, RunSummary, StepOutcome};

#[derive(Parser, Debug)]
#[command(version, about = "Witnet Radon request configuration tasks", long_about = None)]
struct Cli {
    /// Settings file
    #[arg(long, short, default_value = "Config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints the list of accounts
    Accounts,
    /// Configures the Witnet request template
    Configure,
}

fn render<T: Debug>(name: &str, outcome: &StepOutcome<T>) {
    let line = format!("   {:<24} {}", name, outcome);
    match outcome {
        StepOutcome::Cached(_) | StepOutcome::Verified(_) => println!("{}", line.green()),
        StepOutcome::Registered(_) => println!("{}", line.cyan()),
        StepOutcome::Missing { .. } => println!("{}", line.yellow()),
        StepOutcome::Failed { .. } => println!("{}", line.red()),
    }
}

fn print_summary(summary: &RunSummary) {
    println!("\n📋 Witnet configuration for chain {}", summary.chain_id);
    for (kind, outcome) in summary.descriptor_outcomes() {
        render(kind.event_name(), outcome);
    }
    render("WitnetRequestTemplate", &summary.request_template);
    println!("   {} transaction(s) mined", summary.transactions());
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    env_logger::init();

    let cli = Cli::parse();
    let settings = Settings::from_path(&cli.config)?;

    match cli.command {
        Command::Accounts => {
            let provider = tasks::connect(&settings)?;
            let chain_id = tasks::resolve_chain_id(&settings, &provider).await?;
            let wallets = tasks::load_wallets(&settings, chain_id)?;
            for address in tasks::accounts(&provider, &wallets).await? {
                println!("{:?}", address);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Configure => {
            // Dropping the run on Ctrl-C releases the cache lock
            let summary = tokio::select! {
                summary = tasks::configure(&settings) => summary?,
                _ = signal::ctrl_c() => {
                    println!("\n🛑 Shutdown signal received, configuration interrupted");
                    return Ok(ExitCode::from(130));
                }
            };
            print_summary(&summary);

            if summary.is_complete() {
                println!("\n✅ updated witnet config");
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!(
                    "\n{} {}",
                    "⚠️ witnet config incomplete, missing:".yellow(),
                    summary.missing_fields().join(", ")
                );
                Ok(ExitCode::from(2))
            }
        }
    }
}
