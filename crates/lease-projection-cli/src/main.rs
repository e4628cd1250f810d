mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use std::time::Duration;

use lease_projection_core::LeaseProjectionError;

use commands::fingerprint::FingerprintArgs;
use commands::projection::ProjectArgs;
use commands::rent::RentScheduleArgs;
use commands::scenario::ScenarioArgs;

/// Multi-decade lease financial projections
#[derive(Parser)]
#[command(
    name = "leaseproj",
    version,
    about = "Multi-decade lease financial projections",
    long_about = "A CLI for projecting a leased campus's profit & loss, balance sheet and \
                  cash flow from historical actuals through a transition bridge and a \
                  multi-decade lease term, with decimal precision and circular \
                  interest/debt resolution."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Abandon the projection after this many milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Project every period from historical actuals to the end of the lease
    Project(ProjectArgs),
    /// Rent schedule for a rent model over the lease term
    RentSchedule(RentScheduleArgs),
    /// Compare a scenario against the baseline projection
    Scenario(ScenarioArgs),
    /// Print the cache fingerprint of an engine input
    Fingerprint(FingerprintArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let budget = cli.timeout_ms.map(Duration::from_millis);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Project(args) => commands::projection::run_project(args, budget),
        Commands::RentSchedule(args) => commands::rent::run_rent_schedule(args),
        Commands::Scenario(args) => commands::scenario::run_scenario_command(args, budget),
        Commands::Fingerprint(args) => commands::fingerprint::run_fingerprint(args),
        Commands::Version => {
            println!("leaseproj {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => match e.downcast_ref::<LeaseProjectionError>() {
            Some(err) => {
                eprintln!("{}: {}", format!("error[{}]", err.code()).red().bold(), err);
                process::exit(if err.is_retryable() { 2 } else { 1 });
            }
            None => {
                eprintln!("{}: {}", "error".red().bold(), e);
                process::exit(1);
            }
        },
    }
}
