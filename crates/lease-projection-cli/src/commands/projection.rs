use clap::Args;
use log::debug;
use serde_json::{json, Value};
use std::time::Duration;

use lease_projection_core::projection::input::engine_input_from_value;
use lease_projection_core::{run_projection, run_with_deadline};

use crate::input;

/// Arguments for a full lease projection
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to JSON engine input (historical, transition and dynamic config)
    #[arg(long)]
    pub input: Option<String>,

    /// Emit only aggregate metrics, validation and warnings
    #[arg(long)]
    pub summary: bool,
}

pub fn run_project(
    args: ProjectArgs,
    budget: Option<Duration>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let value = input::read_value(args.input.as_deref(), "project")?;
    let engine_input = engine_input_from_value(value)?;

    let output = match budget {
        Some(b) => run_with_deadline(&engine_input, b)?,
        None => run_projection(&engine_input)?,
    };

    debug!(
        "Projected {} periods in {}us",
        output.performance.period_count, output.performance.elapsed_us
    );

    if args.summary {
        return Ok(json!({
            "metrics": output.metrics,
            "validation": {
                "all_periods_balanced": output.validation.all_periods_balanced,
                "all_cash_flows_reconciled": output.validation.all_cash_flows_reconciled,
                "all_periods_converged": output.validation.all_periods_converged,
                "max_balance_difference": output.validation.max_balance_difference,
            },
            "warnings": output.warnings,
            "performance": output.performance,
        }));
    }
    Ok(serde_json::to_value(output)?)
}
