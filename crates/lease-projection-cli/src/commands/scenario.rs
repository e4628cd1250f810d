use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Duration;

use lease_projection_core::cache::store::FingerprintCache;
use lease_projection_core::projection::input::engine_input_from_value;
use lease_projection_core::scenarios::modifier::{run_scenario, ScenarioDials};

use crate::input;

/// Arguments for a baseline vs. scenario comparison
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ScenarioArgs {
    /// Path to JSON engine input for the baseline
    #[arg(long)]
    pub input: Option<String>,

    /// Enrollment multiplier, 0.5 to 1.5 (1.0 = baseline)
    #[arg(long)]
    pub enrollment: Option<Decimal>,

    /// Staff-cost CPI rate, 0 to 0.10
    #[arg(long)]
    pub cpi: Option<Decimal>,

    /// Tuition growth rate for every curriculum track, 0 to 0.15
    #[arg(long)]
    pub tuition_growth: Option<Decimal>,

    /// Rent escalation rate, 0 to 0.10
    #[arg(long)]
    pub rent_escalation: Option<Decimal>,
}

pub fn run_scenario_command(
    args: ScenarioArgs,
    budget: Option<Duration>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let value = input::read_value(args.input.as_deref(), "scenario")?;
    let baseline = engine_input_from_value(value)?;

    let dials = ScenarioDials {
        enrollment_factor: args.enrollment,
        cpi_rate: args.cpi,
        tuition_growth_rate: args.tuition_growth,
        rent_escalation_rate: args.rent_escalation,
    };
    let cache = FingerprintCache::default();
    let result = run_scenario(&cache, &baseline, &dials, budget)?;
    Ok(serde_json::to_value(result)?)
}
