use clap::Args;
use serde_json::Value;

use lease_projection_core::rent::model::{self, RentScheduleInput, RENT_MODEL_NAMES};
use lease_projection_core::LeaseProjectionError;

use crate::input;

/// Arguments for a stand-alone rent schedule
#[derive(Args)]
pub struct RentScheduleArgs {
    /// Path to JSON rent schedule input (rent_model, years, start_year)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the number of years in the input
    #[arg(long)]
    pub years: Option<u32>,
}

pub fn run_rent_schedule(args: RentScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let value = input::read_value(args.input.as_deref(), "rent-schedule")?;
    check_model_tag(&value)?;

    let mut schedule_input: RentScheduleInput = serde_json::from_value(value)?;
    if let Some(years) = args.years {
        schedule_input.years = years;
    }
    let result = model::rent_schedule(&schedule_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Unknown rent model tags are reported by name rather than as a serde error.
fn check_model_tag(value: &Value) -> Result<(), LeaseProjectionError> {
    let name = value
        .pointer("/rent_model/model")
        .and_then(|m| m.as_str())
        .unwrap_or_default();
    if RENT_MODEL_NAMES.contains(&name) {
        Ok(())
    } else {
        Err(LeaseProjectionError::UnknownRentModel(name.to_string()))
    }
}
