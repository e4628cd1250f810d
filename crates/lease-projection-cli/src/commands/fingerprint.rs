use clap::Args;
use serde_json::{json, Value};

use lease_projection_core::cache::fingerprint::{canonical_json, fingerprint};
use lease_projection_core::projection::input::engine_input_from_value;

use crate::input;

/// Arguments for printing an input's cache fingerprint
#[derive(Args)]
pub struct FingerprintArgs {
    /// Path to JSON engine input
    #[arg(long)]
    pub input: Option<String>,

    /// Include the canonical JSON the fingerprint is computed over
    #[arg(long)]
    pub canonical: bool,
}

pub fn run_fingerprint(args: FingerprintArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let value = input::read_value(args.input.as_deref(), "fingerprint")?;
    let engine_input = engine_input_from_value(value)?;
    engine_input.validate()?;

    let key = fingerprint(&engine_input)?;
    let mut out = json!({ "fingerprint": key.as_str() });
    if args.canonical {
        out["canonical"] = Value::String(canonical_json(&engine_input)?);
    }
    Ok(out)
}
