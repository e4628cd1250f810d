use serde_json::Value;

use super::scalar_text;

/// Print just the headline number.
///
/// Projections print the rent NPV, rent schedules the total rent, scenarios
/// the rent NPV delta and fingerprints the hash.
pub fn print_minimal(value: &Value) {
    let candidates = [
        "/metrics/rent_npv",
        "/result/total_rent",
        "/fingerprint",
    ];
    for pointer in candidates {
        if let Some(v) = value.pointer(pointer).filter(|v| !v.is_null()) {
            println!("{}", scalar_text(v));
            return;
        }
    }

    if let Some(deltas) = value.pointer("/result/metric_deltas").and_then(Value::as_array) {
        if let Some(npv) = deltas
            .iter()
            .find(|d| d.get("metric").and_then(Value::as_str) == Some("rent_npv"))
            .and_then(|d| d.get("delta"))
        {
            println!("{}", scalar_text(npv));
            return;
        }
    }

    println!("{}", scalar_text(value));
}
