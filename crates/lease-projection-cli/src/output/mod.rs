pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Columns shown for each projected period in table and CSV output.
const PERIOD_COLUMNS: [(&str, &str); 9] = [
    ("year", "/year"),
    ("window", "/window"),
    ("revenue", "/profit_loss/total_revenue"),
    ("rent", "/profit_loss/rent_expense"),
    ("ebitda", "/profit_loss/ebitda"),
    ("net_income", "/profit_loss/net_income"),
    ("cash", "/balance_sheet/cash"),
    ("debt", "/balance_sheet/debt"),
    ("converged", "/solver/converged"),
];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Header plus one flattened row per period, if `value` is a full projection.
fn period_rows(value: &Value) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let periods = value.get("periods")?.as_array()?;
    let headers = PERIOD_COLUMNS.iter().map(|(h, _)| h.to_string()).collect();
    let rows = periods
        .iter()
        .map(|period| {
            PERIOD_COLUMNS
                .iter()
                .map(|(_, pointer)| match period.pointer(pointer) {
                    Some(v) => scalar_text(v),
                    // Historical years carry no solver diagnostics
                    None => "-".to_string(),
                })
                .collect()
        })
        .collect();
    Some((headers, rows))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Arrays of objects nested in a result, e.g. schedule rows or year deltas.
fn object_arrays(map: &serde_json::Map<String, Value>) -> Vec<(&str, &[Value])> {
    map.iter()
        .filter_map(|(key, val)| match val {
            Value::Array(items) if items.first().is_some_and(Value::is_object) => {
                Some((key.as_str(), items.as_slice()))
            }
            _ => None,
        })
        .collect()
}
