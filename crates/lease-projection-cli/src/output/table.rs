use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{object_arrays, period_rows, scalar_text};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    if let Some((headers, rows)) = period_rows(value) {
        print_rows(&headers, rows);
        if let Some(metrics) = value.get("metrics") {
            println!();
            print_fields(metrics);
        }
        print_warnings(value);
        return;
    }

    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => print_result(result, map),
            None => print_fields(value),
        },
        _ => println!("{value}"),
    }
}

fn print_result(result: &Value, envelope: &Map<String, Value>) {
    print_fields(result);
    if let Value::Object(res_map) = result {
        for (name, items) in object_arrays(res_map) {
            println!("\n{name}:");
            print_array(items);
        }
    }
    print_warnings(&Value::Object(envelope.clone()));

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {meth}");
    }
}

/// Scalar and small nested fields as a two-column table; arrays of objects
/// are printed separately.
fn print_fields(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            if matches!(val, Value::Array(items) if items.first().is_some_and(Value::is_object)) {
                continue;
            }
            builder.push_record([key.as_str(), &scalar_text(val)]);
        }
        println!("{}", Table::from(builder));
    }
}

fn print_array(items: &[Value]) {
    if let Some(Value::Object(first)) = items.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let rows = items
            .iter()
            .filter_map(Value::as_object)
            .map(|map| {
                headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(scalar_text).unwrap_or_default())
                    .collect()
            })
            .collect();
        print_rows(&headers, rows);
    }
}

fn print_rows(headers: &[String], rows: Vec<Vec<String>>) {
    let mut builder = Builder::default();
    builder.push_record(headers.iter().cloned());
    for row in rows {
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));
}

fn print_warnings(value: &Value) {
    if let Some(Value::Array(warnings)) = value.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }
}
