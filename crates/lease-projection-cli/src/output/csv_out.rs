use serde_json::Value;
use std::io;

use super::{object_arrays, period_rows, scalar_text};

/// Write output as CSV to stdout. Projections emit one row per period;
/// schedules and comparisons emit their first row array.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    if let Some((headers, rows)) = period_rows(value) {
        let _ = wtr.write_record(&headers);
        for row in rows {
            let _ = wtr.write_record(&row);
        }
    } else {
        let body = value.get("result").unwrap_or(value);
        match body {
            Value::Object(map) => match object_arrays(map).first() {
                Some((_, items)) => write_array_csv(&mut wtr, items),
                None => {
                    let _ = wtr.write_record(["field", "value"]);
                    for (key, val) in map {
                        let _ = wtr.write_record([key.as_str(), &scalar_text(val)]);
                    }
                }
            },
            _ => {
                let _ = wtr.write_record([&scalar_text(body)]);
            }
        }
    }

    let _ = wtr.flush();
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for map in arr.iter().filter_map(Value::as_object) {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(scalar_text).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}
