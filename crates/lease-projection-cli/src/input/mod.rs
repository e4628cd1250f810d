pub mod file;
pub mod stdin;

use serde_json::Value;

/// JSON from `--input <file>` or, failing that, piped stdin.
pub fn read_value(path: Option<&str>, command: &str) -> Result<Value, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        file::read_json_value(path)
    } else if let Some(data) = stdin::read_stdin()? {
        Ok(data)
    } else {
        Err(format!("--input <file.json> or stdin required for {command}").into())
    }
}
