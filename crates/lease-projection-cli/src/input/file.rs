use lease_projection_core::LeaseProjectionError;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Read an input document. Malformed JSON surfaces as a serialization
/// error so it carries the same code as an in-process parse failure.
pub fn read_json_value(path: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value: Value = serde_json::from_str(&contents).map_err(|e| {
        LeaseProjectionError::SerializationError(format!("{}: {}", canonical.display(), e))
    })?;
    Ok(value)
}

fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.is_file() {
        return Err(format!("Input file not found: {}", canonical.display()).into());
    }
    Ok(canonical)
}
