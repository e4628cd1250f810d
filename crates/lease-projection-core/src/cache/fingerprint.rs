//! Content-derived cache keys.
//!
//! An input is serialized to JSON, canonicalized (object keys sorted, null
//! members dropped, numbers and numeric strings reduced to their shortest
//! decimal form) and hashed with SHA-256. Two inputs that differ only in key
//! order or in how a decimal was written share a fingerprint.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::LeaseProjectionResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical form of a JSON value. Array order is significant and kept.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                let member = &map[key];
                if !member.is_null() {
                    sorted.insert(key.clone(), canonicalize(member));
                }
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Number(n) => normalize_decimal(&n.to_string())
            .map(Value::String)
            .unwrap_or_else(|| value.clone()),
        Value::String(s) => Value::String(normalize_decimal(s).unwrap_or_else(|| s.clone())),
        Value::Bool(_) | Value::Null => value.clone(),
    }
}

/// Canonical JSON text of any serializable input.
pub fn canonical_json<T: Serialize>(input: &T) -> LeaseProjectionResult<String> {
    let value = serde_json::to_value(input)?;
    Ok(serde_json::to_string(&canonicalize(&value))?)
}

pub fn fingerprint<T: Serialize>(input: &T) -> LeaseProjectionResult<Fingerprint> {
    let canonical = canonical_json(input)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(Fingerprint(format!("{:x}", hasher.finalize())))
}

fn normalize_decimal(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit() || b == b'.' || b == b'-') {
        return None;
    }
    Decimal::from_str(trimmed)
        .ok()
        .map(|d| d.normalize().to_string())
}
