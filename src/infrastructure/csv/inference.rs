// ============================================================
// SCALAR INFERENCE
// ============================================================
// Narrow ASCII literal patterns: no exponent, no leading '+', no bare decimal point

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::record::RecordValue;

static INTEGER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]+$").unwrap());

static FLOAT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]+\.[0-9]+$").unwrap());

/// Infer the scalar for an already trimmed cell. `None` means the line had no cell here.
pub fn infer_scalar(cell: Option<&str>) -> RecordValue {
    let Some(value) = cell else {
        return RecordValue::Null;
    };

    if value.is_empty() {
        return RecordValue::Empty;
    }

    if INTEGER_PATTERN.is_match(value) {
        // Too many digits for i64: keep the magnitude as a float.
        return match value.parse::<i64>() {
            Ok(n) => RecordValue::Integer(n),
            Err(_) => value
                .parse::<f64>()
                .map(RecordValue::Float)
                .unwrap_or_else(|_| RecordValue::Text(value.to_string())),
        };
    }

    if FLOAT_PATTERN.is_match(value) {
        if let Ok(f) = value.parse::<f64>() {
            return RecordValue::Float(f);
        }
    }

    RecordValue::Text(value.to_string())
}
