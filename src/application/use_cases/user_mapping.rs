// ============================================================
// RECORD -> USER ROW MAPPING
// ============================================================
// name / age / address are lifted out; everything else lands in additional_info

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::domain::error::{AppError, Result};
use crate::domain::record::{Record, RecordValue};
use crate::domain::user::NewUser;

const NAME_KEY: &str = "name";
const AGE_KEY: &str = "age";
const ADDRESS_KEY: &str = "address";

static DECIMAL_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?([0-9]+\.?[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?$").unwrap());

static RADIX_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0([xX][0-9a-fA-F]+|[oO][0-7]+|[bB][01]+)$").unwrap());

/// Map one decoded record into the row shape stored in the users table.
pub fn map_record(record: &Record) -> Result<NewUser> {
    Ok(NewUser {
        name: extract_name(record),
        age: extract_age(record)?,
        address: extract_address(record),
        additional_info: extract_additional_info(record),
    })
}

/// `"{firstName} {lastName}"` when either part is set, else a plain-string `name`, else empty.
pub fn extract_name(record: &Record) -> String {
    let part = |key: &str| -> String {
        record
            .get_path(&[NAME_KEY, key])
            .filter(|value| value.is_truthy())
            .map(ToString::to_string)
            .unwrap_or_default()
    };

    let first = part("firstName");
    let last = part("lastName");

    if !first.is_empty() || !last.is_empty() {
        return format!("{} {}", first, last).trim().to_string();
    }

    match record.get(NAME_KEY) {
        Some(RecordValue::Text(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Numeric age, or `None` when the value is missing, non-numeric or zero.
///
/// An age of 0 is stored as null, the same as a missing age.
pub fn extract_age(record: &Record) -> Result<Option<i32>> {
    let age = coerce_number(record.get(AGE_KEY));

    if age.is_nan() || age == 0.0 {
        return Ok(None);
    }

    if !age.is_finite() || age.fract() != 0.0 {
        return Err(AppError::ValidationError(format!(
            "age {} is not a whole number",
            age
        )));
    }

    if age < f64::from(i32::MIN) || age > f64::from(i32::MAX) {
        return Err(AppError::ValidationError(format!(
            "age {} is out of range",
            age
        )));
    }

    Ok(Some(age as i32))
}

/// `address` passed through as JSON; falsy values are stored as null.
pub fn extract_address(record: &Record) -> Option<JsonValue> {
    record
        .get(ADDRESS_KEY)
        .filter(|value| value.is_truthy())
        .map(RecordValue::to_json)
}

/// Every top-level key except name/age/address, or `None` when nothing is left.
pub fn extract_additional_info(record: &Record) -> Option<JsonValue> {
    let mut rest = record.clone();
    rest.remove(NAME_KEY);
    rest.remove(AGE_KEY);
    rest.remove(ADDRESS_KEY);

    if rest.is_empty() {
        None
    } else {
        Some(rest.to_json())
    }
}

/// Numeric coercion with the usual loose rules: missing -> NaN, null/blank -> 0,
/// decimal, exponent and 0x/0o/0b literals parsed, anything else NaN.
fn coerce_number(value: Option<&RecordValue>) -> f64 {
    match value {
        None => f64::NAN,
        Some(RecordValue::Null) | Some(RecordValue::Empty) => 0.0,
        Some(RecordValue::Integer(n)) => *n as f64,
        Some(RecordValue::Float(f)) => *f,
        Some(RecordValue::Text(s)) => parse_numeric_text(s),
        Some(RecordValue::Nested(_)) => f64::NAN,
    }
}

fn parse_numeric_text(raw: &str) -> f64 {
    let text = raw.trim();
    if text.is_empty() {
        return 0.0;
    }

    match text {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    if DECIMAL_LITERAL.is_match(text) {
        return text.parse::<f64>().unwrap_or(f64::NAN);
    }

    if RADIX_LITERAL.is_match(text) {
        let radix = match text.as_bytes()[1] {
            b'x' | b'X' => 16,
            b'o' | b'O' => 8,
            _ => 2,
        };
        return i64::from_str_radix(&text[2..], radix)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }

    f64::NAN
}
