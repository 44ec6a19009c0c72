// ============================================================
// DECODED RECORD TREE
// ============================================================
// One tree per CSV data line: string keys mapping to scalars or nested records

use serde_json::{Map, Number, Value as JsonValue};
use std::fmt;

/// A single value inside a decoded record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// Cell was missing from the line.
    Null,
    /// Cell was present but empty after trimming.
    Empty,
    Integer(i64),
    Float(f64),
    Text(String),
    Nested(Record),
}

impl RecordValue {
    /// Truthiness as the import rules use it: null, empty, zero and NaN are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            RecordValue::Null | RecordValue::Empty => false,
            RecordValue::Integer(n) => *n != 0,
            RecordValue::Float(f) => *f != 0.0 && !f.is_nan(),
            RecordValue::Text(s) => !s.is_empty(),
            RecordValue::Nested(_) => true,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            RecordValue::Nested(record) => Some(record),
            _ => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            RecordValue::Null => JsonValue::Null,
            RecordValue::Empty => JsonValue::String(String::new()),
            RecordValue::Integer(n) => JsonValue::Number((*n).into()),
            RecordValue::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            RecordValue::Text(s) => JsonValue::String(s.clone()),
            RecordValue::Nested(record) => record.to_json(),
        }
    }
}

impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordValue::Null => write!(f, "null"),
            RecordValue::Empty => Ok(()),
            RecordValue::Integer(n) => write!(f, "{}", n),
            RecordValue::Float(v) => write!(f, "{}", v),
            RecordValue::Text(s) => write!(f, "{}", s),
            RecordValue::Nested(record) => write!(f, "{}", record.to_json()),
        }
    }
}

/// Tree-shaped mapping built from one CSV data line. Keys keep header order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, RecordValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&RecordValue> {
        self.position(key).map(|index| &self.fields[index].1)
    }

    /// Follow `path` through nested records.
    pub fn get_path(&self, path: &[&str]) -> Option<&RecordValue> {
        let (last, parents) = path.split_last()?;
        let mut current = self;
        for segment in parents {
            current = current.get(segment)?.as_record()?;
        }
        current.get(last)
    }

    /// Set `key`, keeping its original position when it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: RecordValue) -> Option<RecordValue> {
        let key = key.into();
        match self.position(&key) {
            Some(index) => Some(std::mem::replace(&mut self.fields[index].1, value)),
            None => {
                self.fields.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<RecordValue> {
        self.position(key).map(|index| self.fields.remove(index).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|(k, _)| k == key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Assign `value` at the nested `path`, creating intermediate records as needed.
    ///
    /// An intermediate segment that already holds a scalar is never replaced; the
    /// assignment is skipped and `false` is returned. The final segment always
    /// takes the new value.
    pub fn set_path<S: AsRef<str>>(&mut self, path: &[S], value: RecordValue) -> bool {
        let Some((last, parents)) = path.split_last() else {
            return false;
        };

        let mut current = self;
        for segment in parents {
            let segment = segment.as_ref();
            let index = match current.position(segment) {
                Some(index) => index,
                None => {
                    current
                        .fields
                        .push((segment.to_string(), RecordValue::Nested(Record::new())));
                    current.fields.len() - 1
                }
            };
            match &mut current.fields[index].1 {
                RecordValue::Nested(next) => current = next,
                _ => return false,
            }
        }

        current.insert(last.as_ref(), value);
        true
    }

    pub fn to_json(&self) -> JsonValue {
        let map: Map<String, JsonValue> = self
            .fields
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect();
        JsonValue::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_path_builds_nested_records() {
        let mut record = Record::new();
        assert!(record.set_path(&["a", "b"], RecordValue::Integer(1)));
        assert!(record.set_path(&["a", "c"], RecordValue::Integer(2)));

        assert_eq!(record.to_json(), json!({ "a": { "b": 1, "c": 2 } }));
    }

    #[test]
    fn test_set_path_never_replaces_scalar_parent() {
        let mut record = Record::new();
        record.set_path(&["a"], RecordValue::Text("flat".to_string()));

        assert!(!record.set_path(&["a", "b"], RecordValue::Integer(1)));
        assert_eq!(record.get("a"), Some(&RecordValue::Text("flat".to_string())));
    }

    #[test]
    fn test_set_path_last_segment_overwrites() {
        let mut record = Record::new();
        record.set_path(&["a", "b"], RecordValue::Integer(1));
        record.set_path(&["a"], RecordValue::Integer(9));

        assert_eq!(record.get("a"), Some(&RecordValue::Integer(9)));
    }

    #[test]
    fn test_get_path() {
        let mut record = Record::new();
        record.set_path(&["name", "firstName"], RecordValue::Text("Ada".to_string()));

        assert_eq!(
            record.get_path(&["name", "firstName"]),
            Some(&RecordValue::Text("Ada".to_string()))
        );
        assert_eq!(record.get_path(&["name", "lastName"]), None);
        assert_eq!(record.get_path(&["name", "firstName", "x"]), None);
    }

    #[test]
    fn test_keys_keep_insertion_order() {
        let mut record = Record::new();
        record.set_path(&["zip"], RecordValue::Integer(1));
        record.set_path(&["city", "name"], RecordValue::Text("Oslo".to_string()));
        record.set_path(&["age"], RecordValue::Integer(3));
        record.insert("zip", RecordValue::Integer(2));

        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["zip", "city", "age"]);
        assert_eq!(
            serde_json::to_string(&record.to_json()).unwrap(),
            r#"{"zip":2,"city":{"name":"Oslo"},"age":3}"#
        );

        record.remove("city");
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["zip", "age"]);
    }

    #[test]
    fn test_truthiness() {
        assert!(!RecordValue::Null.is_truthy());
        assert!(!RecordValue::Empty.is_truthy());
        assert!(!RecordValue::Integer(0).is_truthy());
        assert!(!RecordValue::Float(0.0).is_truthy());
        assert!(RecordValue::Integer(-1).is_truthy());
        assert!(RecordValue::Text("0".to_string()).is_truthy());
        assert!(RecordValue::Nested(Record::new()).is_truthy());
    }

    #[test]
    fn test_json_keeps_empty_and_null_apart() {
        let mut record = Record::new();
        record.insert("empty", RecordValue::Empty);
        record.insert("missing", RecordValue::Null);
        record.insert("ratio", RecordValue::Float(3.14));

        assert_eq!(
            record.to_json(),
            json!({ "empty": "", "missing": null, "ratio": 3.14 })
        );
    }
}
