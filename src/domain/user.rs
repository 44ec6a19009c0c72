use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Row produced by mapping one decoded record, ready to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub age: Option<i32>,
    pub address: Option<JsonValue>,
    pub additional_info: Option<JsonValue>,
}

/// Row as read back from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: i64,
    pub name: String,
    pub age: Option<i32>,
    pub address: Option<JsonValue>,
    pub additional_info: Option<JsonValue>,
}
