//! The backend's uniform JSON wrapper: `{code, message, data?}` on success,
//! `{code, message, details, timestamp, path}` on failure.

use serde::Deserialize;
use serde_json::Value;

pub const SUCCESS_CODE: i64 = 0;

/// Application codes used by the backend.
pub mod codes {
    pub const BAD_REQUEST: i64 = 10001;
    pub const UNAUTHORIZED: i64 = 10002;
    pub const FORBIDDEN: i64 = 10003;
    pub const NOT_FOUND: i64 = 10004;
    pub const CONFLICT: i64 = 10005;
    pub const INTERNAL_ERROR: i64 = 50001;
    pub const BAD_GATEWAY: i64 = 50002;
    pub const GENERIC: i64 = 99999;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    /// `None` when the field is absent; `Some(Value::Null)` when explicitly null
    #[serde(default, deserialize_with = "present")]
    pub data: Option<Value>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub path: Option<String>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Envelope {
    /// Recognise an envelope: a JSON object whose `code` is an integer.
    pub fn sniff(body: &Value) -> Option<Envelope> {
        let obj = body.as_object()?;
        obj.get("code")?.as_i64()?;
        serde_json::from_value(body.clone()).ok()
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}
