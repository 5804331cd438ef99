//! List decoding for paginated endpoints.
//!
//! The backend wraps lists in several ways: MyBatis pages put items under
//! `records`, Spring pages under `content`, some endpoints nest them under
//! `data`, and a few return a bare array. [`decode_list`] tries those in
//! that order and reports which one matched. Anything else is taken as the
//! list itself: a lone object becomes a one-item page if it decodes as an item.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use counsel_types::{ClientError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ListShape {
    Records,
    Content,
    Data,
    Bare,
    /// `null` payload
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub shape: ListShape,
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_next: Option<bool>,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

const WRAPPERS: [(&str, ListShape); 3] = [
    ("records", ListShape::Records),
    ("content", ListShape::Content),
    ("data", ListShape::Data),
];

pub fn decode_list<T: DeserializeOwned>(payload: Value) -> Result<Page<T>> {
    match payload {
        Value::Null => Ok(Page {
            shape: ListShape::Empty,
            items: Vec::new(),
            total: Some(0),
            has_next: Some(false),
        }),
        Value::Array(items) => Ok(Page {
            shape: ListShape::Bare,
            total: Some(items.len() as u64),
            items: decode_items(items)?,
            has_next: None,
        }),
        Value::Object(mut obj) => {
            for (field, shape) in WRAPPERS {
                if !matches!(obj.get(field), Some(Value::Array(_))) {
                    continue;
                }
                let Some(Value::Array(items)) = obj.remove(field) else {
                    continue;
                };
                let meta = Value::Object(obj);
                return Ok(Page {
                    shape,
                    items: decode_items(items)?,
                    total: total_of(&meta),
                    has_next: has_next_of(&meta),
                });
            }
            let item = serde_json::from_value(Value::Object(obj)).map_err(|e| {
                ClientError::Serialization {
                    message: format!("response is not a recognised list shape: {}", e),
                }
            })?;
            Ok(Page {
                shape: ListShape::Bare,
                items: vec![item],
                total: Some(1),
                has_next: None,
            })
        }
        other => Err(ClientError::Serialization {
            message: format!("expected a list, got {}", other),
        }),
    }
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>> {
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(ClientError::from))
        .collect()
}

fn total_of(meta: &Value) -> Option<u64> {
    meta.get("total")
        .or_else(|| meta.get("totalElements"))
        .and_then(Value::as_u64)
}

fn has_next_of(meta: &Value) -> Option<bool> {
    if let Some(next) = meta.get("hasNext").and_then(Value::as_bool) {
        return Some(next);
    }
    if let Some(last) = meta.get("last").and_then(Value::as_bool) {
        return Some(!last);
    }
    let current = meta.get("current").and_then(Value::as_u64)?;
    let pages = meta.get("pages").and_then(Value::as_u64)?;
    Some(current < pages)
}
