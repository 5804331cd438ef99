//! Value encodings on top of [`StoragePort`].
//!
//! Timed entries are stored as `{"value": .., "timestamp": ms, "expireTime": ms|null}`.
//! Reading an expired or unparsable entry removes it and yields `None`.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use counsel_types::Result;

use crate::ports::StoragePort;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entry<T> {
    value: T,
    timestamp: i64,
    #[serde(default)]
    expire_time: Option<i64>,
}

/// A value read back from a timed entry
#[derive(Debug, Clone, PartialEq)]
pub struct Timed<T> {
    pub value: T,
    pub expires_at: Option<DateTime<Utc>>,
}

pub fn write_timed<T: Serialize>(
    storage: &dyn StoragePort,
    key: &str,
    value: &T,
    expires_at: Option<DateTime<Utc>>,
) -> Result<()> {
    let entry = Entry {
        value,
        timestamp: Utc::now().timestamp_millis(),
        expire_time: expires_at.map(|at| at.timestamp_millis()),
    };
    storage.set(key, &serde_json::to_string(&entry)?)
}

pub fn read_timed<T: DeserializeOwned>(
    storage: &dyn StoragePort,
    key: &str,
    now: DateTime<Utc>,
) -> Option<Timed<T>> {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("Failed to read {}: {}", key, e);
            return None;
        }
    };

    let entry: Entry<T> = match serde_json::from_str(&raw) {
        Ok(entry) => entry,
        Err(e) => {
            log::warn!("Discarding malformed entry {}: {}", key, e);
            discard(storage, key);
            return None;
        }
    };

    let expires_at = entry
        .expire_time
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
    if matches!(expires_at, Some(at) if now > at) {
        log::info!("Entry {} expired", key);
        discard(storage, key);
        return None;
    }

    Some(Timed {
        value: entry.value,
        expires_at,
    })
}

pub fn write_json<T: Serialize + ?Sized>(storage: &dyn StoragePort, key: &str, value: &T) -> Result<()> {
    storage.set(key, &serde_json::to_string(value)?)
}

/// Plain JSON value; `None` when absent or unparsable.
pub fn read_json<T: DeserializeOwned>(storage: &dyn StoragePort, key: &str) -> Option<T> {
    let raw = storage.get(key).ok()??;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Ignoring malformed {}: {}", key, e);
            None
        }
    }
}

/// Best-effort removal; failures are logged, not returned.
pub fn discard(storage: &dyn StoragePort, key: &str) {
    if let Err(e) = storage.remove(key) {
        log::warn!("Failed to remove {}: {}", key, e);
    }
}
