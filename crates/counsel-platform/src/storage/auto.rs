//! Pick the best available storage backend.
//!
//! Priority: localStorage → Memory (fallback)

use std::rc::Rc;

use counsel_core::ports::StoragePort;

use super::{LocalStorage, MemoryStorage};

const PROBE_KEY: &str = "__counsel_probe__";

/// Returns a trait object so callers are backend-agnostic. A backend that
/// opens but refuses writes (Safari private mode) counts as unavailable.
pub fn auto_detect_storage() -> Rc<dyn StoragePort> {
    match LocalStorage::open().and_then(|local| probe(&local).map(|_| local)) {
        Ok(local) => {
            log::info!("Storage backend: localStorage");
            Rc::new(local)
        }
        Err(e) => {
            log::warn!("localStorage unavailable ({}), falling back to memory", e);
            Rc::new(MemoryStorage::new())
        }
    }
}

fn probe(storage: &dyn StoragePort) -> counsel_types::Result<()> {
    storage.set(PROBE_KEY, "1")?;
    storage.remove(PROBE_KEY)
}
