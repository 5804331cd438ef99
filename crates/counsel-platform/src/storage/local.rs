//! `window.localStorage` backend.
//! Persistent across reloads, synchronous, string values only.

use wasm_bindgen::JsValue;
use web_sys::Storage;

use counsel_core::ports::StoragePort;
use counsel_types::{ClientError, Result};

pub struct LocalStorage {
    inner: Storage,
}

impl LocalStorage {
    /// Fails outside a window context or when the browser blocks storage.
    pub fn open() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| ClientError::storage("No window object"))?;
        let inner = window
            .local_storage()
            .map_err(js_error)?
            .ok_or_else(|| ClientError::storage("localStorage not available"))?;
        Ok(Self { inner })
    }
}

impl StoragePort for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get_item(key).map_err(js_error)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        // Throws QuotaExceededError when full
        self.inner.set_item(key, value).map_err(js_error)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove_item(key).map_err(js_error)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let len = self.inner.length().map_err(js_error)?;
        let mut keys = Vec::with_capacity(len as usize);
        for i in 0..len {
            if let Some(key) = self.inner.key(i).map_err(js_error)? {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn backend_name(&self) -> &str {
        "localStorage"
    }
}

fn js_error(e: JsValue) -> ClientError {
    ClientError::storage(format!("{:?}", e))
}
