//! `window.localStorage` backend.
//!
//! Synchronous and small (usually ~5 MiB per origin) but available
//! everywhere IndexedDB is blocked. Values must be UTF-8; everything the
//! chat store writes is JSON or plain text.

use async_trait::async_trait;
use chatui_core::ports::StoragePort;
use chatui_types::{ChatError, Result};
use crate::js;

pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    pub fn open() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| ChatError::Storage("No window object".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(js::storage)?
            .ok_or_else(|| ChatError::Storage("localStorage not available".to_string()))?;
        Ok(Self { storage })
    }
}

#[async_trait(?Send)]
impl StoragePort for LocalStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self.storage.get_item(key).map_err(js::storage)?;
        Ok(value.map(String::into_bytes))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let text = std::str::from_utf8(value)
            .map_err(|e| ChatError::Serialization(format!("localStorage values must be UTF-8: {}", e)))?;
        self.storage.set_item(key, text).map_err(|e| {
            if js::error_name(&e).as_deref() == Some("QuotaExceededError") {
                ChatError::QuotaExceeded { needed: value.len(), available: 0 }
            } else {
                js::storage(e)
            }
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.storage.remove_item(key).map_err(js::storage)
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let len = self.storage.length().map_err(js::storage)?;
        let mut keys = Vec::new();
        for i in 0..len {
            if let Some(key) = self.storage.key(i).map_err(js::storage)? {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn backend_name(&self) -> &str {
        "localstorage"
    }
}
