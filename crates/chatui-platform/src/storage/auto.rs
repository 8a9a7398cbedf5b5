//! Backend selection.
//!
//! Auto priority: IndexedDB → localStorage → Memory (fallback)

use std::rc::Rc;
use chatui_core::ports::StoragePort;
use chatui_types::config::StorageBackendType;
use super::{IndexedDbStorage, LocalStorage, MemoryStorage};

/// Try to open the best available storage backend.
/// Returns a trait object so callers are backend-agnostic.
pub async fn auto_detect_storage() -> Rc<dyn StoragePort> {
    match IndexedDbStorage::open().await {
        Ok(idb) => {
            log::info!("Storage backend: IndexedDB");
            return Rc::new(idb);
        }
        Err(e) => log::warn!("IndexedDB unavailable ({}), trying localStorage", e),
    }

    match LocalStorage::open() {
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

/// Open the configured backend; an unavailable backend falls back to memory.
pub async fn open_storage(kind: StorageBackendType) -> Rc<dyn StoragePort> {
    let opened: Result<Rc<dyn StoragePort>, String> = match kind {
        StorageBackendType::Auto => return auto_detect_storage().await,
        StorageBackendType::Memory => Ok(Rc::new(MemoryStorage::new())),
        StorageBackendType::LocalStorage => LocalStorage::open()
            .map(|s| Rc::new(s) as Rc<dyn StoragePort>)
            .map_err(|e| e.to_string()),
        StorageBackendType::IndexedDb => IndexedDbStorage::open()
            .await
            .map(|s| Rc::new(s) as Rc<dyn StoragePort>)
            .map_err(|e| e.to_string()),
    };

    match opened {
        Ok(storage) => {
            log::info!("Storage backend: {}", storage.backend_name());
            storage
        }
        Err(e) => {
            log::warn!("{:?} storage unavailable ({}), falling back to memory", kind, e);
            Rc::new(MemoryStorage::new())
        }
    }
}
