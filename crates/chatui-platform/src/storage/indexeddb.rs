//! IndexedDB storage backend.
//! Persistent across page reloads and not bound by the localStorage quota.
//! Uses web-sys bindings with wasm-bindgen-futures for async operations.

use async_trait::async_trait;
use js_sys::{Array, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{IdbDatabase, IdbObjectStore, IdbRequest, IdbTransactionMode};

use chatui_core::ports::StoragePort;
use chatui_types::{ChatError, Result};
use crate::js;

const DB_NAME: &str = "chatui";
const STORE_NAME: &str = "kv";
const DB_VERSION: u32 = 1;

pub struct IndexedDbStorage {
    db: IdbDatabase,
}

impl IndexedDbStorage {
    /// Open (or create) the database.
    pub async fn open() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| ChatError::Storage("No window object".to_string()))?;

        let idb_factory = window
            .indexed_db()
            .map_err(js::storage)?
            .ok_or_else(|| ChatError::Storage("IndexedDB not available".to_string()))?;

        let open_req = idb_factory
            .open_with_u32(DB_NAME, DB_VERSION)
            .map_err(js::storage)?;

        let upgrade_req = open_req.clone();
        let onupgrade = Closure::once(move |_event: web_sys::Event| {
            let db = upgrade_req
                .result()
                .ok()
                .and_then(|result| result.dyn_into::<IdbDatabase>().ok());
            match db {
                Some(db) if !db.object_store_names().contains(STORE_NAME) => {
                    if let Err(e) = db.create_object_store(STORE_NAME) {
                        log::error!("Failed to create object store: {}", js::describe(&e));
                    }
                }
                Some(_) => {}
                None => log::error!("IndexedDB upgrade without a database"),
            }
        });
        open_req.set_onupgradeneeded(Some(onupgrade.as_ref().unchecked_ref()));
        onupgrade.forget();

        let db: IdbDatabase = await_request(&open_req)
            .await?
            .dyn_into()
            .map_err(js::storage)?;

        Ok(Self { db })
    }

    fn store(&self, mode: IdbTransactionMode) -> Result<IdbObjectStore> {
        let tx = self
            .db
            .transaction_with_str_and_mode(STORE_NAME, mode)
            .map_err(js::storage)?;
        tx.object_store(STORE_NAME).map_err(js::storage)
    }
}

#[async_trait(?Send)]
impl StoragePort for IndexedDbStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let store = self.store(IdbTransactionMode::Readonly)?;
        let req = store.get(&JsValue::from_str(key)).map_err(js::storage)?;
        let result = await_request(&req).await?;

        if result.is_undefined() || result.is_null() {
            return Ok(None);
        }
        Ok(Some(Uint8Array::new(&result).to_vec()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let store = self.store(IdbTransactionMode::Readwrite)?;
        let js_value = Uint8Array::from(value);
        let req = store
            .put_with_key(&js_value, &JsValue::from_str(key))
            .map_err(js::storage)?;
        await_request(&req).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let store = self.store(IdbTransactionMode::Readwrite)?;
        let req = store.delete(&JsValue::from_str(key)).map_err(js::storage)?;
        await_request(&req).await?;
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let store = self.store(IdbTransactionMode::Readonly)?;
        let req = store.get_all_keys().map_err(js::storage)?;
        let array: Array = await_request(&req).await?.dyn_into().map_err(js::storage)?;

        let mut keys: Vec<String> = array
            .iter()
            .filter_map(|key| key.as_string())
            .filter(|key| key.starts_with(prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn backend_name(&self) -> &str {
        "indexeddb"
    }
}

/// Wait for an IdbRequest to succeed or fail.
/// Wraps the callback-based IDB API into a Promise for JsFuture.
async fn await_request(req: &IdbRequest) -> Result<JsValue> {
    let on_success_req = req.clone();
    let callbacks_req = req.clone();

    let promise = js_sys::Promise::new(&mut move |resolve, reject| {
        let success_req = on_success_req.clone();
        let onsuccess = Closure::once(move |_: web_sys::Event| {
            let _ = resolve.call1(
                &JsValue::NULL,
                &success_req.result().unwrap_or(JsValue::UNDEFINED),
            );
        });
        let onerror = Closure::once(move |_: web_sys::Event| {
            let _ = reject.call1(&JsValue::NULL, &JsValue::from_str("IDB request failed"));
        });
        callbacks_req.set_onsuccess(Some(onsuccess.as_ref().unchecked_ref()));
        callbacks_req.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onsuccess.forget();
        onerror.forget();
    });

    JsFuture::from(promise).await.map_err(js::storage)
}
