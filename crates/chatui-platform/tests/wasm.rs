//! WASM-target tests for chatui-platform (Node.js runtime).
//!
//! Tests MemoryStorage, BrowserTimer and the chat store on top of them
//! under wasm32-unknown-unknown via `wasm-pack test --node`.
//!
//! IndexedDB, localStorage and fetch need a browser and a running server,
//! so they are not covered here.

use wasm_bindgen_test::*;

use std::rc::Rc;
use chatui_core::chat_store::{ChatStore, HISTORY_KEY};
use chatui_core::config_store::ConfigStore;
use chatui_core::ports::{StoragePort, TimerPort};
use chatui_platform::llm::OllamaClient;
use chatui_platform::storage::{MemoryStorage, open_storage};
use chatui_platform::timer::BrowserTimer;
use chatui_types::config::{OllamaConfig, StorageBackendType};
use chatui_types::message::Message;
use chatui_types::session::ChatSession;

// ─── MemoryStorage Tests ─────────────────────────────────

#[wasm_bindgen_test]
fn memory_storage_backend_name() {
    let storage = MemoryStorage::new();
    assert_eq!(storage.backend_name(), "memory");
    assert!(storage.is_empty());
}

#[wasm_bindgen_test]
async fn memory_storage_get_missing() {
    let storage = MemoryStorage::new();
    assert!(storage.get("nonexistent").await.unwrap().is_none());
}

#[wasm_bindgen_test]
async fn memory_storage_set_overwrite_delete() {
    let storage = MemoryStorage::new();
    storage.set("key", b"v1").await.unwrap();
    storage.set("key", b"v2").await.unwrap();
    assert_eq!(storage.get("key").await.unwrap(), Some(b"v2".to_vec()));
    assert!(storage.exists("key").await.unwrap());

    storage.delete("key").await.unwrap();
    assert!(storage.get("key").await.unwrap().is_none());
    storage.delete("key").await.unwrap();
}

#[wasm_bindgen_test]
async fn memory_storage_list_keys_by_prefix() {
    let storage = MemoryStorage::new();
    storage.set("chatui-b", b"2").await.unwrap();
    storage.set("chatui-a", b"1").await.unwrap();
    storage.set("other", b"3").await.unwrap();

    assert_eq!(storage.list_keys("chatui-").await.unwrap(), vec!["chatui-a", "chatui-b"]);
    assert_eq!(storage.list_keys("").await.unwrap().len(), 3);
    assert!(storage.list_keys("zzz").await.unwrap().is_empty());
}

#[wasm_bindgen_test]
async fn open_memory_backend() {
    let storage = open_storage(StorageBackendType::Memory).await;
    assert_eq!(storage.backend_name(), "memory");
}

// ─── Timer Tests ─────────────────────────────────────────

#[wasm_bindgen_test]
async fn browser_timer_sleeps() {
    BrowserTimer.sleep(10).await;
}

// ─── OllamaClient Tests ──────────────────────────────────

#[wasm_bindgen_test]
fn ollama_client_trims_base_url() {
    let config = OllamaConfig {
        base_url: "http://localhost:11434/".to_string(),
        ..Default::default()
    };
    assert_eq!(OllamaClient::new(&config).base_url(), "http://localhost:11434");
}

// ─── Store Integration Tests ─────────────────────────────

#[wasm_bindgen_test]
async fn chat_store_over_memory_storage() {
    let storage = Rc::new(MemoryStorage::new());
    let store = ChatStore::new(storage.clone(), 1024 * 1024);

    let mut session = ChatSession::new("llama3");
    session.messages.push(Message::user("1", "persist me"));
    let id = store.save(&session).await.unwrap();

    assert!(storage.get(HISTORY_KEY).await.unwrap().is_some());
    let loaded = store.load_session(&id).await.unwrap().unwrap();
    assert_eq!(loaded.id.as_deref(), Some(id.as_str()));
    assert_eq!(loaded.messages[0].content, "persist me");
}

#[wasm_bindgen_test]
async fn config_store_over_memory_storage() {
    let configs = ConfigStore::new(Rc::new(MemoryStorage::new()));
    let current = configs.load().await;
    let patch = serde_json::json!({ "features": { "debugMode": true } });
    let updated = configs.update(&current, &patch).await.unwrap();
    assert!(updated.features.debug_mode);
    assert_eq!(configs.load().await, updated);
}

// ─── Download Tests ──────────────────────────────────────

#[wasm_bindgen_test]
fn export_filename_uses_iso_date() {
    let date = chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    assert_eq!(
        chatui_platform::download::export_filename(date),
        "chat-export-2024-05-01.json"
    );
}
