//! WASM-target tests for chatui-types.
//!
//! Mirrors the native unit tests but runs under wasm32-unknown-unknown
//! via `wasm-pack test --node`.

use wasm_bindgen_test::*;

use chatui_types::message::*;
use chatui_types::session::*;
use chatui_types::model::*;
use chatui_types::config::*;
use chatui_types::error::*;

// ─── Message Tests ───────────────────────────────────────

#[wasm_bindgen_test]
fn message_placeholder() {
    let msg = Message::placeholder("a1");
    assert_eq!(msg.role, Role::Assistant);
    assert!(msg.is_loading);
}

#[wasm_bindgen_test]
fn message_timestamp_roundtrip() {
    // chrono's wasmbind clock must produce a serializable timestamp
    let msg = Message::user("1", "hello");
    let json = serde_json::to_string(&msg).unwrap();
    let back: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(back.timestamp, msg.timestamp);
}

// ─── Session Tests ───────────────────────────────────────

#[wasm_bindgen_test]
fn derive_title_truncates_at_word_boundary() {
    let messages = vec![Message::user(
        "1",
        "Explain closures in JavaScript with a simple example please",
    )];
    assert_eq!(derive_title(&messages), "Explain closures in JavaScript with a simple...");
}

#[wasm_bindgen_test]
fn derive_title_short() {
    assert_eq!(derive_title(&[Message::user("1", "hi")]), "hi");
}

#[wasm_bindgen_test]
fn stored_chat_serialization() {
    let mut session = ChatSession::new("llava");
    session.messages.push(Message::user("1", "describe"));
    let stored = StoredChat::from_session(&session, "chat_1".to_string());
    let json = serde_json::to_string(&stored).unwrap();
    assert!(json.contains("messageCount"));
    let back: StoredChat = serde_json::from_str(&json).unwrap();
    assert_eq!(back.message_count, 1);
}

// ─── Model / Config Tests ────────────────────────────────

#[wasm_bindgen_test]
fn vision_heuristic() {
    assert!(is_vision_model("llava:7b"));
    assert!(!is_vision_model("mistral"));
}

#[wasm_bindgen_test]
fn default_config_is_valid() {
    assert!(validate_config(&AppConfig::default()).is_empty());
}

#[wasm_bindgen_test]
fn merge_config_patch() {
    let patch = serde_json::json!({ "chat": { "streamingIntervalMs": 120 } });
    let merged = merge_config(&AppConfig::default(), &patch).unwrap();
    assert_eq!(merged.chat.streaming_interval_ms, 120);
}

#[wasm_bindgen_test]
fn error_display() {
    assert_eq!(ChatError::Cancelled.to_string(), "Cancelled");
}
