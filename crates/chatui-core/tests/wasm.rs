//! WASM-target tests for chatui-core.
//!
//! Runs the stream parser, streaming buffer and chat store under
//! wasm32-unknown-unknown via `wasm-pack test --node`.

use wasm_bindgen_test::*;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;

use chatui_core::CancellationToken;
use chatui_core::chat_store::ChatStore;
use chatui_core::event_bus::EventBus;
use chatui_core::ports::*;
use chatui_core::stream_parser::*;
use chatui_core::streaming_buffer::*;
use chatui_types::event::ChatEvent;
use chatui_types::message::*;
use chatui_types::session::*;
use chatui_types::{ChatError, Result};

#[derive(Default)]
struct MemStorage {
    data: RefCell<HashMap<String, Vec<u8>>>,
}

#[async_trait(?Send)]
impl StoragePort for MemStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.borrow().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.data.borrow_mut().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.data.borrow_mut().remove(key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self.data.borrow().keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }

    fn backend_name(&self) -> &str {
        "wasm-test"
    }
}

fn token_line(content: &str) -> Vec<u8> {
    format!(
        "{{\"message\":{{\"role\":\"assistant\",\"content\":{}}},\"done\":false}}\n",
        serde_json::to_string(content).unwrap()
    )
    .into_bytes()
}

// ─── EventBus Tests ──────────────────────────────────────

#[wasm_bindgen_test]
fn event_bus_drain() {
    let bus = EventBus::new();
    bus.emit(ChatEvent::SessionChanged);
    assert_eq!(bus.drain(), vec![ChatEvent::SessionChanged]);
    assert!(!bus.has_pending());
}

// ─── Stream Parser Tests ─────────────────────────────────

#[wasm_bindgen_test]
fn decoder_handles_split_utf8() {
    let line = token_line("héllo wörld");
    let mut decoder = NdjsonDecoder::new();
    let mut tokens = Vec::new();
    for byte in &line {
        tokens.extend(decoder.push(std::slice::from_ref(byte)));
    }
    assert_eq!(tokens, vec![Record::Token("héllo wörld".to_string())]);
}

#[wasm_bindgen_test]
async fn decode_stream_ends_once() {
    let mut chunks = vec![token_line("a"), token_line("b")];
    chunks.push(b"{\"done\":true,\"eval_count\":2}\n".to_vec());
    let source: ByteStream = Box::pin(stream::iter(chunks.into_iter().map(Ok::<Vec<u8>, ChatError>)));

    let events: Vec<StreamEvent> = decode_chat_stream(source, CancellationToken::new()).collect().await;
    assert_eq!(events.len(), 3);
    assert!(matches!(
        events[2],
        StreamEvent::End(StreamEnd::Done(DoneStats { eval_count: Some(2), .. }))
    ));
}

// ─── StreamingBuffer Tests ───────────────────────────────

#[wasm_bindgen_test]
fn buffer_end_sets_final_text() {
    let mut session = ChatSession::new("llama3");
    session.messages.push(Message::placeholder("m1"));
    let mut buffer = StreamingBuffer::new(StreamingSettings::new(2, 80));
    buffer.start("m1");
    buffer.add_chunk("draft", &mut session);
    buffer.end(Some("final".to_string()), None, &mut session);
    assert_eq!(session.messages[0].content, "final");
    assert!(!session.messages[0].is_loading);
}

// ─── ChatStore Tests ─────────────────────────────────────

#[wasm_bindgen_test]
async fn store_save_list_delete() {
    let store = ChatStore::new(Rc::new(MemStorage::default()), 1024 * 1024);
    let mut session = ChatSession::new("llama3");
    session.messages.push(Message::user("1", "hello from wasm"));

    let id = store.save(&session).await.unwrap();
    let list = store.list().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].last_message, "hello from wasm");

    store.delete(&id).await.unwrap();
    assert!(store.list().await.unwrap().is_empty());
    assert_eq!(store.current_chat_id().await.unwrap(), None);
}

#[wasm_bindgen_test]
async fn store_export_import_roundtrip() {
    let store = ChatStore::new(Rc::new(MemStorage::default()), 1024 * 1024);
    let mut session = ChatSession::new("llama3");
    session.messages.push(Message::user("1", "backup me"));
    store.save(&session).await.unwrap();

    let document = store.export_all().await.unwrap();
    assert_eq!(store.import_all(&document).await.unwrap(), 1);
    assert_eq!(store.list().await.unwrap().len(), 2);
}
