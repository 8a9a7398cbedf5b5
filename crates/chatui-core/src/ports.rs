//! Port traits — the hexagonal architecture boundary.
//!
//! These traits are defined here in `chatui-core` (pure Rust).
//! Implementations live in `chatui-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use std::future::Future;
use std::pin::Pin;
use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;
use chatui_types::{
    Result,
    message::Role,
    model::ModelInfo,
};
use tokio_util::sync::CancellationToken;

/// Raw response body, chunk by chunk, exactly as the transport delivers it
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>>>>;

/// A one-shot timer future
pub type Sleep = Pin<Box<dyn Future<Output = ()>>>;

// ─── Ollama Port ─────────────────────────────────────────────

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub stream: bool,
}

/// One conversation turn as the server expects it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
    /// Base64-encoded images, only sent to vision models
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

#[async_trait(?Send)]
pub trait OllamaPort {
    /// `GET /api/tags`
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// `GET /api/version` with a short timeout. Never errors.
    async fn check_health(&self) -> bool;

    /// `POST /api/chat` with `stream: true`.
    ///
    /// Resolves once the response headers arrive; the body is returned
    /// undecoded. Cancelling `cancel` aborts the underlying request.
    async fn open_chat_stream(&self, req: &ChatRequest, cancel: &CancellationToken) -> Result<ByteStream>;

    /// `POST /api/chat` with `stream: false`; returns `message.content`.
    async fn chat_once(&self, req: &ChatRequest, cancel: &CancellationToken) -> Result<String>;
}

// ─── Storage Port ────────────────────────────────────────────

#[async_trait(?Send)]
pub trait StoragePort {
    /// Get a value by key
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Set a value
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a value
    async fn delete(&self, key: &str) -> Result<()>;

    /// List keys with a given prefix
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}

// ─── Timer Port ──────────────────────────────────────────────

pub trait TimerPort {
    /// A future that resolves after `ms` milliseconds
    fn sleep(&self, ms: u32) -> Sleep;
}
