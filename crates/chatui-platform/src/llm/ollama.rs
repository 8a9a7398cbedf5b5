//! Ollama HTTP adapter.
//!
//! Uses browser `fetch()` via gloo-net. Every request carries an
//! `AbortSignal`; cancelling the request's token or hitting the timeout
//! aborts the fetch, including a body that is still being read. A
//! request's abort watcher ends with the request through a [`DropGuard`].

use async_trait::async_trait;
use futures::future::{self, Either};
use futures::stream;
use gloo_net::http::{Request, Response};
use gloo_timers::future::TimeoutFuture;
use js_sys::{Reflect, Uint8Array};
use serde::Deserialize;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use tokio_util::sync::{CancellationToken, DropGuard};
use web_sys::{AbortController, ReadableStreamDefaultReader};

use chatui_core::ports::*;
use chatui_types::{
    ChatError, Result,
    config::OllamaConfig,
    model::ModelInfo,
};
use crate::js;

pub struct OllamaClient {
    base_url: String,
    timeout_ms: u32,
    health_timeout_ms: u32,
}

impl OllamaClient {
    pub fn new(config: &OllamaConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_ms,
            health_timeout_ms: config.health_check_timeout_ms,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn controller() -> Result<AbortController> {
        AbortController::new().map_err(js::interop)
    }

    /// Abort `controller` once `cancel` fires. Dropping the returned guard
    /// retires the watcher without aborting.
    fn abort_on_cancel(controller: &AbortController, cancel: &CancellationToken) -> DropGuard {
        let request = cancel.child_token();
        let watcher = request.clone();
        let parent = cancel.clone();
        let controller = controller.clone();
        wasm_bindgen_futures::spawn_local(async move {
            watcher.cancelled().await;
            if parent.is_cancelled() {
                controller.abort();
            }
        });
        request.drop_guard()
    }

    /// Send and wait for the response headers, aborting after `timeout_ms`.
    async fn send(&self, request: Request, controller: &AbortController, timeout_ms: u32) -> Result<Response> {
        let send = Box::pin(request.send());
        let timeout = TimeoutFuture::new(timeout_ms);
        match future::select(send, timeout).await {
            Either::Left((result, _)) => result.map_err(fetch_error),
            Either::Right(_) => {
                controller.abort();
                Err(ChatError::Timeout(u64::from(timeout_ms)))
            }
        }
    }

    fn post_chat(&self, req: &ChatRequest, controller: &AbortController) -> Result<Request> {
        Request::post(&self.url("/api/chat"))
            .abort_signal(Some(&controller.signal()))
            .json(req)
            .map_err(|e| ChatError::Serialization(e.to_string()))
    }
}

#[async_trait(?Send)]
impl OllamaPort for OllamaClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let controller = Self::controller()?;
        let request = Request::get(&self.url("/api/tags"))
            .abort_signal(Some(&controller.signal()))
            .build()
            .map_err(fetch_error)?;

        let response = self.send(request, &controller, self.timeout_ms).await?;
        let response = ensure_ok(response).await?;
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Serialization(e.to_string()))?;

        log::debug!("Listed {} models", tags.models.len());
        Ok(tags.models)
    }

    async fn check_health(&self) -> bool {
        let Ok(controller) = Self::controller() else {
            return false;
        };
        let request = Request::get(&self.url("/api/version"))
            .abort_signal(Some(&controller.signal()))
            .build();
        let Ok(request) = request else {
            return false;
        };

        match self.send(request, &controller, self.health_timeout_ms).await {
            Ok(response) => response.ok(),
            Err(e) => {
                log::debug!("Health check failed: {}", e);
                false
            }
        }
    }

    async fn open_chat_stream(&self, req: &ChatRequest, cancel: &CancellationToken) -> Result<ByteStream> {
        let controller = Self::controller()?;
        let abort = Self::abort_on_cancel(&controller, cancel);
        let request = self.post_chat(req, &controller)?;

        let response = self.send(request, &controller, self.timeout_ms).await?;
        let response = ensure_ok(response).await?;
        let body = response
            .body()
            .ok_or_else(|| ChatError::Network("Response has no body".to_string()))?;
        let reader: ReadableStreamDefaultReader = body.get_reader().dyn_into().map_err(|o| js::interop(o.into()))?;

        Ok(body_stream(BodyReader { reader, _abort: abort }))
    }

    async fn chat_once(&self, req: &ChatRequest, cancel: &CancellationToken) -> Result<String> {
        let controller = Self::controller()?;
        let _abort = Self::abort_on_cancel(&controller, cancel);
        let request = self.post_chat(req, &controller)?;

        let response = self.send(request, &controller, self.timeout_ms).await?;
        let response = ensure_ok(response).await?;
        let reply: ChatResponse = response.json().await.map_err(fetch_error)?;
        Ok(reply.message.map(|m| m.content).unwrap_or_default())
    }
}

// ─── API response types ──────────────────────────────────────

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

// ─── Helpers ─────────────────────────────────────────────────

fn fetch_error(e: gloo_net::Error) -> ChatError {
    match e {
        gloo_net::Error::JsError(js) if js.name == "AbortError" => ChatError::Cancelled,
        gloo_net::Error::SerdeError(e) => ChatError::Serialization(e.to_string()),
        other => ChatError::Network(other.to_string()),
    }
}

/// Map a non-2xx response to `ChatError::Server`, using Ollama's
/// `{"error": "..."}` body when present.
async fn ensure_ok(response: Response) -> Result<Response> {
    if response.ok() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    Err(ChatError::Server { status, message })
}

/// Body reader that keeps its request abortable while it is alive
struct BodyReader {
    reader: ReadableStreamDefaultReader,
    _abort: DropGuard,
}

/// Adapt a `ReadableStreamDefaultReader` into a byte stream.
fn body_stream(body: BodyReader) -> ByteStream {
    Box::pin(stream::unfold(Some(body), |body| async move {
        let body = body?;
        match read_chunk(&body.reader).await {
            Ok(Some(bytes)) => Some((Ok(bytes), Some(body))),
            Ok(None) => {
                body.reader.release_lock();
                None
            }
            Err(e) => Some((Err(e), None)),
        }
    }))
}

async fn read_chunk(reader: &ReadableStreamDefaultReader) -> Result<Option<Vec<u8>>> {
    let result = JsFuture::from(reader.read()).await.map_err(|e| {
        if js::error_name(&e).as_deref() == Some("AbortError") {
            ChatError::Cancelled
        } else {
            ChatError::Network(js::describe(&e))
        }
    })?;

    let done = Reflect::get(&result, &JsValue::from_str("done"))
        .map_err(js::interop)?
        .as_bool()
        .unwrap_or(true);
    if done {
        return Ok(None);
    }

    let value = Reflect::get(&result, &JsValue::from_str("value")).map_err(js::interop)?;
    Ok(Some(Uint8Array::new(&value).to_vec()))
}
