//! Chat request building and the high-level `chat` call.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::pin::Pin;
use futures::{Stream, StreamExt};
use chatui_types::{
    ChatError, Result,
    message::{Message, Role},
    model::is_vision_model,
};
use tokio_util::sync::CancellationToken;
use crate::ports::{ChatRequest, OllamaPort, WireMessage};
use crate::stream_parser::{StreamEnd, StreamEvent, decode_chat_stream};

/// Build the request body for `model` from a conversation.
///
/// Loading placeholders are left out. Images go with the last user message
/// and only when the model looks vision-capable; images without in-memory
/// data (restored chats) are skipped.
pub fn build_request(model: &str, history: &[Message], stream: bool) -> ChatRequest {
    let visible: Vec<&Message> = history.iter().filter(|m| !m.is_loading).collect();
    let last_user = visible.iter().rposition(|m| m.role == Role::User);
    let vision = is_vision_model(model);

    let messages = visible
        .iter()
        .enumerate()
        .map(|(idx, message)| {
            let images = if vision && Some(idx) == last_user {
                message
                    .images
                    .iter()
                    .filter(|img| !img.data.is_empty())
                    .map(|img| BASE64.encode(&img.data))
                    .collect()
            } else {
                Vec::new()
            };
            WireMessage {
                role: message.role,
                content: message.content.clone(),
                images,
            }
        })
        .collect();

    ChatRequest {
        model: model.to_string(),
        messages,
        stream,
    }
}

/// Decoded chat response
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent>>>;

/// Open a streaming chat and decode it.
pub async fn stream_events(
    port: &dyn OllamaPort,
    request: &ChatRequest,
    cancel: &CancellationToken,
) -> Result<EventStream> {
    let mut request = request.clone();
    request.stream = true;
    let body = port.open_chat_stream(&request, cancel).await?;
    Ok(Box::pin(decode_chat_stream(body, cancel.clone())))
}

/// Send a chat request and return the full reply text.
///
/// With `on_token` the response is streamed and every token is reported as
/// it arrives; without it a single buffered request is made.
pub async fn chat(
    port: &dyn OllamaPort,
    request: &ChatRequest,
    on_token: Option<&mut dyn FnMut(&str)>,
    cancel: Option<&CancellationToken>,
) -> Result<String> {
    let fallback = CancellationToken::new();
    let cancel = cancel.unwrap_or(&fallback);

    let Some(on_token) = on_token else {
        let mut request = request.clone();
        request.stream = false;
        return port.chat_once(&request, cancel).await;
    };

    let mut events = stream_events(port, request, cancel).await?;
    let mut full = String::new();

    while let Some(event) = events.next().await {
        match event {
            StreamEvent::Token(text) => {
                on_token(&text);
                full.push_str(&text);
            }
            StreamEvent::End(StreamEnd::Done(_)) => return Ok(full),
            StreamEvent::End(StreamEnd::Truncated) => {
                log::warn!("Chat stream ended without a done record");
                return Ok(full);
            }
            StreamEvent::End(StreamEnd::Cancelled) => return Err(ChatError::Cancelled),
            StreamEvent::End(StreamEnd::Failed(e)) => return Err(e),
        }
    }
    Ok(full)
}
