//! Pacing of streamed tokens into the visible message.
//!
//! Tokens are collected and written to the message either once `chunk_size`
//! of them are pending or when the display timer fires. The owner drives the
//! timer: whenever [`StreamingBuffer::timer_armed`] is true it should call
//! [`StreamingBuffer::fire_timer`] after [`StreamingBuffer::display_interval_ms`].

use chatui_types::config::ChatConfig;
use chatui_types::message::{MessageMetadata, MessageUpdate};
use chatui_types::session::ChatSession;

/// Destination of buffered writes
pub trait MessageSink {
    fn write(&mut self, message_id: &str, update: MessageUpdate);
}

impl MessageSink for ChatSession {
    fn write(&mut self, message_id: &str, update: MessageUpdate) {
        if !self.update_message(message_id, update) {
            log::warn!("Streaming write for unknown message {}", message_id);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamingSettings {
    pub chunk_size: usize,
    pub display_interval_ms: u32,
}

impl StreamingSettings {
    pub const MIN_CHUNK_SIZE: usize = 1;
    pub const MIN_INTERVAL_MS: u32 = 50;

    /// Clamped to the minimums
    pub fn new(chunk_size: usize, display_interval_ms: u32) -> Self {
        Self {
            chunk_size: chunk_size.max(Self::MIN_CHUNK_SIZE),
            display_interval_ms: display_interval_ms.max(Self::MIN_INTERVAL_MS),
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(config.streaming_chunk_size, config.streaming_interval_ms)
    }
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}

#[derive(Debug)]
pub struct StreamingBuffer {
    chunks: Vec<String>,
    full_content: String,
    /// Settings of the current stream
    active: StreamingSettings,
    /// Settings for the next stream
    next: StreamingSettings,
    message_id: Option<String>,
    timer_armed: bool,
}

impl StreamingBuffer {
    pub fn new(settings: StreamingSettings) -> Self {
        Self {
            chunks: Vec::new(),
            full_content: String::new(),
            active: settings,
            next: settings,
            message_id: None,
            timer_armed: false,
        }
    }

    /// Change pacing. Takes effect at the next `start`.
    pub fn configure(&mut self, chunk_size: Option<usize>, display_interval_ms: Option<u32>) {
        self.next = StreamingSettings::new(
            chunk_size.unwrap_or(self.next.chunk_size),
            display_interval_ms.unwrap_or(self.next.display_interval_ms),
        );
    }

    pub fn settings(&self) -> StreamingSettings {
        self.next
    }

    pub fn display_interval_ms(&self) -> u32 {
        self.active.display_interval_ms
    }

    pub fn is_streaming(&self) -> bool {
        self.message_id.is_some()
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn full_content(&self) -> &str {
        &self.full_content
    }

    pub fn pending_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn timer_armed(&self) -> bool {
        self.timer_armed
    }

    /// Bind to a message and reset all accumulated state.
    pub fn start(&mut self, message_id: impl Into<String>) {
        self.reset();
        self.active = self.next;
        self.message_id = Some(message_id.into());
    }

    /// Buffer a token. Returns true if it caused a flush.
    pub fn add_chunk(&mut self, text: &str, sink: &mut dyn MessageSink) -> bool {
        if !self.is_streaming() {
            log::warn!("Chunk added while not streaming, ignored");
            return false;
        }

        self.chunks.push(text.to_string());
        self.full_content.push_str(text);

        if self.chunks.len() >= self.active.chunk_size {
            self.flush(sink);
            true
        } else {
            self.timer_armed = true;
            false
        }
    }

    /// Write the accumulated text (still loading) and clear pending chunks.
    pub fn flush(&mut self, sink: &mut dyn MessageSink) {
        self.timer_armed = false;
        let Some(id) = self.message_id.as_deref() else {
            return;
        };
        if !self.full_content.is_empty() {
            sink.write(id, MessageUpdate::streaming(self.full_content.clone()));
        }
        self.chunks.clear();
    }

    /// Timer callback. Flushes only if the timer was armed.
    pub fn fire_timer(&mut self, sink: &mut dyn MessageSink) -> bool {
        if !self.timer_armed {
            return false;
        }
        self.flush(sink);
        true
    }

    /// Final write: `final_text` if given, else the accumulator. Returns the
    /// id of the finalized message, or None when not streaming.
    pub fn end(
        &mut self,
        final_text: Option<String>,
        metadata: Option<MessageMetadata>,
        sink: &mut dyn MessageSink,
    ) -> Option<String> {
        if !self.is_streaming() {
            log::warn!("end() called while not streaming");
            return None;
        }

        if !self.chunks.is_empty() {
            self.flush(sink);
        }

        let content = final_text.unwrap_or_else(|| self.full_content.clone());
        let id = self.message_id.take();
        if let Some(id) = id.as_deref() {
            sink.write(id, MessageUpdate::finished(content, metadata));
        }
        self.reset();
        id
    }

    /// Abandon the stream without writing anything.
    pub fn cancel(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.chunks.clear();
        self.full_content.clear();
        self.message_id = None;
        self.timer_armed = false;
    }
}

impl Default for StreamingBuffer {
    fn default() -> Self {
        Self::new(StreamingSettings::default())
    }
}
