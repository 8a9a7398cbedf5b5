//! NDJSON decoding of `/api/chat` streaming responses.
//!
//! The server sends one JSON record per line. Network chunks do not respect
//! line boundaries (or UTF-8 boundaries), so bytes are buffered and split on
//! `\n` before any text decoding happens.

use std::collections::VecDeque;
use std::pin::pin;
use futures::future::{self, Either};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use chatui_types::ChatError;
use tokio_util::sync::CancellationToken;
use crate::ports::ByteStream;

/// Counters reported on the final `done: true` record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoneStats {
    pub total_duration_ns: Option<u64>,
    pub eval_count: Option<u32>,
    pub prompt_eval_count: Option<u32>,
}

/// How a decoded stream ended. Exactly one per stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEnd {
    /// The server sent `done: true`
    Done(DoneStats),
    /// The body ended without a `done: true` record
    Truncated,
    Cancelled,
    Failed(ChatError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Token(String),
    End(StreamEnd),
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    total_duration: Option<u64>,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

/// A decoded line
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Token(String),
    Done(DoneStats),
    /// The server reported an error in-band
    ServerError(String),
}

/// Incremental line splitter and record decoder.
///
/// After a terminal record (`done: true` or an in-band error) all further
/// input is ignored.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
    finished: bool,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a network chunk and decode every complete line in the buffer.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Record> {
        let mut records = Vec::new();
        if self.finished {
            return records;
        }
        self.buffer.extend_from_slice(chunk);

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.decode_line(&line[..pos], &mut records);
            if self.finished {
                self.buffer.clear();
                break;
            }
        }
        records
    }

    /// Decode whatever is left once the source has ended.
    pub fn finish(&mut self) -> Vec<Record> {
        let mut records = Vec::new();
        if !self.finished {
            let tail = std::mem::take(&mut self.buffer);
            self.decode_line(&tail, &mut records);
        }
        self.finished = true;
        records
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bytes held back waiting for a newline
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    fn decode_line(&mut self, line: &[u8], out: &mut Vec<Record>) {
        let text = match std::str::from_utf8(line) {
            Ok(text) => text.trim(),
            Err(e) => {
                log::debug!("Skipping non-UTF-8 stream line: {}", e);
                return;
            }
        };
        if text.is_empty() {
            return;
        }

        let chunk: ChatChunk = match serde_json::from_str(text) {
            Ok(chunk) => chunk,
            Err(e) => {
                log::debug!("Skipping malformed stream line: {}", e);
                return;
            }
        };

        if let Some(error) = chunk.error {
            out.push(Record::ServerError(error));
            self.finished = true;
            return;
        }

        if let Some(message) = chunk.message {
            if !message.content.is_empty() {
                out.push(Record::Token(message.content));
            }
        }

        if chunk.done {
            out.push(Record::Done(DoneStats {
                total_duration_ns: chunk.total_duration,
                eval_count: chunk.eval_count,
                prompt_eval_count: chunk.prompt_eval_count,
            }));
            self.finished = true;
        }
    }
}

struct DecodeState {
    source: ByteStream,
    decoder: NdjsonDecoder,
    cancel: CancellationToken,
    pending: VecDeque<StreamEvent>,
    ended: bool,
}

impl DecodeState {
    async fn read_next(&mut self) {
        if self.cancel.is_cancelled() {
            self.end(StreamEnd::Cancelled);
            return;
        }

        let next = {
            let read = self.source.next();
            let cancelled = pin!(self.cancel.cancelled());
            match future::select(read, cancelled).await {
                Either::Left((item, _)) => Some(item),
                Either::Right(_) => None,
            }
        };
        let Some(next) = next else {
            self.end(StreamEnd::Cancelled);
            return;
        };

        match next {
            Some(Ok(bytes)) => {
                let records = self.decoder.push(&bytes);
                self.absorb(records);
            }
            Some(Err(ChatError::Cancelled)) => self.end(StreamEnd::Cancelled),
            Some(Err(e)) => self.end(StreamEnd::Failed(e)),
            None => {
                let records = self.decoder.finish();
                self.absorb(records);
                self.end(StreamEnd::Truncated);
            }
        }
    }

    fn absorb(&mut self, records: Vec<Record>) {
        for record in records {
            match record {
                Record::Token(text) => self.pending.push_back(StreamEvent::Token(text)),
                Record::Done(stats) => self.end(StreamEnd::Done(stats)),
                Record::ServerError(message) => {
                    self.end(StreamEnd::Failed(ChatError::Other(message)))
                }
            }
        }
    }

    fn end(&mut self, end: StreamEnd) {
        if !self.ended {
            self.ended = true;
            self.pending.push_back(StreamEvent::End(end));
        }
    }
}

/// Turn a raw response body into tokens followed by exactly one end event.
///
/// Lazy: nothing is read until the returned stream is polled. The cancel
/// token is checked before and raced against every read.
pub fn decode_chat_stream(source: ByteStream, cancel: CancellationToken) -> impl Stream<Item = StreamEvent> {
    let state = DecodeState {
        source,
        decoder: NdjsonDecoder::new(),
        cancel,
        pending: VecDeque::new(),
        ended: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((event, state));
            }
            if state.ended {
                return None;
            }
            state.read_next().await;
        }
    })
}
