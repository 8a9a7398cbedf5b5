//! Chat runtime — the active conversation and its generation lifecycle.
//!
//! A send runs through: health check → append user message and a loading
//! assistant placeholder → stream tokens through the [`StreamingBuffer`] →
//! finalize (or render the error inside the placeholder).
//!
//! The runtime is a clone-cheap handle. `send_message` holds no borrow across
//! an await, so `stop_generation` can be called from the UI while a send is
//! suspended. Each send takes a generation number; a stream whose number is
//! no longer current never writes to the session again.

use std::cell::RefCell;
use std::rc::Rc;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::future::{self, Either};
use tokio_util::sync::CancellationToken;
use chatui_types::{
    ChatError,
    config::AppConfig,
    event::ChatEvent,
    message::{Feedback, Message, MessageImage, MessageMetadata, MessageUpdate, Role},
    model::ServerStatus,
    notice,
    session::{ChatSession, derive_title},
};
use crate::client;
use crate::event_bus::EventBus;
use crate::ports::{ChatRequest, OllamaPort, Sleep, TimerPort};
use crate::stream_parser::{StreamEnd, StreamEvent};
use crate::streaming_buffer::{StreamingBuffer, StreamingSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    /// No messages yet
    Empty,
    Idle,
    Generating,
    /// A saved chat is being swapped in
    Restoring,
}

/// What happened to a `send_message` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input, or a generation was already running
    Ignored,
    /// The server was unreachable; an offline notice was added
    ServerOffline,
    Completed,
    /// Finished, but the stream ended without a done record
    Truncated,
    Stopped,
    /// The error text was rendered into the assistant message
    Failed(String),
}

struct RuntimeInner {
    session: ChatSession,
    state: ChatState,
    buffer: StreamingBuffer,
    streaming: bool,
    current_model: String,
    server_status: ServerStatus,
    cancel: Option<CancellationToken>,
    generation: u64,
    message_counter: u64,
}

impl RuntimeInner {
    fn next_message_id(&mut self) -> String {
        self.message_counter += 1;
        format!("{}-{}", Utc::now().timestamp_millis(), self.message_counter)
    }

    fn settled_state(&self) -> ChatState {
        if self.session.messages.is_empty() {
            ChatState::Empty
        } else {
            ChatState::Idle
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.state == ChatState::Generating
    }

    /// Invalidate the running generation. Returns its token for cancelling
    /// once the borrow is released.
    fn interrupt(&mut self) -> Option<CancellationToken> {
        self.generation += 1;
        self.buffer.cancel();
        self.session.clear_loading();
        self.cancel.take()
    }

    fn add_chunk(&mut self, text: &str) -> bool {
        self.buffer.add_chunk(text, &mut self.session)
    }

    fn fire_timer(&mut self) -> bool {
        self.buffer.fire_timer(&mut self.session)
    }

    fn finish_buffer(&mut self, final_text: Option<String>, metadata: MessageMetadata) {
        self.buffer.end(final_text, Some(metadata), &mut self.session);
    }

    fn settle(&mut self) {
        self.cancel = None;
        self.session.touch();
        self.state = self.settled_state();
    }
}

#[derive(Clone)]
pub struct ChatRuntime {
    inner: Rc<RefCell<RuntimeInner>>,
    backend: Rc<dyn OllamaPort>,
    timer: Rc<dyn TimerPort>,
    event_bus: EventBus,
}

impl ChatRuntime {
    pub fn new(
        config: &AppConfig,
        backend: Rc<dyn OllamaPort>,
        timer: Rc<dyn TimerPort>,
        event_bus: EventBus,
    ) -> Self {
        let model = config.chat.default_model.clone();
        let inner = RuntimeInner {
            session: ChatSession::new(model.clone()),
            state: ChatState::Empty,
            buffer: StreamingBuffer::new(StreamingSettings::from_config(&config.chat)),
            streaming: config.features.streaming,
            current_model: model,
            server_status: ServerStatus::Checking,
            cancel: None,
            generation: 0,
            message_counter: 0,
        };
        Self {
            inner: Rc::new(RefCell::new(inner)),
            backend,
            timer,
            event_bus,
        }
    }

    // ─── Queries ─────────────────────────────────────────────

    pub fn state(&self) -> ChatState {
        self.inner.borrow().state
    }

    pub fn is_generating(&self) -> bool {
        self.state() == ChatState::Generating
    }

    pub fn server_status(&self) -> ServerStatus {
        self.inner.borrow().server_status
    }

    pub fn current_model(&self) -> String {
        self.inner.borrow().current_model.clone()
    }

    pub fn chat_id(&self) -> Option<String> {
        self.inner.borrow().session.id.clone()
    }

    pub fn title(&self) -> String {
        self.inner.borrow().session.title.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.borrow().session.messages.clone()
    }

    pub fn has_messages(&self) -> bool {
        !self.inner.borrow().session.messages.is_empty()
    }

    pub fn streaming_settings(&self) -> StreamingSettings {
        self.inner.borrow().buffer.settings()
    }

    /// Snapshot of the active chat with fresh metadata
    pub fn get_current_chat_state(&self) -> ChatSession {
        let mut session = self.inner.borrow().session.clone();
        session.refresh_metadata();
        session
    }

    // ─── Session management ──────────────────────────────────

    /// Discard the current chat and start an empty one.
    pub fn initialize_new_chat(&self, model: Option<String>) -> ChatSession {
        let (token, session) = {
            let mut inner = self.inner.borrow_mut();
            let token = inner.interrupt();
            if let Some(model) = model {
                inner.current_model = model;
            }
            inner.session = ChatSession::new(inner.current_model.clone());
            inner.state = ChatState::Empty;
            (token, inner.session.clone())
        };
        if let Some(token) = token {
            token.cancel();
        }
        log::debug!("Started new chat with model {}", session.model);
        self.event_bus.emit(ChatEvent::SessionReplaced { chat_id: None });
        session
    }

    /// Replace the active chat with a saved one.
    pub fn restore_chat(&self, saved: ChatSession) {
        let token = {
            let mut inner = self.inner.borrow_mut();
            inner.state = ChatState::Restoring;
            inner.interrupt()
        };
        if let Some(token) = token {
            token.cancel();
        }

        let chat_id = {
            let mut inner = self.inner.borrow_mut();
            let mut session = saved;
            let stray = session.clear_loading();
            if stray > 0 {
                log::debug!("Cleared {} stale loading flags on restore", stray);
            }
            if !session.model.is_empty() {
                inner.current_model = session.model.clone();
            }
            inner.session = session;
            inner.state = inner.settled_state();
            inner.session.id.clone()
        };
        log::info!("Restored chat {:?}", chat_id);
        self.event_bus.emit(ChatEvent::SessionReplaced { chat_id });
    }

    /// Record the id assigned by the store, if the active chat is still the
    /// one that was saved.
    pub fn bind_persisted_id(&self, created_at: DateTime<Utc>, id: &str) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.session.created_at != created_at {
            return false;
        }
        match inner.session.id.as_deref() {
            Some(existing) => existing == id,
            None => {
                inner.session.id = Some(id.to_string());
                true
            }
        }
    }

    pub fn set_model(&self, model: impl Into<String>) {
        {
            let mut inner = self.inner.borrow_mut();
            let model = model.into();
            inner.current_model = model.clone();
            inner.session.model = model;
        }
        self.event_bus.emit(ChatEvent::SessionChanged);
    }

    pub fn set_streaming(&self, enabled: bool) {
        self.inner.borrow_mut().streaming = enabled;
    }

    /// Adjust token pacing; applies from the next generation.
    pub fn configure_streaming(&self, chunk_size: Option<usize>, display_interval_ms: Option<u32>) {
        self.inner.borrow_mut().buffer.configure(chunk_size, display_interval_ms);
    }

    pub fn rename_chat(&self, title: impl Into<String>) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.session.title = title.into();
            inner.session.touch();
        }
        self.event_bus.emit(ChatEvent::SessionChanged);
    }

    pub fn update_message(&self, id: &str, update: MessageUpdate) -> bool {
        let updated = self.inner.borrow_mut().session.update_message(id, update);
        if updated {
            self.event_bus.emit(ChatEvent::SessionChanged);
        }
        updated
    }

    pub fn remove_message(&self, id: &str) -> bool {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let before = inner.session.messages.len();
            inner.session.messages.retain(|m| m.id != id);
            let removed = inner.session.messages.len() != before;
            if removed {
                inner.session.touch();
                if inner.state != ChatState::Generating {
                    inner.state = inner.settled_state();
                }
            }
            removed
        };
        if removed {
            self.event_bus.emit(ChatEvent::SessionChanged);
        }
        removed
    }

    pub fn clear_messages(&self) {
        self.initialize_new_chat(None);
    }

    /// Like/dislike an assistant message; `None` clears the rating.
    pub fn set_feedback(&self, id: &str, feedback: Option<Feedback>) -> bool {
        let updated = {
            let mut inner = self.inner.borrow_mut();
            match inner.session.messages.iter_mut().find(|m| m.id == id) {
                Some(message) if message.role == Role::Assistant => {
                    message.feedback = feedback;
                    true
                }
                _ => false,
            }
        };
        if updated {
            self.event_bus.emit(ChatEvent::SessionChanged);
        }
        updated
    }

    pub async fn check_server_status(&self) -> bool {
        self.set_server_status(ServerStatus::Checking);
        let online = self.backend.check_health().await;
        self.set_server_status(if online { ServerStatus::Online } else { ServerStatus::Offline });
        online
    }

    fn set_server_status(&self, status: ServerStatus) {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            let changed = inner.server_status != status;
            inner.server_status = status;
            changed
        };
        if changed {
            self.event_bus.emit(ChatEvent::ServerStatus(status));
        }
    }

    // ─── Generation ──────────────────────────────────────────

    /// Cancel the running generation and keep whatever text arrived.
    pub fn stop_generation(&self) {
        let token = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != ChatState::Generating {
                return;
            }
            let token = inner.interrupt();
            inner.state = inner.settled_state();
            token
        };
        if let Some(token) = token {
            token.cancel();
        }
        log::info!("Generation stopped");
        self.event_bus.emit(ChatEvent::GenerationStopped);
        self.event_bus.emit(ChatEvent::SessionChanged);
    }

    /// Send a user message and generate the reply. Errors are rendered into
    /// the assistant message, never returned.
    pub async fn send_message(&self, text: &str, images: Vec<MessageImage>) -> SendOutcome {
        let text = text.trim().to_string();
        let (generation, cancel) = {
            let mut inner = self.inner.borrow_mut();
            if text.is_empty() && images.is_empty() {
                return SendOutcome::Ignored;
            }
            if matches!(inner.state, ChatState::Generating | ChatState::Restoring) {
                log::debug!("Send ignored while {:?}", inner.state);
                return SendOutcome::Ignored;
            }
            inner.generation += 1;
            inner.state = ChatState::Generating;
            let cancel = CancellationToken::new();
            inner.cancel = Some(cancel.clone());
            (inner.generation, cancel)
        };

        let online = self.check_server_status().await;
        if !self.inner.borrow().is_current(generation) {
            return SendOutcome::Stopped;
        }
        if !online {
            {
                let mut inner = self.inner.borrow_mut();
                let id = inner.next_message_id();
                inner.session.messages.push(Message::assistant(id, notice::SERVER_OFFLINE));
                inner.settle();
            }
            log::warn!("Inference server offline, message not sent");
            self.event_bus.emit(ChatEvent::SessionChanged);
            return SendOutcome::ServerOffline;
        }

        let (message_id, request, streaming, model) = {
            let mut inner = self.inner.borrow_mut();
            let user_id = inner.next_message_id();
            inner.session.messages.push(Message::user(user_id, text).with_images(images));
            if inner.session.has_default_title() {
                inner.session.title = derive_title(&inner.session.messages);
            }

            let assistant_id = inner.next_message_id();
            inner.session.messages.push(Message::placeholder(assistant_id.clone()));
            inner.session.touch();

            let model = inner.current_model.clone();
            let streaming = inner.streaming;
            let request = client::build_request(&model, &inner.session.messages, streaming);
            inner.buffer.start(assistant_id.clone());
            (assistant_id, request, streaming, model)
        };

        self.event_bus.emit(ChatEvent::GenerationStarted { message_id: message_id.clone() });
        self.event_bus.emit(ChatEvent::SessionChanged);
        log::info!("Generating reply with {} ({} messages)", model, request.messages.len());

        let started = Utc::now();
        let turn = Turn { generation, message_id, model, started };
        if streaming {
            self.run_streaming(&turn, &request, &cancel).await
        } else {
            self.run_buffered(&turn, &request, &cancel).await
        }
    }

    /// Stop, drop the last user message and everything after it, and send
    /// that message again.
    pub async fn regenerate_last_response(&self) -> SendOutcome {
        let (token, resend) = {
            let mut inner = self.inner.borrow_mut();
            let token = if inner.state == ChatState::Generating {
                inner.interrupt()
            } else {
                None
            };
            let last_user = inner.session.messages.iter().rposition(|m| m.role == Role::User);
            let resend = last_user.map(|idx| {
                let message = inner.session.messages[idx].clone();
                inner.session.messages.truncate(idx);
                inner.session.touch();
                (message.content, message.images)
            });
            inner.state = inner.settled_state();
            (token, resend)
        };
        if let Some(token) = token {
            token.cancel();
            self.event_bus.emit(ChatEvent::GenerationStopped);
        }

        let Some((content, images)) = resend else {
            return SendOutcome::Ignored;
        };
        log::debug!("Regenerating last response");
        self.send_message(&content, images).await
    }

    async fn run_streaming(&self, turn: &Turn, request: &ChatRequest, cancel: &CancellationToken) -> SendOutcome {
        let mut events = match client::stream_events(self.backend.as_ref(), request, cancel).await {
            Ok(events) => events,
            Err(e) => return self.fail(turn, e),
        };

        let mut sleep: Option<Sleep> = None;
        loop {
            let armed = {
                let inner = self.inner.borrow();
                inner.is_current(turn.generation) && inner.buffer.timer_armed()
            };
            if !armed {
                sleep = None;
            } else if sleep.is_none() {
                let interval = self.inner.borrow().buffer.display_interval_ms();
                sleep = Some(self.timer.sleep(interval));
            }

            let step = match sleep.as_mut() {
                Some(timer) => match future::select(events.next(), timer).await {
                    Either::Left((event, _)) => Step::Event(event),
                    Either::Right(_) => Step::Timer,
                },
                None => Step::Event(events.next().await),
            };

            match step {
                Step::Timer => {
                    sleep = None;
                    let flushed = {
                        let mut inner = self.inner.borrow_mut();
                        inner.is_current(turn.generation) && inner.fire_timer()
                    };
                    if flushed {
                        self.emit_updated(turn);
                    }
                }
                Step::Event(Some(StreamEvent::Token(text))) => {
                    let flushed = {
                        let mut inner = self.inner.borrow_mut();
                        inner.is_current(turn.generation) && inner.add_chunk(&text)
                    };
                    if flushed {
                        self.emit_updated(turn);
                    }
                }
                Step::Event(Some(StreamEvent::End(end))) => return self.finish(turn, end),
                Step::Event(None) => return self.finish(turn, StreamEnd::Truncated),
            }
        }
    }

    async fn run_buffered(&self, turn: &Turn, request: &ChatRequest, cancel: &CancellationToken) -> SendOutcome {
        match client::chat(self.backend.as_ref(), request, None, Some(cancel)).await {
            Ok(text) => {
                {
                    let mut inner = self.inner.borrow_mut();
                    if !inner.is_current(turn.generation) {
                        return SendOutcome::Stopped;
                    }
                    inner.finish_buffer(Some(text), turn.metadata(None));
                    inner.settle();
                }
                self.emit_finished(turn, false);
                SendOutcome::Completed
            }
            Err(e) => self.fail(turn, e),
        }
    }

    fn finish(&self, turn: &Turn, end: StreamEnd) -> SendOutcome {
        let (truncated, stats) = match end {
            StreamEnd::Done(stats) => (false, Some(stats)),
            StreamEnd::Truncated => (true, None),
            StreamEnd::Cancelled => return self.fail(turn, ChatError::Cancelled),
            StreamEnd::Failed(e) => return self.fail(turn, e),
        };

        {
            let mut inner = self.inner.borrow_mut();
            if !inner.is_current(turn.generation) {
                return SendOutcome::Stopped;
            }
            let token_count = stats.and_then(|s| s.eval_count);
            inner.finish_buffer(None, turn.metadata(token_count));
            inner.settle();
        }

        if truncated {
            log::warn!("Reply {} ended without a done record", turn.message_id);
        }
        self.emit_finished(turn, truncated);
        if truncated {
            SendOutcome::Truncated
        } else {
            SendOutcome::Completed
        }
    }

    fn fail(&self, turn: &Turn, error: ChatError) -> SendOutcome {
        let current = self.inner.borrow().is_current(turn.generation);

        if error == ChatError::Cancelled {
            if current {
                let mut inner = self.inner.borrow_mut();
                inner.buffer.cancel();
                inner.session.clear_loading();
                inner.settle();
            }
            return SendOutcome::Stopped;
        }
        if !current {
            return SendOutcome::Stopped;
        }

        let content = notice::error_content(&error);
        {
            let mut inner = self.inner.borrow_mut();
            inner.buffer.cancel();
            inner
                .session
                .update_message(&turn.message_id, MessageUpdate::finished(content.clone(), None));
            inner.settle();
        }
        log::error!("Generation failed: {}", error);
        self.event_bus.emit(ChatEvent::GenerationFailed {
            message_id: turn.message_id.clone(),
            error: error.to_string(),
        });
        self.event_bus.emit(ChatEvent::SessionChanged);
        SendOutcome::Failed(content)
    }

    fn emit_updated(&self, turn: &Turn) {
        self.event_bus.emit(ChatEvent::MessageUpdated { message_id: turn.message_id.clone() });
    }

    fn emit_finished(&self, turn: &Turn, truncated: bool) {
        self.event_bus.emit(ChatEvent::GenerationFinished {
            message_id: turn.message_id.clone(),
            truncated,
        });
        self.event_bus.emit(ChatEvent::SessionChanged);
    }
}

/// One in-flight generation
struct Turn {
    generation: u64,
    message_id: String,
    model: String,
    started: DateTime<Utc>,
}

impl Turn {
    fn metadata(&self, token_count: Option<u32>) -> MessageMetadata {
        let elapsed = (Utc::now() - self.started).num_milliseconds().max(0) as u64;
        MessageMetadata {
            model: Some(self.model.clone()),
            processing_time_ms: Some(elapsed),
            token_count,
        }
    }
}

enum Step {
    Event(Option<StreamEvent>),
    Timer,
}
