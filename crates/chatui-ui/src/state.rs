//! UI-level state that drives rendering.
//! This is a read-only projection of the chat runtime and the history
//! list, updated each frame by draining the EventBus.

use chatui_core::runtime::ChatState;
use chatui_types::event::{ChatEvent, NoticeLevel};
use chatui_types::message::{Message, MessageImage, Role};
use chatui_types::model::{ModelInfo, ServerStatus};
use chatui_types::session::{ChatSession, ChatSummary};

/// Seconds a notice stays on screen
pub const NOTICE_SECONDS: f64 = 4.0;

/// State visible to UI panels
pub struct UiState {
    /// Messages of the active chat
    pub messages: Vec<Message>,
    pub chat_id: Option<String>,
    pub title: String,
    pub current_model: String,
    pub chat_state: ChatState,
    pub server_status: ServerStatus,
    /// Installed models, as last listed
    pub models: Vec<ModelInfo>,
    /// Stored chats, newest first
    pub history: Vec<ChatSummary>,
    pub search_query: String,
    /// Results for `search_query`; `None` shows the full history
    pub search_results: Option<Vec<ChatSummary>>,
    pub input_text: String,
    /// Images dropped onto the window, sent with the next message
    pub pending_images: Vec<MessageImage>,
    pub show_settings: bool,
    pub show_sidebar: bool,
    /// Chat being renamed in the sidebar
    pub renaming: Option<RenameDraft>,
    /// Status line text
    pub status_text: String,
    pub notices: Vec<Notice>,
    session_dirty: bool,
    history_dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    shown_at: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenameDraft {
    pub id: String,
    pub title: String,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            chat_id: None,
            title: String::new(),
            current_model: String::new(),
            chat_state: ChatState::Empty,
            server_status: ServerStatus::Checking,
            models: Vec::new(),
            history: Vec::new(),
            search_query: String::new(),
            search_results: None,
            input_text: String::new(),
            pending_images: Vec::new(),
            show_settings: false,
            show_sidebar: true,
            renaming: None,
            status_text: "Ready".to_string(),
            notices: Vec::new(),
            session_dirty: true,
            history_dirty: true,
        }
    }

    /// Process events from the EventBus and update UI state
    pub fn process_events(&mut self, events: Vec<ChatEvent>) {
        for event in events {
            match event {
                ChatEvent::GenerationStarted { .. } => {
                    self.chat_state = ChatState::Generating;
                    self.status_text = "Generating...".to_string();
                    self.session_dirty = true;
                }
                ChatEvent::MessageUpdated { .. } | ChatEvent::SessionChanged => {
                    self.session_dirty = true;
                }
                ChatEvent::GenerationFinished { truncated, .. } => {
                    self.chat_state = ChatState::Idle;
                    self.status_text = if truncated {
                        "Response may be incomplete".to_string()
                    } else {
                        "Ready".to_string()
                    };
                    self.session_dirty = true;
                }
                ChatEvent::GenerationStopped => {
                    self.chat_state = ChatState::Idle;
                    self.status_text = "Stopped".to_string();
                    self.session_dirty = true;
                }
                ChatEvent::GenerationFailed { error, .. } => {
                    self.chat_state = ChatState::Idle;
                    self.status_text = format!("Error: {}", error);
                    self.session_dirty = true;
                }
                ChatEvent::SessionReplaced { chat_id } => {
                    log::debug!("Active chat replaced: {:?}", chat_id);
                    self.input_text.clear();
                    self.pending_images.clear();
                    self.status_text = "Ready".to_string();
                    self.session_dirty = true;
                }
                ChatEvent::HistoryChanged => {
                    self.history_dirty = true;
                }
                ChatEvent::ServerStatus(status) => {
                    if status != self.server_status {
                        log::debug!("Server status: {:?}", status);
                    }
                    self.server_status = status;
                    if status == ServerStatus::Offline {
                        self.status_text = "Server offline".to_string();
                    } else if !self.is_busy() {
                        self.status_text = "Ready".to_string();
                    }
                }
                ChatEvent::Notice { level, text } => {
                    self.push_notice(level, text);
                }
            }
        }
    }

    /// True once after events changed the active chat
    pub fn take_session_dirty(&mut self) -> bool {
        std::mem::take(&mut self.session_dirty)
    }

    /// True once after the stored chat list changed
    pub fn take_history_dirty(&mut self) -> bool {
        std::mem::take(&mut self.history_dirty)
    }

    /// Copy a snapshot of the active chat into the projection.
    pub fn sync_session(&mut self, session: &ChatSession, chat_state: ChatState) {
        self.messages = session.messages.clone();
        self.chat_id = session.id.clone();
        self.title = session.title.clone();
        self.current_model = session.model.clone();
        self.chat_state = chat_state;
    }

    pub fn set_history(&mut self, history: Vec<ChatSummary>) {
        self.history = history;
        if self.search_query.trim().is_empty() {
            self.search_results = None;
        }
    }

    /// Chats the sidebar should list: search results when searching
    pub fn visible_history(&self) -> &[ChatSummary] {
        self.search_results.as_deref().unwrap_or(&self.history)
    }

    pub fn set_models(&mut self, models: Vec<ModelInfo>) {
        self.models = models;
    }

    pub fn current_model_info(&self) -> Option<&ModelInfo> {
        self.models.iter().find(|m| m.name == self.current_model)
    }

    pub fn push_notice(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notices.push(Notice { level, text: text.into(), shown_at: None });
    }

    /// Drop notices shown for longer than [`NOTICE_SECONDS`].
    /// `now` is the UI clock in seconds.
    pub fn expire_notices(&mut self, now: f64) {
        for notice in &mut self.notices {
            notice.shown_at.get_or_insert(now);
        }
        self.notices
            .retain(|n| n.shown_at.is_some_and(|at| now - at < NOTICE_SECONDS));
    }

    pub fn attach_image(&mut self, image: MessageImage) {
        self.pending_images.push(image);
    }

    pub fn remove_image(&mut self, id: &str) {
        self.pending_images.retain(|img| img.id != id);
    }

    pub fn can_submit(&self) -> bool {
        !self.is_busy()
            && (!self.input_text.trim().is_empty() || !self.pending_images.is_empty())
    }

    /// Take the composed message, clearing the input. `None` when there
    /// is nothing to send or a generation is running.
    pub fn take_submission(&mut self) -> Option<(String, Vec<MessageImage>)> {
        if !self.can_submit() {
            return None;
        }
        let text = self.input_text.trim().to_string();
        self.input_text.clear();
        Some((text, std::mem::take(&mut self.pending_images)))
    }

    /// Id of the assistant message a regenerate would replace
    pub fn regenerable_message(&self) -> Option<&str> {
        if self.is_busy() {
            return None;
        }
        let last = self.messages.last()?;
        let has_user = self.messages.iter().any(|m| m.role == Role::User);
        (last.role == Role::Assistant && has_user).then_some(last.id.as_str())
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.chat_state, ChatState::Generating | ChatState::Restoring)
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}
