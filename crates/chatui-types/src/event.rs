use serde::{Deserialize, Serialize};
use crate::model::ServerStatus;

/// Events emitted by the chat runtime and history coordinator.
/// UI subscribes to these for reactive updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatEvent {
    /// A generation started streaming into `message_id`
    GenerationStarted { message_id: String },

    /// Buffered text was flushed into a message
    MessageUpdated { message_id: String },

    /// A generation finished and the message is final
    GenerationFinished { message_id: String, truncated: bool },

    /// The user stopped the generation
    GenerationStopped,

    /// Generation failed; the error is shown inside the message
    GenerationFailed { message_id: String, error: String },

    /// Messages, title or model of the active chat changed
    SessionChanged,

    /// The active chat was replaced (new chat or restored chat)
    SessionReplaced { chat_id: Option<String> },

    /// Stored chat list changed
    HistoryChanged,

    ServerStatus(ServerStatus),

    /// Transient notice shown outside the message list
    Notice { level: NoticeLevel, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

impl ChatEvent {
    /// Events after which the active chat should be (re)scheduled for auto-save
    pub fn is_session_mutation(&self) -> bool {
        matches!(
            self,
            ChatEvent::MessageUpdated { .. }
                | ChatEvent::GenerationFinished { .. }
                | ChatEvent::GenerationStopped
                | ChatEvent::GenerationFailed { .. }
                | ChatEvent::SessionChanged
        )
    }
}
