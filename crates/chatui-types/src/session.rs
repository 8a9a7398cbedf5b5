use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::message::{Message, MessageUpdate, Role};

/// Title of a chat that has not been named yet
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

const TITLE_MAX_CHARS: usize = 50;
const TITLE_CUT_CHARS: usize = 47;
const TITLE_MIN_WORD_BREAK: usize = 20;
const PREVIEW_MAX_CHARS: usize = 100;

/// The active conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// None until the chat is first persisted
    pub id: Option<String>,
    pub title: String,
    pub messages: Vec<Message>,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChatMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMetadata {
    pub total_messages: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_response_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub starred: bool,
}

impl ChatSession {
    pub fn new(model: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            title: DEFAULT_CHAT_TITLE.to_string(),
            messages: Vec::new(),
            model: model.into(),
            created_at: now,
            updated_at: now,
            metadata: None,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_CHAT_TITLE
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Apply an update to the message with `id`. Returns false if no such message.
    pub fn update_message(&mut self, id: &str, update: MessageUpdate) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                update.apply(message);
                self.touch();
                true
            }
            None => false,
        }
    }

    pub fn loading_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.is_loading)
    }

    /// Clear the loading flag on every message. Returns how many were cleared.
    pub fn clear_loading(&mut self) -> usize {
        let mut cleared = 0;
        for message in self.messages.iter_mut().filter(|m| m.is_loading) {
            message.is_loading = false;
            cleared += 1;
        }
        if cleared > 0 {
            self.touch();
        }
        cleared
    }

    /// Mean of the recorded assistant processing times, if any
    pub fn average_response_time_ms(&self) -> Option<u64> {
        let times: Vec<u64> = self
            .messages
            .iter()
            .filter_map(|m| m.metadata.as_ref().and_then(|md| md.processing_time_ms))
            .collect();
        if times.is_empty() {
            None
        } else {
            Some(times.iter().sum::<u64>() / times.len() as u64)
        }
    }

    /// Recompute the derived metadata block, keeping tags and star state.
    pub fn refresh_metadata(&mut self) {
        let previous = self.metadata.take().unwrap_or_default();
        self.metadata = Some(ChatMetadata {
            total_messages: self.messages.len(),
            last_activity: Some(self.updated_at),
            average_response_time_ms: self.average_response_time_ms(),
            tags: previous.tags,
            starred: previous.starred,
        });
    }
}

/// Derive a chat title from the first non-blank user message.
///
/// Titles up to 50 characters are used verbatim; longer text is cut to 47
/// characters, backed off to the last space when that space lies past the
/// 20th character, and suffixed with `...`.
pub fn derive_title(messages: &[Message]) -> String {
    let first = messages
        .iter()
        .find(|m| m.role == Role::User && !m.content.trim().is_empty());
    let Some(first) = first else {
        return DEFAULT_CHAT_TITLE.to_string();
    };

    let content = first.content.trim();
    if content.chars().count() <= TITLE_MAX_CHARS {
        return content.to_string();
    }

    let truncated: String = content.chars().take(TITLE_CUT_CHARS).collect();
    let cut = match truncated.rfind(' ') {
        Some(idx) if truncated[..idx].chars().count() > TITLE_MIN_WORD_BREAK => &truncated[..idx],
        _ => truncated.as_str(),
    };
    format!("{}...", cut)
}

/// First 100 characters of `text`, with an ellipsis when cut
pub fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_MAX_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(PREVIEW_MAX_CHARS).collect();
        format!("{}...", head)
    }
}

/// The durable projection of a ChatSession
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredChat {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub message_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChatMetadata>,
}

impl StoredChat {
    pub fn from_session(session: &ChatSession, id: String) -> Self {
        Self {
            id,
            title: session.title.clone(),
            messages: session.messages.clone(),
            model: session.model.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
            message_count: session.messages.len(),
            metadata: session.metadata.clone(),
        }
    }

    pub fn into_session(self) -> ChatSession {
        ChatSession {
            id: Some(self.id),
            title: self.title,
            messages: self.messages,
            model: self.model,
            created_at: self.created_at,
            updated_at: self.updated_at,
            metadata: self.metadata,
        }
    }

    pub fn starred(&self) -> bool {
        self.metadata.as_ref().map(|m| m.starred).unwrap_or(false)
    }
}

/// Summary of a stored chat for listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: String,
    pub title: String,
    pub last_message: String,
    pub timestamp: DateTime<Utc>,
    pub message_count: usize,
    #[serde(default)]
    pub starred: bool,
}

impl From<&StoredChat> for ChatSummary {
    fn from(chat: &StoredChat) -> Self {
        let last_message = chat
            .messages
            .last()
            .map(|m| preview(&m.content))
            .unwrap_or_else(|| "No messages".to_string());
        Self {
            id: chat.id.clone(),
            title: chat.title.clone(),
            last_message,
            timestamp: chat.updated_at,
            message_count: chat.message_count,
            starred: chat.starred(),
        }
    }
}

/// Partial update of a stored chat's user-editable fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatUpdate {
    pub title: Option<String>,
    pub starred: Option<bool>,
    pub tags: Option<Vec<String>>,
}

/// Backup document produced by export and consumed by import
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub export_date: DateTime<Utc>,
    pub version: String,
    pub chats: Vec<StoredChat>,
}

/// Rough storage usage of the chat index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageInfo {
    pub used: usize,
    pub available: usize,
    pub chat_count: usize,
}
