use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// User feedback on an assistant message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Liked,
    Disliked,
}

/// A single turn in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(alias = "type")]
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// True while an in-flight generation is still appending to `content`
    #[serde(default)]
    pub is_loading: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<MessageImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

/// An image attached to a user message.
///
/// The binary payload is kept in memory only; persisted chats keep the
/// display URL and mime type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageImage {
    pub id: String,
    #[serde(skip)]
    pub data: Vec<u8>,
    pub url: String,
    pub mime_type: String,
}

impl MessageImage {
    pub fn new(data: Vec<u8>, url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            data,
            url: url.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Attached to an assistant message when its generation finishes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<u32>,
}

impl Message {
    pub fn new(id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            is_loading: false,
            images: Vec::new(),
            metadata: None,
            feedback: None,
        }
    }

    pub fn user(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(id, Role::User, content)
    }

    pub fn assistant(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(id, Role::Assistant, content)
    }

    /// Empty assistant message that an active generation streams into
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            is_loading: true,
            ..Self::assistant(id, "")
        }
    }

    pub fn with_images(mut self, images: Vec<MessageImage>) -> Self {
        self.images = images;
        self
    }
}

/// A partial update applied to one message by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageUpdate {
    pub content: Option<String>,
    pub is_loading: Option<bool>,
    pub metadata: Option<MessageMetadata>,
}

impl MessageUpdate {
    /// Content written during streaming; the message stays loading.
    pub fn streaming(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            is_loading: Some(true),
            metadata: None,
        }
    }

    /// Final content; clears the loading flag.
    pub fn finished(content: impl Into<String>, metadata: Option<MessageMetadata>) -> Self {
        Self {
            content: Some(content.into()),
            is_loading: Some(false),
            metadata,
        }
    }

    pub fn apply(self, message: &mut Message) {
        if let Some(content) = self.content {
            message.content = content;
        }
        if let Some(is_loading) = self.is_loading {
            message.is_loading = is_loading;
        }
        if self.metadata.is_some() {
            message.metadata = self.metadata;
        }
    }
}
