//! Durable chat history over a [`StoragePort`].
//!
//! All chats live in one JSON document under [`HISTORY_KEY`], keyed by chat
//! id. Every write serializes the whole document first and checks it against
//! the quota, so a failed save never leaves a partially written index.

use std::collections::BTreeMap;
use std::rc::Rc;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use chatui_types::{
    ChatError, Result,
    session::{ChatSession, ChatSummary, ChatUpdate, ExportDocument, StorageInfo, StoredChat},
};
use crate::ports::StoragePort;

pub const HISTORY_KEY: &str = "chatui-history";
pub const CURRENT_CHAT_KEY: &str = "chatui-current-chat";
pub const LAST_MODEL_KEY: &str = "chatui-last-model";
pub const EXPORT_VERSION: &str = "1.0";

type ChatIndex = BTreeMap<String, StoredChat>;

/// `chat_{unix_millis}_{7 random alphanumerics}`
pub fn generate_chat_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("chat_{}_{}", Utc::now().timestamp_millis(), &random[..7])
}

/// Import is lenient about everything but the chats themselves
#[derive(Deserialize)]
struct ImportDocument {
    #[serde(default)]
    chats: Vec<StoredChat>,
}

pub struct ChatStore {
    storage: Rc<dyn StoragePort>,
    quota_bytes: usize,
}

impl ChatStore {
    pub fn new(storage: Rc<dyn StoragePort>, quota_bytes: usize) -> Self {
        Self { storage, quota_bytes }
    }

    pub fn backend_name(&self) -> &str {
        self.storage.backend_name()
    }

    async fn read_index(&self) -> Result<ChatIndex> {
        match self.storage.get(HISTORY_KEY).await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(ChatIndex::new()),
        }
    }

    async fn write_index(&self, index: &ChatIndex) -> Result<()> {
        let bytes = serde_json::to_vec(index)?;
        if bytes.len() > self.quota_bytes {
            return Err(ChatError::QuotaExceeded {
                needed: bytes.len(),
                available: self.quota_bytes,
            });
        }
        self.storage.set(HISTORY_KEY, &bytes).await
    }

    /// Persist a session. A session without an id gets a fresh one; the id
    /// becomes the current-chat pointer.
    pub async fn save(&self, session: &ChatSession) -> Result<String> {
        let mut index = self.read_index().await?;
        let id = session.id.clone().unwrap_or_else(generate_chat_id);

        let mut stored = StoredChat::from_session(session, id.clone());
        // Star and tags are edited through `update` and must survive a re-save
        if let Some(previous) = index.get(&id).and_then(|c| c.metadata.as_ref()) {
            let metadata = stored.metadata.get_or_insert_with(Default::default);
            metadata.starred = previous.starred;
            if metadata.tags.is_empty() {
                metadata.tags = previous.tags.clone();
            }
        }

        index.insert(id.clone(), stored);
        self.write_index(&index).await?;
        self.storage.set(CURRENT_CHAT_KEY, id.as_bytes()).await?;
        log::info!("Saved chat {} ({} messages)", id, session.messages.len());
        Ok(id)
    }

    pub async fn load(&self, id: &str) -> Result<Option<StoredChat>> {
        Ok(self.read_index().await?.remove(id))
    }

    pub async fn load_session(&self, id: &str) -> Result<Option<ChatSession>> {
        Ok(self.load(id).await?.map(StoredChat::into_session))
    }

    /// Apply user edits. Returns false when the chat does not exist.
    pub async fn update(&self, id: &str, update: ChatUpdate) -> Result<bool> {
        let mut index = self.read_index().await?;
        let Some(chat) = index.get_mut(id) else {
            return Ok(false);
        };

        if let Some(title) = update.title {
            chat.title = title;
        }
        if update.starred.is_some() || update.tags.is_some() {
            let metadata = chat.metadata.get_or_insert_with(Default::default);
            if let Some(starred) = update.starred {
                metadata.starred = starred;
            }
            if let Some(tags) = update.tags {
                metadata.tags = tags;
            }
        }
        chat.updated_at = Utc::now();

        self.write_index(&index).await?;
        Ok(true)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut index = self.read_index().await?;
        if index.remove(id).is_some() {
            self.write_index(&index).await?;
            log::info!("Deleted chat {}", id);
        }
        if self.current_chat_id().await?.as_deref() == Some(id) {
            self.clear_current_chat().await?;
        }
        Ok(())
    }

    /// Summaries, newest first
    pub async fn list(&self) -> Result<Vec<ChatSummary>> {
        let index = self.read_index().await?;
        let mut summaries: Vec<ChatSummary> = index.values().map(ChatSummary::from).collect();
        summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(summaries)
    }

    /// Case-insensitive match on the title or the last-message preview
    pub async fn search(&self, query: &str) -> Result<Vec<ChatSummary>> {
        let query = query.trim().to_lowercase();
        let summaries = self.list().await?;
        if query.is_empty() {
            return Ok(summaries);
        }

        Ok(summaries
            .into_iter()
            .filter(|summary| {
                summary.title.to_lowercase().contains(&query)
                    || summary.last_message.to_lowercase().contains(&query)
            })
            .collect())
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<ChatSummary>> {
        let mut summaries = self.list().await?;
        summaries.truncate(limit);
        Ok(summaries)
    }

    /// Pretty-printed backup of every chat
    pub async fn export_all(&self) -> Result<String> {
        let index = self.read_index().await?;
        let document = ExportDocument {
            export_date: Utc::now(),
            version: EXPORT_VERSION.to_string(),
            chats: index.into_values().collect(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Add every chat of a backup under a fresh id. Returns how many were
    /// imported. Existing chats are never overwritten.
    pub async fn import_all(&self, document: &str) -> Result<usize> {
        let parsed: ImportDocument = serde_json::from_str(document)?;
        let mut index = self.read_index().await?;

        let count = parsed.chats.len();
        for mut chat in parsed.chats {
            let mut id = generate_chat_id();
            while index.contains_key(&id) {
                id = generate_chat_id();
            }
            chat.id = id.clone();
            chat.message_count = chat.messages.len();
            index.insert(id, chat);
        }

        self.write_index(&index).await?;
        log::info!("Imported {} chats", count);
        Ok(count)
    }

    /// Keep the `max_chats` most recently updated chats. Returns how many
    /// were deleted.
    pub async fn cleanup(&self, max_chats: usize) -> Result<usize> {
        let index = self.read_index().await?;
        if index.len() <= max_chats {
            return Ok(0);
        }

        let mut chats: Vec<StoredChat> = index.into_values().collect();
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        let removed: Vec<String> = chats.drain(max_chats..).map(|c| c.id).collect();
        let kept: ChatIndex = chats.into_iter().map(|c| (c.id.clone(), c)).collect();
        self.write_index(&kept).await?;

        if let Some(current) = self.current_chat_id().await? {
            if removed.contains(&current) {
                self.clear_current_chat().await?;
            }
        }
        log::info!("Cleaned up {} old chats", removed.len());
        Ok(removed.len())
    }

    pub async fn storage_info(&self) -> Result<StorageInfo> {
        let raw = self.storage.get(HISTORY_KEY).await?;
        let used = raw.as_ref().map(Vec::len).unwrap_or(0);
        let chat_count = match raw {
            Some(bytes) => serde_json::from_slice::<ChatIndex>(&bytes)?.len(),
            None => 0,
        };
        Ok(StorageInfo {
            used,
            available: self.quota_bytes.saturating_sub(used),
            chat_count,
        })
    }

    pub async fn current_chat_id(&self) -> Result<Option<String>> {
        read_string(self.storage.as_ref(), CURRENT_CHAT_KEY).await
    }

    pub async fn set_current_chat(&self, id: &str) -> Result<()> {
        self.storage.set(CURRENT_CHAT_KEY, id.as_bytes()).await
    }

    pub async fn clear_current_chat(&self) -> Result<()> {
        self.storage.delete(CURRENT_CHAT_KEY).await
    }

    pub async fn last_model(&self) -> Result<Option<String>> {
        read_string(self.storage.as_ref(), LAST_MODEL_KEY).await
    }

    pub async fn set_last_model(&self, model: &str) -> Result<()> {
        self.storage.set(LAST_MODEL_KEY, model.as_bytes()).await
    }
}

async fn read_string(storage: &dyn StoragePort, key: &str) -> Result<Option<String>> {
    match storage.get(key).await? {
        Some(bytes) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| ChatError::Serialization(e.to_string())),
        None => Ok(None),
    }
}
