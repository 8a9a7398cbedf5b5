//! Chat history coordinator.
//!
//! Joins the runtime, the store and the auto-saver. Store failures are
//! returned to the caller and also published as a transient notice.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use futures::future::{FutureExt, LocalBoxFuture};
use chatui_types::{
    ChatError, Result,
    event::{ChatEvent, NoticeLevel},
    notice,
    session::{ChatSession, ChatSummary, ChatUpdate, StorageInfo},
};
use crate::autosave::AutoSaver;
use crate::chat_store::ChatStore;
use crate::event_bus::EventBus;
use crate::runtime::ChatRuntime;

#[derive(Clone)]
pub struct ChatHistory {
    runtime: ChatRuntime,
    store: Rc<ChatStore>,
    autosaver: Rc<AutoSaver>,
    event_bus: EventBus,
    summaries: Rc<RefCell<Vec<ChatSummary>>>,
    max_chats: Rc<Cell<usize>>,
}

impl ChatHistory {
    pub fn new(
        runtime: ChatRuntime,
        store: Rc<ChatStore>,
        autosaver: Rc<AutoSaver>,
        event_bus: EventBus,
        max_chats: usize,
    ) -> Self {
        Self {
            runtime,
            store,
            autosaver,
            event_bus,
            summaries: Rc::new(RefCell::new(Vec::new())),
            max_chats: Rc::new(Cell::new(max_chats)),
        }
    }

    pub fn runtime(&self) -> &ChatRuntime {
        &self.runtime
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn set_max_chats(&self, max_chats: usize) {
        self.max_chats.set(max_chats);
    }

    /// Last listed summaries, newest first
    pub fn summaries(&self) -> Vec<ChatSummary> {
        self.summaries.borrow().clone()
    }

    pub async fn refresh(&self) -> Result<()> {
        let summaries = self.store.list().await.map_err(|e| self.report("Failed to load chats", e))?;
        *self.summaries.borrow_mut() = summaries;
        self.event_bus.emit(ChatEvent::HistoryChanged);
        Ok(())
    }

    pub fn new_chat(&self, model: Option<String>) -> ChatSession {
        self.autosaver.cancel();
        self.runtime.initialize_new_chat(model)
    }

    /// Load a stored chat into the runtime.
    pub async fn select_chat(&self, id: &str) -> Result<()> {
        let session = self.store.load_session(id).await.map_err(|e| self.report(notice::CHAT_NOT_FOUND, e))?;
        let Some(session) = session else {
            return Err(self.report(notice::CHAT_NOT_FOUND, ChatError::NotFound(id.to_string())));
        };

        self.autosaver.cancel();
        self.runtime.restore_chat(session);
        if let Err(e) = self.store.set_current_chat(id).await {
            log::warn!("Failed to record current chat: {}", e);
        }
        Ok(())
    }

    /// Reopen the chat that was active when the app was last closed.
    /// Returns false when there was none to reopen.
    pub async fn restore_current(&self) -> Result<bool> {
        let Some(id) = self.store.current_chat_id().await? else {
            return Ok(false);
        };
        match self.store.load_session(&id).await? {
            Some(session) => {
                self.runtime.restore_chat(session);
                Ok(true)
            }
            None => {
                log::warn!("Current chat {} no longer exists", id);
                self.store.clear_current_chat().await?;
                Ok(false)
            }
        }
    }

    /// Delete a stored chat. Deleting the active chat starts a new one.
    pub async fn delete_chat(&self, id: &str) -> Result<()> {
        self.store.delete(id).await.map_err(|e| self.report(notice::DELETE_FAILED, e))?;
        if self.runtime.chat_id().as_deref() == Some(id) {
            self.new_chat(None);
        }
        self.refresh().await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<ChatSummary>> {
        self.store.search(query).await.map_err(|e| self.report("Search failed", e))
    }

    pub async fn export(&self) -> Result<String> {
        let document = self.store.export_all().await.map_err(|e| self.report(notice::EXPORT_FAILED, e))?;
        self.event_bus.notice(NoticeLevel::Success, notice::CHAT_EXPORTED);
        Ok(document)
    }

    pub async fn import(&self, document: &str) -> Result<usize> {
        let count = self
            .store
            .import_all(document)
            .await
            .map_err(|e| self.report(notice::IMPORT_FAILED, e))?;
        self.event_bus.notice(NoticeLevel::Success, format!("Imported {} chats", count));
        self.refresh().await?;
        Ok(count)
    }

    /// Trim stored chats to the configured maximum.
    pub async fn cleanup(&self) -> Result<usize> {
        let removed = self
            .store
            .cleanup(self.max_chats.get())
            .await
            .map_err(|e| self.report("Cleanup failed", e))?;
        if removed > 0 {
            self.refresh().await?;
        }
        Ok(removed)
    }

    pub async fn rename(&self, id: &str, title: &str) -> Result<bool> {
        let update = ChatUpdate { title: Some(title.to_string()), ..Default::default() };
        let found = self.store.update(id, update).await.map_err(|e| self.report(notice::SAVE_FAILED, e))?;
        if self.runtime.chat_id().as_deref() == Some(id) {
            self.runtime.rename_chat(title);
        }
        self.refresh().await?;
        Ok(found)
    }

    pub async fn star(&self, id: &str, starred: bool) -> Result<bool> {
        let update = ChatUpdate { starred: Some(starred), ..Default::default() };
        let found = self.store.update(id, update).await.map_err(|e| self.report(notice::SAVE_FAILED, e))?;
        self.refresh().await?;
        Ok(found)
    }

    pub async fn storage_info(&self) -> Result<StorageInfo> {
        self.store.storage_info().await
    }

    /// Save the active chat right away. Returns the chat id, or None when
    /// there is nothing to save.
    pub async fn save_now(&self) -> Result<Option<String>> {
        let snapshot = self.runtime.get_current_chat_state();
        if snapshot.messages.is_empty() {
            return Ok(None);
        }
        self.autosaver.cancel();
        let id = self.store.save(&snapshot).await.map_err(|e| self.report(notice::SAVE_FAILED, e))?;
        self.runtime.bind_persisted_id(snapshot.created_at, &id);
        self.refresh().await?;
        Ok(Some(id))
    }

    /// Debounced save of the active chat. The returned future must be
    /// spawned; it does nothing if superseded before the delay elapses.
    pub fn schedule_autosave(&self) -> Option<LocalBoxFuture<'static, ()>> {
        if !self.autosaver.is_enabled() || !self.runtime.has_messages() {
            return None;
        }
        let runtime = self.runtime.clone();
        let pending = self.autosaver.schedule(move || runtime.get_current_chat_state());
        let history = self.clone();

        Some(
            async move {
                match pending.await {
                    Some(Ok(saved)) => {
                        history.runtime.bind_persisted_id(saved.created_at, &saved.id);
                        if let Err(e) = history.refresh().await {
                            log::warn!("History refresh after auto-save failed: {}", e);
                        }
                    }
                    Some(Err(e)) => {
                        history.report(notice::SAVE_FAILED, e);
                    }
                    None => {}
                }
            }
            .boxed_local(),
        )
    }

    fn report(&self, context: &str, error: ChatError) -> ChatError {
        log::error!("{}: {}", context, error);
        self.event_bus.notice(NoticeLevel::Error, format!("{}: {}", context, error));
        error
    }
}
