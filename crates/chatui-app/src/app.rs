//! Main egui application — composes all panels and drives the chat core.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use egui::{self, CentralPanel, RichText, SidePanel, TopBottomPanel};

use chatui_core::autosave::AutoSaver;
use chatui_core::chat_store::ChatStore;
use chatui_core::config_store::ConfigStore;
use chatui_core::event_bus::EventBus;
use chatui_core::history::ChatHistory;
use chatui_core::ports::{OllamaPort, StoragePort, TimerPort};
use chatui_core::runtime::ChatRuntime;
use chatui_platform::download::{download_text, export_filename};
use chatui_platform::llm::OllamaClient;
use chatui_platform::timer::BrowserTimer;
use chatui_types::config::AppConfig;
use chatui_types::event::NoticeLevel;
use chatui_types::message::MessageImage;
use chatui_types::model::{pick_model, ModelInfo};
use chatui_types::notice;
use chatui_types::session::{ChatSummary, StorageInfo};
use chatui_types::ChatError;
use chatui_ui::panels::chat::{self, ChatAction, ChatPanelOptions};
use chatui_ui::panels::settings::{self, SaveFeedback, SettingsAction};
use chatui_ui::panels::sidebar::{self, SidebarAction};
use chatui_ui::panels::notices;
use chatui_ui::state::UiState;
use chatui_ui::theme;

const RELOAD_HINT: &str = "Saved. Reload the page to apply server, storage and logging changes.";

/// Everything loaded before the first frame
pub struct Boot {
    pub config: AppConfig,
    pub config_store: ConfigStore,
    pub chat_storage: Rc<dyn StoragePort>,
}

/// Results of spawned tasks, picked up on the next frame
#[derive(Default)]
struct Inbox {
    models: Option<Vec<ModelInfo>>,
    models_loaded: bool,
    search: Option<(String, Vec<ChatSummary>)>,
    storage_info: Option<StorageInfo>,
    settings: Option<Result<AppConfig, String>>,
}

/// The main application state
pub struct ChatApp {
    ui_state: UiState,
    config: AppConfig,
    draft: AppConfig,
    chat_options: ChatPanelOptions,
    save_feedback: Option<SaveFeedback>,
    storage_info: Option<StorageInfo>,
    event_bus: EventBus,
    backend: Rc<dyn OllamaPort>,
    runtime: ChatRuntime,
    history: ChatHistory,
    autosaver: Rc<AutoSaver>,
    config_store: Rc<ConfigStore>,
    inbox: Rc<RefCell<Inbox>>,
    ctx: egui::Context,
}

impl ChatApp {
    pub fn new(cc: &eframe::CreationContext<'_>, boot: Boot) -> Self {
        let Boot { config, config_store, chat_storage } = boot;
        let event_bus = EventBus::new();
        let timer: Rc<dyn TimerPort> = Rc::new(BrowserTimer);
        let backend: Rc<dyn OllamaPort> = Rc::new(OllamaClient::new(&config.ollama));

        let runtime = ChatRuntime::new(&config, backend.clone(), timer.clone(), event_bus.clone());
        let store = Rc::new(ChatStore::new(chat_storage, config.storage.quota_bytes));
        log::info!("Chats stored in {}", store.backend_name());
        let autosaver = Rc::new(AutoSaver::new(store.clone(), timer.clone(), auto_save_delay(&config)));
        let history = ChatHistory::new(
            runtime.clone(),
            store,
            autosaver.clone(),
            event_bus.clone(),
            config.chat.max_chat_history,
        );

        theme::apply_theme(&cc.egui_ctx, config.ui.default_theme);

        let app = Self {
            ui_state: UiState::new(),
            draft: config.clone(),
            chat_options: ChatPanelOptions::from_config(&config),
            save_feedback: None,
            storage_info: None,
            event_bus,
            backend,
            runtime,
            history,
            autosaver,
            config_store: Rc::new(config_store),
            inbox: Rc::new(RefCell::new(Inbox::default())),
            ctx: cc.egui_ctx.clone(),
            config,
        };

        app.start_up();
        app.start_health_checks(timer);
        app
    }

    /// Run `task` on the browser event loop and repaint when it finishes.
    fn spawn(&self, task: impl Future<Output = ()> + 'static) {
        let ctx = self.ctx.clone();
        wasm_bindgen_futures::spawn_local(async move {
            task.await;
            ctx.request_repaint();
        });
    }

    /// Restore the last chat, then check the server and list models.
    fn start_up(&self) {
        let history = self.history.clone();
        let loader = self.model_loader();
        self.spawn(async move {
            if let Err(e) = history.refresh().await {
                log::warn!("Could not load chat history: {}", e);
            }
            match history.restore_current().await {
                Ok(true) => log::info!("Restored the last open chat"),
                Ok(false) => {}
                Err(e) => log::warn!("Could not restore the last chat: {}", e),
            }
            if history.runtime().check_server_status().await {
                loader.load().await;
            }
        });
    }

    fn start_health_checks(&self, timer: Rc<dyn TimerPort>) {
        let interval = self.config.ollama.health_check_interval_ms;
        if interval == 0 {
            return;
        }
        let runtime = self.runtime.clone();
        let loader = self.model_loader();
        let inbox = self.inbox.clone();
        let ctx = self.ctx.clone();
        wasm_bindgen_futures::spawn_local(async move {
            loop {
                timer.sleep(interval).await;
                let online = runtime.check_server_status().await;
                let loaded = inbox.borrow().models_loaded;
                if online && !loaded {
                    loader.load().await;
                }
                ctx.request_repaint();
            }
        });
    }

    fn model_loader(&self) -> ModelLoader {
        ModelLoader {
            backend: self.backend.clone(),
            history: self.history.clone(),
            event_bus: self.event_bus.clone(),
            inbox: self.inbox.clone(),
            default_model: self.config.chat.default_model.clone(),
        }
    }

    // ─── Per-frame plumbing ──────────────────────────────────

    fn pump_events(&mut self, ctx: &egui::Context) {
        let events = self.event_bus.drain();
        if events.is_empty() {
            return;
        }
        let mutated = events.iter().any(|e| e.is_session_mutation());
        self.ui_state.process_events(events);
        ctx.request_repaint();

        if mutated && !self.runtime.is_generating() {
            if let Some(pending) = self.history.schedule_autosave() {
                wasm_bindgen_futures::spawn_local(pending);
            }
        }
    }

    fn sync_projection(&mut self) {
        if self.ui_state.take_session_dirty() {
            let session = self.runtime.get_current_chat_state();
            self.ui_state.sync_session(&session, self.runtime.state());
        }
        if self.ui_state.take_history_dirty() {
            self.ui_state.set_history(self.history.summaries());
        }

        let mut inbox = self.inbox.borrow_mut();
        if let Some(models) = inbox.models.take() {
            self.ui_state.set_models(models);
        }
        if let Some((query, results)) = inbox.search.take() {
            if query == self.ui_state.search_query.trim() {
                self.ui_state.search_results = Some(results);
            }
        }
        if let Some(info) = inbox.storage_info.take() {
            self.storage_info = Some(info);
        }
        let settings = inbox.settings.take();
        drop(inbox);

        match settings {
            Some(Ok(config)) => self.apply_config(config),
            Some(Err(message)) => {
                self.save_feedback = Some(SaveFeedback { message, success: false });
            }
            None => {}
        }
    }

    /// Images attach to the next message; `.json` files are chat backups.
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            let Some(bytes) = file.bytes else {
                log::warn!("Dropped file {} has no contents", file.name);
                continue;
            };
            let mime = if file.mime.is_empty() { mime_from_name(&file.name) } else { file.mime.clone() };

            if mime == "application/json" || file.name.ends_with(".json") {
                match String::from_utf8(bytes.to_vec()) {
                    Ok(document) => self.import_chats(document),
                    Err(_) => self.ui_state.push_notice(NoticeLevel::Error, notice::IMPORT_FAILED),
                }
            } else if mime.starts_with("image/") && self.chat_options.image_upload {
                self.ui_state.attach_image(MessageImage::new(bytes.to_vec(), file.name, mime));
            } else {
                self.ui_state
                    .push_notice(NoticeLevel::Error, format!("Unsupported file: {}", file.name));
            }
        }
    }

    // ─── Actions ─────────────────────────────────────────────

    fn handle_chat_action(&mut self, action: ChatAction) {
        match action {
            ChatAction::Send(text, images) => {
                let runtime = self.runtime.clone();
                self.spawn(async move {
                    let outcome = runtime.send_message(&text, images).await;
                    log::debug!("Send finished: {:?}", outcome);
                });
            }
            ChatAction::Stop => self.runtime.stop_generation(),
            ChatAction::Regenerate => {
                let runtime = self.runtime.clone();
                self.spawn(async move {
                    let outcome = runtime.regenerate_last_response().await;
                    log::debug!("Regenerate finished: {:?}", outcome);
                });
            }
            ChatAction::Feedback { message_id, feedback } => {
                self.runtime.set_feedback(&message_id, feedback);
            }
            ChatAction::Copy(text) => {
                self.ctx.copy_text(text);
                self.ui_state.push_notice(NoticeLevel::Info, "Copied to clipboard");
            }
            ChatAction::Delete(message_id) => {
                self.runtime.remove_message(&message_id);
            }
            ChatAction::SelectModel(model) => {
                self.runtime.set_model(model.clone());
                self.event_bus.notice(NoticeLevel::Success, notice::MODEL_CHANGED);
                let history = self.history.clone();
                self.spawn(async move {
                    if let Err(e) = history.store().set_last_model(&model).await {
                        log::warn!("Failed to remember model {}: {}", model, e);
                    }
                });
            }
            ChatAction::RefreshModels => {
                let loader = self.model_loader();
                self.spawn(async move { loader.load().await });
            }
        }
    }

    fn handle_sidebar_action(&mut self, action: SidebarAction) {
        let history = self.history.clone();
        match action {
            SidebarAction::NewChat => {
                history.new_chat(None);
                self.spawn(async move {
                    if let Err(e) = history.store().clear_current_chat().await {
                        log::warn!("Failed to clear current chat: {}", e);
                    }
                });
            }
            SidebarAction::Select(id) => {
                self.spawn(async move {
                    let _ = history.select_chat(&id).await;
                });
            }
            SidebarAction::Delete(id) => {
                self.spawn(async move {
                    let _ = history.delete_chat(&id).await;
                });
            }
            SidebarAction::Star { id, starred } => {
                self.spawn(async move {
                    let _ = history.star(&id, starred).await;
                });
            }
            SidebarAction::Rename { id, title } => {
                self.spawn(async move {
                    let _ = history.rename(&id, &title).await;
                });
            }
            SidebarAction::Search(query) => {
                if query.is_empty() {
                    return;
                }
                let inbox = self.inbox.clone();
                self.spawn(async move {
                    if let Ok(results) = history.search(&query).await {
                        inbox.borrow_mut().search = Some((query, results));
                    }
                });
            }
            SidebarAction::Export => {
                self.spawn(async move {
                    let Ok(document) = history.export().await else {
                        return;
                    };
                    let filename = export_filename(chrono::Local::now().date_naive());
                    if let Err(e) = download_text(&filename, &document, "application/json") {
                        log::error!("Export download failed: {}", e);
                    }
                });
            }
            SidebarAction::Cleanup => {
                let event_bus = self.event_bus.clone();
                self.spawn(async move {
                    if let Ok(removed) = history.cleanup().await {
                        event_bus.notice(NoticeLevel::Info, format!("Removed {} old chats", removed));
                    }
                });
            }
        }
    }

    fn import_chats(&self, document: String) {
        let history = self.history.clone();
        self.spawn(async move {
            let _ = history.import(&document).await;
        });
    }

    fn handle_settings_action(&mut self, action: SettingsAction) {
        match action {
            SettingsAction::None => {}
            SettingsAction::Changed => self.save_feedback = None,
            SettingsAction::SaveClicked => {
                let store = self.config_store.clone();
                let inbox = self.inbox.clone();
                let draft = self.draft.clone();
                self.spawn(async move {
                    let result = match store.save(&draft).await {
                        Ok(()) => Ok(draft),
                        Err(ChatError::Config(errors)) => Err(errors.join("; ")),
                        Err(e) => Err(e.to_string()),
                    };
                    inbox.borrow_mut().settings = Some(result);
                });
            }
            SettingsAction::ResetClicked => {
                let store = self.config_store.clone();
                let inbox = self.inbox.clone();
                self.spawn(async move {
                    let result = store.reset().await.map_err(|e| e.to_string());
                    inbox.borrow_mut().settings = Some(result);
                });
            }
        }
    }

    fn open_settings(&mut self) {
        self.ui_state.show_settings = true;
        self.draft = self.config.clone();
        self.save_feedback = None;

        let history = self.history.clone();
        let inbox = self.inbox.clone();
        self.spawn(async move {
            match history.storage_info().await {
                Ok(info) => inbox.borrow_mut().storage_info = Some(info),
                Err(e) => log::warn!("Failed to read storage usage: {}", e),
            }
        });
    }

    /// Push a saved config into the live services.
    fn apply_config(&mut self, config: AppConfig) {
        let reload = settings::needs_reload(&self.config, &config);

        self.runtime.set_streaming(config.features.streaming);
        self.runtime.configure_streaming(
            Some(config.chat.streaming_chunk_size),
            Some(config.chat.streaming_interval_ms),
        );
        self.autosaver.set_delay(auto_save_delay(&config));
        self.history.set_max_chats(config.chat.max_chat_history);
        theme::apply_theme(&self.ctx, config.ui.default_theme);
        self.chat_options = ChatPanelOptions::from_config(&config);

        let message = if reload { RELOAD_HINT } else { "Settings saved" };
        self.save_feedback = Some(SaveFeedback { message: message.to_string(), success: true });
        log::info!("Settings applied");

        self.draft = config.clone();
        self.config = config;
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump_events(ctx);
        self.sync_projection();
        self.handle_dropped_files(ctx);

        self.ui_state.expire_notices(ctx.input(|i| i.time));
        if self.ui_state.is_busy() || !self.ui_state.notices.is_empty() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        // ── Top bar ──────────────────────────────────────────
        let mut toggle_settings = false;
        TopBottomPanel::top("top_bar").show(ctx, |ui| {
            let p = theme::palette(ui);
            ui.horizontal(|ui| {
                if self.config.features.chat_history
                    && ui.selectable_label(self.ui_state.show_sidebar, "☰").clicked()
                {
                    self.ui_state.show_sidebar = !self.ui_state.show_sidebar;
                }
                ui.label(RichText::new(&self.config.app.name).strong().color(p.accent).size(16.0));
                ui.separator();
                ui.label(RichText::new(&self.config.app.description).color(p.text_secondary).small());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.selectable_label(self.ui_state.show_settings, "Settings").clicked() {
                        toggle_settings = true;
                    }
                });
            });
        });
        if toggle_settings {
            if self.ui_state.show_settings {
                self.ui_state.show_settings = false;
            } else {
                self.open_settings();
            }
        }

        // ── History side panel ───────────────────────────────
        if self.config.features.chat_history && self.ui_state.show_sidebar {
            let allow_export = self.config.features.message_export;
            let action = SidePanel::left("history_panel")
                .default_width(self.config.ui.sidebar_width)
                .show(ctx, |ui| sidebar::sidebar_panel(ui, &mut self.ui_state, allow_export))
                .inner;
            if let Some(action) = action {
                self.handle_sidebar_action(action);
            }
        }

        // ── Settings side panel ──────────────────────────────
        if self.ui_state.show_settings {
            let action = SidePanel::right("settings_panel")
                .min_width(280.0)
                .max_width(360.0)
                .show(ctx, |ui| {
                    settings::settings_panel(
                        ui,
                        &mut self.draft,
                        &self.ui_state.models,
                        self.storage_info.as_ref(),
                        self.save_feedback.as_ref(),
                    )
                })
                .inner;
            self.handle_settings_action(action);
        }

        // ── Main content ─────────────────────────────────────
        let action = CentralPanel::default()
            .show(ctx, |ui| chat::chat_panel(ui, &mut self.ui_state, &self.chat_options))
            .inner;
        if let Some(action) = action {
            self.handle_chat_action(action);
        }

        notices::notices_overlay(ctx, &self.ui_state);
    }
}

/// Lists models and selects one for the active chat.
struct ModelLoader {
    backend: Rc<dyn OllamaPort>,
    history: ChatHistory,
    event_bus: EventBus,
    inbox: Rc<RefCell<Inbox>>,
    default_model: String,
}

impl ModelLoader {
    async fn load(&self) {
        let models = match self.backend.list_models().await {
            Ok(models) => models,
            Err(e) => {
                log::warn!("Failed to list models: {}", e);
                return;
            }
        };
        if models.is_empty() {
            self.event_bus.notice(NoticeLevel::Error, notice::NO_MODELS);
        }

        let runtime = self.history.runtime();
        let current = runtime.current_model();
        let keep_current = runtime.is_generating()
            || (runtime.has_messages() && models.iter().any(|m| m.name == current));
        if !keep_current {
            let last_used = match self.history.store().last_model().await {
                Ok(last) => last,
                Err(e) => {
                    log::warn!("Failed to read last model: {}", e);
                    None
                }
            };
            if let Some(model) = pick_model(&models, last_used.as_deref(), &self.default_model) {
                if model != current {
                    runtime.set_model(model);
                }
            }
        }

        log::info!("{} models available", models.len());
        let mut inbox = self.inbox.borrow_mut();
        inbox.models = Some(models);
        inbox.models_loaded = true;
    }
}

fn auto_save_delay(config: &AppConfig) -> u32 {
    if config.features.auto_save && config.features.chat_history {
        config.chat.auto_save_interval_ms
    } else {
        0
    }
}

fn mime_from_name(name: &str) -> String {
    let extension = name.rsplit('.').next().unwrap_or_default().to_lowercase();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "json" => "application/json",
        _ => "application/octet-stream",
    };
    mime.to_string()
}
