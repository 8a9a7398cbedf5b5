//! Settings panel: server, chat, appearance and storage options.
//! Edits a draft config; nothing applies until the user clicks Save.

use chatui_types::config::{AppConfig, StorageBackendType, Theme};
use chatui_types::model::ModelInfo;
use chatui_types::session::StorageInfo;
use egui::{self, RichText, Vec2};

use crate::theme::{self, Palette, PANEL_PADDING, PANEL_ROUNDING};

/// What the caller should do after rendering the settings panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsAction {
    /// Nothing changed
    None,
    /// A draft field was edited
    Changed,
    /// The user clicked Save
    SaveClicked,
    /// The user asked to restore defaults
    ResetClicked,
}

/// Save feedback passed in from the app layer
#[derive(Debug, Clone, PartialEq)]
pub struct SaveFeedback {
    pub message: String,
    pub success: bool,
}

/// Render the settings panel. Returns an action for the caller to handle.
pub fn settings_panel(
    ui: &mut egui::Ui,
    draft: &mut AppConfig,
    models: &[ModelInfo],
    storage_info: Option<&StorageInfo>,
    save_feedback: Option<&SaveFeedback>,
) -> SettingsAction {
    let p = theme::palette(ui);
    let mut changed = false;
    let mut save_clicked = false;
    let mut reset_clicked = false;

    egui::Frame::default()
        .fill(p.bg_secondary)
        .inner_margin(PANEL_PADDING)
        .corner_radius(PANEL_ROUNDING)
        .show(ui, |ui| {
            ui.heading(RichText::new("Settings").color(p.text_primary));
            ui.separator();

            egui::ScrollArea::vertical()
                .max_height(ui.available_height() - 56.0)
                .show(ui, |ui| {
                    changed |= server_section(ui, p, draft);
                    section_break(ui);
                    changed |= chat_section(ui, p, draft, models);
                    section_break(ui);
                    changed |= appearance_section(ui, p, draft);
                    section_break(ui);
                    changed |= storage_section(ui, p, draft, storage_info);
                });

            // ── Save Button ──────────────────────────────────
            ui.add_space(8.0);
            ui.separator();
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                let btn = ui.add(
                    egui::Button::new(RichText::new("Save Settings").color(p.on_accent).strong())
                        .fill(p.accent)
                        .corner_radius(PANEL_ROUNDING)
                        .min_size(Vec2::new(120.0, 28.0)),
                );
                if btn.clicked() {
                    save_clicked = true;
                }
                if ui.button("Reset").clicked() {
                    reset_clicked = true;
                }

                if let Some(fb) = save_feedback {
                    let color = if fb.success { p.success } else { p.error };
                    ui.label(RichText::new(&fb.message).color(color).small());
                }
            });
        });

    if save_clicked {
        SettingsAction::SaveClicked
    } else if reset_clicked {
        SettingsAction::ResetClicked
    } else if changed {
        SettingsAction::Changed
    } else {
        SettingsAction::None
    }
}

fn section_break(ui: &mut egui::Ui) {
    ui.add_space(12.0);
    ui.separator();
    ui.add_space(4.0);
}

fn field_label(ui: &mut egui::Ui, p: &Palette, text: &str) {
    ui.label(RichText::new(text).color(p.text_secondary).small());
}

fn server_section(ui: &mut egui::Ui, p: &Palette, draft: &mut AppConfig) -> bool {
    let mut changed = false;
    ui.label(RichText::new("Ollama Server").color(p.accent).strong());
    ui.add_space(2.0);

    field_label(ui, p, "Server URL");
    changed |= ui
        .add(egui::TextEdit::singleline(&mut draft.ollama.base_url).hint_text("http://localhost:11434"))
        .changed();

    ui.add_space(4.0);
    field_label(ui, p, "Request timeout (ms)");
    changed |= ui
        .add(egui::Slider::new(&mut draft.ollama.timeout_ms, 5_000..=300_000).step_by(1_000.0))
        .changed();

    field_label(ui, p, "Health check interval (ms)");
    changed |= ui
        .add(egui::Slider::new(&mut draft.ollama.health_check_interval_ms, 5_000..=300_000).step_by(1_000.0))
        .changed();
    changed
}

fn chat_section(ui: &mut egui::Ui, p: &Palette, draft: &mut AppConfig, models: &[ModelInfo]) -> bool {
    let mut changed = false;
    ui.label(RichText::new("Chat").color(p.accent).strong());
    ui.add_space(2.0);

    field_label(ui, p, "Default model");
    let selected = if draft.chat.default_model.is_empty() {
        "First available".to_string()
    } else {
        draft.chat.default_model.clone()
    };
    egui::ComboBox::from_id_salt("default_model")
        .selected_text(selected)
        .show_ui(ui, |ui| {
            changed |= ui
                .selectable_value(&mut draft.chat.default_model, String::new(), "First available")
                .changed();
            for model in models {
                changed |= ui
                    .selectable_value(&mut draft.chat.default_model, model.name.clone(), model.name.as_str())
                    .changed();
            }
        });

    ui.add_space(4.0);
    changed |= ui.checkbox(&mut draft.features.streaming, "Stream responses").changed();
    ui.add_enabled_ui(draft.features.streaming, |ui| {
        field_label(ui, p, "Chunks per flush");
        changed |= ui
            .add(egui::Slider::new(&mut draft.chat.streaming_chunk_size, 1..=20))
            .changed();
        field_label(ui, p, "Flush interval (ms)");
        changed |= ui
            .add(egui::Slider::new(&mut draft.chat.streaming_interval_ms, 50..=1_000))
            .changed();
    });

    ui.add_space(4.0);
    let mut auto_save = draft.features.auto_save && draft.chat.auto_save_interval_ms > 0;
    if ui.checkbox(&mut auto_save, "Auto-save chats").changed() {
        draft.features.auto_save = auto_save;
        if auto_save && draft.chat.auto_save_interval_ms == 0 {
            draft.chat.auto_save_interval_ms = AppConfig::default().chat.auto_save_interval_ms;
        }
        changed = true;
    }
    if auto_save {
        field_label(ui, p, "Auto-save delay (ms)");
        changed |= ui
            .add(egui::Slider::new(&mut draft.chat.auto_save_interval_ms, 1_000..=30_000).step_by(500.0))
            .changed();
    }

    field_label(ui, p, "Chats to keep on clean up");
    changed |= ui
        .add(egui::Slider::new(&mut draft.chat.max_chat_history, 5..=500))
        .changed();
    changed
}

fn appearance_section(ui: &mut egui::Ui, p: &Palette, draft: &mut AppConfig) -> bool {
    let mut changed = false;
    ui.label(RichText::new("Appearance").color(p.accent).strong());
    ui.add_space(2.0);

    if draft.features.dark_mode {
        field_label(ui, p, "Theme");
        egui::ComboBox::from_id_salt("theme")
            .selected_text(theme_label(draft.ui.default_theme))
            .show_ui(ui, |ui| {
                for theme in [Theme::Auto, Theme::Light, Theme::Dark] {
                    changed |= ui
                        .selectable_value(&mut draft.ui.default_theme, theme, theme_label(theme))
                        .changed();
                }
            });
        ui.add_space(4.0);
    }

    changed |= ui.checkbox(&mut draft.ui.show_timestamps, "Show timestamps").changed();
    changed |= ui.checkbox(&mut draft.ui.show_character_count, "Show character count").changed();
    changed |= ui.checkbox(&mut draft.ui.submit_on_enter, "Send with Enter").changed();
    changed |= ui.checkbox(&mut draft.features.debug_mode, "Debug logging").changed();
    changed
}

fn storage_section(ui: &mut egui::Ui, p: &Palette, draft: &mut AppConfig, info: Option<&StorageInfo>) -> bool {
    let mut changed = false;
    ui.label(RichText::new("Storage").color(p.accent).strong());
    ui.add_space(2.0);

    field_label(ui, p, "Backend");
    egui::ComboBox::from_id_salt("storage_backend")
        .selected_text(storage_label(draft.storage.backend))
        .show_ui(ui, |ui| {
            for backend in STORAGE_OPTIONS {
                changed |= ui
                    .selectable_value(&mut draft.storage.backend, backend, storage_label(backend))
                    .changed();
            }
        });

    ui.add_space(4.0);
    ui.label(
        RichText::new(storage_description(draft.storage.backend))
            .color(p.text_secondary)
            .small()
            .italics(),
    );
    if let Some(info) = info {
        ui.add_space(4.0);
        field_label(ui, p, &storage_usage(info));
    }
    changed
}

/// "3 chats · 12.4 KB of 5120 KB"
pub fn storage_usage(info: &StorageInfo) -> String {
    format!(
        "{} chats · {:.1} KB of {:.0} KB",
        info.chat_count,
        info.used as f64 / 1024.0,
        (info.used + info.available) as f64 / 1024.0
    )
}

const STORAGE_OPTIONS: [StorageBackendType; 4] = [
    StorageBackendType::Auto,
    StorageBackendType::IndexedDb,
    StorageBackendType::LocalStorage,
    StorageBackendType::Memory,
];

pub fn theme_label(theme: Theme) -> &'static str {
    match theme {
        Theme::Auto => "System",
        Theme::Light => "Light",
        Theme::Dark => "Dark",
    }
}

pub fn storage_label(backend: StorageBackendType) -> &'static str {
    match backend {
        StorageBackendType::Auto => "Auto-detect",
        StorageBackendType::Memory => "Memory",
        StorageBackendType::LocalStorage => "localStorage",
        StorageBackendType::IndexedDb => "IndexedDB",
    }
}

pub fn storage_description(backend: StorageBackendType) -> &'static str {
    match backend {
        StorageBackendType::Auto => "Automatically selects the best available backend. Tries IndexedDB, then localStorage, then Memory.",
        StorageBackendType::Memory => "Fast but volatile. All chats are lost on page reload.",
        StorageBackendType::LocalStorage => "Small synchronous browser storage, usually about 5 MB per site.",
        StorageBackendType::IndexedDb => "Persistent browser storage. Chats survive page reloads and browser restarts.",
    }
}

/// Draft changes that only take effect after a page reload
pub fn needs_reload(saved: &AppConfig, draft: &AppConfig) -> bool {
    saved.ollama != draft.ollama
        || saved.storage != draft.storage
        || saved.features.debug_mode != draft.features.debug_mode
}
