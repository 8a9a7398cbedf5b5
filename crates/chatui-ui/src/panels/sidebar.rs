//! History sidebar: new chat, search, stored chats and backup.

use chatui_types::session::ChatSummary;
use chrono::{DateTime, Utc};
use egui::{self, RichText, ScrollArea, Vec2};

use crate::state::{RenameDraft, UiState};
use crate::theme::{self, PANEL_PADDING, PANEL_ROUNDING};

#[derive(Debug, Clone, PartialEq)]
pub enum SidebarAction {
    NewChat,
    Select(String),
    Delete(String),
    Star { id: String, starred: bool },
    Rename { id: String, title: String },
    /// The search box changed; an empty query has already reset the list
    Search(String),
    Export,
    Cleanup,
}

/// Render the sidebar. Returns an action for the caller to handle.
pub fn sidebar_panel(ui: &mut egui::Ui, state: &mut UiState, allow_export: bool) -> Option<SidebarAction> {
    let p = theme::palette(ui);
    let mut action = None;

    egui::Frame::default()
        .fill(p.bg_secondary)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            let new_chat = ui.add_enabled(
                !state.is_busy(),
                egui::Button::new(RichText::new("+ New Chat").color(p.on_accent).strong())
                    .fill(p.accent)
                    .corner_radius(PANEL_ROUNDING)
                    .min_size(Vec2::new(ui.available_width(), 28.0)),
            );
            if new_chat.clicked() {
                action = Some(SidebarAction::NewChat);
            }

            ui.add_space(6.0);
            let search = ui.add(
                egui::TextEdit::singleline(&mut state.search_query)
                    .hint_text("Search chats...")
                    .desired_width(f32::INFINITY),
            );
            if search.changed() {
                let query = state.search_query.trim().to_string();
                if query.is_empty() {
                    state.search_results = None;
                }
                action = Some(SidebarAction::Search(query));
            }

            ui.separator();

            let footer_height = if allow_export { 64.0 } else { 24.0 };
            ScrollArea::vertical()
                .max_height(ui.available_height() - footer_height)
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    if let Some(a) = chat_list(ui, state) {
                        action = Some(a);
                    }
                });

            ui.separator();
            if allow_export {
                ui.horizontal(|ui| {
                    if ui.button("Export").clicked() {
                        action = Some(SidebarAction::Export);
                    }
                    if ui.button("Clean up").on_hover_text("Remove the oldest chats").clicked() {
                        action = Some(SidebarAction::Cleanup);
                    }
                });
                ui.label(
                    RichText::new("Drop an exported .json file to import")
                        .color(p.text_secondary)
                        .small()
                        .italics(),
                );
            }
        });

    action
}

fn chat_list(ui: &mut egui::Ui, state: &mut UiState) -> Option<SidebarAction> {
    let p = theme::palette(ui);
    let mut action = None;
    let now = Utc::now();

    let chats = sorted_for_display(state.visible_history());
    if chats.is_empty() {
        let text = if state.search_results.is_some() { "No matching chats" } else { "No saved chats yet" };
        ui.label(RichText::new(text).color(p.text_secondary).small());
        return None;
    }

    for chat in chats {
        let active = state.chat_id.as_deref() == Some(chat.id.as_str());
        let fill = if active { p.bg_surface } else { p.bg_secondary };

        egui::Frame::default()
            .fill(fill)
            .corner_radius(PANEL_ROUNDING)
            .inner_margin(6.0)
            .show(ui, |ui| {
                let editing = state.renaming.as_ref().is_some_and(|d| d.id == chat.id);
                if editing {
                    if let Some(a) = rename_row(ui, state) {
                        action = Some(a);
                    }
                } else {
                    let title = ui.add(
                        egui::Label::new(RichText::new(&chat.title).color(p.text_primary).strong())
                            .truncate()
                            .sense(egui::Sense::click()),
                    );
                    if title.clicked() && !active && !state.is_busy() {
                        action = Some(SidebarAction::Select(chat.id.clone()));
                    }
                }

                ui.label(RichText::new(&chat.last_message).color(p.text_secondary).small());
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new(format!(
                            "{} · {} messages",
                            relative_time(chat.timestamp, now),
                            chat.message_count
                        ))
                        .color(p.text_secondary)
                        .small(),
                    );
                    let star = if chat.starred { "★" } else { "☆" };
                    if ui.small_button(star).clicked() {
                        action = Some(SidebarAction::Star { id: chat.id.clone(), starred: !chat.starred });
                    }
                    if ui.small_button("✏").on_hover_text("Rename").clicked() {
                        state.renaming = Some(RenameDraft { id: chat.id.clone(), title: chat.title.clone() });
                    }
                    if ui.small_button("🗑").on_hover_text("Delete").clicked() {
                        action = Some(SidebarAction::Delete(chat.id.clone()));
                    }
                });
            });
        ui.add_space(4.0);
    }

    action
}

fn rename_row(ui: &mut egui::Ui, state: &mut UiState) -> Option<SidebarAction> {
    let mut action = None;
    let mut close = false;
    if let Some(draft) = state.renaming.as_mut() {
        ui.horizontal(|ui| {
            let edit = ui.add(egui::TextEdit::singleline(&mut draft.title).desired_width(ui.available_width() - 56.0));
            let submitted = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            let confirmed = ui.small_button("✔").clicked();
            if (submitted || confirmed) && !draft.title.trim().is_empty() {
                action = Some(SidebarAction::Rename { id: draft.id.clone(), title: draft.title.trim().to_string() });
                close = true;
            }
            if ui.small_button("✕").clicked() {
                close = true;
            }
        });
    }
    if close {
        state.renaming = None;
    }
    action
}

/// Starred chats first, each group keeping its newest-first order
pub fn sorted_for_display(chats: &[ChatSummary]) -> Vec<ChatSummary> {
    let mut sorted = chats.to_vec();
    sorted.sort_by_key(|chat| !chat.starred);
    sorted
}

/// "Just now", "5m ago", "3h ago", "2d ago", then the calendar date
pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);
    if elapsed.num_minutes() < 1 {
        "Just now".to_string()
    } else if elapsed.num_hours() < 1 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_days() < 1 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_days() < 7 {
        format!("{}d ago", elapsed.num_days())
    } else {
        at.format("%Y-%m-%d").to_string()
    }
}
