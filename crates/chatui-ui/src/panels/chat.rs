//! Chat panel: header with model selector, message list and composer.

use chatui_types::config::AppConfig;
use chatui_types::message::{Feedback, Message, MessageImage, MessageMetadata, Role};
use chatui_types::model::ServerStatus;
use chatui_types::notice;
use egui::{self, Align, Layout, RichText, ScrollArea, Vec2};

use crate::state::UiState;
use crate::theme::{self, Palette, PANEL_PADDING, PANEL_ROUNDING};

pub const SUGGESTED_PROMPTS: &[&str] = &[
    "Explain a concept in simple terms",
    "Help me write a short email",
    "Summarize the key points of a topic",
    "Give me ideas for a weekend project",
];

/// Optional chat capabilities, decided once from the config.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPanelOptions {
    pub model_selector: bool,
    pub message_actions: bool,
    pub regeneration: bool,
    pub image_upload: bool,
    pub timestamps: bool,
    pub welcome_screen: bool,
    pub suggested_prompts: bool,
    pub max_input_length: usize,
    pub show_character_count: bool,
    pub submit_on_enter: bool,
    pub max_messages_display: usize,
}

impl ChatPanelOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        let features = &config.features;
        Self {
            model_selector: features.model_selector,
            message_actions: features.message_actions,
            regeneration: features.message_actions && features.message_regeneration,
            image_upload: features.image_upload,
            timestamps: features.timestamps || config.ui.show_timestamps,
            welcome_screen: features.welcome_screen,
            suggested_prompts: features.suggested_prompts,
            max_input_length: config.ui.max_input_length,
            show_character_count: config.ui.show_character_count,
            submit_on_enter: config.ui.submit_on_enter,
            max_messages_display: config.ui.max_messages_display,
        }
    }
}

impl Default for ChatPanelOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// What the user asked for this frame
#[derive(Debug, Clone, PartialEq)]
pub enum ChatAction {
    /// Send text with the images that were attached to it
    Send(String, Vec<MessageImage>),
    Stop,
    Regenerate,
    Feedback { message_id: String, feedback: Option<Feedback> },
    Copy(String),
    Delete(String),
    SelectModel(String),
    RefreshModels,
}

/// Render the chat panel. Returns an action when the user did something.
pub fn chat_panel(ui: &mut egui::Ui, state: &mut UiState, options: &ChatPanelOptions) -> Option<ChatAction> {
    let p = theme::palette(ui);
    let mut action = None;

    egui::Frame::default()
        .fill(p.bg_primary)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.vertical(|ui| {
                header(ui, p, state, options, &mut action);
                ui.separator();

                let available_height = ui.available_height() - composer_height(options);
                ScrollArea::vertical()
                    .max_height(available_height)
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        if state.messages.is_empty() {
                            if options.welcome_screen {
                                welcome(ui, p, state, options, &mut action);
                            }
                            return;
                        }
                        let regenerable = if options.regeneration {
                            state.regenerable_message().map(str::to_string)
                        } else {
                            None
                        };
                        let skip = state.messages.len().saturating_sub(options.max_messages_display);
                        for message in state.messages.iter().skip(skip) {
                            let can_regenerate = regenerable.as_deref() == Some(message.id.as_str());
                            if let Some(a) = render_message(ui, p, message, options, can_regenerate, state.is_busy()) {
                                action = Some(a);
                            }
                            ui.add_space(4.0);
                        }
                    });

                ui.add_space(8.0);
                if let Some(a) = composer(ui, p, state, options) {
                    action = Some(a);
                }
            });
        });

    action
}

fn composer_height(options: &ChatPanelOptions) -> f32 {
    if options.show_character_count { 96.0 } else { 80.0 }
}

fn header(
    ui: &mut egui::Ui,
    p: &Palette,
    state: &UiState,
    options: &ChatPanelOptions,
    action: &mut Option<ChatAction>,
) {
    ui.horizontal(|ui| {
        let title = if state.title.is_empty() { "New Chat" } else { state.title.as_str() };
        ui.heading(RichText::new(title).color(p.text_primary).strong());

        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            let (dot, color) = match state.server_status {
                ServerStatus::Online => ("● Online", p.success),
                ServerStatus::Offline => ("● Offline", p.error),
                ServerStatus::Checking => ("● Checking", p.warning),
            };
            ui.label(RichText::new(dot).color(color).small());

            let status_color = if state.is_busy() { p.warning } else { p.text_secondary };
            ui.label(RichText::new(&state.status_text).color(status_color).small());

            if options.model_selector {
                if ui.small_button("⟳").on_hover_text("Refresh models").clicked() {
                    *action = Some(ChatAction::RefreshModels);
                }
                ui.add_enabled_ui(!state.is_busy(), |ui| {
                    egui::ComboBox::from_id_salt("model_selector")
                        .selected_text(model_label(state))
                        .show_ui(ui, |ui| {
                            for model in &state.models {
                                let selected = model.name == state.current_model;
                                let label = format!("{} ({})", model.display_name(), model.human_size());
                                if ui.selectable_label(selected, label).clicked() && !selected {
                                    *action = Some(ChatAction::SelectModel(model.name.clone()));
                                }
                            }
                        });
                });
            }
        });
    });
}

fn model_label(state: &UiState) -> String {
    match state.current_model_info() {
        Some(model) => model.display_name(),
        None if state.current_model.is_empty() => "No model".to_string(),
        None => state.current_model.clone(),
    }
}

fn welcome(
    ui: &mut egui::Ui,
    p: &Palette,
    state: &UiState,
    options: &ChatPanelOptions,
    action: &mut Option<ChatAction>,
) {
    ui.add_space(24.0);
    ui.vertical_centered(|ui| {
        ui.heading(RichText::new("How can I help you today?").color(p.text_primary));
        ui.add_space(12.0);
        if !options.suggested_prompts {
            return;
        }
        for prompt in SUGGESTED_PROMPTS {
            let button = egui::Button::new(RichText::new(*prompt).color(p.text_primary))
                .fill(p.bg_secondary)
                .corner_radius(PANEL_ROUNDING)
                .min_size(Vec2::new(280.0, 28.0));
            if ui.add_enabled(!state.is_busy(), button).clicked() {
                *action = Some(ChatAction::Send(prompt.to_string(), Vec::new()));
            }
        }
    });
}

fn render_message(
    ui: &mut egui::Ui,
    p: &Palette,
    message: &Message,
    options: &ChatPanelOptions,
    can_regenerate: bool,
    busy: bool,
) -> Option<ChatAction> {
    let mut action = None;
    let is_error = notice::is_error_content(&message.content);
    let (label, label_color, bg) = match message.role {
        Role::User => ("You", p.accent, p.bg_secondary),
        Role::Assistant if is_error => ("Assistant", p.error, p.error_bg),
        Role::Assistant => ("Assistant", p.success, p.bg_secondary),
    };

    egui::Frame::default()
        .fill(bg)
        .corner_radius(PANEL_ROUNDING)
        .inner_margin(8.0)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new(label).color(label_color).strong().small());
                if options.timestamps {
                    let local = message.timestamp.with_timezone(&chrono::Local);
                    ui.label(RichText::new(local.format("%H:%M").to_string()).color(p.text_secondary).small());
                }
            });

            for image in &message.images {
                ui.label(RichText::new(format!("📎 {}", image.url)).color(p.text_secondary).small());
            }

            if message.is_loading && message.content.is_empty() {
                ui.spinner();
            } else {
                ui.horizontal_wrapped(|ui| {
                    ui.label(RichText::new(&message.content).color(p.text_primary));
                    if message.is_loading {
                        ui.label(RichText::new("▌").color(p.accent).strong());
                    }
                });
            }

            if let Some(meta) = &message.metadata {
                let text = metadata_line(meta);
                if !text.is_empty() {
                    ui.label(RichText::new(text).color(p.text_secondary).small());
                }
            }

            if options.message_actions && !message.is_loading {
                ui.horizontal(|ui| {
                    if ui.small_button("Copy").clicked() {
                        action = Some(ChatAction::Copy(message.content.clone()));
                    }
                    if message.role == Role::Assistant && !is_error {
                        for (feedback, icon) in [(Feedback::Liked, "👍"), (Feedback::Disliked, "👎")] {
                            let active = message.feedback == Some(feedback);
                            if ui.selectable_label(active, icon).clicked() {
                                action = Some(ChatAction::Feedback {
                                    message_id: message.id.clone(),
                                    feedback: (!active).then_some(feedback),
                                });
                            }
                        }
                    }
                    if can_regenerate && ui.small_button("Regenerate").clicked() {
                        action = Some(ChatAction::Regenerate);
                    }
                    if ui.add_enabled(!busy, egui::Button::new("Delete").small()).clicked() {
                        action = Some(ChatAction::Delete(message.id.clone()));
                    }
                });
            }
        });

    action
}

/// "llama3 · 1.2s · 42 tokens"
pub fn metadata_line(meta: &MessageMetadata) -> String {
    let mut parts = Vec::new();
    if let Some(model) = &meta.model {
        parts.push(model.clone());
    }
    if let Some(ms) = meta.processing_time_ms {
        parts.push(format!("{:.1}s", ms as f64 / 1000.0));
    }
    if let Some(tokens) = meta.token_count {
        parts.push(format!("{} tokens", tokens));
    }
    parts.join(" · ")
}

fn composer(ui: &mut egui::Ui, p: &Palette, state: &mut UiState, options: &ChatPanelOptions) -> Option<ChatAction> {
    let mut action = None;

    if options.image_upload && !state.pending_images.is_empty() {
        let mut removed = None;
        ui.horizontal_wrapped(|ui| {
            for image in &state.pending_images {
                if ui.small_button(format!("📎 {} ✕", image.url)).clicked() {
                    removed = Some(image.id.clone());
                }
            }
        });
        if let Some(id) = removed {
            state.remove_image(&id);
        }
    }

    ui.horizontal(|ui| {
        let input_id = ui.make_persistent_id("chat_input");
        let enter_pressed = options.submit_on_enter
            && ui.memory(|m| m.has_focus(input_id))
            && ui.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Enter));

        let hint = if options.image_upload {
            "Type a message... (drop images to attach)"
        } else {
            "Type a message..."
        };
        let input = egui::TextEdit::multiline(&mut state.input_text)
            .id(input_id)
            .hint_text(hint)
            .char_limit(options.max_input_length)
            .desired_rows(2)
            .desired_width(ui.available_width() - 70.0)
            .font(egui::FontId::proportional(14.0));
        let response = ui.add(input);

        if state.is_busy() {
            let stop = ui.add(
                egui::Button::new(RichText::new("Stop").color(p.on_accent))
                    .fill(p.error)
                    .corner_radius(PANEL_ROUNDING)
                    .min_size(Vec2::new(60.0, 0.0)),
            );
            if stop.clicked() {
                action = Some(ChatAction::Stop);
            }
            return;
        }

        let send_enabled = state.can_submit();
        let send_btn = ui.add_enabled(
            send_enabled,
            egui::Button::new(RichText::new("Send").color(p.on_accent))
                .fill(if send_enabled { p.accent } else { p.bg_surface })
                .corner_radius(PANEL_ROUNDING)
                .min_size(Vec2::new(60.0, 0.0)),
        );

        if enter_pressed || send_btn.clicked() {
            if let Some((text, images)) = state.take_submission() {
                action = Some(ChatAction::Send(text, images));
            }
            response.request_focus();
        }
    });

    if options.show_character_count {
        let count = state.input_text.chars().count();
        let color = if count >= options.max_input_length { p.error } else { p.text_secondary };
        ui.label(RichText::new(format!("{}/{}", count, options.max_input_length)).color(color).small());
    }

    action
}
