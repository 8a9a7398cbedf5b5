//! Transient notices in the bottom-right corner.

use chatui_types::event::NoticeLevel;
use egui::{self, Align2, RichText};

use crate::state::UiState;
use crate::theme::{self, PANEL_ROUNDING};

pub fn notices_overlay(ctx: &egui::Context, state: &UiState) {
    if state.notices.is_empty() {
        return;
    }
    egui::Area::new(egui::Id::new("notices"))
        .anchor(Align2::RIGHT_BOTTOM, [-16.0, -16.0])
        .show(ctx, |ui| {
            let p = theme::palette(ui);
            for notice in &state.notices {
                let color = match notice.level {
                    NoticeLevel::Success => p.success,
                    NoticeLevel::Info => p.accent,
                    NoticeLevel::Error => p.error,
                };
                egui::Frame::default()
                    .fill(p.bg_surface)
                    .stroke(egui::Stroke::new(1.0, color))
                    .corner_radius(PANEL_ROUNDING)
                    .inner_margin(8.0)
                    .show(ui, |ui| {
                        ui.set_max_width(320.0);
                        ui.label(RichText::new(&notice.text).color(p.text_primary));
                    });
                ui.add_space(4.0);
            }
        });
}
