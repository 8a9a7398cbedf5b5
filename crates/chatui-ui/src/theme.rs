//! UI theme: a dark and a light palette over the same spacing constants.

use chatui_types::config::Theme;
use egui::{Color32, CornerRadius, Stroke, Vec2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub bg_primary: Color32,
    pub bg_secondary: Color32,
    pub bg_surface: Color32,
    pub text_primary: Color32,
    pub text_secondary: Color32,
    pub accent: Color32,
    pub on_accent: Color32,
    pub success: Color32,
    pub error: Color32,
    pub error_bg: Color32,
    pub warning: Color32,
}

pub const DARK: Palette = Palette {
    bg_primary: Color32::from_rgb(24, 24, 27),
    bg_secondary: Color32::from_rgb(39, 39, 42),
    bg_surface: Color32::from_rgb(52, 52, 56),
    text_primary: Color32::from_rgb(228, 228, 231),
    text_secondary: Color32::from_rgb(161, 161, 170),
    accent: Color32::from_rgb(99, 102, 241),
    on_accent: Color32::from_rgb(255, 255, 255),
    success: Color32::from_rgb(34, 197, 94),
    error: Color32::from_rgb(239, 68, 68),
    error_bg: Color32::from_rgb(50, 20, 20),
    warning: Color32::from_rgb(234, 179, 8),
};

pub const LIGHT: Palette = Palette {
    bg_primary: Color32::from_rgb(255, 255, 255),
    bg_secondary: Color32::from_rgb(244, 244, 245),
    bg_surface: Color32::from_rgb(228, 228, 231),
    text_primary: Color32::from_rgb(24, 24, 27),
    text_secondary: Color32::from_rgb(82, 82, 91),
    accent: Color32::from_rgb(79, 70, 229),
    on_accent: Color32::from_rgb(255, 255, 255),
    success: Color32::from_rgb(22, 163, 74),
    error: Color32::from_rgb(220, 38, 38),
    error_bg: Color32::from_rgb(254, 226, 226),
    warning: Color32::from_rgb(202, 138, 4),
};

pub const PANEL_ROUNDING: CornerRadius = CornerRadius::same(6);
pub const PANEL_PADDING: Vec2 = Vec2::new(12.0, 8.0);

/// Palette matching the visuals currently in effect
pub fn palette(ui: &egui::Ui) -> &'static Palette {
    if ui.visuals().dark_mode { &DARK } else { &LIGHT }
}

pub fn preference(theme: Theme) -> egui::ThemePreference {
    match theme {
        Theme::Light => egui::ThemePreference::Light,
        Theme::Dark => egui::ThemePreference::Dark,
        Theme::Auto => egui::ThemePreference::System,
    }
}

/// Install both palettes and select `theme`. `Auto` follows the system.
pub fn apply_theme(ctx: &egui::Context, theme: Theme) {
    ctx.set_visuals_of(egui::Theme::Dark, visuals(egui::Visuals::dark(), &DARK));
    ctx.set_visuals_of(egui::Theme::Light, visuals(egui::Visuals::light(), &LIGHT));
    ctx.style_mut(|style| style.spacing.item_spacing = Vec2::new(8.0, 6.0));
    ctx.set_theme(preference(theme));
}

fn visuals(mut visuals: egui::Visuals, p: &Palette) -> egui::Visuals {
    visuals.panel_fill = p.bg_primary;
    visuals.window_fill = p.bg_secondary;
    visuals.extreme_bg_color = p.bg_secondary;

    visuals.widgets.inactive.bg_fill = p.bg_surface;
    visuals.widgets.inactive.weak_bg_fill = p.bg_surface;
    visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, p.text_secondary);
    visuals.widgets.hovered.bg_fill = p.bg_surface;
    visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, p.text_primary);
    visuals.widgets.active.bg_fill = p.accent;
    visuals.widgets.active.fg_stroke = Stroke::new(1.0, p.on_accent);

    visuals.selection.bg_fill = p.accent.linear_multiply(0.4);
    visuals.selection.stroke = Stroke::new(1.0, p.accent);
    visuals
}
