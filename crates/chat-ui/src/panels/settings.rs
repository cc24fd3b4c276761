//! Settings panel: Assistants API connection and polling bounds.

use egui::{self, RichText, Vec2};
use chat_types::config::ChatConfig;
use crate::theme::*;

/// What the caller should do after rendering the settings panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsAction {
    None,
    /// A field was edited but not applied yet
    Changed,
    /// The user clicked Apply; the caller rebuilds its API client
    ApplyClicked,
}

/// Result of the last apply, shown next to the button
#[derive(Debug, Clone)]
pub struct ApplyFeedback {
    pub message: String,
    pub success: bool,
}

pub fn settings_panel(
    ui: &mut egui::Ui,
    config: &mut ChatConfig,
    show_diagnostics: &mut bool,
    feedback: Option<&ApplyFeedback>,
) -> SettingsAction {
    let mut changed = false;
    let mut apply_clicked = false;

    egui::Frame::default()
        .fill(BG_SECONDARY)
        .inner_margin(PANEL_PADDING)
        .corner_radius(PANEL_ROUNDING)
        .show(ui, |ui| {
            ui.heading(RichText::new("Settings").color(TEXT_PRIMARY));
            ui.separator();

            // ── Connection ───────────────────────────────────
            ui.label(RichText::new("Assistant").color(ACCENT).strong());
            ui.add_space(2.0);

            ui.label(RichText::new("API Base URL").color(TEXT_SECONDARY).small());
            changed |= ui
                .add(egui::TextEdit::singleline(&mut config.api.api_base).hint_text("https://api.openai.com/v1"))
                .changed();

            ui.add_space(4.0);

            ui.label(RichText::new("API Key").color(TEXT_SECONDARY).small());
            changed |= ui
                .add(
                    egui::TextEdit::singleline(&mut config.api.api_key)
                        .password(true)
                        .hint_text("sk-..."),
                )
                .changed();

            ui.add_space(4.0);

            ui.label(RichText::new("Assistant ID").color(TEXT_SECONDARY).small());
            changed |= ui
                .add(egui::TextEdit::singleline(&mut config.api.assistant_id).hint_text("asst_..."))
                .changed();

            ui.add_space(4.0);

            ui.label(RichText::new("OpenAI-Beta header").color(TEXT_SECONDARY).small());
            changed |= ui.text_edit_singleline(&mut config.api.beta_header).changed();

            ui.add_space(12.0);
            ui.separator();
            ui.add_space(4.0);

            // ── Polling ──────────────────────────────────────
            ui.label(RichText::new("Polling").color(ACCENT).strong());
            ui.add_space(2.0);

            let polling = &mut config.polling;
            ui.label(RichText::new("Initial interval (ms)").color(TEXT_SECONDARY).small());
            changed |= ui
                .add(egui::Slider::new(&mut polling.initial_interval_ms, 100..=5_000))
                .changed();

            ui.label(RichText::new("Max interval (ms)").color(TEXT_SECONDARY).small());
            changed |= ui
                .add(egui::Slider::new(&mut polling.max_interval_ms, 100..=30_000))
                .changed();

            ui.label(RichText::new("Backoff multiplier").color(TEXT_SECONDARY).small());
            changed |= ui
                .add(egui::Slider::new(&mut polling.backoff_multiplier, 1.0..=3.0))
                .changed();

            ui.label(RichText::new("Max polls").color(TEXT_SECONDARY).small());
            changed |= ui
                .add(egui::Slider::new(&mut polling.max_attempts, 1..=500))
                .changed();

            ui.label(RichText::new("Timeout (ms)").color(TEXT_SECONDARY).small());
            changed |= ui
                .add(egui::Slider::new(&mut polling.timeout_ms, 10_000..=900_000))
                .changed();

            ui.add_space(8.0);
            ui.checkbox(show_diagnostics, "Show error details under failed replies");

            ui.add_space(16.0);
            ui.separator();
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                let btn = ui.add(
                    egui::Button::new(RichText::new("Apply").color(TEXT_PRIMARY).strong())
                        .fill(ACCENT)
                        .corner_radius(PANEL_ROUNDING)
                        .min_size(Vec2::new(120.0, 28.0)),
                );
                if btn.clicked() {
                    apply_clicked = true;
                }

                if let Some(fb) = feedback {
                    let color = if fb.success { SUCCESS } else { ERROR };
                    ui.label(RichText::new(&fb.message).color(color).small());
                }
            });

            if !config.api.is_configured() {
                ui.add_space(4.0);
                ui.label(
                    RichText::new("API key and assistant ID are required before chatting.")
                        .color(WARNING)
                        .small()
                        .italics(),
                );
            }
        });

    if apply_clicked {
        SettingsAction::ApplyClicked
    } else if changed {
        SettingsAction::Changed
    } else {
        SettingsAction::None
    }
}
