//! Chat panel: transcript, typing indicator, staged attachments and input.

use egui::{self, Align, Layout, RichText, ScrollArea, Vec2};
use chat_types::message::{Attachment, AttachmentKind, Message, Origin};
use crate::state::{ChatIntent, UiState, TYPING};
use crate::theme::*;

/// Render the chat panel. Returns an intent when the user submits or clears.
pub fn chat_panel(ui: &mut egui::Ui, state: &mut UiState) -> Option<ChatIntent> {
    let mut intent = None;

    stage_dropped_files(ui, state);

    egui::Frame::default()
        .fill(BG_PRIMARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.vertical(|ui| {
                // Header
                ui.horizontal(|ui| {
                    ui.heading(RichText::new("Assistant").color(TEXT_PRIMARY).strong());
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let clear_enabled = !state.messages.is_empty() || state.is_busy();
                        if ui
                            .add_enabled(clear_enabled, egui::Button::new("Clear chat").small())
                            .clicked()
                        {
                            intent = Some(ChatIntent::Clear);
                        }
                        let status_color = if state.is_busy() { WARNING } else { SUCCESS };
                        ui.label(RichText::new(&state.status_text).color(status_color).small());
                    });
                });

                ui.separator();

                // Transcript
                let available_height = ui.available_height() - 90.0;
                let bubble_width = ui.available_width() * BUBBLE_MAX_WIDTH_RATIO;
                ScrollArea::vertical()
                    .max_height(available_height)
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        if state.messages.is_empty() {
                            ui.label(
                                RichText::new("Ask the assistant anything. Drop an image or audio file to reference it.")
                                    .color(TEXT_SECONDARY)
                                    .italics(),
                            );
                        }
                        for message in &state.messages {
                            render_message(ui, message, bubble_width, state.show_diagnostics);
                            ui.add_space(4.0);
                        }

                        if state.is_busy() {
                            ui.horizontal(|ui| {
                                ui.spinner();
                                ui.label(RichText::new(TYPING).color(TEXT_SECONDARY).small());
                            });
                        }
                    });

                ui.add_space(6.0);

                // Staged attachments
                if state.has_pending_attachment() {
                    ui.horizontal(|ui| {
                        if let Some(image) = &state.pending_image {
                            if attachment_chip(ui, image, true) {
                                state.pending_image = None;
                            }
                        }
                        if let Some(audio) = &state.pending_audio {
                            if attachment_chip(ui, audio, true) {
                                state.pending_audio = None;
                            }
                        }
                    });
                }

                // Input area
                ui.horizontal(|ui| {
                    let input = egui::TextEdit::singleline(&mut state.input_text)
                        .hint_text("Type a message...")
                        .desired_width(ui.available_width() - 70.0)
                        .font(egui::FontId::proportional(14.0));

                    let response = ui.add(input);

                    let send_enabled = state.can_send();
                    let send_btn = ui.add_enabled(
                        send_enabled,
                        egui::Button::new(RichText::new("Send").color(TEXT_PRIMARY))
                            .fill(if send_enabled { ACCENT } else { BG_SURFACE })
                            .corner_radius(PANEL_ROUNDING)
                            .min_size(Vec2::new(60.0, 0.0)),
                    );

                    let enter_pressed =
                        response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    if enter_pressed || send_btn.clicked() {
                        if let Some(submit) = state.take_submission() {
                            intent = Some(submit);
                        }
                        response.request_focus();
                    }
                });
            });
        });

    intent
}

/// Files dropped onto the window become staged attachments.
fn stage_dropped_files(ui: &egui::Ui, state: &mut UiState) {
    let dropped = ui.ctx().input(|i| i.raw.dropped_files.clone());
    for file in dropped {
        let name = if file.name.is_empty() {
            file.path
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment".to_string())
        } else {
            file.name.clone()
        };
        state.stage_attachment(&name, &file.mime);
    }
}

/// Returns true when the remove button was clicked.
fn attachment_chip(ui: &mut egui::Ui, attachment: &Attachment, removable: bool) -> bool {
    let mut removed = false;
    chip_frame().show(ui, |ui| {
        ui.horizontal(|ui| {
            let icon = match attachment.kind {
                AttachmentKind::Image => "🖼",
                AttachmentKind::Audio => "🎵",
            };
            ui.label(RichText::new(format!("{} {}", icon, attachment.name)).color(TEXT_PRIMARY).small());
            if removable && ui.small_button("✕").clicked() {
                removed = true;
            }
        });
    });
    removed
}

fn render_message(ui: &mut egui::Ui, message: &Message, max_width: f32, show_diagnostics: bool) {
    let (label, label_color, layout) = match message.origin {
        Origin::User => ("You", ACCENT, Layout::right_to_left(Align::Min)),
        Origin::Assistant if message.has_error() => ("Assistant", ERROR, Layout::left_to_right(Align::Min)),
        Origin::Assistant => ("Assistant", SUCCESS, Layout::left_to_right(Align::Min)),
    };
    let time = message
        .created_at
        .with_timezone(&chrono::Local)
        .format("%H:%M")
        .to_string();

    ui.with_layout(layout, |ui| {
        bubble_frame(message).show(ui, |ui| {
            ui.set_max_width(max_width);
            ui.vertical(|ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(label).color(label_color).strong().small());
                    ui.label(RichText::new(time).color(TEXT_SECONDARY).small());
                });
                for attachment in &message.attachments {
                    attachment_chip(ui, attachment, false);
                }
                if !message.content.is_empty() {
                    ui.label(RichText::new(&message.content).color(TEXT_PRIMARY));
                }
                if show_diagnostics {
                    if let Some(error) = &message.error {
                        ui.label(RichText::new(error).color(TEXT_SECONDARY).small().monospace());
                    }
                }
            });
        });
    });
}
