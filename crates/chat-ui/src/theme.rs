//! Chat palette, bubble frames and the global egui style.

use egui::{Color32, CornerRadius, FontId, Frame, Margin, Stroke, TextStyle, Vec2};
use chat_types::message::{Message, Origin};

pub const BG_PRIMARY: Color32 = Color32::from_rgb(22, 24, 29);
pub const BG_SECONDARY: Color32 = Color32::from_rgb(34, 37, 44);
pub const BG_SURFACE: Color32 = Color32::from_rgb(48, 52, 61);
pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(230, 232, 236);
pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(150, 156, 168);
pub const ACCENT: Color32 = Color32::from_rgb(16, 163, 127);
pub const SUCCESS: Color32 = Color32::from_rgb(34, 197, 94);
pub const WARNING: Color32 = Color32::from_rgb(234, 179, 8);
pub const ERROR: Color32 = Color32::from_rgb(239, 68, 68);

pub const USER_BUBBLE: Color32 = Color32::from_rgb(28, 78, 66);
pub const ASSISTANT_BUBBLE: Color32 = BG_SECONDARY;
pub const ERROR_BUBBLE: Color32 = Color32::from_rgb(58, 26, 28);
pub const ATTACHMENT_CHIP: Color32 = BG_SURFACE;

pub const BUBBLE_ROUNDING: CornerRadius = CornerRadius::same(10);
pub const PANEL_ROUNDING: CornerRadius = CornerRadius::same(6);
pub const PANEL_PADDING: Vec2 = Vec2::new(12.0, 8.0);
/// Bubbles never span more than this share of the panel width
pub const BUBBLE_MAX_WIDTH_RATIO: f32 = 0.8;

/// Fill for a transcript entry: user, assistant, or a failed delivery
pub fn bubble_fill(message: &Message) -> Color32 {
    match message.origin {
        Origin::User => USER_BUBBLE,
        Origin::Assistant if message.has_error() => ERROR_BUBBLE,
        Origin::Assistant => ASSISTANT_BUBBLE,
    }
}

/// Frame around one transcript entry. Failed deliveries get a red outline
/// so they stay visible with diagnostics hidden.
pub fn bubble_frame(message: &Message) -> Frame {
    let stroke = if message.has_error() {
        Stroke::new(1.0, ERROR.linear_multiply(0.6))
    } else {
        Stroke::NONE
    };
    Frame::default()
        .fill(bubble_fill(message))
        .stroke(stroke)
        .corner_radius(BUBBLE_ROUNDING)
        .inner_margin(Margin::symmetric(10, 8))
}

/// Frame for an attachment name, inside a bubble or above the input
pub fn chip_frame() -> Frame {
    Frame::default()
        .fill(ATTACHMENT_CHIP)
        .stroke(Stroke::new(1.0, ACCENT.linear_multiply(0.3)))
        .corner_radius(PANEL_ROUNDING)
        .inner_margin(Margin::symmetric(6, 3))
}

/// Apply the dark chat theme to an egui context
pub fn apply_theme(ctx: &egui::Context) {
    ctx.style_mut(|style| {
        let visuals = &mut style.visuals;
        visuals.dark_mode = true;
        visuals.panel_fill = BG_PRIMARY;
        visuals.window_fill = BG_SECONDARY;
        visuals.window_corner_radius = PANEL_ROUNDING;
        // Text inputs sit on the assistant bubble colour
        visuals.extreme_bg_color = ASSISTANT_BUBBLE;
        visuals.hyperlink_color = ACCENT;
        visuals.text_cursor.stroke = Stroke::new(2.0, ACCENT);

        visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, BG_SURFACE);
        visuals.widgets.inactive.bg_fill = BG_SURFACE;
        visuals.widgets.inactive.weak_bg_fill = BG_SURFACE;
        visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, TEXT_SECONDARY);
        visuals.widgets.hovered.weak_bg_fill = USER_BUBBLE;
        visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, TEXT_PRIMARY);
        visuals.widgets.active.weak_bg_fill = ACCENT;
        visuals.widgets.active.fg_stroke = Stroke::new(1.0, TEXT_PRIMARY);

        visuals.selection.bg_fill = ACCENT.linear_multiply(0.4);
        visuals.selection.stroke = Stroke::new(1.0, ACCENT);

        // Timestamps and status lines use the small style
        style.text_styles.insert(TextStyle::Small, FontId::proportional(11.0));
        style.text_styles.insert(TextStyle::Body, FontId::proportional(14.0));

        style.spacing.item_spacing = Vec2::new(8.0, 6.0);
        style.spacing.button_padding = Vec2::new(10.0, 4.0);
    });
}
