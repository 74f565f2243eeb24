//! Auto-dismissing failure notification in the top-right corner.

use autovision_core::session::Notice;
use eframe::egui::{self, Align2, Color32, RichText};
use std::time::{Duration, Instant};

const FADE: Duration = Duration::from_millis(300);

/// Opacity over the notice's lifetime: fade in, hold, fade out.
pub(super) fn notice_opacity(age: Duration, lifetime: Duration) -> f32 {
    let fade = FADE.as_secs_f32();
    let fade_in = age.as_secs_f32() / fade;
    let fade_out = lifetime.saturating_sub(age).as_secs_f32() / fade;
    fade_in.min(fade_out).clamp(0.0, 1.0)
}

pub(super) fn render_notice(ctx: &egui::Context, notice: &Notice, lifetime: Duration, now: Instant) {
    let age = now.saturating_duration_since(notice.raised_at);
    let opacity = notice_opacity(age, lifetime);

    egui::Area::new(egui::Id::new("failure-notice"))
        .order(egui::Order::Foreground)
        .anchor(Align2::RIGHT_TOP, egui::vec2(-20.0, 20.0))
        .interactable(false)
        .show(ctx, |ui| {
            ui.multiply_opacity(opacity);
            egui::Frame::new()
                .fill(Color32::from_rgba_unmultiplied(239, 68, 68, 230))
                .corner_radius(8.0)
                .inner_margin(egui::Margin::symmetric(18, 12))
                .show(ui, |ui| {
                    ui.label(RichText::new(&notice.message).color(Color32::WHITE));
                });
        });

    if opacity < 1.0 {
        ctx.request_repaint();
    } else {
        ctx.request_repaint_after(lifetime.saturating_sub(age).saturating_sub(FADE));
    }
}
