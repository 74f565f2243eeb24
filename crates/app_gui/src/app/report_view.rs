//! Paints a rendered [`Report`](autovision_core::Report).

use autovision_core::report::{ConfidenceBar, Rgba, SpecCard};
use autovision_core::session::ShownReport;
use eframe::egui::{self, Color32, RichText, Stroke};
use std::time::{Duration, Instant};

const CARD_WIDTH: f32 = 200.0;
const CARD_FADE: Duration = Duration::from_millis(500);

/// Buttons under the report that need the app to act.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ReportAction {
    ExportCsv,
    CopySummary,
}

pub(super) fn color(c: Rgba) -> Color32 {
    let alpha = (c.a.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color32::from_rgba_unmultiplied(c.r, c.g, c.b, alpha)
}

/// Opacity of a card `elapsed` after the report appeared.
pub(super) fn card_opacity(reveal_after: Duration, elapsed: Duration) -> f32 {
    match elapsed.checked_sub(reveal_after) {
        None => 0.0,
        Some(since) => (since.as_secs_f32() / CARD_FADE.as_secs_f32()).min(1.0),
    }
}

pub(super) fn render_report(
    ui: &mut egui::Ui,
    shown: &ShownReport,
    now: Instant,
) -> Option<ReportAction> {
    let report = &shown.report;
    let elapsed = now.saturating_duration_since(shown.shown_at);
    let mut action = None;

    ui.horizontal(|ui| {
        ui.vertical(|ui| {
            ui.heading(RichText::new(&report.name).strong());
            ui.label(&report.year);
        });
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let palette = report.tier.palette();
            egui::Frame::new()
                .fill(color(palette.background))
                .stroke(Stroke::new(1.0, color(palette.border)))
                .corner_radius(8.0)
                .inner_margin(egui::Margin::symmetric(12, 6))
                .show(ui, |ui| {
                    ui.vertical(|ui| {
                        ui.label(
                            RichText::new(report.headline.to_string())
                                .size(22.0)
                                .strong()
                                .color(color(palette.text)),
                        );
                        ui.label(RichText::new(report.tier.label()).color(color(palette.text)));
                    });
                });
        });
    });

    ui.add_space(8.0);
    axis_bar(ui, "Model", &report.model_bar);
    axis_bar(ui, "Year", &report.year_bar);

    ui.add_space(12.0);
    ui.heading("Engine specifications");
    if report.cards.is_empty() {
        ui.weak("No specifications returned.");
    }
    let visible = report.revealed_cards(elapsed);
    ui.horizontal_wrapped(|ui| {
        for card in &report.cards[..visible] {
            let opacity = card_opacity(card.reveal_after, elapsed);
            ui.scope(|ui| {
                ui.multiply_opacity(opacity);
                spec_card(ui, card);
            });
        }
    });
    let settling = visible < report.cards.len()
        || report
            .cards
            .last()
            .is_some_and(|c| card_opacity(c.reveal_after, elapsed) < 1.0);
    if settling {
        ui.ctx().request_repaint();
    }

    if let Some(note) = &report.inference_note {
        ui.add_space(6.0);
        ui.weak(format!("Some specifications could not be inferred: {note}"));
    }

    ui.add_space(12.0);
    ui.horizontal(|ui| {
        if ui.button("Export CSV").clicked() {
            action = Some(ReportAction::ExportCsv);
        }
        if ui.button("Copy summary").clicked() {
            action = Some(ReportAction::CopySummary);
        }
    });

    action
}

fn axis_bar(ui: &mut egui::Ui, label: &str, bar: &ConfidenceBar) {
    ui.horizontal(|ui| {
        ui.add_sized([60.0, 18.0], egui::Label::new(label));
        ui.add(
            egui::ProgressBar::new(bar.fill)
                .desired_width(320.0)
                .text(bar.percent.to_string()),
        );
    });
}

fn spec_card(ui: &mut egui::Ui, card: &SpecCard) {
    egui::Frame::group(ui.style())
        .inner_margin(egui::Margin::same(10))
        .show(ui, |ui| {
            ui.set_width(CARD_WIDTH);
            ui.horizontal(|ui| {
                ui.label(card.descriptor.icon.glyph());
                ui.label(RichText::new(&*card.descriptor.label).strong());
            });
            ui.label(RichText::new(&card.display_value).size(18.0));
            ui.weak(format!("● {}", card.source));
            ui.label(format!("Confidence: {}", card.confidence.percent));
            ui.add(
                egui::ProgressBar::new(card.confidence.fill)
                    .desired_width(CARD_WIDTH)
                    .desired_height(4.0),
            );
        });
}
