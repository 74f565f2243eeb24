//! Settings panel rendering for the service endpoints and timings.

use super::{Panel, UiApp};
use autovision_core::HttpPredictionClient;
use eframe::egui;
use std::sync::Arc;

impl UiApp {
    /// Renders the settings screen: endpoints, notification and card timing.
    pub(super) fn render_settings_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Settings");
        ui.add_space(8.0);
        egui::Grid::new("settings-grid")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                ui.label("Prediction endpoint");
                ui.add(
                    egui::TextEdit::singleline(&mut self.pending_endpoint).desired_width(360.0),
                );
                ui.end_row();

                ui.label("Sample endpoint");
                ui.add(
                    egui::TextEdit::singleline(&mut self.pending_sample_endpoint)
                        .desired_width(360.0),
                );
                ui.end_row();

                ui.label("Notification duration");
                ui.add(
                    egui::DragValue::new(&mut self.config.notice_seconds)
                        .range(1..=60)
                        .suffix(" s"),
                );
                ui.end_row();

                ui.label("Card reveal stagger");
                ui.add(
                    egui::DragValue::new(&mut self.config.stagger_ms)
                        .range(0..=1000)
                        .suffix(" ms"),
                );
                ui.end_row();
            });

        ui.add_space(12.0);
        let busy = self.session.in_flight() || self.sample_rx.is_some();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!busy, egui::Button::new("Apply and save"))
                .clicked()
            {
                self.apply_settings();
            }
            if busy {
                ui.weak("Wait for the running request to finish.");
            }
        });

        ui.add_space(16.0);
        ui.separator();
        ui.add_space(6.0);
        ui.heading("Versions");
        ui.label(format!("App version: {}", self.app_version));
        if let Some(path) = &self.config_path {
            ui.weak(format!("Settings file: {}", path.display()));
        }
    }

    fn apply_settings(&mut self) {
        self.config.endpoint = self.pending_endpoint.trim().to_string();
        self.config.sample_endpoint = self.pending_sample_endpoint.trim().to_string();
        match HttpPredictionClient::new(&self.config) {
            Ok(client) => self.client = Arc::new(client),
            Err(e) => {
                tracing::warn!("keeping previous client: {e}");
                self.status = "Could not apply endpoint".to_string();
                return;
            }
        }
        self.session.set_notice_duration(self.config.notice_duration());
        self.session.set_stagger(self.config.stagger());

        self.status = match &self.config_path {
            Some(path) => match self.config.save_to(path) {
                Ok(()) => "Settings saved".to_string(),
                Err(e) => {
                    tracing::warn!("{e}");
                    format!("Settings applied but not saved: {e}")
                }
            },
            None => "Settings applied for this session".to_string(),
        };
        self.panel = Panel::Analyze;
    }
}
