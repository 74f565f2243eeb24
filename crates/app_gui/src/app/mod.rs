//! Desktop shell: wires picker, drag-and-drop and the worker threads to the
//! analysis session and paints the result.

mod notice;
mod report_view;
mod settings;

use anyhow::Result;
use autovision_core::config::{self, AppConfig};
use autovision_core::counter::{CounterStore, JsonFileStore, MemoryStore};
use autovision_core::intake::{self, ImageSelection};
use autovision_core::{
    AnalysisSession, Completion, HttpPredictionClient, PredictionBackend, PredictionResult,
    SubmissionError, UsageCounter, export_csv,
};
use eframe::{App, Frame, egui};
use report_view::ReportAction;
use rfd::FileDialog;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Instant;

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "bmp"];
const PREVIEW_HEIGHT: f32 = 280.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Panel {
    Analyze,
    Settings,
}

type AnalysisOutcome = Result<PredictionResult, SubmissionError>;
type SampleOutcome = Result<ImageSelection, SubmissionError>;

pub struct UiApp {
    config: AppConfig,
    config_path: Option<PathBuf>,
    client: Arc<HttpPredictionClient>,
    session: AnalysisSession,
    analysis_rx: Option<Receiver<AnalysisOutcome>>,
    sample_rx: Option<Receiver<SampleOutcome>>,
    /// Selection revision when the pending sample was requested.
    sample_requested_at: u64,
    /// Bumped on every new selection so the image loader never serves a
    /// stale preview.
    preview_generation: u64,
    panel: Panel,
    pending_endpoint: String,
    pending_sample_endpoint: String,
    status: String,
    app_version: &'static str,
}

impl UiApp {
    pub fn new() -> Result<Self> {
        let (config_path, store): (Option<PathBuf>, Box<dyn CounterStore>) =
            match config::app_dir() {
                Ok(dir) => (
                    Some(dir.join(config::CONFIG_FILE)),
                    Box::new(JsonFileStore::in_dir(&dir)),
                ),
                Err(err) => {
                    tracing::warn!("usage count and settings will not be saved: {err}");
                    (None, Box::new(MemoryStore::default()))
                }
            };
        let config = config_path
            .as_deref()
            .map(AppConfig::load_or_default)
            .unwrap_or_default();
        let client = Arc::new(HttpPredictionClient::new(&config)?);
        let session = AnalysisSession::new(
            UsageCounter::open(store),
            config.notice_duration(),
            config.stagger(),
        );
        tracing::info!("prediction endpoint: {}", client.endpoint());

        Ok(Self {
            pending_endpoint: config.endpoint.clone(),
            pending_sample_endpoint: config.sample_endpoint.clone(),
            config,
            config_path,
            client,
            session,
            analysis_rx: None,
            sample_rx: None,
            sample_requested_at: 0,
            preview_generation: 0,
            panel: Panel::Analyze,
            status: String::new(),
            app_version: env!("AUTOVISION_VERSION"),
        })
    }

    fn preview_uri(&self, image: &ImageSelection) -> String {
        format!(
            "bytes://selection/{}/{}",
            self.preview_generation, image.file_name
        )
    }

    fn take_selection(&mut self, ctx: &egui::Context, candidate: Option<ImageSelection>) {
        self.replace_selection(ctx, |session| session.select(candidate));
    }

    fn replace_selection(
        &mut self,
        ctx: &egui::Context,
        change: impl FnOnce(&mut AnalysisSession) -> bool,
    ) {
        let old_uri = self.session.selection().image().map(|img| self.preview_uri(img));
        if change(&mut self.session) {
            self.preview_generation += 1;
            if let Some(uri) = old_uri {
                ctx.forget_image(&uri);
            }
            self.status.clear();
        }
    }

    fn clear_selection(&mut self, ctx: &egui::Context) {
        if let Some(img) = self.session.selection().image() {
            ctx.forget_image(&self.preview_uri(img));
        }
        self.session.clear();
    }

    fn pick_file(&mut self, ctx: &egui::Context) {
        let Some(path) = FileDialog::new()
            .add_filter("Images", &IMAGE_EXTENSIONS)
            .set_directory(".")
            .pick_file()
        else {
            return;
        };
        self.load_from_path(ctx, &path, None);
    }

    fn load_from_path(&mut self, ctx: &egui::Context, path: &Path, declared: Option<&str>) {
        match intake::load_path(path, declared) {
            Ok(candidate) => self.take_selection(ctx, candidate),
            Err(err) => {
                tracing::warn!("{err:#}");
                self.status = format!("Could not open {}", path.display());
            }
        }
    }

    /// Only the first dropped file is considered.
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let Some(file) = dropped.into_iter().next() else {
            return;
        };
        let declared = (!file.mime.is_empty()).then_some(file.mime.as_str());
        if let Some(bytes) = file.bytes.clone() {
            let mime = declared.or_else(|| intake::mime_for_path(Path::new(&file.name)));
            self.take_selection(ctx, intake::accept(&file.name, mime, bytes));
        } else if let Some(path) = file.path.as_deref() {
            self.load_from_path(ctx, path, declared);
        }
    }

    fn start_analysis(&mut self, ctx: &egui::Context) {
        let client = Arc::clone(&self.client);
        let repaint = ctx.clone();
        let (tx, rx) = mpsc::channel();
        let started = self.session.submit(move |image| {
            thread::spawn(move || {
                let outcome = client.predict(&image);
                let _ = tx.send(outcome);
                repaint.request_repaint();
            });
        });
        if started {
            self.status.clear();
            self.analysis_rx = Some(rx);
        }
    }

    fn poll_analysis(&mut self) {
        let Some(rx) = &self.analysis_rx else {
            return;
        };
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => Err(SubmissionError::Interrupted),
        };
        self.analysis_rx = None;
        if let Completion::Rendered(count) = self.session.complete(outcome, Instant::now()) {
            self.status = format!("Analysis complete ({count} total)");
        }
    }

    fn start_sample(&mut self, ctx: &egui::Context) {
        if self.sample_rx.is_some() || self.session.in_flight() {
            return;
        }
        let client = Arc::clone(&self.client);
        let repaint = ctx.clone();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(client.random_sample());
            repaint.request_repaint();
        });
        self.sample_rx = Some(rx);
        self.sample_requested_at = self.session.selection_revision();
    }

    fn poll_sample(&mut self, ctx: &egui::Context) {
        let Some(rx) = &self.sample_rx else {
            return;
        };
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => Err(SubmissionError::Interrupted),
        };
        self.sample_rx = None;
        match outcome {
            Ok(image) => {
                let requested_at = self.sample_requested_at;
                self.replace_selection(ctx, |session| session.offer_sample(image, requested_at));
            }
            Err(err) => {
                tracing::warn!("sample image: {err}");
                self.session.raise(err.user_message(), Instant::now());
            }
        }
    }

    fn export_report(&mut self) {
        let Some(shown) = self.session.report() else {
            return;
        };
        let Some(path) = FileDialog::new()
            .add_filter("CSV", &["csv"])
            .set_file_name("autovision_report.csv")
            .save_file()
        else {
            return;
        };
        if let Err(e) = export_csv(&shown.report, &path) {
            tracing::warn!("export failed: {e:#}");
            self.status = format!("Export failed: {e}");
        } else {
            self.status = format!("CSV exported: {}", path.display());
        }
    }

    fn copy_summary(&mut self) {
        let Some(shown) = self.session.report() else {
            return;
        };
        let summary = shown.report.summary();
        match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(summary)) {
            Ok(()) => self.status = "Summary copied".to_string(),
            Err(e) => {
                tracing::warn!("clipboard unavailable: {e}");
                self.status = "Could not copy to clipboard".to_string();
            }
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("AutoVision");
                ui.separator();
                ui.selectable_value(&mut self.panel, Panel::Analyze, "Analyze");
                ui.selectable_value(&mut self.panel, Panel::Settings, "Settings");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let target = self.session.scans_count() as f32;
                    let shown = ctx.animate_value_with_time(egui::Id::new("scans-count"), target, 0.5);
                    ui.label(format!("Analyses: {}", shown.floor() as u64));
                    if !self.status.is_empty() {
                        ui.separator();
                        ui.weak(&self.status);
                    }
                });
            });
        });
    }

    fn render_upload_area(&mut self, ui: &mut egui::Ui) {
        let ctx = ui.ctx().clone();
        let hovering = ctx.input(|i| !i.raw.hovered_files.is_empty());
        let busy = self.session.in_flight();
        let stroke_color = if hovering {
            ui.visuals().selection.bg_fill
        } else {
            ui.visuals().widgets.noninteractive.bg_stroke.color
        };

        egui::Frame::group(ui.style())
            .stroke(egui::Stroke::new(2.0, stroke_color))
            .inner_margin(egui::Margin::same(16))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                match self.session.selection().image().cloned() {
                    None => {
                        ui.vertical_centered(|ui| {
                            ui.add_space(24.0);
                            ui.label("Drop a photo of a vehicle here");
                            ui.add_space(8.0);
                            ui.horizontal(|ui| {
                                if ui
                                    .add_enabled(!busy, egui::Button::new("Choose photo..."))
                                    .clicked()
                                {
                                    self.pick_file(&ctx);
                                }
                                let sample_busy = self.sample_rx.is_some();
                                if ui
                                    .add_enabled(!busy && !sample_busy, egui::Button::new("Try a sample"))
                                    .clicked()
                                {
                                    self.start_sample(&ctx);
                                }
                                if sample_busy {
                                    ui.spinner();
                                }
                            });
                            ui.add_space(24.0);
                        });
                    }
                    Some(image) => {
                        let uri = self.preview_uri(&image);
                        ui.vertical_centered(|ui| {
                            ui.add(
                                egui::Image::from_bytes(
                                    uri,
                                    egui::load::Bytes::Shared(image.bytes.clone()),
                                )
                                .max_height(PREVIEW_HEIGHT)
                                .maintain_aspect_ratio(true),
                            );
                            ui.label(&image.file_name);
                            if ui
                                .add_enabled(!busy, egui::Button::new("Remove"))
                                .clicked()
                            {
                                self.clear_selection(&ctx);
                            }
                        });
                    }
                }
            });

        ui.add_space(10.0);
        ui.vertical_centered(|ui| {
            if busy {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Analyzing...");
                });
            } else if ui
                .add_enabled(
                    self.session.can_submit(),
                    egui::Button::new("Analyze vehicle").min_size(egui::vec2(180.0, 32.0)),
                )
                .clicked()
            {
                self.start_analysis(&ctx);
            }
        });
    }
}

impl App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_analysis();
        self.poll_sample(ctx);
        self.handle_dropped_files(ctx);
        self.session.prune_notice(Instant::now());

        self.render_top_bar(ctx);

        egui::CentralPanel::default().show(ctx, |ui| match self.panel {
            Panel::Analyze => {
                egui::ScrollArea::vertical()
                    .auto_shrink([false; 2])
                    .show(ui, |ui| {
                        self.render_upload_area(ui);
                        let mut action = None;
                        if let Some(shown) = self.session.report() {
                            ui.add_space(16.0);
                            ui.separator();
                            action = report_view::render_report(ui, shown, Instant::now());
                        }
                        match action {
                            Some(ReportAction::ExportCsv) => self.export_report(),
                            Some(ReportAction::CopySummary) => self.copy_summary(),
                            None => {}
                        }
                    });
            }
            Panel::Settings => self.render_settings_panel(ui),
        });

        if let Some(notice) = self.session.notice() {
            notice::render_notice(ctx, notice, self.session.notice_duration(), Instant::now());
        }
    }
}
