//! State of one running client: selection, in-flight flag, results.

use crate::client::SubmissionError;
use crate::counter::UsageCounter;
use crate::intake::{ImageSelection, SelectionState};
use crate::prediction::PredictionResult;
use crate::report::Report;
use std::time::{Duration, Instant};

/// A transient failure message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub raised_at: Instant,
}

/// The report on screen and when it appeared, for the card stagger.
#[derive(Debug, Clone, PartialEq)]
pub struct ShownReport {
    pub report: Report,
    pub shown_at: Instant,
}

/// What finishing a submission did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Report rendered; carries the new usage count.
    Rendered(u64),
    Failed,
}

pub struct AnalysisSession {
    selection: SelectionState,
    /// Bumped whenever the selection changes.
    selection_revision: u64,
    in_flight: bool,
    counter: UsageCounter,
    report: Option<ShownReport>,
    notice: Option<Notice>,
    notice_duration: Duration,
    stagger: Duration,
}

impl AnalysisSession {
    pub fn new(counter: UsageCounter, notice_duration: Duration, stagger: Duration) -> Self {
        Self {
            selection: SelectionState::Empty,
            selection_revision: 0,
            in_flight: false,
            counter,
            report: None,
            notice: None,
            notice_duration,
            stagger,
        }
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn selection_revision(&self) -> u64 {
        self.selection_revision
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn scans_count(&self) -> u64 {
        self.counter.count()
    }

    pub fn report(&self) -> Option<&ShownReport> {
        self.report.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn set_stagger(&mut self, stagger: Duration) {
        self.stagger = stagger;
    }

    pub fn notice_duration(&self) -> Duration {
        self.notice_duration
    }

    pub fn set_notice_duration(&mut self, duration: Duration) {
        self.notice_duration = duration;
    }

    /// Take an accepted image. `None` (a rejected candidate) changes
    /// nothing. Ignored while a submission is outstanding.
    pub fn select(&mut self, candidate: Option<ImageSelection>) -> bool {
        let Some(image) = candidate else {
            return false;
        };
        if self.in_flight {
            return false;
        }
        tracing::debug!("selected {} ({})", image.file_name, image.mime);
        self.selection = SelectionState::Preview(image);
        self.selection_revision += 1;
        self.report = None;
        true
    }

    /// Take a downloaded sample image, unless the selection changed since
    /// the download started at `requested_at` (a [`selection_revision`]).
    ///
    /// [`selection_revision`]: Self::selection_revision
    pub fn offer_sample(&mut self, image: ImageSelection, requested_at: u64) -> bool {
        if self.selection_revision != requested_at {
            tracing::info!("discarding sample {}: selection changed", image.file_name);
            return false;
        }
        self.select(Some(image))
    }

    /// Back to the empty state; hides any report.
    pub fn clear(&mut self) {
        if self.in_flight {
            return;
        }
        if self.selection.image().is_some() {
            self.selection_revision += 1;
        }
        self.selection = SelectionState::Empty;
        self.report = None;
    }

    pub fn can_submit(&self) -> bool {
        !self.in_flight && self.selection.image().is_some()
    }

    /// Start a submission, handing the image to `dispatch` exactly once.
    ///
    /// Without a selection, or while one is outstanding, this does nothing
    /// and returns `false`.
    pub fn submit<F>(&mut self, dispatch: F) -> bool
    where
        F: FnOnce(ImageSelection),
    {
        if !self.can_submit() {
            return false;
        }
        let Some(image) = self.selection.image().cloned() else {
            return false;
        };
        self.in_flight = true;
        tracing::info!("analysis started for {}", image.file_name);
        dispatch(image);
        true
    }

    /// Finish the outstanding submission. The session is ready to submit
    /// again afterwards whatever the outcome.
    pub fn complete(
        &mut self,
        outcome: Result<PredictionResult, SubmissionError>,
        now: Instant,
    ) -> Completion {
        self.in_flight = false;
        match outcome {
            Ok(payload) => {
                let report = Report::render_with_stagger(&payload, self.stagger);
                tracing::info!(
                    "analysis finished: {} ({}, {})",
                    report.name,
                    report.year,
                    report.headline
                );
                self.report = Some(ShownReport {
                    report,
                    shown_at: now,
                });
                Completion::Rendered(self.counter.increment())
            }
            Err(err) => {
                tracing::warn!("analysis failed: {err}");
                self.raise(err.user_message(), now);
                Completion::Failed
            }
        }
    }

    /// Show a failure message, replacing any current one.
    pub fn raise(&mut self, message: &str, now: Instant) {
        self.notice = Some(Notice {
            message: message.to_string(),
            raised_at: now,
        });
    }

    /// Drop the notice once it has been visible long enough.
    pub fn prune_notice(&mut self, now: Instant) {
        if self
            .notice
            .as_ref()
            .is_some_and(|n| now.saturating_duration_since(n.raised_at) >= self.notice_duration)
        {
            self.notice = None;
        }
    }
}
