//! Core of the AutoVision client: payload types, the report renderer and
//! the plumbing around a single analysis.

pub mod catalog;
pub mod client;
pub mod config;
pub mod counter;
pub mod export;
pub mod intake;
pub mod prediction;
pub mod report;
pub mod session;

pub use client::{HttpPredictionClient, PredictionBackend, SubmissionError};
pub use config::AppConfig;
pub use counter::{JsonFileStore, UsageCounter};
pub use export::export_csv;
pub use intake::{ImageSelection, SelectionState};
pub use prediction::{PredictionResult, SpecEntry, SpecValue};
pub use report::{ConfidenceTier, Report, SpecCard};
pub use session::{AnalysisSession, Completion};
