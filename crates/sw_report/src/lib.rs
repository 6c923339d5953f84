//! crates/sw_report/src/lib.rs
//! Offline admin report: who took part, and what the group weighted.
//!
//! Determinism rules:
//! - No store access here. Callers pass the overview and export views.
//! - Stable section order; strategies in `(order, id)` order, indicators by
//!   descending average then id (as the consolidation gives them).
//! - The rendered document is canonical JSON; its digest covers the report
//!   body only, so it can be recomputed from the file.

#![deny(unsafe_code)]

use std::fmt;

pub mod render_json;
pub mod structure;

pub use render_json::{render_json, verify_document, write_report, RenderedReport, REPORT_FILE};
pub use structure::{
    build_model, Cover, IndicatorLine, Participation, ParticipantLine, ReportModel, StrategySection,
};

// ===== Errors =====
#[derive(Debug)]
pub enum ReportError {
    /// The overview and export are for different surveys.
    SurveyMismatch { overview: String, export: String },
    /// Digest in a rendered document does not match its body.
    DigestMismatch,
    Io(sw_io::IoError),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::SurveyMismatch { overview, export } => {
                write!(f, "overview is for survey {overview}, export is for {export}")
            }
            ReportError::DigestMismatch => write!(f, "report digest does not match its body"),
            ReportError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ReportError {}

impl From<sw_io::IoError> for ReportError {
    fn from(e: sw_io::IoError) -> Self {
        ReportError::Io(e)
    }
}
