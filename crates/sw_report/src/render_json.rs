//! render_json.rs: canonical JSON document for the admin report.
//!
//! Layout (keys sorted by the canonical writer):
//! `{ "format": "sw-report/1", "integrity": { "report_sha256": .. }, "report": {..} }`
//!
//! The digest is over the canonical bytes of `report` alone.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::info;

use sw_io::canonical_json::{to_canonical_bytes, to_canonical_json_bytes, write_atomic};
use sw_io::hasher::sha256_hex;
use sw_io::IoError;

use crate::structure::ReportModel;
use crate::ReportError;

pub const REPORT_FILE: &str = "report.json";
const FORMAT: &str = "sw-report/1";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub sha256: String,
}

pub fn render_json(model: &ReportModel) -> Result<RenderedReport, ReportError> {
    let body = to_canonical_bytes(model)?;
    let sha256 = sha256_hex(&body);
    let report: Value = serde_json::from_slice(&body).map_err(IoError::from)?;
    let doc = json!({
        "format": FORMAT,
        "integrity": { "report_sha256": sha256 },
        "report": report,
    });
    Ok(RenderedReport { bytes: to_canonical_json_bytes(&doc)?, sha256 })
}

/// Recompute the digest of a rendered document; returns it when it matches.
pub fn verify_document(bytes: &[u8]) -> Result<String, ReportError> {
    let doc: Value = serde_json::from_slice(bytes).map_err(IoError::from)?;
    let claimed = doc
        .pointer("/integrity/report_sha256")
        .and_then(Value::as_str)
        .ok_or(ReportError::DigestMismatch)?;
    let report = doc.get("report").ok_or(ReportError::DigestMismatch)?;
    let actual = sha256_hex(&to_canonical_json_bytes(report)?);
    if actual == claimed {
        Ok(actual)
    } else {
        Err(ReportError::DigestMismatch)
    }
}

/// Render and write `<dir>/report.json` atomically.
pub fn write_report(dir: &Path, model: &ReportModel) -> Result<(PathBuf, String), ReportError> {
    let rendered = render_json(model)?;
    let path = dir.join(REPORT_FILE);
    write_atomic(&path, &rendered.bytes)?;
    info!(path = %path.display(), sha256 = %rendered.sha256, "report written");
    Ok((path, rendered.sha256))
}
