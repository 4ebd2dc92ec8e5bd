use anyhow::Result;
use passfit_vision::{ComplianceResult, PhotoStandard};
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;

/// Machine-readable report for one photo.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub image: &'a Path,
    pub standard: &'a PhotoStandard,
    pub result: &'a ComplianceResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<&'a Path>,
}

impl Report<'_> {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Human-readable report: one line per check, then the metrics.
pub fn render_text(image: &Path, result: &ComplianceResult) -> String {
    let mut out = String::new();
    let verdict = if result.passed { "PASS" } else { "FAIL" };
    let _ = writeln!(out, "{}  {}", verdict, image.display());

    for check in &result.checks {
        let mark = if check.passed { "✓" } else { "✗" };
        let _ = writeln!(out, "  {} {}: {}", mark, check.label, check.message);
    }

    let m = &result.metrics;
    let _ = writeln!(out, "metrics:");
    let _ = writeln!(out, "  faces:          {}", m.face_count);
    if result.face_data.is_some() {
        let _ = writeln!(out, "  head height:    {:.1}%", m.head_height_percent);
        let _ = writeln!(out, "  eye height:     {:.1}%", m.eye_height_percent);
        let _ = writeln!(out, "  head tilt:      {:.1}°", m.head_tilt_degrees);
        let _ = writeln!(
            out,
            "  center offset:  {:.1}%",
            m.horizontal_center_offset_percent
        );
    }

    if let Some(failure) = result.primary_failure() {
        let _ = writeln!(out, "fix first: {}", failure.message);
    }

    out
}
