//! JSON report for tooling

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{FileReport, ReportFormat, ReportGenerator, ReportSummary, TOOL_NAME, TOOL_VERSION};

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    tool: &'static str,
    version: &'static str,
    generated_at: DateTime<Utc>,
    summary: ReportSummary,
    files: &'a [FileReport],
}

#[derive(Debug, Default, Clone)]
pub struct JsonReporter {
    pretty: bool,
}

impl JsonReporter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl ReportGenerator for JsonReporter {
    fn generate_report(&self, files: &[FileReport]) -> Result<String> {
        let report = JsonReport {
            tool: TOOL_NAME,
            version: TOOL_VERSION,
            generated_at: Utc::now(),
            summary: ReportSummary::from_files(files),
            files,
        };
        let json = if self.pretty {
            serde_json::to_string_pretty(&report)
        } else {
            serde_json::to_string(&report)
        };
        json.context("Failed to serialize JSON report")
    }

    fn supported_format() -> ReportFormat {
        ReportFormat::Json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ScriptExtent;
    use crate::diagnostics::{DiagnosticRecord, DiagnosticSeverity};

    #[test]
    fn test_json_report_shape() {
        let diagnostic = DiagnosticRecord::new(
            "Parameter 'Age' is missing documentation in the comment-based help.",
            ScriptExtent::empty(),
            "PSMissingParameterDocumentation",
            DiagnosticSeverity::Warning,
            Some("a.ps1".to_string()),
        )
        .with_subject("Age");
        let files = vec![FileReport::new("a.ps1", vec![diagnostic])];

        let output = JsonReporter::compact().generate_report(&files).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["tool"], "pshelp-analyzer");
        assert_eq!(value["summary"]["diagnostics"], 1);
        assert_eq!(value["files"][0]["diagnostics"][0]["subject"], "Age");
        assert_eq!(value["files"][0]["diagnostics"][0]["severity"], "Warning");
    }
}
