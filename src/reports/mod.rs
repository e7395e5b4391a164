/*!
# Reports Module

Renders analysis results.

## Supported formats:
- **Text** - human-readable console report, grouped per file
- **JSON** - structured report for tooling
- **SARIF 2.1.0** - for GitHub code scanning, Azure DevOps and other CI/CD

## Usage:

```rust,ignore
use pshelp_analyzer::reports::{generate_report, FileReport, ReportFormat};

let files = vec![FileReport::new("script.ps1", diagnostics)];
let sarif = generate_report(ReportFormat::Sarif, &files, false)?;
std::fs::write("pshelp.sarif", sarif)?;
```
*/

pub mod json;
pub mod sarif;
pub mod text;

pub use json::JsonReporter;
pub use sarif::SarifReporter;
pub use text::TextReporter;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::diagnostics::DiagnosticRecord;

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Text,
    Json,
    Sarif,
}

impl std::str::FromStr for ReportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            "sarif" => Ok(ReportFormat::Sarif),
            _ => Err(anyhow::anyhow!("Unknown report format: {}", s)),
        }
    }
}

/// Results for one analyzed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: String,
    pub diagnostics: Vec<DiagnosticRecord>,
    /// Set when the file could not be read or parsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    pub fn new(path: impl Into<String>, diagnostics: Vec<DiagnosticRecord>) -> Self {
        Self {
            path: path.into(),
            diagnostics,
            error: None,
        }
    }

    pub fn failed(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            diagnostics: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Totals over a set of file reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub files: usize,
    pub files_with_diagnostics: usize,
    pub diagnostics: usize,
    pub failed_files: usize,
}

impl ReportSummary {
    pub fn from_files(files: &[FileReport]) -> Self {
        Self {
            files: files.len(),
            files_with_diagnostics: files.iter().filter(|f| !f.diagnostics.is_empty()).count(),
            diagnostics: files.iter().map(|f| f.diagnostics.len()).sum(),
            failed_files: files.iter().filter(|f| f.error.is_some()).count(),
        }
    }
}

/// Report generator for one format
pub trait ReportGenerator {
    fn generate_report(&self, files: &[FileReport]) -> Result<String>;

    fn supported_format() -> ReportFormat
    where
        Self: Sized;
}

/// Renders `files` in the requested format
pub fn generate_report(format: ReportFormat, files: &[FileReport], use_colors: bool) -> Result<String> {
    match format {
        ReportFormat::Text => TextReporter::new(use_colors).generate_report(files),
        ReportFormat::Json => JsonReporter::new().generate_report(files),
        ReportFormat::Sarif => SarifReporter::default().generate_report(files),
    }
}

pub const TOOL_NAME: &str = "pshelp-analyzer";
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");
