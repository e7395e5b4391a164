/*!
# Text Reporter

Console report grouped per file. Colors come from `colored` and can be
switched off for CI logs and redirected output.
*/

use anyhow::Result;
use colored::{ColoredString, Colorize};
use std::fmt::Write as _;

use super::{FileReport, ReportFormat, ReportGenerator, ReportSummary};
use crate::diagnostics::{DiagnosticRecord, DiagnosticSeverity};

/// Text reporter for console output
pub struct TextReporter {
    use_colors: bool,
}

impl TextReporter {
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Plain reporter for CI/CD
    pub fn plain() -> Self {
        Self::new(false)
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> ColoredString) -> String {
        if self.use_colors {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn severity(&self, severity: DiagnosticSeverity) -> String {
        let label = severity.to_string();
        match severity {
            DiagnosticSeverity::Information => self.paint(&label, |s| s.blue()),
            DiagnosticSeverity::Warning => self.paint(&label, |s| s.yellow()),
            DiagnosticSeverity::Error | DiagnosticSeverity::ParseError => {
                self.paint(&label, |s| s.red().bold())
            }
        }
    }

    fn diagnostic_line(&self, diagnostic: &DiagnosticRecord) -> String {
        let position = format!(
            "{}:{}",
            diagnostic.extent.start_line, diagnostic.extent.start_column
        );
        let mut line = format!(
            "  {} {} {}",
            self.paint(&position, |s| s.dimmed()),
            self.severity(diagnostic.severity),
            self.paint(&diagnostic.rule_name, |s| s.cyan()),
        );
        if let Some(function) = &diagnostic.function_name {
            let _ = write!(line, " [{}]", function);
        }
        let _ = write!(line, " {}", diagnostic.message);
        line
    }

    fn summary(&self, summary: &ReportSummary) -> String {
        let mut text = format!(
            "{} {} file(s), {} diagnostic(s)",
            self.paint("Summary:", |s| s.bold()),
            summary.files,
            summary.diagnostics
        );
        if summary.failed_files > 0 {
            let failed = format!("{} failed", summary.failed_files);
            let _ = write!(text, ", {}", self.paint(&failed, |s| s.red()));
        }
        text.push('\n');
        text
    }
}

impl ReportGenerator for TextReporter {
    fn generate_report(&self, files: &[FileReport]) -> Result<String> {
        let mut output = String::new();

        for file in files {
            if file.diagnostics.is_empty() && file.error.is_none() {
                continue;
            }
            output.push_str(&self.paint(&file.path, |s| s.bold().underline()));
            output.push('\n');

            if let Some(error) = &file.error {
                let _ = writeln!(output, "  {} {}", self.severity(DiagnosticSeverity::ParseError), error);
            }
            for diagnostic in &file.diagnostics {
                output.push_str(&self.diagnostic_line(diagnostic));
                output.push('\n');
            }
            output.push('\n');
        }

        output.push_str(&self.summary(&ReportSummary::from_files(files)));
        Ok(output)
    }

    fn supported_format() -> ReportFormat {
        ReportFormat::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ScriptExtent, ScriptPosition};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_report() {
        let extent = ScriptExtent::new(
            ScriptPosition::new(8, 1, 0),
            ScriptPosition::new(10, 2, 0),
            "",
        );
        let diagnostic = DiagnosticRecord::new(
            "Parameter 'Age' is missing documentation in the comment-based help.",
            extent,
            "PSMissingParameterDocumentation",
            DiagnosticSeverity::Warning,
            Some("a.ps1".to_string()),
        )
        .with_function_name("f");
        let files = vec![
            FileReport::new("a.ps1", vec![diagnostic]),
            FileReport::new("clean.ps1", Vec::new()),
        ];

        let output = TextReporter::plain().generate_report(&files).unwrap();
        assert_eq!(
            output,
            "a.ps1\n  8:1 warning PSMissingParameterDocumentation [f] Parameter 'Age' is missing documentation in the comment-based help.\n\nSummary: 2 file(s), 1 diagnostic(s)\n"
        );
    }

    #[test]
    fn test_failed_file_is_listed() {
        let files = vec![FileReport::failed("bad.ps1", "parse error at 1:1: missing closing '}'")];
        let output = TextReporter::plain().generate_report(&files).unwrap();
        assert!(output.contains("bad.ps1\n  parse error parse error at 1:1"));
        assert!(output.ends_with("Summary: 1 file(s), 0 diagnostic(s), 1 failed\n"));
    }
}
