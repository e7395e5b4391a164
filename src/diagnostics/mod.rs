//! Diagnostic records emitted by rules
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::ScriptExtent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DiagnosticSeverity {
    Information,
    Warning,
    Error,
    ParseError,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Information => write!(f, "information"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::ParseError => write!(f, "parse error"),
        }
    }
}

/// Machine-applicable edit: replace the range with `text`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionExtent {
    pub start_line: usize,
    pub end_line: usize,
    pub start_column: usize,
    pub end_column: usize,
    pub text: String,
    pub file: Option<String>,
    pub description: String,
}

impl CorrectionExtent {
    pub fn new(
        start_line: usize,
        end_line: usize,
        start_column: usize,
        end_column: usize,
        text: impl Into<String>,
        file: Option<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            start_line,
            end_line,
            start_column,
            end_column,
            text: text.into(),
            file,
            description: description.into(),
        }
    }
}

/// One finding of a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub message: String,
    pub extent: ScriptExtent,
    pub rule_name: String,
    pub severity: DiagnosticSeverity,
    pub script_path: Option<String>,
    /// Declared name of the function the finding belongs to
    pub function_name: Option<String>,
    /// What the finding is about, e.g. the undocumented parameter
    pub subject: Option<String>,
    #[serde(default)]
    pub suggested_corrections: Vec<CorrectionExtent>,
}

impl DiagnosticRecord {
    pub fn new(
        message: impl Into<String>,
        extent: ScriptExtent,
        rule_name: impl Into<String>,
        severity: DiagnosticSeverity,
        script_path: Option<String>,
    ) -> Self {
        Self {
            message: message.into(),
            extent,
            rule_name: rule_name.into(),
            severity,
            script_path,
            function_name: None,
            subject: None,
            suggested_corrections: Vec::new(),
        }
    }

    pub fn with_function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_correction(mut self, correction: CorrectionExtent) -> Self {
        self.suggested_corrections.push(correction);
        self
    }

    /// `file:line:column` of the start of the extent
    pub fn location(&self) -> String {
        format!(
            "{}:{}:{}",
            self.script_path.as_deref().unwrap_or("<script>"),
            self.extent.start_line,
            self.extent.start_column
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ScriptPosition;

    #[test]
    fn test_builder_and_location() {
        let extent = ScriptExtent::new(
            ScriptPosition::new(4, 1, 30),
            ScriptPosition::new(6, 2, 60),
            "function f {}",
        );
        let record = DiagnosticRecord::new(
            "message",
            extent,
            "PSMissingParameterDocumentation",
            DiagnosticSeverity::Warning,
            Some("a.ps1".to_string()),
        )
        .with_function_name("f")
        .with_subject("Age");

        assert_eq!(record.location(), "a.ps1:4:1");
        assert_eq!(record.function_name.as_deref(), Some("f"));
        assert_eq!(record.subject.as_deref(), Some("Age"));
        assert!(record.suggested_corrections.is_empty());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(DiagnosticSeverity::Warning < DiagnosticSeverity::Error);
        assert_eq!(DiagnosticSeverity::ParseError.to_string(), "parse error");
    }
}
