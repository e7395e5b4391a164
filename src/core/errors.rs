/*!
# Error System for PSHelp Analyzer

Errors that stop an analysis. Recoverable problems (a failing dynamic
parameter evaluation, for instance) never reach this type; they are
logged and the analysis continues.
*/

use std::path::PathBuf;
use thiserror::Error;

use super::ScriptPosition;

/// Fatal analysis error
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The caller handed in no syntax tree at all.
    #[error("syntax tree is absent; nothing to analyze")]
    NullAst,

    #[error("parse error at {position}: {message}")]
    Parse {
        message: String,
        position: ScriptPosition,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("rule '{rule}' failed: {message}")]
    Rule { rule: String, message: String },
}

impl AnalysisError {
    pub fn parse(message: impl Into<String>, position: ScriptPosition) -> Self {
        Self::Parse {
            message: message.into(),
            position,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = AnalysisError::parse("missing closing '}'", ScriptPosition::new(3, 7, 40));
        assert_eq!(err.to_string(), "parse error at 3:7: missing closing '}'");
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err = AnalysisError::io(
            "missing.ps1",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().starts_with("failed to read missing.ps1"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
