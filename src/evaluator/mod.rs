/*!
# Script Evaluation

Dynamic parameters only exist at runtime, so learning their names means
running the `dynamicparam` block. Evaluation sits behind the
[`ScriptEvaluator`] trait: the rule hands over script text and a timeout
and receives output lines or an [`EvaluationError`].

- [`ProcessEvaluator`] runs each script in a fresh `pwsh` process.
- [`DisabledEvaluator`] refuses every script (dynamic resolution off).
*/

pub mod process;

pub use process::{encode_command, ProcessEvaluator};

use std::time::Duration;
use thiserror::Error;

use crate::ast::StatementAst;

/// Default bound on one evaluation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Why an evaluation produced no output lines
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("script evaluation is unavailable: {0}")]
    Unavailable(String),

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("evaluation timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    #[error("evaluation failed (exit code {}): {stderr}", .code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    Failed { code: Option<i32>, stderr: String },

    #[error("evaluation produced unreadable output: {0}")]
    InvalidOutput(String),
}

/// Runs a script in an isolated interpreter and returns its output lines
pub trait ScriptEvaluator: Send + Sync {
    fn evaluate(&self, script: &str, timeout: Duration) -> Result<Vec<String>, EvaluationError>;
}

/// Evaluator used when dynamic parameter resolution is turned off
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledEvaluator;

impl ScriptEvaluator for DisabledEvaluator {
    fn evaluate(&self, _script: &str, _timeout: Duration) -> Result<Vec<String>, EvaluationError> {
        Err(EvaluationError::Unavailable(
            "dynamic parameter resolution is disabled".to_string(),
        ))
    }
}

/// Script that runs a `dynamicparam` block's statements and writes the
/// names of the parameters it returns, one per line.
pub fn dynamic_parameter_script(statements: &[StatementAst]) -> String {
    let body: Vec<String> = statements.iter().map(|statement| statement.to_string()).collect();
    format!(
        "$ErrorActionPreference = 'Stop'\n$__dynamicParameters = @(. {{\n{}\n}})\n$__dynamicParameters[0].Keys | Write-Output\n",
        body.join("\n")
    )
}

/// Splits raw interpreter output into trimmed, non-blank lines
pub fn output_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
