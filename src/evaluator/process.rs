//! Out-of-process evaluation through the PowerShell executable

use base64::Engine as _;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{output_lines, EvaluationError, ScriptEvaluator};

pub const DEFAULT_INTERPRETER: &str = "pwsh";

/// Encodes a script for `-EncodedCommand`: base64 of its UTF-16LE bytes
pub fn encode_command(script: &str) -> String {
    let bytes: Vec<u8> = script.encode_utf16().flat_map(u16::to_le_bytes).collect();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Spawns one interpreter process per evaluation. The encoded script is
/// passed as the last argument. The process is killed when the timeout
/// elapses.
#[derive(Debug, Clone)]
pub struct ProcessEvaluator {
    program: String,
    args: Vec<String>,
}

impl Default for ProcessEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_INTERPRETER, Self::default_args())
    }
}

impl ProcessEvaluator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn default_args() -> Vec<String> {
        ["-NoLogo", "-NoProfile", "-NonInteractive", "-EncodedCommand"]
            .iter()
            .map(|arg| arg.to_string())
            .collect()
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn spawn_error(&self, source: std::io::Error) -> EvaluationError {
        EvaluationError::Spawn {
            program: self.program.clone(),
            source,
        }
    }

    async fn run(&self, script: &str, timeout: Duration) -> Result<Vec<String>, EvaluationError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(encode_command(script))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| self.spawn_error(e))?;
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| self.spawn_error(e))?,
            // dropping the child kills it
            Err(_) => return Err(EvaluationError::Timeout(timeout)),
        };

        if !output.status.success() {
            return Err(EvaluationError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| EvaluationError::InvalidOutput(e.to_string()))?;
        Ok(output_lines(&stdout))
    }
}

impl ScriptEvaluator for ProcessEvaluator {
    /// Blocks on a private current-thread runtime; must not be called
    /// from inside another tokio runtime.
    fn evaluate(&self, script: &str, timeout: Duration) -> Result<Vec<String>, EvaluationError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| self.spawn_error(e))?;
        tracing::trace!("evaluating {} bytes with {}", script.len(), self.program);
        runtime.block_on(self.run(script, timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_command_is_utf16le_base64() {
        assert_eq!(encode_command("a"), "YQA=");
        assert_eq!(encode_command(""), "");
    }

    #[test]
    fn test_default_invocation() {
        let evaluator = ProcessEvaluator::default();
        assert_eq!(evaluator.program(), "pwsh");
        assert_eq!(evaluator.args.last().map(String::as_str), Some("-EncodedCommand"));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let evaluator = ProcessEvaluator::new("pshelp-analyzer-no-such-interpreter", Vec::new());
        let err = evaluator.evaluate("1", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, EvaluationError::Spawn { .. }));
    }

    // `sh -c SCRIPT ENCODED` runs SCRIPT; the encoded command lands in $0.
    #[cfg(unix)]
    fn shell(script: &str) -> ProcessEvaluator {
        ProcessEvaluator::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[cfg(unix)]
    #[test]
    fn test_output_lines_are_captured() {
        let lines = shell("printf 'Alpha\\n\\n  Beta \\n'")
            .evaluate("ignored", Duration::from_secs(5))
            .unwrap();
        assert_eq!(lines, vec!["Alpha".to_string(), "Beta".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_failure() {
        let err = shell("echo broken >&2; exit 3")
            .evaluate("ignored", Duration::from_secs(5))
            .unwrap_err();
        match err {
            EvaluationError::Failed { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_output_is_invalid() {
        let err = shell("printf '\\377'")
            .evaluate("ignored", Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, EvaluationError::InvalidOutput(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_process() {
        let err = shell("sleep 5")
            .evaluate("ignored", Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Timeout(_)));
    }
}
