/*!
# Rules for PSHelp Analyzer

Script rules inspect a parsed script and emit [`DiagnosticRecord`]s.
Every rule implements [`ScriptRule`]; the set of rules is an explicit
list assembled by [`RuleRegistry::builtin`] at startup.

## Usage

```rust,ignore
use pshelp_analyzer::rules::{AnalyzerConfig, RulesEngine};

let config = AnalyzerConfig::load_from_file("pshelp.toml")?;
let engine = RulesEngine::new(config);
let diagnostics = engine.analyze(Some(&tree), Some("script.ps1"))?;
```

## Configuration Example

```toml
version = "1.0"

[settings]
use_colors = true

[settings.dynamic_parameters]
enabled = true
interpreter = "pwsh"
timeout_ms = 10000

[rules.PSMissingParameterDocumentation]
enabled = true
```
*/

pub mod config;
pub mod engine;
pub mod missing_parameter_documentation;

pub use config::{AnalyzerConfig, DynamicParameterSettings, GlobalSettings, RuleConfig};
pub use engine::RulesEngine;
pub use missing_parameter_documentation::MissingParameterDocumentation;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::ast::ScriptBlockAst;
use crate::core::AnalysisResult;
use crate::diagnostics::{DiagnosticRecord, DiagnosticSeverity};

/// Rule identifier (e.g. "PSMissingParameterDocumentation")
pub type RuleId = String;

/// Severity a rule declares for its findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    Information,
    #[default]
    Warning,
    Error,
}

impl fmt::Display for RuleSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleSeverity::Information => write!(f, "information"),
            RuleSeverity::Warning => write!(f, "warning"),
            RuleSeverity::Error => write!(f, "error"),
        }
    }
}

impl From<RuleSeverity> for DiagnosticSeverity {
    fn from(severity: RuleSeverity) -> Self {
        match severity {
            RuleSeverity::Information => DiagnosticSeverity::Information,
            RuleSeverity::Warning => DiagnosticSeverity::Warning,
            RuleSeverity::Error => DiagnosticSeverity::Error,
        }
    }
}

/// Where a rule comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Builtin,
    Managed,
    Module,
}

/// Static description of a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMetadata {
    pub name: String,
    pub common_name: String,
    pub description: String,
    pub severity: RuleSeverity,
    pub source_type: SourceType,
    pub source_name: String,
}

/// A rule that inspects a whole script
pub trait ScriptRule: Send + Sync {
    fn metadata(&self) -> RuleMetadata;

    fn name(&self) -> String {
        self.metadata().name
    }

    /// Analyzes one tree. `file_name` is copied into every diagnostic.
    fn analyze_script(
        &self,
        ast: &ScriptBlockAst,
        file_name: Option<&str>,
    ) -> AnalysisResult<Vec<DiagnosticRecord>>;
}

/// Explicit list of available rules
#[derive(Default, Clone)]
pub struct RuleRegistry {
    rules: Vec<Arc<dyn ScriptRule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in rules configured from `settings`
    pub fn builtin(settings: &GlobalSettings) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MissingParameterDocumentation::from_settings(
            &settings.dynamic_parameters,
        )));
        registry
    }

    /// Adds a rule; a rule with the same name is replaced.
    pub fn register(&mut self, rule: Arc<dyn ScriptRule>) {
        let name = rule.name();
        self.rules.retain(|existing| existing.name() != name);
        self.rules.push(rule);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ScriptRule>> {
        self.rules
            .iter()
            .find(|rule| rule.name().eq_ignore_ascii_case(name))
    }

    pub fn rules(&self) -> &[Arc<dyn ScriptRule>] {
        &self.rules
    }

    pub fn names(&self) -> Vec<String> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.names())
            .finish()
    }
}

/// Names of the built-in rules
pub fn builtin_rule_names() -> Vec<String> {
    vec![missing_parameter_documentation::RULE_NAME.to_string()]
}

/// Rule application statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleStats {
    /// Number of times rule was applied
    pub applications: u64,
    /// Number of violations found
    pub violations: u64,
    /// Average execution time in microseconds
    pub avg_execution_time_us: f64,
    /// Total execution time in microseconds
    pub total_execution_time_us: u64,
}

impl RuleStats {
    /// Update statistics with new execution
    pub fn update(&mut self, violations: u64, execution_time_us: u64) {
        self.applications += 1;
        self.violations += violations;
        self.total_execution_time_us += execution_time_us;
        self.avg_execution_time_us =
            self.total_execution_time_us as f64 / self.applications as f64;
    }

    /// Violations per application
    pub fn violation_rate(&self) -> f64 {
        if self.applications == 0 {
            0.0
        } else {
            self.violations as f64 / self.applications as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_stats() {
        let mut stats = RuleStats::default();
        stats.update(2, 100);
        stats.update(0, 300);
        assert_eq!(stats.applications, 2);
        assert_eq!(stats.violations, 2);
        assert_eq!(stats.avg_execution_time_us, 200.0);
        assert_eq!(stats.violation_rate(), 1.0);
    }

    #[test]
    fn test_builtin_registry() {
        let registry = RuleRegistry::builtin(&GlobalSettings::default());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), builtin_rule_names());

        let rule = registry.get("psmissingparameterdocumentation").unwrap();
        let metadata = rule.metadata();
        assert_eq!(metadata.severity, RuleSeverity::Warning);
        assert_eq!(metadata.source_type, SourceType::Builtin);
        assert_eq!(metadata.source_name, "PS");
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = RuleRegistry::builtin(&GlobalSettings::default());
        registry.register(Arc::new(MissingParameterDocumentation::without_dynamic_parameters()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_severity_maps_to_diagnostic_severity() {
        assert_eq!(
            DiagnosticSeverity::from(RuleSeverity::Warning),
            DiagnosticSeverity::Warning
        );
    }
}
