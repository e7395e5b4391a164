/*!
# Rules Engine

Runs the enabled rules of a registry over one syntax tree and keeps
per-rule statistics. The engine is shared between worker threads, so
statistics live behind a mutex.
*/

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use crate::ast::ScriptBlockAst;
use crate::core::{AnalysisError, AnalysisResult};
use crate::diagnostics::DiagnosticRecord;

use super::{AnalyzerConfig, RuleId, RuleRegistry, RuleStats};

/// Rules application engine
pub struct RulesEngine {
    /// Configuration
    config: AnalyzerConfig,
    registry: RuleRegistry,
    /// Rule statistics
    stats: Mutex<HashMap<RuleId, RuleStats>>,
}

impl RulesEngine {
    /// Engine over the built-in rules configured by `config`
    pub fn new(config: AnalyzerConfig) -> Self {
        let registry = RuleRegistry::builtin(&config.settings);
        Self::with_registry(config, registry)
    }

    pub fn with_registry(config: AnalyzerConfig, registry: RuleRegistry) -> Self {
        Self {
            config,
            registry,
            stats: Mutex::new(HashMap::new()),
        }
    }

    /// Runs every enabled rule. An absent tree fails before any rule runs;
    /// a failing rule aborts the analysis.
    pub fn analyze(
        &self,
        ast: Option<&ScriptBlockAst>,
        file_name: Option<&str>,
    ) -> AnalysisResult<Vec<DiagnosticRecord>> {
        let ast = ast.ok_or(AnalysisError::NullAst)?;
        let mut diagnostics = Vec::new();

        for rule in self.registry.rules() {
            let name = rule.name();
            if !self.config.is_rule_enabled(&name) {
                tracing::debug!("rule {} disabled", name);
                continue;
            }

            let start_time = Instant::now();
            let found = rule.analyze_script(ast, file_name)?;
            let elapsed = start_time.elapsed().as_micros() as u64;
            tracing::debug!(
                "rule {} on {}: {} diagnostic(s) in {}μs",
                name,
                file_name.unwrap_or("<script>"),
                found.len(),
                elapsed
            );

            self.record(&name, found.len() as u64, elapsed);
            diagnostics.extend(found);
        }

        Ok(diagnostics)
    }

    fn record(&self, rule: &str, violations: u64, execution_time_us: u64) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats
            .entry(rule.to_string())
            .or_default()
            .update(violations, execution_time_us);
    }

    /// Snapshot of rule statistics
    pub fn get_stats(&self) -> HashMap<RuleId, RuleStats> {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_stats(&self) {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Get rule application summary
    pub fn get_summary(&self) -> RulesSummary {
        let stats = self.get_stats();
        let total_rules = self.registry.len();
        let enabled_rules = self
            .registry
            .names()
            .iter()
            .filter(|name| self.config.is_rule_enabled(name))
            .count();

        let total_applications: u64 = stats.values().map(|s| s.applications).sum();
        let total_violations: u64 = stats.values().map(|s| s.violations).sum();
        let avg_execution_time_us = if stats.is_empty() {
            0.0
        } else {
            stats.values().map(|s| s.avg_execution_time_us).sum::<f64>() / stats.len() as f64
        };

        RulesSummary {
            total_rules,
            enabled_rules,
            total_applications,
            total_violations,
            avg_execution_time_us,
        }
    }
}

/// Summary of rules application
#[derive(Debug, Clone)]
pub struct RulesSummary {
    /// Number of registered rules
    pub total_rules: usize,
    /// Number of enabled rules
    pub enabled_rules: usize,
    /// Total rule applications
    pub total_applications: u64,
    /// Total violations found
    pub total_violations: u64,
    /// Average execution time per rule
    pub avg_execution_time_us: f64,
}

impl std::fmt::Display for RulesSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Rules Summary:")?;
        writeln!(f, "  Total rules: {}", self.total_rules)?;
        writeln!(f, "  Enabled rules: {}", self.enabled_rules)?;
        writeln!(f, "  Total applications: {}", self.total_applications)?;
        writeln!(f, "  Total violations: {}", self.total_violations)?;
        writeln!(f, "  Avg execution time: {:.2}μs", self.avg_execution_time_us)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ScriptParser;
    use crate::rules::missing_parameter_documentation::RULE_NAME;
    use crate::rules::RuleConfig;

    fn offline_config() -> AnalyzerConfig {
        let mut config = AnalyzerConfig::default();
        config.settings.dynamic_parameters.enabled = false;
        config
    }

    #[test]
    fn test_absent_tree_fails_fast() {
        let engine = RulesEngine::new(offline_config());
        let err = engine.analyze(None, Some("a.ps1")).unwrap_err();
        assert!(matches!(err, AnalysisError::NullAst));
        assert!(engine.get_stats().is_empty());
    }

    #[test]
    fn test_stats_tracking() {
        let engine = RulesEngine::new(offline_config());
        let tree = ScriptParser::new()
            .parse("function f { param($A, $B) }", None)
            .unwrap();

        let diagnostics = engine.analyze(Some(&tree), None).unwrap();
        assert_eq!(diagnostics.len(), 2);

        let stats = engine.get_stats();
        assert_eq!(stats[RULE_NAME].applications, 1);
        assert_eq!(stats[RULE_NAME].violations, 2);

        let summary = engine.get_summary();
        assert_eq!(summary.total_rules, 1);
        assert_eq!(summary.enabled_rules, 1);
        assert_eq!(summary.total_violations, 2);

        engine.clear_stats();
        assert!(engine.get_stats().is_empty());
    }

    #[test]
    fn test_disabled_rule_is_skipped() {
        let mut config = offline_config();
        config.rules.insert(
            RULE_NAME.to_string(),
            RuleConfig { enabled: false },
        );
        let engine = RulesEngine::new(config);
        let tree = ScriptParser::new()
            .parse("function f { param($A) }", None)
            .unwrap();
        assert!(engine.analyze(Some(&tree), None).unwrap().is_empty());
        assert_eq!(engine.get_summary().enabled_rules, 0);
    }
}
