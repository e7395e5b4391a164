/*!
# Analyzer Configuration

Configuration structures and loading for the analyzer.
Supports TOML and YAML files; the format is picked from the file
extension (`.yaml`/`.yml` for YAML, anything else is TOML).
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::evaluator::process::{ProcessEvaluator, DEFAULT_INTERPRETER};

use super::missing_parameter_documentation::RULE_NAME;

/// Configuration for a single rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Whether the rule is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// How `dynamicparam` blocks are evaluated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicParameterSettings {
    /// Evaluate dynamic parameter blocks at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Interpreter executable
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Arguments placed before the encoded script
    #[serde(default = "ProcessEvaluator::default_args")]
    pub interpreter_args: Vec<String>,

    /// Bound on one evaluation in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_interpreter() -> String {
    DEFAULT_INTERPRETER.to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for DynamicParameterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interpreter: default_interpreter(),
            interpreter_args: ProcessEvaluator::default_args(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl DynamicParameterSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Global analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    /// Parallel processing threads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,

    /// Whether to use colors in output
    #[serde(default = "default_true")]
    pub use_colors: bool,

    #[serde(default)]
    pub dynamic_parameters: DynamicParameterSettings,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            threads: None,
            use_colors: true,
            dynamic_parameters: DynamicParameterSettings::default(),
        }
    }
}

/// Top-level analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Configuration version
    #[serde(default = "default_version")]
    pub version: String,

    /// Global settings
    #[serde(default)]
    pub settings: GlobalSettings,

    /// Rule configurations
    #[serde(default)]
    pub rules: HashMap<String, RuleConfig>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        let mut rules = HashMap::new();
        rules.insert(RULE_NAME.to_string(), RuleConfig::default());

        Self {
            version: default_version(),
            settings: GlobalSettings::default(),
            rules,
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration, TOML or YAML by extension
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = if is_yaml(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config from {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config from {}", path.display()))?
        };

        for warning in config.validate() {
            tracing::warn!("{}: {}", path.display(), warning);
        }
        Ok(config)
    }

    /// Save configuration, TOML or YAML by extension
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml(path) {
            serde_yaml::to_string(self).context("Failed to serialize config to YAML")?
        } else {
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Get rule configuration
    pub fn get_rule(&self, rule_id: &str) -> Option<&RuleConfig> {
        self.rules
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(rule_id))
            .map(|(_, config)| config)
    }

    /// Rules without an entry are enabled
    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        self.get_rule(rule_id).map_or(true, |rule| rule.enabled)
    }

    /// Problems that do not prevent analysis
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let known = super::builtin_rule_names();

        let mut names: Vec<&String> = self.rules.keys().collect();
        names.sort();
        for name in names {
            if !known.iter().any(|rule| rule.eq_ignore_ascii_case(name)) {
                warnings.push(format!("Unknown rule '{}'", name));
            }
        }

        let dynamic = &self.settings.dynamic_parameters;
        if dynamic.enabled && dynamic.timeout_ms == 0 {
            warnings.push(
                "settings.dynamic_parameters.timeout_ms is 0; every evaluation will time out"
                    .to_string(),
            );
        }
        if dynamic.enabled && dynamic.interpreter.trim().is_empty() {
            warnings.push("settings.dynamic_parameters.interpreter is empty".to_string());
        }
        if self.settings.threads == Some(0) {
            warnings.push("settings.threads is 0; the default thread count is used".to_string());
        }

        warnings
    }

    /// Create example configuration file
    pub fn create_example_config<P: AsRef<Path>>(path: P) -> Result<()> {
        Self::default().save_to_file(path)
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AnalyzerConfig::default();
        assert!(config.is_rule_enabled(RULE_NAME));
        assert_eq!(config.settings.dynamic_parameters.timeout_ms, 10_000);
        assert_eq!(config.settings.dynamic_parameters.interpreter, "pwsh");
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pshelp.toml");
        let config = AnalyzerConfig::default();
        config.save_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[rules.PSMissingParameterDocumentation]"));

        let loaded = AnalyzerConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pshelp.yml");
        let config = AnalyzerConfig::default();
        config.save_to_file(&path).unwrap();
        assert_eq!(AnalyzerConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AnalyzerConfig = toml::from_str(
            "[settings.dynamic_parameters]\nenabled = false\n\n[rules.PSMissingParameterDocumentation]\nenabled = false\n",
        )
        .unwrap();
        assert!(!config.settings.dynamic_parameters.enabled);
        assert_eq!(config.settings.dynamic_parameters.timeout_ms, 10_000);
        assert!(!config.is_rule_enabled("psmissingparameterdocumentation"));
        assert!(config.is_rule_enabled("PSSomethingElse"));
    }

    #[test]
    fn test_example_config_only_writes_read_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("example.toml");
        AnalyzerConfig::create_example_config(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("enabled = true"));
        assert!(!text.contains("tags"));
        assert!(!text.contains("description"));
    }

    #[test]
    fn test_legacy_rule_keys_are_ignored() {
        let config: AnalyzerConfig = toml::from_str(
            "[rules.PSMissingParameterDocumentation]\nenabled = false\ndescription = \"old\"\ntags = [\"builtin\"]\n",
        )
        .unwrap();
        assert_eq!(
            config.get_rule(RULE_NAME),
            Some(&RuleConfig { enabled: false })
        );
    }

    #[test]
    fn test_validation_warnings() {
        let mut config = AnalyzerConfig::default();
        config.rules.insert("PSNoSuchRule".to_string(), RuleConfig::default());
        config.settings.dynamic_parameters.timeout_ms = 0;

        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("PSNoSuchRule"));
        assert!(warnings[1].contains("timeout_ms"));
    }
}
