/*!
# SARIF Reporter

Reports in SARIF 2.1.0 (Static Analysis Results Interchange Format) for
GitHub code scanning, Azure DevOps and other CI/CD systems.

Suggested corrections become SARIF `fixes`: the diagnostic's correction
range is the deleted region, its text the inserted content.

## Usage:

```rust,ignore
use pshelp_analyzer::reports::{ReportGenerator, SarifReporter};

let sarif_output = SarifReporter::default().generate_report(&files)?;
std::fs::write("pshelp.sarif", sarif_output)?;
```
*/

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{FileReport, ReportFormat, ReportGenerator, TOOL_NAME, TOOL_VERSION};
use crate::diagnostics::{CorrectionExtent, DiagnosticRecord, DiagnosticSeverity};
use crate::rules::{RuleMetadata, RuleRegistry, RuleSeverity};

pub const SARIF_SCHEMA: &str = "https://json.schemastore.org/sarif-2.1.0.json";
pub const SARIF_VERSION: &str = "2.1.0";

/// SARIF 2.1.0 root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarifReport {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub version: String,
    pub runs: Vec<SarifRun>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarifRun {
    pub tool: SarifTool,
    pub results: Vec<SarifResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invocations: Vec<SarifInvocation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarifTool {
    pub driver: SarifDriver,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifDriver {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<SarifRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRule {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_description: Option<SarifMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_description: Option<SarifMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_configuration: Option<SarifReportingConfiguration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarifReportingConfiguration {
    pub level: SarifLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SarifLevel {
    Note,
    Warning,
    Error,
}

impl From<DiagnosticSeverity> for SarifLevel {
    fn from(severity: DiagnosticSeverity) -> Self {
        match severity {
            DiagnosticSeverity::Information => SarifLevel::Note,
            DiagnosticSeverity::Warning => SarifLevel::Warning,
            DiagnosticSeverity::Error | DiagnosticSeverity::ParseError => SarifLevel::Error,
        }
    }
}

impl From<RuleSeverity> for SarifLevel {
    fn from(severity: RuleSeverity) -> Self {
        DiagnosticSeverity::from(severity).into()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifResult {
    pub rule_id: String,
    pub level: SarifLevel,
    pub message: SarifMessage,
    pub locations: Vec<SarifLocation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixes: Vec<SarifFix>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SarifMessage {
    pub text: String,
}

impl SarifMessage {
    fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifLocation {
    pub physical_location: SarifPhysicalLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifPhysicalLocation {
    pub artifact_location: SarifArtifactLocation,
    pub region: SarifRegion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SarifArtifactLocation {
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRegion {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifFix {
    pub description: SarifMessage,
    pub artifact_changes: Vec<SarifArtifactChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifArtifactChange {
    pub artifact_location: SarifArtifactLocation,
    pub replacements: Vec<SarifReplacement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifReplacement {
    pub deleted_region: SarifRegion,
    pub inserted_content: SarifMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifInvocation {
    pub execution_successful: bool,
    pub end_time_utc: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_execution_notifications: Vec<SarifNotification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarifNotification {
    pub level: SarifLevel,
    pub message: SarifMessage,
}

/// SARIF 2.1.0 reporter
pub struct SarifReporter {
    tool_name: String,
    tool_version: String,
    rules: Vec<RuleMetadata>,
}

impl Default for SarifReporter {
    fn default() -> Self {
        let rules = RuleRegistry::builtin(&Default::default())
            .rules()
            .iter()
            .map(|rule| rule.metadata())
            .collect();
        Self::new(TOOL_NAME, TOOL_VERSION).with_rules(rules)
    }
}

impl SarifReporter {
    pub fn new(tool_name: impl Into<String>, tool_version: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_version: tool_version.into(),
            rules: Vec::new(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<RuleMetadata>) -> Self {
        self.rules = rules;
        self
    }

    /// Builds the report structure
    pub fn build_report(&self, files: &[FileReport]) -> SarifReport {
        let results = files
            .iter()
            .flat_map(|file| {
                file.diagnostics
                    .iter()
                    .map(move |diagnostic| convert_result(&file.path, diagnostic))
            })
            .collect();

        let notifications: Vec<SarifNotification> = files
            .iter()
            .filter_map(|file| {
                file.error.as_ref().map(|error| SarifNotification {
                    level: SarifLevel::Error,
                    message: SarifMessage::new(format!("{}: {}", file.path, error)),
                })
            })
            .collect();

        let driver = SarifDriver {
            name: self.tool_name.clone(),
            version: self.tool_version.clone(),
            rules: self.rules.iter().map(convert_rule).collect(),
        };

        SarifReport {
            schema: SARIF_SCHEMA.to_string(),
            version: SARIF_VERSION.to_string(),
            runs: vec![SarifRun {
                tool: SarifTool { driver },
                results,
                invocations: vec![SarifInvocation {
                    execution_successful: notifications.is_empty(),
                    end_time_utc: Utc::now().to_rfc3339(),
                    tool_execution_notifications: notifications,
                }],
            }],
        }
    }
}

fn convert_rule(rule: &RuleMetadata) -> SarifRule {
    SarifRule {
        id: rule.name.clone(),
        name: Some(rule.common_name.clone()),
        short_description: Some(SarifMessage::new(rule.common_name.clone())),
        full_description: Some(SarifMessage::new(rule.description.clone())),
        default_configuration: Some(SarifReportingConfiguration {
            level: rule.severity.into(),
        }),
    }
}

/// Forward slashes, as SARIF URIs expect
fn to_uri(path: &str) -> String {
    path.replace('\\', "/")
}

fn convert_fix(uri: &str, correction: &CorrectionExtent) -> SarifFix {
    let uri = correction.file.as_deref().map_or_else(|| uri.to_string(), to_uri);
    SarifFix {
        description: SarifMessage::new(correction.description.clone()),
        artifact_changes: vec![SarifArtifactChange {
            artifact_location: SarifArtifactLocation { uri },
            replacements: vec![SarifReplacement {
                deleted_region: SarifRegion {
                    start_line: correction.start_line,
                    start_column: correction.start_column,
                    end_line: correction.end_line,
                    end_column: correction.end_column,
                },
                inserted_content: SarifMessage::new(correction.text.clone()),
            }],
        }],
    }
}

fn convert_result(path: &str, diagnostic: &DiagnosticRecord) -> SarifResult {
    let uri = to_uri(diagnostic.script_path.as_deref().unwrap_or(path));
    let extent = &diagnostic.extent;

    let mut properties = BTreeMap::new();
    if let Some(function) = &diagnostic.function_name {
        properties.insert("functionName".to_string(), function.clone());
    }
    if let Some(subject) = &diagnostic.subject {
        properties.insert("parameterName".to_string(), subject.clone());
    }

    SarifResult {
        rule_id: diagnostic.rule_name.clone(),
        level: diagnostic.severity.into(),
        message: SarifMessage::new(diagnostic.message.clone()),
        locations: vec![SarifLocation {
            physical_location: SarifPhysicalLocation {
                artifact_location: SarifArtifactLocation { uri: uri.clone() },
                region: SarifRegion {
                    start_line: extent.start_line,
                    start_column: extent.start_column,
                    end_line: extent.end_line,
                    end_column: extent.end_column,
                },
            },
        }],
        fixes: diagnostic
            .suggested_corrections
            .iter()
            .map(|correction| convert_fix(&uri, correction))
            .collect(),
        properties,
    }
}

impl ReportGenerator for SarifReporter {
    fn generate_report(&self, files: &[FileReport]) -> Result<String> {
        serde_json::to_string_pretty(&self.build_report(files))
            .context("Failed to serialize SARIF report")
    }

    fn supported_format() -> ReportFormat {
        ReportFormat::Sarif
    }
}
