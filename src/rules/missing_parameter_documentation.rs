/*!
# PSMissingParameterDocumentation

Reports every function parameter that has no `.PARAMETER` entry in the
function's comment-based help.

Parameters come from three places, in this order:

1. inline parameters (`function f($a) { }`)
2. every `param( )` block found anywhere under the function, nested
   script blocks included
3. names produced at runtime by the function's `dynamicparam` blocks

Inline parameters are checked on purpose. A check limited to `param( )`
blocks would let `function f($a)` through with `$a` undocumented, even
though help lists it like any other parameter.

Names are compared case-insensitively and reported once. Each finding is
anchored on the whole function, with an empty correction pointing at it.
*/

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::ast::{Ast, AstKind, BlockKind, FunctionDefinitionAst, NamedBlockAst, ScriptBlockAst};
use crate::core::AnalysisResult;
use crate::diagnostics::{CorrectionExtent, DiagnosticRecord};
use crate::evaluator::{
    dynamic_parameter_script, DisabledEvaluator, ProcessEvaluator, ScriptEvaluator, DEFAULT_TIMEOUT,
};
use crate::help::{get_help_content, CommentHelpInfo};

use super::config::DynamicParameterSettings;
use super::{RuleMetadata, RuleSeverity, ScriptRule, SourceType};

pub const SOURCE_NAME: &str = "PS";
pub const RULE_NAME: &str = "PSMissingParameterDocumentation";
pub const COMMON_NAME: &str = "Missing Parameter Documentation";
pub const DESCRIPTION: &str =
    "Every parameter of a function should be documented with a .PARAMETER entry in its comment-based help.";
pub const CORRECTION_DESCRIPTION: &str = "Add parameter documentation";

/// Message for one undocumented parameter
pub fn error_message(parameter: &str) -> String {
    format!(
        "Parameter '{}' is missing documentation in the comment-based help.",
        parameter
    )
}

pub struct MissingParameterDocumentation {
    evaluator: Arc<dyn ScriptEvaluator>,
    timeout: Duration,
}

impl MissingParameterDocumentation {
    pub fn new(evaluator: Arc<dyn ScriptEvaluator>, timeout: Duration) -> Self {
        Self { evaluator, timeout }
    }

    /// Dynamic blocks run through the configured interpreter, or not at all
    pub fn from_settings(settings: &DynamicParameterSettings) -> Self {
        if settings.enabled {
            let evaluator =
                ProcessEvaluator::new(settings.interpreter.clone(), settings.interpreter_args.clone());
            Self::new(Arc::new(evaluator), settings.timeout())
        } else {
            Self::without_dynamic_parameters()
        }
    }

    pub fn without_dynamic_parameters() -> Self {
        Self::new(Arc::new(DisabledEvaluator), DEFAULT_TIMEOUT)
    }

    /// Every function definition under `root`, nested ones included
    pub fn functions(root: &ScriptBlockAst) -> impl Iterator<Item = &FunctionDefinitionAst> {
        Ast::from(root)
            .find_all(|node| node.kind() == AstKind::FunctionDefinition, true)
            .filter_map(|node| node.as_function_definition())
    }

    /// Statically declared parameter names, in declaration order.
    /// Duplicates are kept.
    pub fn declared_parameters(function: &FunctionDefinitionAst) -> Vec<String> {
        let inline = function.parameters.iter().flatten();
        let blocks = Ast::from(function)
            .find_all(|node| node.kind() == AstKind::ParamBlock, true)
            .filter_map(|node| node.as_param_block())
            .flat_map(|param_block| param_block.parameters.iter());

        inline
            .chain(blocks)
            .map(|parameter| parameter.name.clone())
            .collect()
    }

    /// `dynamicparam` blocks anywhere under the function
    fn dynamic_param_blocks(function: &FunctionDefinitionAst) -> Vec<&NamedBlockAst> {
        Ast::from(function)
            .find_all(
                |node| {
                    node.as_named_block()
                        .map_or(false, |block| block.kind == BlockKind::DynamicParam)
                },
                true,
            )
            .filter_map(|node| node.as_named_block())
            .collect()
    }

    /// Names the function's `dynamicparam` blocks produce when run. A block
    /// that fails to evaluate contributes nothing; the others still count.
    pub fn dynamic_parameters(&self, function: &FunctionDefinitionAst) -> Vec<String> {
        let mut names = Vec::new();
        for block in Self::dynamic_param_blocks(function) {
            let script = dynamic_parameter_script(&block.statements);
            match self.evaluator.evaluate(&script, self.timeout) {
                Ok(lines) => {
                    tracing::debug!(
                        "function '{}': dynamic block yielded {} parameter(s)",
                        function.name,
                        lines.len()
                    );
                    names.extend(lines);
                }
                Err(e) => {
                    tracing::warn!(
                        "function '{}': dynamic parameters at line {} not resolved: {}",
                        function.name,
                        block.extent.start_line,
                        e
                    );
                }
            }
        }
        names
    }

    /// Declared then dynamic names, first spelling of each name kept
    pub fn parameter_names(&self, function: &FunctionDefinitionAst) -> Vec<String> {
        let mut seen = HashSet::new();
        Self::declared_parameters(function)
            .into_iter()
            .chain(self.dynamic_parameters(function))
            .filter(|name| seen.insert(name.to_uppercase()))
            .collect()
    }

    /// Names absent from the help, in the order given
    pub fn undocumented<'n>(names: &'n [String], help: &CommentHelpInfo) -> Vec<&'n str> {
        names
            .iter()
            .filter(|name| !help.contains_parameter(name))
            .map(String::as_str)
            .collect()
    }

    /// Correction spanning the function; start column is one past its start
    pub fn correction(function: &FunctionDefinitionAst) -> CorrectionExtent {
        let extent = &function.extent;
        CorrectionExtent::new(
            extent.start_line,
            extent.end_line,
            extent.start_column + 1,
            extent.end_column,
            String::new(),
            extent.file.clone(),
            CORRECTION_DESCRIPTION,
        )
    }

    fn diagnostic(
        &self,
        function: &FunctionDefinitionAst,
        parameter: &str,
        file_name: Option<&str>,
    ) -> DiagnosticRecord {
        DiagnosticRecord::new(
            error_message(parameter),
            function.extent.clone(),
            RULE_NAME,
            RuleSeverity::Warning.into(),
            file_name.map(str::to_string),
        )
        .with_function_name(function.name.clone())
        .with_subject(parameter)
        .with_correction(Self::correction(function))
    }

    /// Findings for a single function
    pub fn check_function(
        &self,
        function: &FunctionDefinitionAst,
        file_name: Option<&str>,
    ) -> Vec<DiagnosticRecord> {
        let names = self.parameter_names(function);
        if names.is_empty() {
            return Vec::new();
        }
        let help = get_help_content(function);
        tracing::debug!(
            "function '{}': {} parameter(s), {} documented",
            function.name,
            names.len(),
            help.parameters.len()
        );

        Self::undocumented(&names, &help)
            .into_iter()
            .map(|parameter| self.diagnostic(function, parameter, file_name))
            .collect()
    }
}

impl Default for MissingParameterDocumentation {
    fn default() -> Self {
        Self::from_settings(&DynamicParameterSettings::default())
    }
}

impl ScriptRule for MissingParameterDocumentation {
    fn metadata(&self) -> RuleMetadata {
        RuleMetadata {
            name: RULE_NAME.to_string(),
            common_name: COMMON_NAME.to_string(),
            description: DESCRIPTION.to_string(),
            severity: RuleSeverity::Warning,
            source_type: SourceType::Builtin,
            source_name: SOURCE_NAME.to_string(),
        }
    }

    fn analyze_script(
        &self,
        ast: &ScriptBlockAst,
        file_name: Option<&str>,
    ) -> AnalysisResult<Vec<DiagnosticRecord>> {
        let diagnostics = Self::functions(ast)
            .flat_map(|function| self.check_function(function, file_name))
            .collect();
        Ok(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticSeverity;
    use crate::evaluator::EvaluationError;
    use crate::parser::ScriptParser;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Answers each evaluation with the next scripted result
    struct ScriptedEvaluator {
        results: Mutex<Vec<Result<Vec<String>, EvaluationError>>>,
        scripts: Mutex<Vec<String>>,
    }

    impl ScriptedEvaluator {
        fn new(mut results: Vec<Result<Vec<String>, EvaluationError>>) -> Arc<Self> {
            results.reverse();
            Arc::new(Self {
                results: Mutex::new(results),
                scripts: Mutex::new(Vec::new()),
            })
        }
    }

    impl ScriptEvaluator for ScriptedEvaluator {
        fn evaluate(&self, script: &str, _timeout: Duration) -> Result<Vec<String>, EvaluationError> {
            self.scripts.lock().unwrap().push(script.to_string());
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn names(values: &[&str]) -> Result<Vec<String>, EvaluationError> {
        Ok(values.iter().map(|v| v.to_string()).collect())
    }

    fn analyze_with(rule: &MissingParameterDocumentation, source: &str) -> Vec<DiagnosticRecord> {
        let tree = ScriptParser::new().parse(source, Some("test.ps1")).unwrap();
        rule.analyze_script(&tree, Some("test.ps1")).unwrap()
    }

    fn analyze(source: &str) -> Vec<DiagnosticRecord> {
        analyze_with(&MissingParameterDocumentation::without_dynamic_parameters(), source)
    }

    fn subjects(diagnostics: &[DiagnosticRecord]) -> Vec<&str> {
        diagnostics
            .iter()
            .filter_map(|d| d.subject.as_deref())
            .collect()
    }

    #[test]
    fn test_partially_documented_function() {
        let source = r#"
<#
.SYNOPSIS
    Says hello.
.PARAMETER Name
    Who to greet.
#>
function f {
    param($Name, $Age)
}
"#;
        let diagnostics = analyze(source);
        assert_eq!(diagnostics.len(), 1);

        let diagnostic = &diagnostics[0];
        assert_eq!(diagnostic.subject.as_deref(), Some("Age"));
        assert_eq!(diagnostic.message, error_message("Age"));
        assert_eq!(diagnostic.rule_name, "PSMissingParameterDocumentation");
        assert_eq!(diagnostic.severity, DiagnosticSeverity::Warning);
        assert_eq!(diagnostic.function_name.as_deref(), Some("f"));
        assert_eq!(diagnostic.script_path.as_deref(), Some("test.ps1"));
        assert_eq!(diagnostic.extent.start_line, 8);
        assert_eq!(diagnostic.extent.end_line, 10);
    }

    #[test]
    fn test_correction_spans_function() {
        let diagnostics = analyze("function f {\n    param($Path)\n}");
        let correction = &diagnostics[0].suggested_corrections[0];
        assert_eq!(
            correction,
            &CorrectionExtent::new(1, 3, 2, 2, "", Some("test.ps1".to_string()), "Add parameter documentation")
        );
    }

    #[test]
    fn test_function_without_parameters_or_help() {
        assert!(analyze("function g {\n    Write-Output 1\n}").is_empty());
    }

    #[test]
    fn test_function_without_parameters_but_with_help() {
        assert!(analyze("<#\n.SYNOPSIS\n x\n#>\nfunction g { }").is_empty());
    }

    #[test]
    fn test_fully_documented_function() {
        let source = "function f {\n  <#\n  .PARAMETER name\n  .PARAMETER AGE\n  #>\n  param($Name, $Age)\n}";
        assert!(analyze(source).is_empty());
    }

    #[test]
    fn test_duplicate_parameter_reported_once() {
        let diagnostics = analyze("function f {\n  param($Path)\n  $sb = { param($path) }\n}");
        assert_eq!(subjects(&diagnostics), vec!["Path"]);
    }

    #[test]
    fn test_nested_functions_reported_independently() {
        let source = "function Outer {\n  param($A)\n  function Inner {\n    param($B)\n  }\n}";
        let diagnostics = analyze(source);
        let pairs: Vec<_> = diagnostics
            .iter()
            .map(|d| (d.function_name.as_deref().unwrap_or(""), d.subject.as_deref().unwrap_or("")))
            .collect();
        // param blocks of nested functions also count for the outer function
        assert_eq!(pairs, vec![("Outer", "A"), ("Outer", "B"), ("Inner", "B")]);
    }

    #[test]
    fn test_inline_parameters_are_checked() {
        let diagnostics = analyze("# .PARAMETER a\n# first\nfunction Add($a, $b) { $a + $b }");
        assert_eq!(subjects(&diagnostics), vec!["b"]);
    }

    #[test]
    fn test_dynamic_parameters() {
        let evaluator = ScriptedEvaluator::new(vec![names(&["X", "Y"])]);
        let rule = MissingParameterDocumentation::new(evaluator.clone(), DEFAULT_TIMEOUT);
        let source = r#"
function h {
    <#
    .PARAMETER X
        Documented.
    #>
    [CmdletBinding()]
    param()
    dynamicparam {
        $dictionary = New-Object System.Management.Automation.RuntimeDefinedParameterDictionary
        $dictionary
    }
    end { }
}
"#;
        let diagnostics = analyze_with(&rule, source);
        assert_eq!(subjects(&diagnostics), vec!["Y"]);

        let scripts = evaluator.scripts.lock().unwrap();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].contains("RuntimeDefinedParameterDictionary\n$dictionary\n"));
    }

    #[test]
    fn test_failed_dynamic_block_keeps_declared_findings() {
        let evaluator = ScriptedEvaluator::new(vec![Err(EvaluationError::Failed {
            code: Some(1),
            stderr: "boom".to_string(),
        })]);
        let rule = MissingParameterDocumentation::new(evaluator, DEFAULT_TIMEOUT);
        let source = "function k {\n  param($Path)\n  dynamicparam { throw 'no' }\n  process { }\n}";
        assert_eq!(subjects(&analyze_with(&rule, source)), vec!["Path"]);
    }

    #[test]
    fn test_dynamic_duplicates_of_declared_names_collapse() {
        let evaluator = ScriptedEvaluator::new(vec![names(&["path", "Extra"])]);
        let rule = MissingParameterDocumentation::new(evaluator, DEFAULT_TIMEOUT);
        let source = "function k {\n  param($Path)\n  dynamicparam { $d }\n  end { }\n}";
        assert_eq!(subjects(&analyze_with(&rule, source)), vec!["Path", "Extra"]);
    }

    #[test]
    fn test_each_dynamic_block_is_evaluated() {
        let evaluator = ScriptedEvaluator::new(vec![
            Err(EvaluationError::Timeout(DEFAULT_TIMEOUT)),
            names(&["Second"]),
        ]);
        let rule = MissingParameterDocumentation::new(evaluator.clone(), DEFAULT_TIMEOUT);
        let source = "function a {\n  dynamicparam { $one }\n  end { }\n}\nfunction b {\n  dynamicparam { $two }\n  end { }\n}";
        assert_eq!(subjects(&analyze_with(&rule, source)), vec!["Second"]);
        assert_eq!(evaluator.scripts.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_disabled_evaluation_ignores_dynamic_blocks() {
        let source = "function k {\n  dynamicparam { $d }\n  end { }\n}";
        assert!(analyze(source).is_empty());
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let tree = ScriptParser::new()
            .parse("function f {\n  param($A, $B, $C)\n}\nfunction g($X) { }", Some("x.ps1"))
            .unwrap();
        let rule = MissingParameterDocumentation::without_dynamic_parameters();
        let first = rule.analyze_script(&tree, Some("x.ps1")).unwrap();
        let second = rule.analyze_script(&tree, Some("x.ps1")).unwrap();
        assert_eq!(first, second);
        assert_eq!(subjects(&first), vec!["A", "B", "C", "X"]);
    }

    #[test]
    fn test_leading_comment_documents_parameter_when_help_exists() {
        let source = "<#\n.SYNOPSIS\n x\n#>\nfunction f {\n  param(\n    # The path\n    $Path,\n    $Other\n  )\n}";
        assert_eq!(subjects(&analyze(source)), vec!["Other"]);
    }
}
