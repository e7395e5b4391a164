/*!
# PSHelp Analyzer

Static analyzer for PowerShell scripts that finds function parameters
missing from the function's comment-based help.

## Core Features

- **PowerShell front end** - logos lexer and recursive-descent grammar for
  functions, parameter blocks, named blocks and nested script blocks
- **Comment-based help** - `.SYNOPSIS`/`.PARAMETER`/... extraction with
  PowerShell's placement rules
- **Dynamic parameters** - `dynamicparam` blocks are evaluated in a fresh,
  time-bounded `pwsh` process to learn the parameter names they produce
- **Configurable rules** - TOML/YAML configuration, explicit rule registry
- **Reports** - colored text, JSON and SARIF 2.1.0 with suggested fixes
- **Parallel processing** - files are analyzed concurrently with rayon

## Architecture

```text
PSHelp Analyzer
├── core         - positions, errors, BOM-aware file reading
├── parser       - lexer and grammar
├── ast          - syntax tree and recursive search
├── help         - comment-based help extraction
├── evaluator    - isolated script evaluation for dynamic parameters
├── rules        - rule trait, registry, engine, configuration
├── diagnostics  - diagnostic records and suggested corrections
└── reports      - text, JSON, SARIF
```

## Usage

### CLI
```bash
pshelp-analyzer analyze ./scripts -r --format sarif --output results.sarif
pshelp-analyzer analyze Module.psm1 --no-dynamic
pshelp-analyzer rules list
pshelp-analyzer rules generate-config --output pshelp.toml
```

### Library
```rust
use pshelp_analyzer::{analyze_source, AnalyzerConfig, RulesEngine};

let mut config = AnalyzerConfig::default();
config.settings.dynamic_parameters.enabled = false;
let engine = RulesEngine::new(config);

let diagnostics = analyze_source(&engine, r#"
function Get-Thing {
    param($Name)
}
"#, Some("example.ps1"))?;
assert_eq!(diagnostics.len(), 1);
# Ok::<(), pshelp_analyzer::AnalysisError>(())
```
*/

pub mod ast;
pub mod cli_common;
pub mod core;
pub mod diagnostics;
pub mod evaluator;
pub mod help;
pub mod parser;
pub mod reports;
pub mod rules;

pub use ast::{tree_from_json, Ast, AstKind, FunctionDefinitionAst, ScriptBlockAst};
pub use crate::core::{AnalysisError, AnalysisResult, ScriptExtent, ScriptPosition};
pub use diagnostics::{CorrectionExtent, DiagnosticRecord, DiagnosticSeverity};
pub use evaluator::{DisabledEvaluator, EvaluationError, ProcessEvaluator, ScriptEvaluator};
pub use help::{get_help_content, parse_comment_help, CommentHelpInfo};
pub use parser::ScriptParser;
pub use reports::{generate_report, FileReport, ReportFormat};
pub use rules::{
    AnalyzerConfig, MissingParameterDocumentation, RuleMetadata, RuleRegistry, RulesEngine,
    ScriptRule,
};

use std::path::Path;

/// Parses `source` and runs the engine's rules over it
pub fn analyze_source(
    engine: &RulesEngine,
    source: &str,
    file: Option<&str>,
) -> AnalysisResult<Vec<DiagnosticRecord>> {
    let tree = ScriptParser::new().parse(source, file)?;
    engine.analyze(Some(&tree), file)
}

/// Reads, parses and analyzes one script file
pub fn analyze_file(engine: &RulesEngine, path: &Path) -> AnalysisResult<Vec<DiagnosticRecord>> {
    let tree = ScriptParser::new().parse_file(path)?;
    let file = path.to_string_lossy();
    engine.analyze(Some(&tree), Some(&file))
}

/// Loads a JSON-dumped tree and analyzes it; `null` is an absent tree.
/// `file` names the script; the file recorded in the root extent is the fallback.
pub fn analyze_tree_json(
    engine: &RulesEngine,
    json: &str,
    file: Option<&str>,
) -> AnalysisResult<Vec<DiagnosticRecord>> {
    let tree = tree_from_json(json).map_err(|e| {
        AnalysisError::parse(
            format!("invalid syntax tree JSON: {}", e),
            ScriptPosition::new(e.line(), e.column(), 0),
        )
    })?;
    let file_name = file
        .map(str::to_string)
        .or_else(|| tree.as_ref().and_then(|tree| tree.extent.file.clone()));
    engine.analyze(tree.as_ref(), file_name.as_deref())
}
