/*!
# Syntax Tree

Owned node types for the parts of a PowerShell script the analyzer
inspects. Trees come either from [`crate::parser::ScriptParser`] or from
a JSON dump produced by an external parser, so every node is serde
(de)serializable.

Statements keep their source text in the extent; only the structure
needed to find functions, parameter blocks and named blocks is modeled.
*/

pub mod search;

pub use search::{Ast, AstKind, FindAll};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::ScriptExtent;

/// Script block: the root of a file, a function body or a `{ ... }` expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptBlockAst {
    pub extent: ScriptExtent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_block: Option<ParamBlockAst>,
    #[serde(default)]
    pub named_blocks: Vec<NamedBlockAst>,
}

impl ScriptBlockAst {
    pub fn new(extent: ScriptExtent) -> Self {
        Self {
            extent,
            param_block: None,
            named_blocks: Vec::new(),
        }
    }

    /// First named block of the given kind
    pub fn named_block(&self, kind: BlockKind) -> Option<&NamedBlockAst> {
        self.named_blocks.iter().find(|block| block.kind == kind)
    }

    /// Dynamic-parameters block of this script block, if declared
    pub fn dynamic_param_block(&self) -> Option<&NamedBlockAst> {
        self.named_block(BlockKind::DynamicParam)
    }
}

/// Kind of function-like declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    #[default]
    Function,
    Filter,
    Workflow,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionKind::Function => write!(f, "function"),
            FunctionKind::Filter => write!(f, "filter"),
            FunctionKind::Workflow => write!(f, "workflow"),
        }
    }
}

/// Comment tokens that may hold the comment-based help of a function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentGroup {
    /// Raw comment tokens, delimiters included (`# ...` or `<# ... #>`)
    pub comments: Vec<String>,
    pub extent: ScriptExtent,
}

/// `function Name [(inline params)] { body }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinitionAst {
    pub name: String,
    #[serde(default)]
    pub kind: FunctionKind,
    pub extent: ScriptExtent,
    /// Parameters written as `function f($a, $b)`; absent when not used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<ParameterAst>>,
    pub body: ScriptBlockAst,
    /// Help comment candidates, most preferred first
    #[serde(default)]
    pub help_comments: Vec<CommentGroup>,
}

/// `param( ... )`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamBlockAst {
    pub extent: ScriptExtent,
    /// Attributes written before `param`, e.g. `[CmdletBinding()]`
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterAst>,
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterAst {
    /// User-facing name: no `$`, no braces (`$Path` -> `Path`)
    pub name: String,
    pub extent: ScriptExtent,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Comments written directly above the parameter
    #[serde(default)]
    pub leading_comments: Vec<String>,
}

/// Kind of a named block inside a script block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Begin,
    Process,
    End,
    DynamicParam,
    Clean,
}

impl BlockKind {
    /// Keyword that opens the block
    pub fn keyword(&self) -> &'static str {
        match self {
            BlockKind::Begin => "begin",
            BlockKind::Process => "process",
            BlockKind::End => "end",
            BlockKind::DynamicParam => "dynamicparam",
            BlockKind::Clean => "clean",
        }
    }
}

/// `begin { }`, `process { }`, `dynamicparam { }`...; an unnamed body is an
/// `End` block with `unnamed` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedBlockAst {
    pub kind: BlockKind,
    #[serde(default)]
    pub unnamed: bool,
    pub extent: ScriptExtent,
    #[serde(default)]
    pub statements: Vec<StatementAst>,
}

/// Statement inside a named block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatementAst {
    FunctionDefinition(FunctionDefinitionAst),
    Pipeline(PipelineAst),
}

impl StatementAst {
    pub fn extent(&self) -> &ScriptExtent {
        match self {
            StatementAst::FunctionDefinition(function) => &function.extent,
            StatementAst::Pipeline(pipeline) => &pipeline.extent,
        }
    }
}

impl fmt::Display for StatementAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extent().text)
    }
}

/// Any other statement. Only its `{ ... }` expressions are structured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineAst {
    pub extent: ScriptExtent,
    #[serde(default)]
    pub script_blocks: Vec<ScriptBlockAst>,
}

/// Loads a tree dumped as JSON. `null` yields `None`, the absent tree.
pub fn tree_from_json(json: &str) -> Result<Option<ScriptBlockAst>, serde_json::Error> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_json_is_absent_tree() {
        assert!(tree_from_json("null").unwrap().is_none());
    }

    #[test]
    fn test_json_tree_with_defaults() {
        let json = r#"{
            "extent": { "start_line": 1, "start_column": 1, "end_line": 1, "end_column": 1 },
            "named_blocks": [{
                "kind": "end",
                "unnamed": true,
                "extent": { "start_line": 1, "start_column": 1, "end_line": 1, "end_column": 1 },
                "statements": [{
                    "type": "pipeline",
                    "extent": { "start_line": 1, "start_column": 1, "end_line": 1, "end_column": 12, "text": "Get-Process" }
                }]
            }]
        }"#;
        let tree = tree_from_json(json).unwrap().unwrap();
        let end = tree.named_block(BlockKind::End).unwrap();
        assert!(end.unnamed);
        assert_eq!(end.statements[0].to_string(), "Get-Process");
        assert!(tree.dynamic_param_block().is_none());
    }
}
