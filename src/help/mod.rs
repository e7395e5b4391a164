/*!
# Comment-Based Help

Extracts the structured help record PowerShell builds from a comment
block such as

```text
<#
.SYNOPSIS
    Gets a thing.
.PARAMETER Name
    Name of the thing.
#>
```

The grammar records candidate comment groups per function; the first
candidate that parses as help is the function's help.
*/

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ast::{Ast, AstKind, CommentGroup, FunctionDefinitionAst};

/// `.KEYWORD` or `.KEYWORD argument` on its own line
static KEYWORD_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\.([A-Za-z]+)(?:[ \t]+(.*?))?\s*$").expect("keyword line pattern is valid")
});

/// Help sections PowerShell recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Synopsis,
    Description,
    Parameter,
    Example,
    Inputs,
    Outputs,
    Notes,
    Link,
    Component,
    Role,
    Functionality,
    ForwardHelpTargetName,
    ForwardHelpCategory,
    RemoteHelpRunspace,
    ExternalHelp,
}

impl Section {
    fn from_keyword(keyword: &str) -> Option<Self> {
        let section = match keyword.to_ascii_uppercase().as_str() {
            "SYNOPSIS" => Section::Synopsis,
            "DESCRIPTION" => Section::Description,
            "PARAMETER" => Section::Parameter,
            "EXAMPLE" => Section::Example,
            "INPUTS" => Section::Inputs,
            "OUTPUTS" => Section::Outputs,
            "NOTES" => Section::Notes,
            "LINK" => Section::Link,
            "COMPONENT" => Section::Component,
            "ROLE" => Section::Role,
            "FUNCTIONALITY" => Section::Functionality,
            "FORWARDHELPTARGETNAME" => Section::ForwardHelpTargetName,
            "FORWARDHELPCATEGORY" => Section::ForwardHelpCategory,
            "REMOTEHELPRUNSPACE" => Section::RemoteHelpRunspace,
            "EXTERNALHELP" => Section::ExternalHelp,
            _ => return None,
        };
        Some(section)
    }
}

/// Parsed comment-based help of one function
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentHelpInfo {
    pub synopsis: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub examples: Vec<String>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub links: Vec<String>,
    pub component: Option<String>,
    pub role: Option<String>,
    pub functionality: Option<String>,
    pub forward_help_target_name: Option<String>,
    pub forward_help_category: Option<String>,
    pub remote_help_runspace: Option<String>,
    pub external_help: Option<String>,
    /// Parameter documentation keyed by upper-cased parameter name
    pub parameters: BTreeMap<String, String>,
}

impl CommentHelpInfo {
    /// Case-insensitive parameter lookup
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(&name.to_uppercase())
            .map(String::as_str)
    }

    pub fn contains_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(&name.to_uppercase())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn add_parameter(&mut self, name: &str, text: String) {
        self.parameters
            .entry(name.to_uppercase())
            .and_modify(|existing| append(existing, &text))
            .or_insert(text);
    }

    fn add(&mut self, section: Section, argument: Option<&str>, text: String) {
        match section {
            Section::Synopsis => merge(&mut self.synopsis, text),
            Section::Description => merge(&mut self.description, text),
            Section::Notes => merge(&mut self.notes, text),
            Section::Component => merge(&mut self.component, text),
            Section::Role => merge(&mut self.role, text),
            Section::Functionality => merge(&mut self.functionality, text),
            Section::Example => self.examples.push(text),
            Section::Inputs => self.inputs.push(text),
            Section::Outputs => self.outputs.push(text),
            Section::Link => self.links.push(text),
            Section::Parameter => {
                if let Some(name) = argument {
                    self.add_parameter(name, text);
                }
            }
            // these carry their value as the keyword argument
            Section::ForwardHelpTargetName => {
                merge(&mut self.forward_help_target_name, argument_or(argument, text))
            }
            Section::ForwardHelpCategory => {
                merge(&mut self.forward_help_category, argument_or(argument, text))
            }
            Section::RemoteHelpRunspace => {
                merge(&mut self.remote_help_runspace, argument_or(argument, text))
            }
            Section::ExternalHelp => merge(&mut self.external_help, argument_or(argument, text)),
        }
    }
}

fn argument_or(argument: Option<&str>, text: String) -> String {
    match argument {
        Some(argument) if text.is_empty() => argument.to_string(),
        Some(argument) => format!("{}\n{}", argument, text),
        None => text,
    }
}

fn append(existing: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !existing.is_empty() {
        existing.push('\n');
    }
    existing.push_str(text);
}

fn merge(slot: &mut Option<String>, text: String) {
    match slot {
        Some(existing) => append(existing, &text),
        None => *slot = Some(text),
    }
}

/// Comment text without delimiters, one entry per source line
fn comment_lines(comments: &[String]) -> Vec<String> {
    let mut lines = Vec::new();
    for comment in comments {
        if let Some(body) = comment.strip_prefix("<#") {
            let body = body.strip_suffix("#>").unwrap_or(body);
            lines.extend(body.lines().map(str::to_string));
        } else {
            lines.push(comment.strip_prefix('#').unwrap_or(comment).to_string());
        }
    }
    lines
}

/// Body text of a section: common indentation removed, outer blank lines dropped
fn section_text(lines: &[String]) -> String {
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    let text: Vec<&str> = lines
        .iter()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()).trim_end())
        .collect();
    text.join("\n").trim_matches('\n').to_string()
}

/// Parses one comment group. Returns `None` when the group is not help:
/// no keyword at all, or a `.WORD` line that is not a help keyword.
pub fn parse_comment_help(group: &CommentGroup) -> Option<CommentHelpInfo> {
    parse_help_lines(&comment_lines(&group.comments))
}

fn parse_help_lines(lines: &[String]) -> Option<CommentHelpInfo> {
    let mut help = CommentHelpInfo::default();
    let mut current: Option<(Section, Option<String>)> = None;
    let mut body: Vec<String> = Vec::new();
    let mut seen_keyword = false;

    for line in lines {
        if let Some(captures) = KEYWORD_LINE.captures(line) {
            let keyword = captures.get(1).map_or("", |m| m.as_str());
            let section = Section::from_keyword(keyword)?;
            if let Some((previous, argument)) = current.take() {
                help.add(previous, argument.as_deref(), section_text(&body));
            }
            body.clear();
            seen_keyword = true;
            let argument = captures
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .filter(|argument| !argument.is_empty());
            current = Some((section, argument));
        } else if current.is_some() {
            body.push(line.clone());
        }
    }

    if let Some((section, argument)) = current.take() {
        help.add(section, argument.as_deref(), section_text(&body));
    }

    seen_keyword.then_some(help)
}

/// Help of a function; empty when it has none. Never fails.
///
/// With a help block present, a parameter's leading comment documents the
/// parameter when `.PARAMETER` does not.
pub fn get_help_content(function: &FunctionDefinitionAst) -> CommentHelpInfo {
    let Some(mut help) = function.help_comments.iter().find_map(parse_comment_help) else {
        return CommentHelpInfo::default();
    };

    let inline = function.parameters.iter().flatten();
    let declared = function
        .body
        .param_block
        .iter()
        .flat_map(|param_block| param_block.parameters.iter());
    for parameter in inline.chain(declared) {
        if parameter.leading_comments.is_empty() || help.contains_parameter(&parameter.name) {
            continue;
        }
        let text = section_text(&comment_lines(&parameter.leading_comments));
        help.add_parameter(&parameter.name, text);
    }

    help
}

/// Help of every function in a tree, in search order
pub fn collect_help<'a>(root: Ast<'a>) -> Vec<(&'a FunctionDefinitionAst, CommentHelpInfo)> {
    root.find_all(|node| node.kind() == AstKind::FunctionDefinition, true)
        .filter_map(|node| node.as_function_definition())
        .map(|function| (function, get_help_content(function)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ScriptExtent;
    use pretty_assertions::assert_eq;

    fn group(comments: &[&str]) -> CommentGroup {
        CommentGroup {
            comments: comments.iter().map(|c| c.to_string()).collect(),
            extent: ScriptExtent::empty(),
        }
    }

    #[test]
    fn test_block_comment_help() {
        let help = parse_comment_help(&group(&[
            "<#\n.SYNOPSIS\n    Gets a thing.\n.DESCRIPTION\n    Longer text\n    on two lines.\n.PARAMETER Name\n    The name.\n.parameter count\n.EXAMPLE\n    Get-Thing -Name x\n#>",
        ]))
        .unwrap();

        assert_eq!(help.synopsis.as_deref(), Some("Gets a thing."));
        assert_eq!(
            help.description.as_deref(),
            Some("Longer text\non two lines.")
        );
        assert_eq!(help.parameter("name"), Some("The name."));
        assert_eq!(help.parameter("COUNT"), Some(""));
        assert!(help.contains_parameter("Count"));
        assert_eq!(help.examples, vec!["Get-Thing -Name x".to_string()]);
    }

    #[test]
    fn test_line_comment_help() {
        let help = parse_comment_help(&group(&[
            "# .SYNOPSIS",
            "#   Short.",
            "# .PARAMETER Path",
            "#   Where.",
        ]))
        .unwrap();
        assert_eq!(help.synopsis.as_deref(), Some("Short."));
        assert_eq!(help.parameter("path"), Some("Where."));
    }

    #[test]
    fn test_unknown_keyword_is_not_help() {
        assert!(parse_comment_help(&group(&["<#\n.SYNOPSIS\n x\n.FOO\n#>"])).is_none());
    }

    #[test]
    fn test_plain_comment_is_not_help() {
        assert!(parse_comment_help(&group(&["# just a note"])).is_none());
    }

    #[test]
    fn test_parameter_without_name_is_ignored() {
        let help = parse_comment_help(&group(&["<#\n.PARAMETER\n  orphan\n#>"])).unwrap();
        assert!(help.parameters.is_empty());
    }

    #[test]
    fn test_repeated_sections_concatenate() {
        let help = parse_comment_help(&group(&[
            "<#\n.PARAMETER A\n first\n.LINK\n one\n.PARAMETER a\n second\n.LINK\n two\n#>",
        ]))
        .unwrap();
        assert_eq!(help.parameter("A"), Some("first\nsecond"));
        assert_eq!(help.links, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_forward_help_argument() {
        let help = parse_comment_help(&group(&[
            "<#\n.FORWARDHELPTARGETNAME Get-ChildItem\n.FORWARDHELPCATEGORY Cmdlet\n#>",
        ]))
        .unwrap();
        assert_eq!(help.forward_help_target_name.as_deref(), Some("Get-ChildItem"));
        assert_eq!(help.forward_help_category.as_deref(), Some("Cmdlet"));
    }
}
