//! Borrowed node references and recursive search over the tree

use super::{
    FunctionDefinitionAst, NamedBlockAst, ParamBlockAst, ParameterAst, PipelineAst,
    ScriptBlockAst, StatementAst,
};
use crate::core::ScriptExtent;

/// Node kind, used by search predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AstKind {
    ScriptBlock,
    FunctionDefinition,
    ParamBlock,
    Parameter,
    NamedBlock,
    Pipeline,
}

/// Copyable reference to any node of a tree
#[derive(Debug, Clone, Copy)]
pub enum Ast<'a> {
    ScriptBlock(&'a ScriptBlockAst),
    FunctionDefinition(&'a FunctionDefinitionAst),
    ParamBlock(&'a ParamBlockAst),
    Parameter(&'a ParameterAst),
    NamedBlock(&'a NamedBlockAst),
    Pipeline(&'a PipelineAst),
}

impl<'a> Ast<'a> {
    pub fn kind(&self) -> AstKind {
        match self {
            Ast::ScriptBlock(_) => AstKind::ScriptBlock,
            Ast::FunctionDefinition(_) => AstKind::FunctionDefinition,
            Ast::ParamBlock(_) => AstKind::ParamBlock,
            Ast::Parameter(_) => AstKind::Parameter,
            Ast::NamedBlock(_) => AstKind::NamedBlock,
            Ast::Pipeline(_) => AstKind::Pipeline,
        }
    }

    pub fn extent(&self) -> &'a ScriptExtent {
        match self {
            Ast::ScriptBlock(node) => &node.extent,
            Ast::FunctionDefinition(node) => &node.extent,
            Ast::ParamBlock(node) => &node.extent,
            Ast::Parameter(node) => &node.extent,
            Ast::NamedBlock(node) => &node.extent,
            Ast::Pipeline(node) => &node.extent,
        }
    }

    /// Direct children in source order
    pub fn children(&self) -> Vec<Ast<'a>> {
        match *self {
            Ast::ScriptBlock(block) => {
                let mut children = Vec::with_capacity(block.named_blocks.len() + 1);
                if let Some(param_block) = &block.param_block {
                    children.push(Ast::ParamBlock(param_block));
                }
                children.extend(block.named_blocks.iter().map(Ast::NamedBlock));
                children
            }
            Ast::FunctionDefinition(function) => {
                let mut children: Vec<Ast<'a>> = function
                    .parameters
                    .iter()
                    .flatten()
                    .map(Ast::Parameter)
                    .collect();
                children.push(Ast::ScriptBlock(&function.body));
                children
            }
            Ast::ParamBlock(param_block) => param_block.parameters.iter().map(Ast::Parameter).collect(),
            Ast::Parameter(_) => Vec::new(),
            Ast::NamedBlock(named) => named.statements.iter().map(Ast::from).collect(),
            Ast::Pipeline(pipeline) => pipeline.script_blocks.iter().map(Ast::ScriptBlock).collect(),
        }
    }

    /// Lazily yields every node (this one included) matching `predicate`,
    /// in pre-order. With `search_nested` off, nested functions and
    /// `{ ... }` expressions may match but are not entered.
    pub fn find_all<P>(self, predicate: P, search_nested: bool) -> FindAll<'a, P>
    where
        P: FnMut(&Ast<'a>) -> bool,
    {
        FindAll {
            stack: vec![(self, false)],
            predicate,
            search_nested,
        }
    }

    /// First node matching `predicate` in pre-order
    pub fn find<P>(self, predicate: P, search_nested: bool) -> Option<Ast<'a>>
    where
        P: FnMut(&Ast<'a>) -> bool,
    {
        self.find_all(predicate, search_nested).next()
    }

    pub fn as_function_definition(&self) -> Option<&'a FunctionDefinitionAst> {
        match *self {
            Ast::FunctionDefinition(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_param_block(&self) -> Option<&'a ParamBlockAst> {
        match *self {
            Ast::ParamBlock(param_block) => Some(param_block),
            _ => None,
        }
    }

    pub fn as_named_block(&self) -> Option<&'a NamedBlockAst> {
        match *self {
            Ast::NamedBlock(named) => Some(named),
            _ => None,
        }
    }
}

impl<'a> From<&'a ScriptBlockAst> for Ast<'a> {
    fn from(node: &'a ScriptBlockAst) -> Self {
        Ast::ScriptBlock(node)
    }
}

impl<'a> From<&'a FunctionDefinitionAst> for Ast<'a> {
    fn from(node: &'a FunctionDefinitionAst) -> Self {
        Ast::FunctionDefinition(node)
    }
}

impl<'a> From<&'a StatementAst> for Ast<'a> {
    fn from(node: &'a StatementAst) -> Self {
        match node {
            StatementAst::FunctionDefinition(function) => Ast::FunctionDefinition(function),
            StatementAst::Pipeline(pipeline) => Ast::Pipeline(pipeline),
        }
    }
}

/// Iterator returned by [`Ast::find_all`]
pub struct FindAll<'a, P> {
    /// Pending nodes; the flag marks nodes that open a nested scope
    stack: Vec<(Ast<'a>, bool)>,
    predicate: P,
    search_nested: bool,
}

impl<'a, P> Iterator for FindAll<'a, P>
where
    P: FnMut(&Ast<'a>) -> bool,
{
    type Item = Ast<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, nested)) = self.stack.pop() {
            if self.search_nested || !nested {
                let from_pipeline = matches!(node, Ast::Pipeline(_));
                for child in node.children().into_iter().rev() {
                    let opens_scope = matches!(child, Ast::FunctionDefinition(_))
                        || (from_pipeline && matches!(child, Ast::ScriptBlock(_)));
                    self.stack.push((child, opens_scope));
                }
            }
            if (self.predicate)(&node) {
                return Some(node);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ScriptParser;

    fn function_names(source: &str, search_nested: bool) -> Vec<String> {
        let tree = ScriptParser::new().parse(source, None).unwrap();
        Ast::from(&tree)
            .find_all(|node| node.kind() == AstKind::FunctionDefinition, search_nested)
            .filter_map(|node| node.as_function_definition())
            .map(|function| function.name.clone())
            .collect()
    }

    #[test]
    fn test_find_all_enters_nested_functions() {
        let source = "function Outer {\n  function Inner { }\n  $sb = { function InBlock { } }\n}\nfunction Second { }";
        assert_eq!(
            function_names(source, true),
            vec!["Outer", "Inner", "InBlock", "Second"]
        );
    }

    #[test]
    fn test_find_all_without_nested_search() {
        let source = "function Outer {\n  function Inner { }\n}\nfunction Second { }";
        assert_eq!(function_names(source, false), vec!["Outer", "Second"]);
    }

    #[test]
    fn test_find_all_includes_root() {
        let tree = ScriptParser::new().parse("Get-Item", None).unwrap();
        let root = Ast::from(&tree);
        assert_eq!(
            root.find(|node| node.kind() == AstKind::ScriptBlock, true)
                .map(|node| node.kind()),
            Some(AstKind::ScriptBlock)
        );
    }
}
