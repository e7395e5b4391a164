/*!
# PowerShell Grammar

Recursive-descent builder for the syntax tree. It recognizes the
structure the analyzer depends on (function definitions, parameter
blocks, named blocks, nested `{ ... }` expressions) and keeps every
other statement as source text.
*/

use crate::ast::{
    BlockKind, CommentGroup, FunctionDefinitionAst, FunctionKind, NamedBlockAst, ParamBlockAst,
    ParameterAst, PipelineAst, ScriptBlockAst, StatementAst,
};
use crate::core::{AnalysisError, AnalysisResult, LineIndex, ScriptExtent};

use super::lexer::{Token, TokenType};

/// Parser state over one token stream
pub struct Grammar<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    index: LineIndex,
    file: Option<String>,
}

impl<'s> Grammar<'s> {
    pub fn new(source: &'s str, tokens: Vec<Token>, file: Option<String>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            index: LineIndex::new(source),
            file,
        }
    }

    /// Parses the whole token stream as the root script block
    pub fn parse_script(mut self) -> AnalysisResult<ScriptBlockAst> {
        let root = self.script_block(None)?;
        if let Some(token) = self.peek() {
            return Err(self.error_at(token.start, format!("unexpected '{}'", token.value)));
        }
        Ok(root)
    }

    // ---- token helpers -------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn kind(&self) -> Option<TokenType> {
        self.kind_at(self.pos)
    }

    fn kind_at(&self, index: usize) -> Option<TokenType> {
        self.tokens.get(index).map(|token| token.token_type)
    }

    /// Index of the first non-trivia token at or after `index`
    fn significant_from(&self, index: usize) -> Option<usize> {
        (index..self.tokens.len()).find(|&i| !self.tokens[i].token_type.is_trivia())
    }

    fn skip_trivia(&mut self) {
        while self.kind().map_or(false, |kind| kind.is_trivia()) {
            self.pos += 1;
        }
    }

    /// Skips trivia and statement separators
    fn skip_separators(&mut self) {
        while self
            .kind()
            .map_or(false, |kind| kind.is_trivia() || kind == TokenType::Semicolon)
        {
            self.pos += 1;
        }
    }

    fn extent(&self, start: usize, end: usize) -> ScriptExtent {
        self.index
            .extent(self.source, start, end)
            .with_file(self.file.clone())
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> AnalysisError {
        AnalysisError::parse(message, self.index.position(self.source, offset))
    }

    fn text(&self, start: usize, end: usize) -> String {
        self.source.get(start..end).unwrap_or_default().to_string()
    }

    // ---- script blocks -------------------------------------------------

    /// Parses script block contents. `open` is the index of the `{` token,
    /// `None` for the file root. Consumes the closing brace.
    fn script_block(&mut self, open: Option<usize>) -> AnalysisResult<ScriptBlockAst> {
        let closing = open.is_some();
        let start = open.map_or(0, |i| self.tokens[i].start);

        let param_block = self.param_block()?;

        self.skip_separators();
        let body_start = self.peek().map_or(self.source.len(), |t| t.start);
        let named_blocks = if self.at_named_block() {
            self.named_blocks(closing)?
        } else {
            let statements = self.statements(closing)?;
            let body_end = statements
                .last()
                .map_or(body_start, |statement| statement.extent().end_offset);
            vec![NamedBlockAst {
                kind: BlockKind::End,
                unnamed: true,
                extent: self.extent(body_start, body_end.max(body_start)),
                statements,
            }]
        };

        let end = match open {
            Some(open) => {
                if self.kind() != Some(TokenType::RightBrace) {
                    return Err(self.error_at(self.tokens[open].start, "missing closing '}'"));
                }
                let end = self.tokens[self.pos].end;
                self.pos += 1;
                end
            }
            None => self.source.len(),
        };

        Ok(ScriptBlockAst {
            extent: self.extent(start, end),
            param_block,
            named_blocks,
        })
    }

    /// Optional `[attributes] param( ... )` at the start of a script block
    fn param_block(&mut self) -> AnalysisResult<Option<ParamBlockAst>> {
        let checkpoint = self.pos;
        self.skip_trivia();

        let first = self.pos;
        let mut attributes = Vec::new();
        while self.kind() == Some(TokenType::LeftBracket) {
            let start = self.tokens[self.pos].start;
            let end = self.skip_group()?;
            attributes.push(self.text(start, end));
            self.skip_trivia();
        }

        let is_param = self.kind() == Some(TokenType::Param)
            && self
                .significant_from(self.pos + 1)
                .and_then(|i| self.kind_at(i))
                == Some(TokenType::LeftParen);
        if !is_param {
            self.pos = checkpoint;
            return Ok(None);
        }

        let start = self.tokens[first].start;
        self.pos += 1;
        self.skip_trivia();
        let open = self.pos;
        self.pos += 1;
        let parameters = self.parameter_list(open)?;
        let end = self.tokens[self.pos - 1].end;

        Ok(Some(ParamBlockAst {
            extent: self.extent(start, end),
            attributes,
            parameters,
        }))
    }

    fn block_kind(kind: TokenType) -> Option<BlockKind> {
        match kind {
            TokenType::Begin => Some(BlockKind::Begin),
            TokenType::Process => Some(BlockKind::Process),
            TokenType::End => Some(BlockKind::End),
            TokenType::DynamicParam => Some(BlockKind::DynamicParam),
            TokenType::Clean => Some(BlockKind::Clean),
            _ => None,
        }
    }

    fn at_named_block(&self) -> bool {
        let Some(kind) = self.kind() else {
            return false;
        };
        Self::block_kind(kind).is_some()
            && self
                .significant_from(self.pos + 1)
                .and_then(|i| self.kind_at(i))
                == Some(TokenType::LeftBrace)
    }

    /// `begin { } process { } ...` until the enclosing close brace
    fn named_blocks(&mut self, closing: bool) -> AnalysisResult<Vec<NamedBlockAst>> {
        let mut blocks = Vec::new();
        loop {
            self.skip_separators();
            let Some(token) = self.peek() else { break };
            if closing && token.token_type == TokenType::RightBrace {
                break;
            }
            let keyword_start = token.start;
            let kind = match Self::block_kind(token.token_type) {
                Some(kind) if self.at_named_block() => kind,
                _ => {
                    return Err(self.error_at(
                        keyword_start,
                        format!("unexpected '{}' where a named block was expected", token.value),
                    ))
                }
            };

            self.pos += 1;
            self.skip_trivia();
            let open = self.pos;
            self.pos += 1;
            let statements = self.statements(true)?;
            if self.kind() != Some(TokenType::RightBrace) {
                return Err(self.error_at(self.tokens[open].start, "missing closing '}'"));
            }
            let end = self.tokens[self.pos].end;
            self.pos += 1;

            blocks.push(NamedBlockAst {
                kind,
                unnamed: false,
                extent: self.extent(keyword_start, end),
                statements,
            });
        }
        Ok(blocks)
    }

    /// Statements until a closing brace (not consumed) or end of input
    fn statements(&mut self, closing: bool) -> AnalysisResult<Vec<StatementAst>> {
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            let Some(token) = self.peek() else { break };
            let (kind, start) = (token.token_type, token.start);
            match kind {
                TokenType::RightBrace if closing => break,
                TokenType::RightBrace => {
                    return Err(self.error_at(start, "unexpected '}'"));
                }
                TokenType::Function | TokenType::Filter | TokenType::Workflow => {
                    let function = self.function_definition()?;
                    statements.push(StatementAst::FunctionDefinition(function));
                }
                _ => {
                    if let Some(pipeline) = self.pipeline()? {
                        statements.push(StatementAst::Pipeline(pipeline));
                    }
                }
            }
        }
        Ok(statements)
    }

    // ---- functions -----------------------------------------------------

    fn function_definition(&mut self) -> AnalysisResult<FunctionDefinitionAst> {
        let keyword = self.pos;
        let keyword_token = &self.tokens[keyword];
        let start = keyword_token.start;
        let kind = match keyword_token.token_type {
            TokenType::Filter => FunctionKind::Filter,
            TokenType::Workflow => FunctionKind::Workflow,
            _ => FunctionKind::Function,
        };
        self.pos += 1;

        let name = match self.peek() {
            Some(token) if token.token_type.is_name_like() => token.value.clone(),
            _ => return Err(self.error_at(start, "missing function name")),
        };
        self.pos += 1;
        self.skip_trivia();

        let parameters = if self.kind() == Some(TokenType::LeftParen) {
            let open = self.pos;
            self.pos += 1;
            let parameters = self.parameter_list(open)?;
            self.skip_trivia();
            Some(parameters)
        } else {
            None
        };

        if self.kind() != Some(TokenType::LeftBrace) {
            return Err(self.error_at(start, format!("missing body of function '{}'", name)));
        }
        let open = self.pos;
        self.pos += 1;
        let body = self.script_block(Some(open))?;
        let close = self.pos - 1;

        Ok(FunctionDefinitionAst {
            name,
            kind,
            extent: self.extent(start, self.tokens[close].end),
            parameters,
            help_comments: self.help_candidates(keyword, open, close),
            body,
        })
    }

    /// Comment groups that may hold the function's help, in lookup order:
    /// before the keyword, at the start of the body, at the end of the body.
    fn help_candidates(&self, keyword: usize, open: usize, close: usize) -> Vec<CommentGroup> {
        let mut candidates = Vec::new();

        // at most one blank line between the comment and the keyword
        let mut i = keyword;
        let mut newlines = 0;
        while i > 0 && self.tokens[i - 1].token_type == TokenType::Newline {
            newlines += 1;
            i -= 1;
        }
        if i > 0 && newlines <= 2 && self.tokens[i - 1].token_type.is_comment() {
            candidates.push(self.comment_group_backward(i - 1));
        }

        let mut i = open + 1;
        while i < close && self.tokens[i].token_type == TokenType::Newline {
            i += 1;
        }
        if i < close && self.tokens[i].token_type.is_comment() {
            candidates.push(self.comment_group_forward(i, close));
        }

        let mut i = close;
        while i > open + 1 && self.tokens[i - 1].token_type == TokenType::Newline {
            i -= 1;
        }
        if i > open + 1 && self.tokens[i - 1].token_type.is_comment() {
            let group = self.comment_group_backward(i - 1);
            if !candidates.contains(&group) {
                candidates.push(group);
            }
        }

        candidates
    }

    /// A block comment stands alone; line comments group while they sit
    /// on consecutive lines.
    fn comment_group_backward(&self, last: usize) -> CommentGroup {
        let mut first = last;
        if self.tokens[last].token_type == TokenType::LineComment {
            while first >= 2
                && self.tokens[first - 1].token_type == TokenType::Newline
                && self.tokens[first - 2].token_type == TokenType::LineComment
            {
                first -= 2;
            }
        }
        self.comment_group(first, last)
    }

    fn comment_group_forward(&self, first: usize, limit: usize) -> CommentGroup {
        let mut last = first;
        if self.tokens[first].token_type == TokenType::LineComment {
            while last + 2 < limit
                && self.tokens[last + 1].token_type == TokenType::Newline
                && self.tokens[last + 2].token_type == TokenType::LineComment
            {
                last += 2;
            }
        }
        self.comment_group(first, last)
    }

    fn comment_group(&self, first: usize, last: usize) -> CommentGroup {
        CommentGroup {
            comments: self.tokens[first..=last]
                .iter()
                .filter(|token| token.token_type.is_comment())
                .map(|token| token.value.clone())
                .collect(),
            extent: self.extent(self.tokens[first].start, self.tokens[last].end),
        }
    }

    // ---- parameters ----------------------------------------------------

    /// Parameter list after `(` at `open`; consumes the matching `)`.
    fn parameter_list(&mut self, open: usize) -> AnalysisResult<Vec<ParameterAst>> {
        let mut parameters = Vec::new();
        let mut segment = Segment::default();
        let mut depth = 0usize;

        loop {
            let Some(token) = self.peek() else {
                return Err(self.error_at(self.tokens[open].start, "missing closing ')'"));
            };
            let index = self.pos;
            let kind = token.token_type;
            self.pos += 1;

            match kind {
                TokenType::RightParen if depth == 0 => {
                    if let Some(parameter) = self.finish_segment(std::mem::take(&mut segment)) {
                        parameters.push(parameter);
                    }
                    break;
                }
                TokenType::Comma if depth == 0 => {
                    if let Some(parameter) = self.finish_segment(std::mem::take(&mut segment)) {
                        parameters.push(parameter);
                    }
                }
                TokenType::Newline => {}
                TokenType::LineComment | TokenType::BlockComment => {
                    if depth == 0 && segment.name.is_none() {
                        segment.comments.push(self.tokens[index].value.clone());
                    }
                }
                _ if kind.opens_group() => {
                    if depth == 0 && kind == TokenType::LeftBracket && segment.name.is_none() {
                        segment.attribute_start = Some(index);
                    }
                    depth += 1;
                    segment.touch(index);
                }
                _ if kind.closes_group() => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        if let Some(attribute_start) = segment.attribute_start.take() {
                            let text =
                                self.text(self.tokens[attribute_start].start, self.tokens[index].end);
                            segment.attributes.push(text);
                        }
                    }
                    segment.touch(index);
                }
                TokenType::Variable if depth == 0 && segment.name.is_none() => {
                    segment.name = Some(index);
                    segment.touch(index);
                }
                TokenType::Equals
                    if depth == 0 && segment.name.is_some() && segment.default_start.is_none() =>
                {
                    segment.default_start = Some(index + 1);
                    segment.touch(index);
                }
                _ => segment.touch(index),
            }
        }

        Ok(parameters)
    }

    fn finish_segment(&self, segment: Segment) -> Option<ParameterAst> {
        let name_index = segment.name?;
        let first = segment.first?;
        let last = segment.last?;
        let end = self.tokens[last].end;

        let default_value = segment
            .default_start
            .filter(|&start| start <= last)
            .map(|start| self.text(self.tokens[start].start, end).trim().to_string());

        Some(ParameterAst {
            name: variable_name(&self.tokens[name_index].value),
            extent: self.extent(self.tokens[first].start, end),
            attributes: segment.attributes,
            default_value,
            leading_comments: segment.comments,
        })
    }

    // ---- other statements ----------------------------------------------

    /// One statement kept as text. Returns `None` when only trivia remained.
    fn pipeline(&mut self) -> AnalysisResult<Option<PipelineAst>> {
        let mut script_blocks = Vec::new();
        let mut depth = 0usize;
        let mut first: Option<usize> = None;
        let mut last_end = 0usize;
        let mut last_kind: Option<TokenType> = None;

        while let Some(token) = self.peek() {
            let kind = token.token_type;
            let (start, end) = (token.start, token.end);
            match kind {
                TokenType::RightBrace => break,
                TokenType::Newline if depth == 0 && last_kind != Some(TokenType::Pipe) => break,
                TokenType::Semicolon if depth == 0 => break,
                TokenType::Newline | TokenType::LineComment | TokenType::BlockComment => {
                    self.pos += 1;
                    continue;
                }
                TokenType::LeftBrace => {
                    let open = self.pos;
                    self.pos += 1;
                    let block = self.script_block(Some(open))?;
                    last_end = block.extent.end_offset;
                    script_blocks.push(block);
                }
                TokenType::AtBrace => {
                    let open = self.pos;
                    self.pos += 1;
                    last_end = self.hashtable(open, &mut script_blocks)?;
                }
                _ if kind.opens_group() => {
                    depth += 1;
                    self.pos += 1;
                    last_end = end;
                }
                _ if kind.closes_group() => {
                    depth = depth.saturating_sub(1);
                    self.pos += 1;
                    last_end = end;
                }
                _ => {
                    self.pos += 1;
                    last_end = end;
                }
            }
            first.get_or_insert(start);
            last_kind = Some(kind);
        }

        Ok(first.map(|start| PipelineAst {
            extent: self.extent(start, last_end),
            script_blocks,
        }))
    }

    /// Hashtable literal after `@{` at `open`; collects nested script
    /// blocks and returns the end offset of the closing brace.
    fn hashtable(
        &mut self,
        open: usize,
        script_blocks: &mut Vec<ScriptBlockAst>,
    ) -> AnalysisResult<usize> {
        loop {
            let Some(token) = self.peek() else {
                return Err(self.error_at(self.tokens[open].start, "missing closing '}'"));
            };
            let (kind, end) = (token.token_type, token.end);
            match kind {
                TokenType::RightBrace => {
                    self.pos += 1;
                    return Ok(end);
                }
                TokenType::LeftBrace => {
                    let nested = self.pos;
                    self.pos += 1;
                    script_blocks.push(self.script_block(Some(nested))?);
                }
                TokenType::AtBrace => {
                    let nested = self.pos;
                    self.pos += 1;
                    self.hashtable(nested, script_blocks)?;
                }
                _ => self.pos += 1,
            }
        }
    }

    /// Skips a bracketed group starting at the current token and returns
    /// the end offset of its closing token.
    fn skip_group(&mut self) -> AnalysisResult<usize> {
        let open = self.pos;
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            let kind = token.token_type;
            let end = token.end;
            self.pos += 1;
            if kind.opens_group() {
                depth += 1;
            } else if kind.closes_group() {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(end);
                }
            }
        }
        let opening = &self.tokens[open];
        Err(self.error_at(
            opening.start,
            format!("missing closing for '{}'", opening.value),
        ))
    }
}

/// Tokens of one comma-separated parameter declaration
#[derive(Debug, Default)]
struct Segment {
    first: Option<usize>,
    last: Option<usize>,
    name: Option<usize>,
    attribute_start: Option<usize>,
    attributes: Vec<String>,
    default_start: Option<usize>,
    comments: Vec<String>,
}

impl Segment {
    fn touch(&mut self, index: usize) {
        self.first.get_or_insert(index);
        self.last = Some(index);
    }
}

/// `$Name` -> `Name`, `${Name}` -> `Name`, `$script:Name` -> `script:Name`
pub fn variable_name(token: &str) -> String {
    let name = token.strip_prefix('$').unwrap_or(token);
    let name = name
        .strip_prefix('{')
        .and_then(|inner| inner.strip_suffix('}'))
        .unwrap_or(name);
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_name() {
        assert_eq!(variable_name("$Path"), "Path");
        assert_eq!(variable_name("${Odd Name}"), "Odd Name");
        assert_eq!(variable_name("$script:Count"), "script:Count");
    }
}
