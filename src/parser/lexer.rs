/*!
# PowerShell Lexical Analyzer

Token-level scanner for the subset of PowerShell the grammar needs:
keywords that open functions and blocks, bracket pairs, comments,
strings (so their contents never look like code), variables and
newlines. Everything else is a generic word.
*/

use logos::{Lexer, Logos};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::{AnalysisError, LineIndex};

fn block_comment(lex: &mut Lexer<TokenType>) -> bool {
    let rest = lex.remainder();
    match rest.find("#>") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => false,
    }
}

/// Consumes a here-string body; the terminator must start a line.
fn here_string_body(lex: &mut Lexer<TokenType>, terminator: &str) -> bool {
    let rest = lex.remainder();
    if rest.starts_with(terminator) {
        lex.bump(terminator.len());
        return true;
    }
    let needle = format!("\n{}", terminator);
    match rest.find(&needle) {
        Some(at) => {
            lex.bump(at + needle.len());
            true
        }
        None => false,
    }
}

fn here_string_single(lex: &mut Lexer<TokenType>) -> bool {
    here_string_body(lex, "'@")
}

fn here_string_double(lex: &mut Lexer<TokenType>) -> bool {
    here_string_body(lex, "\"@")
}

/// PowerShell token types
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    // Keywords - declarations
    #[token("function", ignore(case))]
    Function,
    #[token("filter", ignore(case))]
    Filter,
    #[token("workflow", ignore(case))]
    Workflow,
    #[token("param", ignore(case))]
    Param,

    // Keywords - named blocks
    #[token("dynamicparam", ignore(case))]
    DynamicParam,
    #[token("begin", ignore(case))]
    Begin,
    #[token("process", ignore(case))]
    Process,
    #[token("end", ignore(case))]
    End,
    #[token("clean", ignore(case))]
    Clean,

    // Delimiters
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token("@(")]
    AtParen,
    #[token("@{")]
    AtBrace,
    #[token("$(")]
    DollarParen,

    // Punctuation
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token("=")]
    Equals,
    #[token("|")]
    Pipe,

    // Comments
    #[regex(r"#[^\r\n]*")]
    LineComment,
    #[token("<#", block_comment)]
    BlockComment,

    // Literals; typographic quotes delimit strings like their ASCII forms
    #[regex(r"['‘’‚‛][^'‘’‚‛]*['‘’‚‛]")]
    StringSingle,
    #[regex(r#"["“”„]([^"“”„`]|`[^\n]|`\n)*["“”„]"#)]
    StringDouble,
    #[regex(r"@'\r?\n", here_string_single)]
    HereStringSingle,
    #[regex(r#"@"\r?\n"#, here_string_double)]
    HereStringDouble,

    // Variables: $name, $scope:name, $_, $$, $?, $^, ${any text}
    #[regex(r"\$(\w+(:\w*)?|[$?^])")]
    #[regex(r"\$\{[^}]*\}")]
    Variable,
    #[regex(r"@\w+")]
    Splat,

    // Anything else: commands, operators, numbers, member access
    #[regex(r#"[^\s{}()\[\],;=|#'"`$@‘’‚‛“”„]+"#, priority = 1)]
    Word,
    #[regex(r"[@$`]")]
    Other,

    // Whitespace, line continuations and newlines
    #[regex(r"[ \t\f\r\u{00A0}\u{2000}-\u{200B}\u{3000}\u{FEFF}]+", logos::skip)]
    Whitespace,
    #[regex(r"`\r?\n", logos::skip)]
    LineContinuation,
    #[regex(r"\r?\n")]
    Newline,
}

impl TokenType {
    /// Newlines and comments
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            TokenType::Newline | TokenType::LineComment | TokenType::BlockComment
        )
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, TokenType::LineComment | TokenType::BlockComment)
    }

    /// Tokens that increase bracket nesting
    pub fn opens_group(&self) -> bool {
        matches!(
            self,
            TokenType::LeftParen
                | TokenType::LeftBracket
                | TokenType::LeftBrace
                | TokenType::AtParen
                | TokenType::AtBrace
                | TokenType::DollarParen
        )
    }

    pub fn closes_group(&self) -> bool {
        matches!(
            self,
            TokenType::RightParen | TokenType::RightBracket | TokenType::RightBrace
        )
    }

    /// Tokens that may name a function
    pub fn is_name_like(&self) -> bool {
        matches!(
            self,
            TokenType::Word
                | TokenType::Function
                | TokenType::Filter
                | TokenType::Workflow
                | TokenType::Param
                | TokenType::DynamicParam
                | TokenType::Begin
                | TokenType::Process
                | TokenType::End
                | TokenType::Clean
        )
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Function => write!(f, "function"),
            TokenType::Filter => write!(f, "filter"),
            TokenType::Workflow => write!(f, "workflow"),
            TokenType::Param => write!(f, "param"),
            TokenType::DynamicParam => write!(f, "dynamicparam"),
            TokenType::Begin => write!(f, "begin"),
            TokenType::Process => write!(f, "process"),
            TokenType::End => write!(f, "end"),
            TokenType::Clean => write!(f, "clean"),
            TokenType::LeftBrace => write!(f, "{{"),
            TokenType::RightBrace => write!(f, "}}"),
            TokenType::LeftParen => write!(f, "("),
            TokenType::RightParen => write!(f, ")"),
            TokenType::LeftBracket => write!(f, "["),
            TokenType::RightBracket => write!(f, "]"),
            TokenType::AtParen => write!(f, "@("),
            TokenType::AtBrace => write!(f, "@{{"),
            TokenType::DollarParen => write!(f, "$("),
            TokenType::Comma => write!(f, ","),
            TokenType::Semicolon => write!(f, ";"),
            TokenType::Equals => write!(f, "="),
            TokenType::Pipe => write!(f, "|"),
            TokenType::LineComment | TokenType::BlockComment => write!(f, "COMMENT"),
            TokenType::StringSingle
            | TokenType::StringDouble
            | TokenType::HereStringSingle
            | TokenType::HereStringDouble => write!(f, "STRING"),
            TokenType::Variable => write!(f, "VARIABLE"),
            TokenType::Splat => write!(f, "SPLAT"),
            TokenType::Word => write!(f, "WORD"),
            TokenType::Other => write!(f, "OTHER"),
            TokenType::Whitespace => write!(f, "WHITESPACE"),
            TokenType::LineContinuation => write!(f, "CONTINUATION"),
            TokenType::Newline => write!(f, "NEWLINE"),
        }
    }
}

/// Token with its byte range in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new(token_type: TokenType, value: &str, start: usize) -> Self {
        Self {
            token_type,
            value: value.to_string(),
            start,
            end: start + value.len(),
        }
    }
}

/// PowerShell lexer
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptLexer;

impl ScriptLexer {
    pub fn new() -> Self {
        Self
    }

    /// Tokenizes a script; the first unrecognized input is an error.
    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, AnalysisError> {
        let mut tokens = Vec::new();
        let mut lexer = TokenType::lexer(input);

        while let Some(result) = lexer.next() {
            let span = lexer.span();
            match result {
                Ok(token_type) => tokens.push(Token::new(token_type, lexer.slice(), span.start)),
                Err(_) => {
                    let position = LineIndex::new(input).position(input, span.start);
                    let snippet: String = input.get(span.start..).unwrap_or_default().chars().take(12).collect();
                    return Err(AnalysisError::parse(
                        format!("unrecognized or unterminated input starting with '{}'", snippet),
                        position,
                    ));
                }
            }
        }

        Ok(tokens)
    }
}
