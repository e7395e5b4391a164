/*!
# PowerShell Parser

Builds [`ScriptBlockAst`] trees from PowerShell source using a logos
lexer and a small recursive-descent grammar.

## Usage

```rust
use pshelp_analyzer::parser::ScriptParser;

let tree = ScriptParser::new().parse(r#"
function Get-Thing {
    param($Name)
}
"#, None)?;
# Ok::<(), pshelp_analyzer::core::AnalysisError>(())
```
*/

pub mod grammar;
pub mod lexer;

pub use grammar::variable_name;
pub use lexer::{ScriptLexer, Token, TokenType};

use std::path::Path;

use crate::ast::ScriptBlockAst;
use crate::core::{read_script_file, AnalysisResult};

/// Main PowerShell parser
#[derive(Debug, Default, Clone)]
pub struct ScriptParser {
    lexer: ScriptLexer,
}

impl ScriptParser {
    pub fn new() -> Self {
        Self {
            lexer: ScriptLexer::new(),
        }
    }

    /// Parses source text. `file` is recorded in every extent.
    pub fn parse(&self, source: &str, file: Option<&str>) -> AnalysisResult<ScriptBlockAst> {
        let source = source.strip_prefix('\u{FEFF}').unwrap_or(source);
        let tokens = self.lexer.tokenize(source)?;
        tracing::trace!("tokenized {} tokens", tokens.len());
        grammar::Grammar::new(source, tokens, file.map(str::to_string)).parse_script()
    }

    /// Reads a script with BOM detection and parses it
    pub fn parse_file(&self, path: &Path) -> AnalysisResult<ScriptBlockAst> {
        let source = read_script_file(path)?;
        let file = path.to_string_lossy();
        self.parse(&source, Some(&file))
    }
}
