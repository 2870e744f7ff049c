use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_diagnostics::OxcDiagnostic;
use oxc_parser::{ParseOptions, Parser, ParserReturn};
use oxc_span::SourceType;

/// Result of parsing one JavaScript source file.
///
/// The caller must keep the `Allocator` alive for as long as the `Program` is
/// used, since the AST borrows from it.
pub struct ParseResult<'a> {
    /// The parsed AST program.
    pub program: Program<'a>,
    /// Syntax errors encountered during parsing.
    pub errors: Vec<OxcDiagnostic>,
    /// Whether the parser panicked and terminated early.
    pub panicked: bool,
}

impl<'a> ParseResult<'a> {
    /// Returns `true` if parsing succeeded without errors.
    pub fn is_ok(&self) -> bool {
        !self.panicked && self.errors.is_empty()
    }

    /// Error messages, each prefixed with `path`.
    pub fn messages(&self, path: &Path) -> Vec<String> {
        self.errors
            .iter()
            .map(|e| format!("{}: {e}", path.display()))
            .collect()
    }
}

/// Parse JavaScript source text into an oxc AST.
///
/// `path` selects the `SourceType` (script vs module, JSX, TypeScript). Paths
/// without a recognised extension are parsed as ES modules.
pub fn parse_source<'a>(
    allocator: &'a Allocator,
    source_text: &'a str,
    path: &Path,
) -> ParseResult<'a> {
    let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::mjs());

    let ParserReturn {
        program,
        errors,
        panicked,
        ..
    } = Parser::new(allocator, source_text, source_type)
        .with_options(ParseOptions {
            preserve_parens: false,
            ..ParseOptions::default()
        })
        .parse();

    ParseResult {
        program,
        errors,
        panicked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ok() {
        let allocator = Allocator::default();
        let source = "let x = 1; while (x) { x = x - 1; }";
        let result = parse_source(&allocator, source, Path::new("a.js"));
        assert!(result.is_ok());
        assert_eq!(result.program.body.len(), 2);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let allocator = Allocator::default();
        let result = parse_source(&allocator, "let = ;", Path::new("a.js"));
        assert!(!result.is_ok());
        let messages = result.messages(Path::new("a.js"));
        assert!(messages.iter().all(|m| m.starts_with("a.js: ")));
    }
}
