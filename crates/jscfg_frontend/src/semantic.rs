use oxc_ast::ast::Program;
use oxc_diagnostics::OxcDiagnostic;
use oxc_semantic::{Semantic, SemanticBuilder, SemanticBuilderReturn};

/// Result of semantic analysis on a parsed program.
pub struct SemanticResult<'a> {
    /// Scopes, symbols and resolved references. The walker keys its SSA
    /// environment by the symbols recorded here.
    pub semantic: Semantic<'a>,
    /// Early errors: undefined label targets, redeclarations and the like.
    pub errors: Vec<OxcDiagnostic>,
}

impl<'a> SemanticResult<'a> {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Run oxc's semantic pass over `program`: scope and symbol resolution, plus
/// early-error checks such as `break` outside a loop when `check_syntax` is
/// set.
pub fn analyze_semantics<'a>(program: &'a Program<'a>, check_syntax: bool) -> SemanticResult<'a> {
    let SemanticBuilderReturn { semantic, errors } = SemanticBuilder::new()
        .with_check_syntax_error(check_syntax)
        .build(program);

    SemanticResult { semantic, errors }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use oxc_allocator::Allocator;

    use super::*;
    use crate::parse::parse_source;

    #[test]
    fn test_redeclaration_is_an_error() {
        let allocator = Allocator::default();
        let parsed = parse_source(&allocator, "let a = 1; let a = 2;", Path::new("a.js"));
        assert!(parsed.is_ok());
        assert!(!analyze_semantics(&parsed.program, true).is_ok());
    }

    #[test]
    fn test_clean_program() {
        let allocator = Allocator::default();
        let source = "outer: for (;;) { break outer; }";
        let parsed = parse_source(&allocator, source, Path::new("a.js"));
        assert!(analyze_semantics(&parsed.program, true).is_ok());
    }

    #[test]
    fn test_shadowed_names_get_distinct_symbols() {
        let allocator = Allocator::default();
        let parsed = parse_source(&allocator, "let x = 1; { let x = 2; }", Path::new("a.js"));
        let result = analyze_semantics(&parsed.program, true);
        assert!(result.is_ok());
        let scoping = result.semantic.scoping();
        assert_eq!(scoping.symbol_names().filter(|name| *name == "x").count(), 2);
    }
}
