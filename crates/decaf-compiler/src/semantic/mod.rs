pub mod analyzer;
pub mod scope;
pub mod type_checker;
pub mod types;

pub use analyzer::{Analysis, Analyzer, AnalyzerOptions};
pub use scope::{Scope, ScopeId, ScopeKind, ScopeTree, Symbol, SymbolKind};
pub use types::{Type, TypeRegistry};

use crate::ast::nodes::Program;

/// Run semantic analysis on a program with the default options.
///
/// The returned `Analysis` holds the scope tree, the node→scope map and
/// every diagnostic; `had_errors()` is the overall verdict.
pub fn analyze(program: &Program) -> Analysis {
    Analyzer::new().analyze(program)
}

/// Run semantic analysis with explicit options (entry point name, whether
/// to require it).
pub fn analyze_with_options(program: &Program, options: AnalyzerOptions) -> Analysis {
    Analyzer::with_options(options).analyze(program)
}
