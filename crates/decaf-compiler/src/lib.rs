//! Semantic analysis for Decaf, a small imperative teaching language with
//! structs, arrays and methods.
//!
//! The parse tree (`ast`) is produced by an external parser; `semantic`
//! resolves every identifier, checks every type rule and collects every
//! violation without stopping at the first one.

pub mod ast;
pub mod semantic;

pub use semantic::{analyze, analyze_with_options, Analysis, AnalyzerOptions};
