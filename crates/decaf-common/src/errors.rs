use serde::Serialize;

use crate::span::Span;

/// Diagnostic families reported by the parser and the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorClass {
    Array,
    Decl,
    Name,
    Param,
    Struct,
    Return,
    Type,
    Attribute,
    Syntax,
}

impl ErrorClass {
    pub fn label(self) -> &'static str {
        match self {
            ErrorClass::Array => "ArrayError",
            ErrorClass::Decl => "DeclError",
            ErrorClass::Name => "NameError",
            ErrorClass::Param => "ParamError",
            ErrorClass::Struct => "StructError",
            ErrorClass::Return => "ReturnError",
            ErrorClass::Type => "TypeError",
            ErrorClass::Attribute => "AttributeError",
            ErrorClass::Syntax => "SyntaxError",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single violation, carrying the contextual values its message needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompileError {
    #[error("Size of array '{name}' is negative or 0")]
    ArraySize { name: String },

    #[error("Index {index} of array '{name}' is out of range")]
    ArrayIndex { name: String, index: i64 },

    #[error("Index of array '{name}' must be of type 'int', not '{found}'")]
    ArrayIndexType { name: String, found: String },

    #[error("Array '{name}' cannot be used without an index")]
    ArrayNotIndexed { name: String },

    #[error("Redeclaration of '{name}' in '{scope}'")]
    Redeclaration { name: String, scope: String },

    #[error("Name '{name}' is not defined")]
    UndefinedName { name: String },

    #[error("Duplicate argument '{param}' in '{method}()'")]
    DuplicateParam { param: String, method: String },

    #[error("Struct '{name}' cannot have the same name as a built-in type or another struct")]
    StructRedefinition { name: String },

    #[error("The return type '{found}' must be the same as the method type '{expected}'")]
    ReturnMismatch { expected: String, found: String },

    /// TypeError code 1.
    #[error("Unsupported operand type(s) for '{op}'")]
    UnsupportedOperand { op: String },

    /// TypeError code 2.
    #[error("Conditional '{stmt}' evaluates <expr> of type 'boolean'")]
    NonBooleanCondition { stmt: String },

    /// TypeError code 3.
    #[error("'{name}' object is not callable")]
    NotCallable { name: String },

    /// TypeError code 4.
    #[error("'{name}()' does not have the correct arguments")]
    BadArguments { name: String },

    #[error("'{name}' has no attribute '{member}'")]
    NoAttribute { name: String, member: String },

    #[error("{message}")]
    Syntax { message: String },
}

impl CompileError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CompileError::ArraySize { .. }
            | CompileError::ArrayIndex { .. }
            | CompileError::ArrayIndexType { .. }
            | CompileError::ArrayNotIndexed { .. } => ErrorClass::Array,
            CompileError::Redeclaration { .. } => ErrorClass::Decl,
            CompileError::UndefinedName { .. } => ErrorClass::Name,
            CompileError::DuplicateParam { .. } => ErrorClass::Param,
            CompileError::StructRedefinition { .. } => ErrorClass::Struct,
            CompileError::ReturnMismatch { .. } => ErrorClass::Return,
            CompileError::UnsupportedOperand { .. }
            | CompileError::NonBooleanCondition { .. }
            | CompileError::NotCallable { .. }
            | CompileError::BadArguments { .. } => ErrorClass::Type,
            CompileError::NoAttribute { .. } => ErrorClass::Attribute,
            CompileError::Syntax { .. } => ErrorClass::Syntax,
        }
    }

    /// Subcode of a TypeError (1 bad operand, 2 non-boolean condition,
    /// 3 not callable, 4 bad call arguments).
    pub fn type_code(&self) -> Option<u8> {
        match self {
            CompileError::UnsupportedOperand { .. } => Some(1),
            CompileError::NonBooleanCondition { .. } => Some(2),
            CompileError::NotCallable { .. } => Some(3),
            CompileError::BadArguments { .. } => Some(4),
            _ => None,
        }
    }
}

/// An error anchored at a source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub error: CompileError,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(error: CompileError, span: Span) -> Self {
        Self { error, span }
    }

    pub fn class(&self) -> ErrorClass {
        self.error.class()
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: line:{}. {}", self.class(), self.span, self.error)
    }
}

/// Collector for diagnostics during analysis. Reporting never fails.
#[derive(Debug, Default)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, error: CompileError, span: Span) {
        self.report(Diagnostic::new(error, span));
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_rendering() {
        let diag = Diagnostic::new(
            CompileError::UndefinedName { name: "x".into() },
            Span::line(3),
        );
        assert_eq!(diag.to_string(), "NameError: line:3. Name 'x' is not defined");
    }

    #[test]
    fn type_codes() {
        let cases = [
            (CompileError::UnsupportedOperand { op: "+".into() }, Some(1)),
            (
                CompileError::NonBooleanCondition {
                    stmt: "ifScope".into(),
                },
                Some(2),
            ),
            (CompileError::NotCallable { name: "x".into() }, Some(3)),
            (CompileError::BadArguments { name: "f".into() }, Some(4)),
            (CompileError::ArraySize { name: "a".into() }, None),
        ];
        for (error, code) in cases {
            assert_eq!(error.type_code(), code, "{error:?}");
        }
    }

    #[test]
    fn classes() {
        assert_eq!(
            CompileError::DuplicateParam {
                param: "a".into(),
                method: "f".into()
            }
            .class(),
            ErrorClass::Param
        );
        assert_eq!(
            CompileError::BadArguments { name: "f".into() }.class(),
            ErrorClass::Type
        );
        assert_eq!(ErrorClass::Return.to_string(), "ReturnError");
    }

    #[test]
    fn array_index_messages() {
        let diag = Diagnostic::new(
            CompileError::ArrayIndexType {
                name: "a".into(),
                found: "boolean".into(),
            },
            Span::line(7),
        );
        assert_eq!(
            diag.to_string(),
            "ArrayError: line:7. Index of array 'a' must be of type 'int', not 'boolean'"
        );
        assert_eq!(
            CompileError::ArrayNotIndexed { name: "a".into() }.class(),
            ErrorClass::Array
        );
    }

    #[test]
    fn bag_tracks_errors() {
        let mut bag = DiagnosticBag::new();
        assert!(!bag.has_errors());
        bag.error(CompileError::ArraySize { name: "a".into() }, Span::line(1));
        bag.error(CompileError::ArraySize { name: "b".into() }, Span::line(2));
        assert!(bag.has_errors());
        assert_eq!(bag.len(), 2);
        assert_eq!(bag.diagnostics()[1].span.line, 2);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(CompileError::NotCallable { name: "x".into() }).unwrap();
        assert_eq!(json["kind"], "not_callable");
        assert_eq!(json["name"], "x");
    }
}
