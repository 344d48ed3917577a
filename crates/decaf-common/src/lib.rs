pub mod config;
pub mod errors;
pub mod span;

pub use config::{ConfigError, DecafConfig, DiagnosticFormat};
pub use errors::{CompileError, Diagnostic, DiagnosticBag, ErrorClass};
pub use span::Span;
