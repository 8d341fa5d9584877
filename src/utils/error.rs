//! Error handling for viewc

use crate::utils::Span;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error classification reported with every diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    TypeError,
    MutabilityError,
    UnresolvedIdentifierError,
    CircularDependencyError,
    SchemaLookupError,
    IoError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TypeError => "TypeError",
            Self::MutabilityError => "MutabilityError",
            Self::UnresolvedIdentifierError => "UnresolvedIdentifierError",
            Self::CircularDependencyError => "CircularDependencyError",
            Self::SchemaLookupError => "SchemaLookupError",
            Self::IoError => "IoError",
        };
        f.write_str(name)
    }
}

/// Compiler error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ==================== Type Errors ====================

    #[error("{span}: type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("{span}: unknown type '{name}'")]
    UnknownType { name: String, span: Span },

    #[error("{span}: '{callee}' expects {expected} argument(s), got {got}")]
    ArgCountMismatch {
        callee: String,
        expected: usize,
        got: usize,
        span: Span,
    },

    #[error("{span}: callback '{param}' of component '{component}' expects ({expected}), got ({got})")]
    CallbackSignature {
        component: String,
        param: String,
        expected: String,
        got: String,
        span: Span,
    },

    #[error("{span}: component '{component}' has no parameter named '{prop}'")]
    UnknownProp {
        component: String,
        prop: String,
        span: Span,
    },

    #[error("{span}: component '{component}' requires parameter '{prop}'")]
    MissingProp {
        component: String,
        prop: String,
        span: Span,
    },

    #[error("{span}: parameter '{param}' of component '{component}': {message}")]
    ReferenceArgument {
        component: String,
        param: String,
        message: String,
        span: Span,
    },

    #[error("{span}: type '{ty}' has no field '{field}'")]
    UnknownField {
        ty: String,
        field: String,
        span: Span,
    },

    #[error("{span}: duplicate definition of '{name}'")]
    DuplicateDefinition { name: String, span: Span },

    #[error("{span}: operator '{op}' cannot be applied to '{ty}'")]
    InvalidOperand { op: String, ty: String, span: Span },

    #[error("{span}: expression of type '{ty}' is not indexable")]
    NotIndexable { ty: String, span: Span },

    #[error("{span}: '{name}' is not callable")]
    NotCallable { name: String, span: Span },

    #[error("{span}: struct '{owner}' cannot hold no-copy field '{field}' of type '{ty}'")]
    NocopyField {
        owner: String,
        field: String,
        ty: String,
        span: Span,
    },

    #[error("{span}: {message}")]
    InvalidView { message: String, span: Span },

    #[error("{span}: '{type_name}.{method}' {message}")]
    SharedMethod {
        type_name: String,
        method: String,
        message: String,
        span: Span,
    },

    #[error("{span}: lifecycle method '{method}' {message}")]
    HookSignature {
        method: String,
        message: String,
        span: Span,
    },

    // ==================== Mutability Errors ====================

    #[error("{span}: cannot modify immutable variable '{name}'; declare it 'mut'")]
    Mutability { name: String, span: Span },

    // ==================== Resolution Errors ====================

    #[error("{span}: undeclared identifier '{name}'")]
    UnresolvedIdentifier { name: String, span: Span },

    #[error("circular dependency among components: {}", .cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    #[error("{span}: '{}' not found in the type schema", display_schema_path(.type_name, .member))]
    SchemaLookup {
        type_name: String,
        member: Option<String>,
        span: Span,
    },

    // ==================== Driver Errors ====================

    #[error("IO error: {0}")]
    Io(String),

    #[error("invalid input: {0}")]
    Input(String),

    #[error("code generation failed: {0}")]
    Codegen(String),
}

fn display_schema_path(type_name: &str, member: &Option<String>) -> String {
    match member {
        Some(m) => format!("{}.{}", type_name, m),
        None => type_name.to_string(),
    }
}

impl Error {
    /// Get the span associated with this error
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::TypeMismatch { span, .. }
            | Self::UnknownType { span, .. }
            | Self::ArgCountMismatch { span, .. }
            | Self::CallbackSignature { span, .. }
            | Self::UnknownProp { span, .. }
            | Self::MissingProp { span, .. }
            | Self::ReferenceArgument { span, .. }
            | Self::UnknownField { span, .. }
            | Self::DuplicateDefinition { span, .. }
            | Self::InvalidOperand { span, .. }
            | Self::NotIndexable { span, .. }
            | Self::NotCallable { span, .. }
            | Self::NocopyField { span, .. }
            | Self::InvalidView { span, .. }
            | Self::SharedMethod { span, .. }
            | Self::HookSignature { span, .. }
            | Self::Mutability { span, .. }
            | Self::UnresolvedIdentifier { span, .. }
            | Self::SchemaLookup { span, .. } => Some(*span),
            Self::CircularDependency { .. } | Self::Io(_) | Self::Input(_) | Self::Codegen(_) => None,
        }
    }

    /// Stable classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Mutability { .. } => ErrorKind::MutabilityError,
            Self::UnresolvedIdentifier { .. } => ErrorKind::UnresolvedIdentifierError,
            Self::CircularDependency { .. } => ErrorKind::CircularDependencyError,
            Self::SchemaLookup { .. } => ErrorKind::SchemaLookupError,
            Self::Io(_) | Self::Input(_) => ErrorKind::IoError,
            _ => ErrorKind::TypeError,
        }
    }

    /// Source line of the error, if known
    pub fn line(&self) -> Option<u32> {
        self.span().filter(|s| s.is_known()).map(|s| s.line)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Input(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_stable() {
        let err = Error::Mutability { name: "x".into(), span: Span::line(4) };
        assert_eq!(err.kind(), ErrorKind::MutabilityError);
        assert_eq!(err.line(), Some(4));
        assert!(err.to_string().contains("'x'"));

        let err = Error::CircularDependency { cycle: vec!["A".into(), "B".into(), "A".into()] };
        assert_eq!(err.kind(), ErrorKind::CircularDependencyError);
        assert_eq!(err.to_string(), "circular dependency among components: A -> B -> A");
        assert_eq!(err.line(), None);
    }

    #[test]
    fn test_schema_lookup_message() {
        let err = Error::SchemaLookup {
            type_name: "Canvas".into(),
            member: Some("draw".into()),
            span: Span::new(3, 7),
        };
        assert_eq!(err.to_string(), "line 3:7: 'Canvas.draw' not found in the type schema");
        assert_eq!(err.kind(), ErrorKind::SchemaLookupError);
    }
}
