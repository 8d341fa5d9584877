//! Structured feedback
//!
//! Machine-readable diagnostics for `--json`:
//! - error reports with a stable kind and fix suggestions
//! - warnings collected during compilation
//! - region statistics

use serde::{Deserialize, Serialize};

use crate::utils::{Error, ErrorKind, Span};

// ==================== Structured Error Report ====================

/// One diagnostic, error or warning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorReport {
    /// Error code (e.g., "E0001")
    pub code: String,

    /// Stable kind name (`TypeError`, `MutabilityError`, ...)
    pub kind: String,

    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    pub location: Option<Location>,

    /// Suggested fixes
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    fn from_span(span: Span, file: &str) -> Option<Self> {
        span.is_known().then(|| Location { file: file.to_string(), line: span.line, column: span.column })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    /// Description of the fix
    pub message: String,

    /// The replacement text
    pub replacement: Option<String>,

    /// Confidence in this suggestion (0.0 - 1.0)
    pub confidence: f64,
}

impl Suggestion {
    fn new(message: impl Into<String>, replacement: Option<String>, confidence: f64) -> Self {
        Self { message: message.into(), replacement, confidence }
    }
}

// ==================== Warnings ====================

/// Non-fatal findings; compilation always proceeds
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A loop key with side effects; the loop is compiled unkeyed
    ImpureLoopKey { component: String, loop_id: usize, span: Span },
}

impl Warning {
    pub fn message(&self) -> String {
        match self {
            Warning::ImpureLoopKey { component, loop_id, .. } => format!(
                "key of loop {} in '{}' has side effects; the loop is rebuilt on every change",
                loop_id, component
            ),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Warning::ImpureLoopKey { span, .. } => *span,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Warning::ImpureLoopKey { .. } => "W0001",
        }
    }
}

/// Warnings collected across all stages of one compilation
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, warning: Warning) {
        log::warn!("{}: {}", warning.span(), warning.message());
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn reports(&self, file_name: &str) -> Vec<ErrorReport> {
        self.warnings.iter().map(|w| ErrorReport::from_warning(w, file_name)).collect()
    }
}

// ==================== Compilation Feedback ====================

/// Complete result of one compilation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationFeedback {
    pub success: bool,

    pub source_file: String,

    /// All errors and warnings
    pub diagnostics: Vec<ErrorReport>,

    pub stats: CompilationStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompilationStats {
    pub component_count: usize,
    pub binding_count: usize,
    pub loop_count: usize,
    pub if_count: usize,
    pub total_time_ms: u64,
}

// ==================== Error Conversion ====================

impl ErrorReport {
    /// Create an error report from a compiler error
    pub fn from_error(error: &Error, file_name: &str) -> Self {
        let (code, suggestions) = generate_error_info(error);
        let mut report = Self {
            code: code.to_string(),
            kind: error.kind().to_string(),
            severity: Severity::Error,
            message: error.to_string(),
            location: error.span().and_then(|s| Location::from_span(s, file_name)),
            suggestions,
        };
        report.sort_suggestions();
        report
    }

    pub fn from_warning(warning: &Warning, file_name: &str) -> Self {
        let suggestions = match warning {
            Warning::ImpureLoopKey { .. } => vec![Suggestion::new(
                "Key the loop by a field of the item, e.g. key={item.id}",
                None,
                0.8,
            )],
        };
        Self {
            code: warning.code().to_string(),
            kind: "Warning".to_string(),
            severity: Severity::Warning,
            message: warning.message(),
            location: Location::from_span(warning.span(), file_name),
            suggestions,
        }
    }

    /// Most confident suggestion first
    pub fn sort_suggestions(&mut self) {
        self.suggestions.sort_by(|a, b| {
            b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

/// Error code and fix suggestions for an error
fn generate_error_info(error: &Error) -> (&'static str, Vec<Suggestion>) {
    match error {
        Error::TypeMismatch { expected, .. } => (
            "E0001",
            vec![Suggestion::new(format!("Use a value of type {}", expected), None, 0.6)],
        ),
        Error::UnknownType { name, .. } => (
            "E0002",
            vec![
                Suggestion::new(format!("Declare a struct, enum or component named '{}'", name), None, 0.6),
                Suggestion::new("Pass the type schema with --schema", None, 0.4),
            ],
        ),
        Error::ArgCountMismatch { expected, got, .. } => {
            let message = if got < expected {
                format!("Add {} more argument(s)", expected - got)
            } else {
                format!("Remove {} extra argument(s)", got - expected)
            };
            ("E0003", vec![Suggestion::new(message, None, 0.9)])
        }
        Error::CallbackSignature { expected, .. } => (
            "E0004",
            vec![Suggestion::new(format!("Bind a method taking ({})", expected), None, 0.8)],
        ),
        Error::UnknownProp { component, prop, .. } => (
            "E0005",
            vec![Suggestion::new(format!("Declare a 'pub' parameter '{}' on '{}'", prop, component), None, 0.6)],
        ),
        Error::MissingProp { prop, .. } => (
            "E0007",
            vec![Suggestion::new(format!("Pass {}={{...}} or give the parameter a default", prop), None, 0.8)],
        ),
        Error::ReferenceArgument { param, .. } => (
            "E0006",
            vec![Suggestion::new(
                format!("Pass a variable by reference: &{}={{name}}", param),
                Some(format!("&{}", param)),
                0.7,
            )],
        ),
        Error::Mutability { name, .. } => (
            "E0010",
            vec![Suggestion::new(format!("Declare '{}' as 'mut'", name), Some(format!("mut {}", name)), 0.9)],
        ),
        Error::UnresolvedIdentifier { name, .. } => (
            "E0011",
            vec![Suggestion::new(format!("Define '{}' before using it", name), None, 0.8)],
        ),
        Error::CircularDependency { cycle } => (
            "E0020",
            vec![Suggestion::new(
                format!("Break the cycle {} by passing data through a callback", cycle.join(" -> ")),
                None,
                0.5,
            )],
        ),
        Error::SchemaLookup { type_name, .. } => (
            "E0030",
            vec![Suggestion::new(format!("Check the schema entry for '{}'", type_name), None, 0.5)],
        ),
        Error::SharedMethod { type_name, method, .. } => (
            "E0031",
            vec![Suggestion::new(format!("Check how '{}.{}' is declared in the schema", type_name, method), None, 0.5)],
        ),
        Error::HookSignature { method, .. } => (
            "E0032",
            vec![Suggestion::new(format!("Rename '{}' if it is not meant as a lifecycle method", method), None, 0.4)],
        ),
        _ => ("E9999", Vec::new()),
    }
}

impl CompilationFeedback {
    pub fn success(source_file: String, warnings: Vec<ErrorReport>, stats: CompilationStats) -> Self {
        Self { success: true, source_file, diagnostics: warnings, stats }
    }

    pub fn failure(source_file: String, errors: Vec<ErrorReport>, stats: CompilationStats) -> Self {
        Self { success: false, source_file, diagnostics: errors, stats }
    }

    /// Output as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        let name = kind.to_string();
        self.diagnostics.iter().any(|d| d.kind == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_report_carries_kind_and_line() {
        let err = Error::Mutability { name: "x".into(), span: Span::new(7, 5) };
        let report = ErrorReport::from_error(&err, "app.json");
        assert_eq!(report.kind, "MutabilityError");
        assert_eq!(report.code, "E0010");
        assert_eq!(report.location, Some(Location { file: "app.json".into(), line: 7, column: 5 }));
        assert_eq!(report.suggestions[0].replacement.as_deref(), Some("mut x"));
    }

    #[test]
    fn test_missing_prop_report() {
        let err = Error::MissingProp { component: "Item".into(), prop: "label".into(), span: Span::line(9) };
        let mut report = ErrorReport::from_error(&err, "app.json");
        assert_eq!(report.code, "E0007");
        assert_eq!(report.kind, "TypeError");

        report.suggestions.push(Suggestion::new("Remove the component", None, 0.1));
        report.suggestions.insert(0, Suggestion::new("Check the spelling", None, 0.2));
        report.sort_suggestions();
        let confidences: Vec<f64> = report.suggestions.iter().map(|s| s.confidence).collect();
        assert_eq!(confidences, vec![0.8, 0.2, 0.1]);
    }

    #[test]
    fn test_unknown_span_has_no_location() {
        let err = Error::CircularDependency { cycle: vec!["A".into(), "A".into()] };
        let report = ErrorReport::from_error(&err, "app.json");
        assert!(report.location.is_none());
        assert_eq!(report.kind, "CircularDependencyError");
    }

    #[test]
    fn test_warnings_serialize() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn(Warning::ImpureLoopKey { component: "List".into(), loop_id: 0, span: Span::line(3) });
        let feedback =
            CompilationFeedback::success("app.json".into(), diagnostics.reports("app.json"), CompilationStats::default());
        assert!(feedback.success);
        let json: serde_json::Value = serde_json::from_str(&feedback.to_json()).unwrap();
        assert_eq!(json["diagnostics"][0]["severity"], "Warning");
        assert_eq!(json["diagnostics"][0]["location"]["line"], 3);
    }
}
