//! The diagnostic system for the Patter compiler.
//!
//! Every problem found while lexing or parsing is represented as a
//! [`Diagnostic`]: a structured message kind (never a free-form string), a
//! severity, and a precise source position. Diagnostics are delivered through
//! the [`DiagnosticSink`] trait so hosts can intercept them; the default
//! [`Diagnostics`] collector gathers them for the aggregate [`CompileError`]
//! returned by the convenience entry point.
//!
//! Rendering is handled by `miette`: each diagnostic carries a stable error
//! code of the form `patter::{phase}::{suffix}` and a labeled span, and
//! `CompileError` attaches the named source so the fancy report printer can
//! show annotated snippets for every collected problem.

use std::fmt;
use std::sync::Arc;

use miette::{LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

// ============================================================================
// MESSAGE KINDS
// ============================================================================

/// The compilation phase a diagnostic originated from; used in error codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Lexer,
    Parser,
}

impl Phase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Phase::Lexer => "lexer",
            Phase::Parser => "parser",
        }
    }
}

/// Structured message kinds for every diagnostic the front end can produce.
///
/// Each kind maps to a stable `code_suffix` so consumers can match on codes
/// instead of message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An escape sequence ran into end of input or is otherwise cut short.
    IncompleteEscape,
    /// A backslash was applied to a whitespace character.
    EscapedWhitespace,
    /// An escape quantifier was not followed by a comma.
    MissingQuantityComma,
    /// A verbatim string was not terminated before end of input.
    IncompleteVerbatim,
    /// A regex literal was not terminated before end of input.
    IncompleteRegex,
    /// A regex literal failed to compile.
    InvalidRegex { reason: String },
    /// A regex flags token contained an unsupported letter.
    UnknownRegexFlag { flag: char },
    /// A `\u`/`\U` escape payload did not decode to a valid code point.
    InvalidCodePoint { digits: String },
    /// A token appeared where a different one was required.
    UnexpectedToken { expected: String, found: String },
    /// Input ended while a construct was still open.
    UnexpectedEndOfInput { expected: String },
    /// A function tag named a function missing from the registry.
    NonexistentFunction { name: String },
    /// The function exists but no overload accepts this argument count.
    NonexistentOverload { name: String, arg_count: usize },
    /// A replacer tag supplied an argument count other than two.
    ReplacerArgumentCount { count: usize },
}

impl ErrorKind {
    /// Stable machine-readable suffix, combined with the phase into the full
    /// error code `patter::{phase}::{suffix}`.
    pub const fn code_suffix(&self) -> &'static str {
        use ErrorKind::*;
        match self {
            IncompleteEscape => "incomplete_escape",
            EscapedWhitespace => "escaped_whitespace",
            MissingQuantityComma => "missing_quantity_comma",
            IncompleteVerbatim => "incomplete_verbatim",
            IncompleteRegex => "incomplete_regex",
            InvalidRegex { .. } => "invalid_regex",
            UnknownRegexFlag { .. } => "unknown_regex_flag",
            InvalidCodePoint { .. } => "invalid_code_point",
            UnexpectedToken { .. } => "unexpected_token",
            UnexpectedEndOfInput { .. } => "unexpected_end_of_input",
            NonexistentFunction { .. } => "nonexistent_function",
            NonexistentOverload { .. } => "nonexistent_overload",
            ReplacerArgumentCount { .. } => "replacer_argument_count",
        }
    }

    pub const fn phase(&self) -> Phase {
        use ErrorKind::*;
        match self {
            IncompleteEscape | EscapedWhitespace | MissingQuantityComma | IncompleteVerbatim
            | IncompleteRegex => Phase::Lexer,
            InvalidRegex { .. }
            | UnknownRegexFlag { .. }
            | InvalidCodePoint { .. }
            | UnexpectedToken { .. }
            | UnexpectedEndOfInput { .. }
            | NonexistentFunction { .. }
            | NonexistentOverload { .. }
            | ReplacerArgumentCount { .. } => Phase::Parser,
        }
    }

    /// Short text for the primary span label.
    fn label(&self) -> String {
        use ErrorKind::*;
        match self {
            IncompleteEscape => "escape cut short here".to_string(),
            EscapedWhitespace => "whitespace cannot be escaped".to_string(),
            MissingQuantityComma => "expected ',' after the quantifier".to_string(),
            IncompleteVerbatim => "string never closes".to_string(),
            IncompleteRegex => "regex never closes".to_string(),
            InvalidRegex { .. } => "pattern rejected here".to_string(),
            UnknownRegexFlag { flag } => format!("'{}' is not a flag", flag),
            InvalidCodePoint { .. } => "not a valid code point".to_string(),
            UnexpectedToken { expected, .. } => format!("expected {}", expected),
            UnexpectedEndOfInput { expected } => format!("expected {}", expected),
            NonexistentFunction { .. } => "unknown function".to_string(),
            NonexistentOverload { arg_count, .. } => {
                format!("no overload takes {} arguments", arg_count)
            }
            ReplacerArgumentCount { .. } => "replacer defined here".to_string(),
        }
    }

    /// Optional remediation hint rendered by miette under `help:`.
    fn help(&self) -> Option<String> {
        use ErrorKind::*;
        match self {
            IncompleteEscape => {
                Some("finish the escape sequence before the end of the source".to_string())
            }
            EscapedWhitespace => {
                Some("use a verbatim string to include literal whitespace".to_string())
            }
            MissingQuantityComma => {
                Some("write repeated escapes as \\<count>,<character>".to_string())
            }
            IncompleteVerbatim => Some("close the string with '\"'".to_string()),
            IncompleteRegex => Some("close the pattern with '`'".to_string()),
            UnknownRegexFlag { .. } => {
                Some("supported flags are i, m, s, and x".to_string())
            }
            ReplacerArgumentCount { .. } => {
                Some("a replacer takes exactly two arguments: subject; replacement".to_string())
            }
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ErrorKind::*;
        match self {
            IncompleteEscape => write!(f, "incomplete escape sequence"),
            EscapedWhitespace => write!(f, "whitespace cannot be escaped"),
            MissingQuantityComma => write!(f, "escape quantifier must be followed by a comma"),
            IncompleteVerbatim => write!(f, "unterminated verbatim string"),
            IncompleteRegex => write!(f, "unterminated regex literal"),
            InvalidRegex { reason } => write!(f, "invalid regex literal: {}", reason),
            UnknownRegexFlag { flag } => write!(f, "unknown regex flag '{}'", flag),
            InvalidCodePoint { digits } => {
                write!(f, "'{}' is not a valid Unicode code point", digits)
            }
            UnexpectedToken { expected, found } => {
                write!(f, "unexpected token: expected {}, found {}", expected, found)
            }
            UnexpectedEndOfInput { expected } => {
                write!(f, "unexpected end of input: expected {}", expected)
            }
            NonexistentFunction { name } => write!(f, "nonexistent function '{}'", name),
            NonexistentOverload { name, arg_count } => write!(
                f,
                "function '{}' has no overload taking {} arguments",
                name, arg_count
            ),
            ReplacerArgumentCount { count } => write!(
                f,
                "replacer requires exactly two arguments, found {}",
                count
            ),
        }
    }
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// The position a diagnostic points at: line bookkeeping straight from the
/// token model plus a byte range.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SourcePosition {
    pub line: usize,
    pub line_start_offset: usize,
    pub index: usize,
    pub length: usize,
}

impl SourcePosition {
    pub fn new(line: usize, line_start_offset: usize, index: usize, length: usize) -> Self {
        Self {
            line,
            line_start_offset,
            index,
            length,
        }
    }

    /// Zero-based column, derived lazily from the line start.
    pub fn column(&self) -> usize {
        self.index.saturating_sub(self.line_start_offset)
    }
}

/// One reported problem.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub position: SourcePosition,
    /// Attached by the driver once compilation finishes so each related
    /// diagnostic can render its own snippet. Not named `source`: thiserror
    /// would treat a field of that name as an error cause.
    src: Option<Arc<NamedSource<String>>>,
}

impl Diagnostic {
    pub fn error(kind: ErrorKind, position: SourcePosition) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            position,
            src: None,
        }
    }

    pub fn warning(kind: ErrorKind, position: SourcePosition) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            position,
            src: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn code_string(&self) -> String {
        format!("patter::{}::{}", self.kind.phase().as_str(), self.kind.code_suffix())
    }

    fn attach_source(&mut self, source: Arc<NamedSource<String>>) {
        self.src = Some(source);
    }

    fn primary_label(&self) -> LabeledSpan {
        let length = self.position.length.max(1);
        LabeledSpan::new(Some(self.kind.label()), self.position.index, length)
    }
}

impl miette::Diagnostic for Diagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.code_string()))
    }

    fn severity(&self) -> Option<miette::Severity> {
        match self.severity {
            Severity::Warning => Some(miette::Severity::Warning),
            Severity::Error => Some(miette::Severity::Error),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.kind
            .help()
            .map(|help| Box::new(help) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(self.primary_label())))
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.src
            .as_ref()
            .map(|source| source.as_ref() as &dyn SourceCode)
    }
}

// ============================================================================
// SINKS
// ============================================================================

/// Destination for diagnostics, injectable so hosts can stream, filter, or
/// collect them.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// The default sink: collects everything for end-of-compile aggregation.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Orders collected diagnostics by source position. Lexical problems are
    /// discovered lazily while the parser pulls tokens, so arrival order is
    /// not source order.
    pub fn sort_by_position(&mut self) {
        self.items.sort_by_key(|d| d.position.index);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }
}

// ============================================================================
// AGGREGATE COMPILE ERROR
// ============================================================================

/// Aggregate failure for a whole compilation, carrying every diagnostic
/// reported against the named source.
#[derive(Debug, Error)]
#[error("compilation of '{name}' failed with {} error{}", self.error_count(), if self.error_count() == 1 { "" } else { "s" })]
pub struct CompileError {
    name: String,
    diagnostics: Vec<Diagnostic>,
    // Not named `source` for the same thiserror reason as in `Diagnostic`.
    src: Arc<NamedSource<String>>,
}

/// Attach `name`/`source_text` to each diagnostic so it can render its own
/// snippet when reported standalone.
pub fn attach_source(name: &str, source_text: &str, diagnostics: &mut [Diagnostic]) {
    let source = Arc::new(NamedSource::new(name.to_string(), source_text.to_string()));
    for diagnostic in diagnostics {
        diagnostic.attach_source(Arc::clone(&source));
    }
}

impl CompileError {
    pub fn new(name: impl Into<String>, source_text: impl Into<String>, mut diagnostics: Vec<Diagnostic>) -> Self {
        let name = name.into();
        let source = Arc::new(NamedSource::new(name.clone(), source_text.into()));
        for diagnostic in &mut diagnostics {
            diagnostic.attach_source(Arc::clone(&source));
        }
        Self {
            name,
            diagnostics,
            src: source,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    /// True when any collected diagnostic has `kind`'s code suffix; test and
    /// host convenience.
    pub fn has_code(&self, suffix: &str) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.kind.code_suffix() == suffix)
    }
}

impl miette::Diagnostic for CompileError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new("patter::compile"))
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(self.src.as_ref())
    }

    fn related(&self) -> Option<Box<dyn Iterator<Item = &dyn miette::Diagnostic> + '_>> {
        Some(Box::new(
            self.diagnostics
                .iter()
                .map(|d| d as &dyn miette::Diagnostic),
        ))
    }
}
