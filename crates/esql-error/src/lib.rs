use std::fmt;

use esql_ast::Span;
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Which stage of the front-end rejected the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Unrecognized character sequence or unterminated literal.
    Lexical,
    /// The leading word of a command is not a known command (possibly
    /// because it is only recognized with dev features enabled).
    UnknownCommand,
    /// A grammar expectation was violated.
    Syntax,
    /// Well-formed tokens that do not make a valid command shape.
    Structural,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lexical => "lexical error",
            Self::UnknownCommand => "unknown command",
            Self::Syntax => "syntax error",
            Self::Structural => "invalid command",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// A problem found while lexing or parsing, located in the source text.
///
/// Diagnostics are collected, never thrown: parsing always completes and
/// reports every independent problem it found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    /// 1-based line of `span.start`.
    pub line: u32,
    /// 1-based column (in characters) of `span.start`.
    pub col: u32,
}

impl Diagnostic {
    pub fn error(
        kind: DiagnosticKind,
        message: impl Into<String>,
        span: Span,
        line: u32,
        col: u32,
    ) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            message: message.into(),
            span,
            line,
            col,
        }
    }

    pub fn lexical(message: impl Into<String>, span: Span, line: u32, col: u32) -> Self {
        Self::error(DiagnosticKind::Lexical, message, span, line, col)
    }

    pub fn syntax(message: impl Into<String>, span: Span, line: u32, col: u32) -> Self {
        Self::error(DiagnosticKind::Syntax, message, span, line, col)
    }

    pub fn structural(message: impl Into<String>, span: Span, line: u32, col: u32) -> Self {
        Self::error(DiagnosticKind::Structural, message, span, line, col)
    }

    pub fn unknown_command(message: impl Into<String>, span: Span, line: u32, col: u32) -> Self {
        Self::error(DiagnosticKind::UnknownCommand, message, span, line, col)
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}: {}", self.line, self.col, self.kind, self.message)
    }
}

/// Sort diagnostics by source position, keeping insertion order for ties.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by_key(|d| (d.span.start, d.span.end));
}

// ---------------------------------------------------------------------------
// Boundary errors
// ---------------------------------------------------------------------------

/// Failures at the edges of the front-end: oversize input, rejected
/// queries, configuration and I/O problems.
#[derive(Error, Debug)]
pub enum EsqlError {
    /// Query text exceeds the configured size limit.
    #[error("query is {length} bytes, limit is {max}")]
    InputTooLong { length: usize, max: usize },

    /// The query produced at least one error diagnostic.
    #[error("{}", summarize(.diagnostics))]
    InvalidQuery { diagnostics: Vec<Diagnostic> },

    /// Parser configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// File or stream I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    match diagnostics {
        [] => "invalid query".to_owned(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

impl EsqlError {
    /// Whether the user can likely fix this by editing the query or config.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InputTooLong { .. } | Self::InvalidQuery { .. } | Self::Config(_)
        )
    }

    /// Human-friendly suggestion for fixing this error.
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InputTooLong { .. } => {
                Some("Shorten the query or raise max_input_bytes in the parser configuration")
            }
            Self::InvalidQuery { .. } => Some("Fix the reported positions and try again"),
            Self::Config(_) => Some("Check the configuration file against the documented keys"),
            Self::Io(_) | Self::Json(_) => None,
        }
    }

    /// Get the process exit code for this error (for CLI use).
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidQuery { .. } => 1,
            Self::InputTooLong { .. } | Self::Config(_) => 2,
            Self::Io(_) | Self::Json(_) => 3,
        }
    }

    /// Diagnostics carried by an invalid-query error, empty otherwise.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::InvalidQuery { diagnostics } => diagnostics,
            _ => &[],
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using `EsqlError`.
pub type Result<T> = std::result::Result<T, EsqlError>;
