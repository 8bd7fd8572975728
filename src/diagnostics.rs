//! Non-fatal diagnostics produced while loading metadata.
//!
//! Problems that should not abort a load (an unparsable file, a resource naming
//! an unknown provider, a template that never settles) are collected as
//! [`Diagnostic`] values and handed back to the caller. Each diagnostic is also
//! mirrored to `tracing` at a level matching its severity.

use serde::Serialize;
use std::fmt;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// What a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A YAML stream failed to parse; the file contributed no documents.
    ParseFailure,
    /// A file exists but could not be read.
    UnreadableFile,
    /// A document was skipped (not a mapping, or a malformed `profile` field).
    InvalidDocument,
    /// A resource names a provider absent from `providers`.
    UnknownProvider,
    /// Rendering stopped at the pass budget without reaching a fixed point.
    NotConverged,
    /// A dotenv file exists but could not be loaded.
    DotenvFailed,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::ParseFailure => write!(f, "parse failure"),
            DiagnosticKind::UnreadableFile => write!(f, "unreadable file"),
            DiagnosticKind::InvalidDocument => write!(f, "invalid document"),
            DiagnosticKind::UnknownProvider => write!(f, "unknown provider"),
            DiagnosticKind::NotConverged => write!(f, "not converged"),
            DiagnosticKind::DotenvFailed => write!(f, "dotenv failed"),
        }
    }
}

/// A single structured diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    /// Label of the source (file path or embedded resource) this refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// One-based line number, when the underlying parser reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// One-based column number, when the underlying parser reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl Diagnostic {
    pub fn new(severity: Severity, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            source: None,
            line: None,
            column: None,
        }
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, kind, message)
    }

    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, kind, message)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_position(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// Mirror this diagnostic to tracing at the matching level.
    pub fn emit(&self) {
        let source = self.source.as_deref().unwrap_or("-");
        match self.severity {
            Severity::Error => {
                tracing::error!(kind = %self.kind, source = %source, "{}", self)
            }
            Severity::Warning => {
                tracing::warn!(kind = %self.kind, source = %source, "{}", self)
            }
        }
    }

    /// Emit and return self, for use while accumulating.
    pub fn emitted(self) -> Self {
        self.emit();
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source, self.line, self.column) {
            (Some(source), Some(line), Some(column)) => {
                write!(f, "{} ({}:{}): {}", source, line, column, self.message)
            }
            (Some(source), _, _) => write!(f, "{}: {}", source, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

/// True if any diagnostic is at error severity.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}
