use std::fmt;

use super::token::Token;

/// Severity of a single diagnostic. Only `Error` blocks Wasm emission; the
/// other two are informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        write!(f, "{}", text)
    }
}

/// A source span derived from the offending node's token: row/column are
/// 1-based, length is the raw lexeme length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub row: usize,
    pub column: usize,
    pub length: usize,
}

impl Span {
    pub fn of(token: &Token) -> Self {
        Span { row: token.row, column: token.column, length: token.text.chars().count().max(1) }
    }
}

/// A single diagnostic message, tied to a source span and tagged with the
/// producer that raised it (`"Analyzer"`, `"Validator"`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub producer: &'static str,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(severity: Severity, producer: &'static str, message: impl Into<String>, span: Span) -> Self {
        Diagnostic { severity, producer, message: message.into(), span }
    }

    pub fn error(producer: &'static str, message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Error, producer, message, span)
    }

    pub fn warning(producer: &'static str, message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Warning, producer, message, span)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} ({}): {}",
            self.span.row, self.span.column, self.severity, self.producer, self.message
        )
    }
}

/// Logger accumulates diagnostics in the order they are raised. Passes never
/// abort on a diagnostic; they keep going so a single run surfaces every
/// issue it can.
#[derive(Debug, Default, Clone)]
pub struct Logger {
    diagnostics: Vec<Diagnostic>,
}

impl Logger {
    pub fn new() -> Self {
        Logger { diagnostics: Vec::new() }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, producer: &'static str, message: impl Into<String>, span: Span) {
        self.push(Diagnostic::error(producer, message, span));
    }

    pub fn warning(&mut self, producer: &'static str, message: impl Into<String>, span: Span) {
        self.push(Diagnostic::warning(producer, message, span));
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
