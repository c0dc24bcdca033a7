//! Diagnostics shared by every compiler stage.
//!
//! Stages collect `Diagnostic` values instead of failing on the first
//! problem, so one run can surface as many errors as possible. The
//! pipeline decides afterwards whether the collected set aborts
//! compilation; only `Error` severity does.

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A single problem tied to a source location.
///
/// `code` is a stable identifier (`E0001` and friends) so tests and
/// tooling can match on the class of problem rather than the message
/// text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<&'static str>,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Span) -> Diagnostic {
        Diagnostic {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            span,
        }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            code: None,
            message: message.into(),
            span,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Diagnostic {
        self.code = Some(code);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render the diagnostic against the source it was produced from.
    ///
    /// The output is the usual three-part form: a headline, the file
    /// position, and the offending line with a caret underline. No
    /// trailing newline; callers decide how to join diagnostics.
    pub fn render(&self, path: &str, source: &str) -> String {
        let label = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        let mut out = String::new();
        match self.code {
            Some(code) => out.push_str(&format!("{label}[{code}]: {}\n", self.message)),
            None => out.push_str(&format!("{label}: {}\n", self.message)),
        }
        out.push_str(&format!("  --> {path}:{}:{}\n", self.span.line, self.span.col));
        if let Some(text) = source.lines().nth(self.span.line as usize - 1) {
            out.push_str(&format!("{:>4} | {text}\n", self.span.line));
            let pad = " ".repeat(self.span.col.saturating_sub(1) as usize);
            let carets = "^".repeat(self.span.len.max(1) as usize);
            out.push_str(&format!("     | {pad}{carets}"));
        } else {
            // Spans at end of file point past the last line.
            out.pop();
        }
        out
    }
}

/// True when any diagnostic in the slice is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}
