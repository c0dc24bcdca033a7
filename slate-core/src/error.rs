use thiserror::Error;

use crate::diagnostic::Diagnostic;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("compilation failed with {} syntax error(s)", .diagnostics.len())]
    Syntax { diagnostics: Vec<Diagnostic> },
    #[error("compilation failed with {} semantic error(s)", .diagnostics.len())]
    Semantic { diagnostics: Vec<Diagnostic> },
}

impl CoreError {
    /// The diagnostics behind the failure, for callers that want to
    /// render them against the source.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CoreError::Syntax { diagnostics } => diagnostics,
            CoreError::Semantic { diagnostics } => diagnostics,
        }
    }
}
