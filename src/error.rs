//! Error types for the analysis pipeline
//!
//! Precondition violations abort the current variable only. Degenerate
//! statistics and non-convergence are reported and the analysis continues.

use thiserror::Error;

/// Errors raised while checking assumptions, running tests or sizing effects
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error("Degenerate statistic: {0}")]
    Degenerate(String),

    #[error("Not determinable: {0}")]
    NonConvergence(String),

    #[error("Invalid distribution parameters: {0}")]
    Distribution(String),

    #[error("Failed to render diagnostic plot: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl AnalysisError {
    /// Whether the error aborts the variable being evaluated
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Precondition(_) | Self::Io(_))
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(AnalysisError::Precondition("empty".into()).is_fatal());
        assert!(AnalysisError::Io("disk".into()).is_fatal());
        assert!(!AnalysisError::Degenerate("eta = 1".into()).is_fatal());
        assert!(!AnalysisError::NonConvergence("bracket".into()).is_fatal());
    }

    #[test]
    fn test_display_carries_context() {
        let err = AnalysisError::Precondition("group 'Red' is empty".into());
        assert_eq!(err.to_string(), "Precondition violated: group 'Red' is empty");
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing dir");
        let err: AnalysisError = io.into();
        assert!(matches!(err, AnalysisError::Io(ref m) if m.contains("missing dir")));
    }
}
