//! Error type shared by every exploration component.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExploreError>;

#[derive(Debug, Error)]
pub enum ExploreError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid domain for variable '{variable}': {reason}")]
    InvalidDomain { variable: String, reason: String },

    #[error("Variable '{variable}' of kind {kind} cannot be sampled")]
    UnsupportedVariableKind { variable: String, kind: String },

    #[error("Sample should contain {expected} rows but contains {found}")]
    SampleMismatch { expected: usize, found: usize },

    #[error("Unknown exploration strategy: {0}")]
    UnknownStrategy(String),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExploreError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ExploreError::Configuration(message.into())
    }

    pub fn invalid_domain(variable: impl Into<String>, reason: impl Into<String>) -> Self {
        ExploreError::InvalidDomain {
            variable: variable.into(),
            reason: reason.into(),
        }
    }

    /// Errors that abort an exploration before any evaluation is dispatched.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ExploreError::Configuration(_)
                | ExploreError::InvalidDomain { .. }
                | ExploreError::SampleMismatch { .. }
                | ExploreError::UnknownStrategy(_)
                | ExploreError::UnsupportedVariableKind { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_errors_are_configuration() {
        assert!(ExploreError::configuration("missing outputs").is_configuration());
        assert!(ExploreError::SampleMismatch {
            expected: 800,
            found: 799
        }
        .is_configuration());
        let io = ExploreError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(!io.is_configuration());
    }

    #[test]
    fn test_display_names_variable() {
        let err = ExploreError::invalid_domain("speed", "min > max");
        assert_eq!(
            err.to_string(),
            "Invalid domain for variable 'speed': min > max"
        );
    }
}
