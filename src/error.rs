//! Crate error type.
//!
//! Infeasible or time-limited solves are not errors: they are reported as a
//! [`SolveStatus`](crate::cp::SolveStatus) on the result.

use thiserror::Error;

use crate::validation::ValidationError;

/// Errors raised while building or orchestrating a roster model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RosterError {
    /// Config or input data rejected before any model is built.
    #[error("invalid problem definition: {}", join_messages(.0))]
    Validation(Vec<ValidationError>),

    /// A rule setting was rejected at rule construction.
    #[error("rule '{rule}': invalid setting '{key}': {reason}")]
    InvalidSetting {
        rule: String,
        key: String,
        reason: String,
    },

    /// The finished model failed its structural sanity check. Indicates a
    /// broken rule pipeline, not bad input.
    #[error("model sanity check failed: {0}")]
    BuildSanity(String),

    /// A rule read a variable that no earlier rule declared.
    #[error("variable {family}{key} has not been declared")]
    MissingVariable { family: &'static str, key: String },

    /// The orchestrator was asked to solve before building.
    #[error("model has not been built")]
    NotBuilt,
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias for roster operations.
pub type Result<T> = std::result::Result<T, RosterError>;

impl From<Vec<ValidationError>> for RosterError {
    fn from(errors: Vec<ValidationError>) -> Self {
        RosterError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_validation_message_joined() {
        let err = RosterError::from(vec![
            ValidationError::new(ValidationErrorKind::InvalidShiftBounds, "a"),
            ValidationError::new(ValidationErrorKind::InvalidRestHours, "b"),
        ]);
        assert_eq!(err.to_string(), "invalid problem definition: a; b");
    }

    #[test]
    fn test_missing_variable_message() {
        let err = RosterError::MissingVariable {
            family: "x",
            key: "[0, 1, 2]".into(),
        };
        assert_eq!(err.to_string(), "variable x[0, 1, 2] has not been declared");
    }
}
