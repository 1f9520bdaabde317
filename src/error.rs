//! Instrumentation Error Types

use thiserror::Error;

/// Errors raised by the instrumentation pass.
///
/// The pass only runs on checked programs, so every variant signals a broken
/// structural precondition. None of them is recoverable: a partially
/// instrumented program must not be compiled further.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstrumentError {
    /// Structural precondition broken at a specific rule position
    #[error("invariant violated in rule {rule}, term {term}: {reason}")]
    InvariantViolated {
        rule: usize,
        term: usize,
        reason: String,
    },

    /// Program already carries instrumentation
    #[error("rule {rule} is already instrumented; the pass must not run twice")]
    AlreadyInstrumented { rule: usize },
}

impl InstrumentError {
    pub(crate) fn invariant(rule: usize, term: usize, reason: impl Into<String>) -> Self {
        InstrumentError::InvariantViolated {
            rule,
            term,
            reason: reason.into(),
        }
    }
}

/// Result type for instrumentation operations
pub type InstrumentResult<T> = Result<T, InstrumentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invariant_message_names_position() {
        let err = InstrumentError::invariant(3, 1, "empty record");
        assert_eq!(
            err.to_string(),
            "invariant violated in rule 3, term 1: empty record"
        );
    }

    #[test]
    fn test_already_instrumented_message() {
        let err = InstrumentError::AlreadyInstrumented { rule: 0 };
        assert!(err.to_string().contains("must not run twice"));
    }
}
