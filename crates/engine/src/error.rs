//! Error types for intake wizards.
//!
//! Field-level validation failures are plain values (`Option<String>` on the
//! session); only the cases below travel as errors.

use indexmap::IndexMap;
use schoolhub_types::FieldKind;
use thiserror::Error;

/// Fatal problems in an intake definition. Raised while building a wizard;
/// no session can be started from a definition that produces one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("intake definition could not be parsed: {0}")]
    Definition(String),

    #[error("intake declares no steps")]
    NoSteps,

    #[error("step '{step}' has no fields")]
    EmptyStep { step: String },

    #[error("field '{field}' is not assigned to any step")]
    UncoveredField { field: String },

    #[error("field '{field}' appears in both step '{first}' and step '{second}'")]
    DuplicateField { field: String, first: String, second: String },

    #[error("step '{step}' references undeclared field '{field}'")]
    UnknownStepField { step: String, field: String },

    #[error("field '{field}' has an invalid pattern '{pattern}': {reason}")]
    InvalidPattern { field: String, pattern: String, reason: String },

    #[error("field '{field}' references unknown option list '{list}'")]
    UnknownOptionList { field: String, list: String },

    #[error("field '{field}' has a rule referencing unknown field '{other}'")]
    UnknownRuleReference { field: String, other: String },

    #[error("rule '{rule}' cannot apply to {kind:?} field '{field}'")]
    IncompatibleRule { field: String, rule: &'static str, kind: FieldKind },

    #[error("field '{field}' has a default that cannot be used: {reason}")]
    InvalidDefault { field: String, reason: String },
}

/// Rejected wizard transitions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WizardError {
    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    #[error("field '{field}' does not accept attachments")]
    NotAnAttachment { field: String },

    #[error("field '{field}' holds an attachment; stage a file instead of setting a value")]
    AttachmentRequiresStaging { field: String },

    #[error("a submission is in flight; wait for it to finish or reset the session")]
    SubmissionPending,

    #[error("the session has already been submitted; reset it to start a new intake")]
    Submitted,

    #[error(transparent)]
    StepGate(#[from] StepGateError),
}

/// Aggregate of failing fields that blocked `advance()`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("step '{step_id}' has {} invalid field(s): {}", .failures.len(), field_list(.failures))]
pub struct StepGateError {
    /// Index of the step that refused to advance.
    pub step: usize,
    pub step_id: String,
    /// Failing field name to error message, in step order.
    pub failures: IndexMap<String, String>,
}

impl StepGateError {
    pub fn failing_fields(&self) -> impl Iterator<Item = &str> {
        self.failures.keys().map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.failures.contains_key(field)
    }
}

/// Failures of the one-shot submission handoff.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("submission blocked: {} field(s) invalid ({})", .failures.len(), field_list(.failures))]
    Invalid {
        failures: IndexMap<String, String>,
        /// Earliest step containing a failing field.
        earliest_step: usize,
    },

    #[error("a submission for this session is already in flight")]
    InFlight,

    #[error("this session has already been submitted")]
    AlreadySubmitted,

    #[error("record store unreachable: {0}")]
    Transport(String),

    #[error("record store rejected the submission (HTTP {status}): {message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("record store returned an unexpected response: {0}")]
    MalformedResponse(String),

    #[error("the session changed while the submission was in flight; response discarded")]
    Stale,
}

impl SubmissionError {
    /// Whether the user can retry without re-entering anything.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Rejected { .. } | Self::MalformedResponse(_))
    }
}

fn field_list(failures: &IndexMap<String, String>) -> String {
    failures.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_gate_error_lists_fields_in_order() {
        let mut failures = IndexMap::new();
        failures.insert("grade".to_string(), "Grade is required".to_string());
        failures.insert("section".to_string(), "Section is required".to_string());
        let error = StepGateError {
            step: 1,
            step_id: "academic".into(),
            failures,
        };

        assert_eq!(error.to_string(), "step 'academic' has 2 invalid field(s): grade, section");
        assert!(error.contains("section"));
        assert_eq!(error.failing_fields().collect::<Vec<_>>(), vec!["grade", "section"]);
    }

    #[test]
    fn only_remote_failures_are_retryable() {
        assert!(SubmissionError::Transport("refused".into()).is_retryable());
        assert!(
            SubmissionError::Rejected {
                status: 500,
                code: None,
                message: "boom".into()
            }
            .is_retryable()
        );
        assert!(!SubmissionError::InFlight.is_retryable());
        assert!(!SubmissionError::Stale.is_retryable());
    }
}
