//! Wizard session state.
//!
//! A [`WizardSession`] is the explicit value object holding everything a
//! running intake has collected: field values, per-field touched/error
//! status, staged attachments, the step pointer, and the submission phase.
//! It has no behavior of its own beyond accessors; transitions live on
//! [`Wizard`](crate::Wizard) so they can be exercised without a renderer.

use indexmap::IndexMap;
use schoolhub_types::{FieldValue, RecordId};

use crate::{attachments::AttachmentStager, schema::FieldValues};

/// Touched flag and latest validation result for one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldStatus {
    pub touched: bool,
    pub error: Option<String>,
}

/// Identifies one dispatched submission and the session epoch it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionTicket {
    pub(crate) epoch: u64,
    pub(crate) sequence: u64,
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Editing,
    /// A submission has been dispatched and no response applied yet.
    Submitting { ticket: SubmissionTicket },
    /// Terminal: the record store accepted the intake.
    Submitted { record: RecordId },
}

/// Aggregate state of one running intake.
#[derive(Debug)]
pub struct WizardSession {
    pub(crate) step: usize,
    pub(crate) values: FieldValues,
    pub(crate) status: IndexMap<String, FieldStatus>,
    pub(crate) attachments: AttachmentStager,
    pub(crate) phase: SessionPhase,
    pub(crate) epoch: u64,
    pub(crate) next_ticket: u64,
}

impl WizardSession {
    pub(crate) fn new(values: FieldValues) -> Self {
        let status = values.keys().map(|name| (name.clone(), FieldStatus::default())).collect();
        Self {
            step: 0,
            values,
            status,
            attachments: AttachmentStager::new(),
            phase: SessionPhase::Editing,
            epoch: 0,
            next_ticket: 0,
        }
    }

    pub fn current_step(&self) -> usize {
        self.step
    }

    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn status(&self, field: &str) -> Option<&FieldStatus> {
        self.status.get(field)
    }

    pub fn is_touched(&self, field: &str) -> bool {
        self.status.get(field).is_some_and(|status| status.touched)
    }

    /// Latest validation error, shown only once the field has been touched.
    pub fn visible_error(&self, field: &str) -> Option<&str> {
        self.status
            .get(field)
            .filter(|status| status.touched)
            .and_then(|status| status.error.as_deref())
    }

    pub fn attachments(&self) -> &AttachmentStager {
        &self.attachments
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.phase, SessionPhase::Submitting { .. })
    }

    /// Record id once the session reached its terminal state.
    pub fn submitted_record(&self) -> Option<&RecordId> {
        match &self.phase {
            SessionPhase::Submitted { record } => Some(record),
            _ => None,
        }
    }

    /// Generation counter bumped by every reset.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn record_status(&mut self, field: &str, error: Option<String>, touch: bool) {
        let status = self.status.entry(field.to_string()).or_default();
        status.error = error;
        status.touched |= touch;
    }
}
