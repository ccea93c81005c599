//! Submission assembly and the one-shot handoff to the record store.
//!
//! Submitting is split into three parts so the asynchronous request never
//! holds the session:
//!
//! 1. [`SubmissionAssembler::prepare`] revalidates every field, builds the
//!    payload, and moves the session to `Submitting` under a fresh ticket.
//! 2. [`RecordStore::create_record`] performs the request.
//! 3. [`SubmissionAssembler::complete`] applies the outcome, but only if the
//!    ticket still owns the session. A response for a session that was reset
//!    in the meantime is discarded.
//!
//! [`SubmissionAssembler::submit`] runs all three back to back.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use schoolhub_types::{FieldKind, RecordId};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::{
    error::SubmissionError,
    session::{SessionPhase, SubmissionTicket, WizardSession},
    wizard::Wizard,
};

/// One binary part of the outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadAttachment {
    pub field: String,
    pub wire_name: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

/// Everything sent to the record store for one intake.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionPayload {
    pub intake: String,
    /// Store-relative path declared by the intake, if any.
    pub path: Option<String>,
    /// Scalar fields as `(wire name, text)` pairs in step order. Empty
    /// values are sent as empty strings.
    pub fields: Vec<(String, String)>,
    pub attachments: Vec<PayloadAttachment>,
}

impl SubmissionPayload {
    pub fn field(&self, wire_name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == wire_name)
            .map(|(_, value)| value.as_str())
    }

    /// JSON description of the payload with attachment bytes replaced by
    /// their size.
    pub fn summary(&self) -> Value {
        let fields: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();
        let attachments: Vec<Value> = self
            .attachments
            .iter()
            .map(|attachment| {
                json!({
                    "field": attachment.wire_name,
                    "file_name": attachment.file_name,
                    "mime_type": attachment.mime_type,
                    "size_bytes": attachment.bytes.len(),
                })
            })
            .collect();

        json!({
            "intake": self.intake,
            "path": self.path,
            "fields": fields,
            "attachments": attachments,
        })
    }
}

/// The external record store that turns a payload into a record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_record(&self, payload: &SubmissionPayload) -> Result<RecordId, SubmissionError>;
}

/// A prepared submission that owns the session until completed.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    pub ticket: SubmissionTicket,
    pub payload: SubmissionPayload,
}

/// Builds payloads for one wizard and applies store responses.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionAssembler<'w> {
    wizard: &'w Wizard,
}

impl<'w> SubmissionAssembler<'w> {
    pub fn new(wizard: &'w Wizard) -> Self {
        Self { wizard }
    }

    /// Revalidate the whole session and claim it for one request.
    ///
    /// Every field across every step is checked again here, whatever the
    /// step gates said earlier. Failing fields are marked touched.
    pub fn prepare(&self, session: &mut WizardSession) -> Result<PendingSubmission, SubmissionError> {
        match session.phase {
            SessionPhase::Submitted { .. } => return Err(SubmissionError::AlreadySubmitted),
            SessionPhase::Submitting { .. } => return Err(SubmissionError::InFlight),
            SessionPhase::Editing => {}
        }

        let mut failures = IndexMap::new();
        let mut earliest_step = None;
        for step in 0..self.wizard.step_count() {
            let step_failures = self.wizard.validate_step(session, step, false);
            for (field, error) in &step_failures {
                session.record_status(field, Some(error.clone()), true);
            }
            if !step_failures.is_empty() {
                earliest_step.get_or_insert(step);
                failures.extend(step_failures);
            }
        }
        if let Some(earliest_step) = earliest_step {
            warn!(failing = failures.len(), earliest_step, "submission blocked by revalidation");
            return Err(SubmissionError::Invalid { failures, earliest_step });
        }

        let payload = self.build_payload(session);
        let ticket = SubmissionTicket {
            epoch: session.epoch,
            sequence: session.next_ticket,
        };
        session.next_ticket += 1;
        session.phase = SessionPhase::Submitting { ticket };
        debug!(
            intake = %payload.intake,
            fields = payload.fields.len(),
            attachments = payload.attachments.len(),
            "submission prepared"
        );
        Ok(PendingSubmission { ticket, payload })
    }

    /// Apply a store outcome if `ticket` still owns the session.
    ///
    /// On success the session becomes `Submitted` and every attachment is
    /// released. On failure the session returns to `Editing` with values and
    /// binaries intact so the user can retry.
    pub fn complete(
        &self,
        session: &mut WizardSession,
        ticket: SubmissionTicket,
        outcome: Result<RecordId, SubmissionError>,
    ) -> Result<RecordId, SubmissionError> {
        if session.phase != (SessionPhase::Submitting { ticket }) {
            warn!(
                ticket_epoch = ticket.epoch,
                session_epoch = session.epoch,
                "discarding response for a session that no longer owns it"
            );
            return Err(SubmissionError::Stale);
        }

        match outcome {
            Ok(record) => {
                session.attachments.release_all();
                session.phase = SessionPhase::Submitted { record: record.clone() };
                info!(intake = %self.wizard.name(), record = %record, "intake submitted");
                Ok(record)
            }
            Err(error) => {
                session.phase = SessionPhase::Editing;
                warn!(intake = %self.wizard.name(), %error, retryable = error.is_retryable(), "submission failed");
                Err(error)
            }
        }
    }

    /// Prepare, dispatch, and complete in one call.
    pub async fn submit(&self, session: &mut WizardSession, store: &dyn RecordStore) -> Result<RecordId, SubmissionError> {
        let pending = self.prepare(session)?;
        let outcome = store.create_record(&pending.payload).await;
        self.complete(session, pending.ticket, outcome)
    }

    fn build_payload(&self, session: &WizardSession) -> SubmissionPayload {
        let schema = self.wizard.schema();
        let mut fields = Vec::new();
        let mut attachments = Vec::new();

        for step in self.wizard.partition().steps() {
            for field in &step.fields {
                let wire_name = schema.wire_name(field).unwrap_or(field).to_string();
                if schema.kind(field) == Some(FieldKind::Attachment) {
                    if let Some(binary) = session.attachments.binary(field) {
                        attachments.push(PayloadAttachment {
                            field: field.clone(),
                            wire_name,
                            file_name: binary.file_name.clone(),
                            mime_type: binary.mime_type.clone(),
                            bytes: Arc::clone(&binary.bytes),
                        });
                    }
                    continue;
                }
                let text = session.value(field).and_then(|value| value.wire_text()).unwrap_or_default();
                fields.push((wire_name, text));
            }
        }

        SubmissionPayload {
            intake: self.wizard.name().to_string(),
            path: self.wizard.submit_path().map(str::to_string),
            fields,
            attachments,
        }
    }
}
