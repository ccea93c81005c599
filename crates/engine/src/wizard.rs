//! Wizard controller: step state machine with gated validation.
//!
//! [`Wizard`] is immutable configuration (schema plus step partition). Every
//! transition takes the [`WizardSession`] explicitly and runs to completion
//! synchronously: a value write and the re-validation it triggers happen in
//! the same call, so `advance()` always decides on the freshest values.

use indexmap::IndexMap;
use schoolhub_types::{FieldKind, FieldValue, IntakeDefinition, IntakeOptions};
use tracing::{debug, warn};

use crate::{
    attachments::PreviewHandle,
    error::{ConfigurationError, StepGateError, WizardError},
    partition::StepPartition,
    schema::FieldSchema,
    session::{SessionPhase, WizardSession},
};

/// Result of a successful `advance()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The step pointer moved to this index.
    Moved(usize),
    /// The final step validated; the session is ready for submission.
    ReadyToSubmit,
}

/// Static wizard configuration.
#[derive(Debug, Clone)]
pub struct Wizard {
    name: String,
    submit_path: Option<String>,
    schema: FieldSchema,
    partition: StepPartition,
}

impl Wizard {
    /// Compile a wizard from a definition. Fails if any rule or the step
    /// partition is malformed.
    pub fn from_definition(definition: &IntakeDefinition, options: &IntakeOptions) -> Result<Self, ConfigurationError> {
        let schema = FieldSchema::from_definition(definition, options)?;
        let partition = StepPartition::new(&definition.steps, &schema)?;
        debug!(
            intake = %definition.intake,
            fields = schema.len(),
            steps = partition.step_count(),
            "compiled intake wizard"
        );
        Ok(Self {
            name: definition.intake.clone(),
            submit_path: definition.submit_path.clone(),
            schema,
            partition,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn submit_path(&self) -> Option<&str> {
        self.submit_path.as_deref()
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn partition(&self) -> &StepPartition {
        &self.partition
    }

    pub fn step_count(&self) -> usize {
        self.partition.step_count()
    }

    pub fn fields_of(&self, step: usize) -> Option<&[String]> {
        self.partition.fields_of(step)
    }

    /// Fresh session: step 0, every field at its default, nothing touched.
    pub fn start_session(&self) -> WizardSession {
        WizardSession::new(self.schema.default_values())
    }

    /// Store a value, mark it touched, and re-validate it plus any field
    /// whose cross-field rule reads it. Returns the field's own error.
    pub fn set_field(&self, session: &mut WizardSession, field: &str, value: FieldValue) -> Result<Option<String>, WizardError> {
        self.ensure_editable(session)?;
        let kind = self.kind_of(field)?;
        if kind == FieldKind::Attachment {
            if !value.is_empty() {
                return Err(WizardError::AttachmentRequiresStaging { field: field.to_string() });
            }
            session.attachments.clear(field);
        }

        session.values.insert(field.to_string(), value);
        Ok(self.revalidate_after_write(session, field))
    }

    /// Interpret raw input text by the field's kind, then [`set_field`](Self::set_field).
    pub fn set_input(&self, session: &mut WizardSession, field: &str, raw: &str) -> Result<Option<String>, WizardError> {
        let kind = self.kind_of(field)?;
        self.set_field(session, field, FieldValue::from_input(kind, raw))
    }

    /// Stage a binary for an attachment field and record its reference as
    /// the field value.
    pub fn stage_attachment(
        &self,
        session: &mut WizardSession,
        field: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<PreviewHandle, WizardError> {
        self.ensure_editable(session)?;
        if self.kind_of(field)? != FieldKind::Attachment {
            return Err(WizardError::NotAnAttachment { field: field.to_string() });
        }

        let handle = session.attachments.stage(field, file_name, bytes);
        let reference = session
            .attachments
            .binary(field)
            .map(|binary| FieldValue::Attachment(binary.reference()))
            .unwrap_or_default();
        session.values.insert(field.to_string(), reference);
        self.revalidate_after_write(session, field);
        Ok(handle)
    }

    /// Release the staged binary for an attachment field.
    pub fn clear_attachment(&self, session: &mut WizardSession, field: &str) -> Result<(), WizardError> {
        self.ensure_editable(session)?;
        if self.kind_of(field)? != FieldKind::Attachment {
            return Err(WizardError::NotAnAttachment { field: field.to_string() });
        }
        self.set_field(session, field, FieldValue::Empty).map(|_| ())
    }

    /// Gate forward navigation on the current step's fields.
    ///
    /// On failure every field of the step is marked touched so its error
    /// renders, and the step pointer stays put.
    pub fn advance(&self, session: &mut WizardSession) -> Result<Advance, WizardError> {
        self.ensure_editable(session)?;
        let step = session.step;
        let failures = self.validate_step(session, step, true);

        if !failures.is_empty() {
            let step_id = self.partition.step(step).map(|step| step.id.clone()).unwrap_or_default();
            warn!(step = %step_id, failing = failures.len(), "step gate rejected advance");
            return Err(StepGateError {
                step,
                step_id,
                failures,
            }
            .into());
        }

        if step >= self.partition.last_step() {
            debug!(step, "final step validated");
            return Ok(Advance::ReadyToSubmit);
        }
        session.step = step + 1;
        debug!(from = step, to = session.step, "advanced step");
        Ok(Advance::Moved(session.step))
    }

    /// Step back without validation. No-op at step 0 and on a submitted
    /// session.
    pub fn retreat(&self, session: &mut WizardSession) -> usize {
        if session.step > 0 && !matches!(session.phase, SessionPhase::Submitted { .. }) {
            session.step -= 1;
            debug!(to = session.step, "retreated step");
        }
        session.step
    }

    /// Return to the initial state: defaults, nothing touched, no
    /// attachments, step 0. Any in-flight submission loses ownership.
    pub fn reset(&self, session: &mut WizardSession) {
        let epoch = session.epoch + 1;
        let next_ticket = session.next_ticket;
        session.attachments.release_all();
        *session = WizardSession::new(self.schema.default_values());
        session.epoch = epoch;
        session.next_ticket = next_ticket;
        debug!(epoch, "reset wizard session");
    }

    /// Failing fields of one step against the session's current values.
    pub fn step_failures(&self, session: &WizardSession, step: usize) -> IndexMap<String, String> {
        self.partition
            .fields_of(step)
            .unwrap_or_default()
            .iter()
            .filter_map(|field| {
                self.schema
                    .validate(field, &session.values)
                    .err()
                    .map(|error| (field.clone(), error))
            })
            .collect()
    }

    /// Validate a step, record each field's result, and optionally mark the
    /// step's fields touched.
    pub(crate) fn validate_step(&self, session: &mut WizardSession, step: usize, touch: bool) -> IndexMap<String, String> {
        let mut failures = IndexMap::new();
        for field in self.partition.fields_of(step).unwrap_or_default() {
            let result = self.schema.validate(field, &session.values).err();
            if let Some(error) = &result {
                failures.insert(field.clone(), error.clone());
            }
            session.record_status(field, result, touch);
        }
        failures
    }

    fn revalidate_after_write(&self, session: &mut WizardSession, field: &str) -> Option<String> {
        let own = self.schema.validate(field, &session.values).err();
        session.record_status(field, own.clone(), true);

        for dependent in self.schema.dependents_of(field) {
            let error = self.schema.validate(dependent, &session.values).err();
            session.record_status(dependent, error, false);
        }
        own
    }

    fn kind_of(&self, field: &str) -> Result<FieldKind, WizardError> {
        self.schema
            .kind(field)
            .ok_or_else(|| WizardError::UnknownField { field: field.to_string() })
    }

    fn ensure_editable(&self, session: &WizardSession) -> Result<(), WizardError> {
        match session.phase {
            SessionPhase::Editing => Ok(()),
            SessionPhase::Submitting { .. } => Err(WizardError::SubmissionPending),
            SessionPhase::Submitted { .. } => Err(WizardError::Submitted),
        }
    }
}
