//! # SchoolHub Engine
//!
//! Multi-step intake wizards with gated validation and staged binary
//! attachments, plus the one-shot handoff of a completed intake to the
//! record store.
//!
//! ## Usage
//!
//! ```rust
//! use schoolhub_engine::{Advance, student_registration};
//! use schoolhub_types::IntakeOptions;
//!
//! let wizard = student_registration(&IntakeOptions::default())?;
//! let mut session = wizard.start_session();
//!
//! // Blank required fields keep the wizard on the first step.
//! assert!(wizard.advance(&mut session).is_err());
//!
//! for (field, value) in [
//!     ("firstName", "Asha"),
//!     ("lastName", "Rao"),
//!     ("dob", "2016-04-12"),
//!     ("gender", "Female"),
//!     ("bloodGroup", "O+"),
//! ] {
//!     wizard.set_input(&mut session, field, value)?;
//! }
//! assert_eq!(wizard.advance(&mut session)?, Advance::Moved(1));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`schema`**: compiled per-field rules ([`FieldSchema`])
//! - **`partition`**: ordered steps covering every field once ([`StepPartition`])
//! - **`attachments`**: staged binaries and their previews ([`AttachmentStager`])
//! - **`wizard`** / **`session`**: the step state machine over an explicit session value
//! - **`submission`**: full revalidation, payload assembly, and response ownership
//! - **`store`**: the HTTP [`RecordStore`]
//! - **`registration`**: the built-in student registration intake

use std::{fs, path::Path};

use anyhow::{Context, Result};
use schoolhub_types::IntakeDefinition;

pub mod attachments;
pub mod error;
pub mod partition;
pub mod registration;
pub mod schema;
pub mod session;
pub mod store;
pub mod submission;
pub mod wizard;

pub use attachments::{AttachmentStager, PreviewHandle, PreviewId, StagedBinary};
pub use error::{ConfigurationError, StepGateError, SubmissionError, WizardError};
pub use partition::{Step, StepPartition};
pub use registration::{registration_definition, student_registration};
pub use schema::{FieldSchema, FieldValues};
pub use session::{FieldStatus, SessionPhase, SubmissionTicket, WizardSession};
pub use store::{HttpRecordStore, interpret_response};
pub use submission::{PayloadAttachment, PendingSubmission, RecordStore, SubmissionAssembler, SubmissionPayload};
pub use wizard::{Advance, Wizard};

/// Load an intake definition from a YAML or JSON file.
///
/// Files ending in `.json` are parsed as JSON; anything else as YAML.
pub fn parse_intake_file(file_path: impl AsRef<Path>) -> Result<IntakeDefinition> {
    let file_path = file_path.as_ref();
    let content = fs::read_to_string(file_path).with_context(|| format!("Failed to read intake file: {}", file_path.display()))?;

    let is_json = file_path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
    let definition = if is_json {
        serde_json::from_str(&content).with_context(|| format!("Invalid intake JSON in {}", file_path.display()))?
    } else {
        serde_yaml::from_str(&content).with_context(|| format!("Invalid intake YAML in {}", file_path.display()))?
    };
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolhub_types::IntakeOptions;

    #[test]
    fn parse_intake_file_reads_yaml() {
        let temp_dir = tempfile::tempdir().expect("tempdir");
        let intake_path = temp_dir.path().join("enquiry.yaml");
        fs::write(
            &intake_path,
            r#"
intake: enquiry
fields:
  parentName:
    kind: text
    rules:
      - rule: required
steps:
  - id: only
    fields: [parentName]
"#,
        )
        .expect("write intake");

        let definition = parse_intake_file(&intake_path).expect("parse intake");
        assert_eq!(definition.intake, "enquiry");
        let wizard = Wizard::from_definition(&definition, &IntakeOptions::default()).expect("wizard");
        assert_eq!(wizard.step_count(), 1);
    }

    #[test]
    fn parse_intake_file_reads_json_by_extension() {
        let temp_dir = tempfile::tempdir().expect("tempdir");
        let intake_path = temp_dir.path().join("enquiry.json");
        fs::write(
            &intake_path,
            r#"{"intake": "enquiry", "fields": {"phone": {"kind": "text"}}, "steps": [{"id": "only", "fields": ["phone"]}]}"#,
        )
        .expect("write intake");

        let definition = parse_intake_file(&intake_path).expect("parse intake");
        assert_eq!(definition.fields.len(), 1);
    }

    #[test]
    fn parse_intake_file_reports_the_path() {
        let temp_dir = tempfile::tempdir().expect("tempdir");
        let intake_path = temp_dir.path().join("broken.yaml");
        fs::write(&intake_path, "intake: [unterminated").expect("write intake");

        let error = parse_intake_file(&intake_path).expect_err("invalid yaml");
        assert!(format!("{error:#}").contains("broken.yaml"));
    }
}
