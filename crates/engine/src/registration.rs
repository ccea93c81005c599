//! Built-in student registration intake.
//!
//! Four steps: personal, academic, parent/guardian contact, and document
//! uploads. Enumerated choices resolve against the configured option lists
//! and attachment ceilings fall back to the configured limit.

use schoolhub_types::{IntakeDefinition, IntakeOptions};

use crate::{error::ConfigurationError, wizard::Wizard};

const REGISTRATION_YAML: &str = include_str!("registration.yaml");

/// Parse the embedded registration definition.
pub fn registration_definition() -> Result<IntakeDefinition, ConfigurationError> {
    serde_yaml::from_str(REGISTRATION_YAML).map_err(|error| ConfigurationError::Definition(error.to_string()))
}

/// Build the registration wizard against the given options.
pub fn student_registration(options: &IntakeOptions) -> Result<Wizard, ConfigurationError> {
    Wizard::from_definition(&registration_definition()?, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolhub_types::FieldKind;

    #[test]
    fn embedded_definition_compiles_with_default_options() {
        let wizard = student_registration(&IntakeOptions::default()).expect("registration wizard");
        assert_eq!(wizard.name(), "student_registration");
        assert_eq!(wizard.step_count(), 4);
        assert_eq!(wizard.schema().len(), 22);

        let ids: Vec<&str> = wizard.partition().steps().iter().map(|step| step.id.as_str()).collect();
        assert_eq!(ids, vec!["personal", "academic", "contact", "documents"]);
    }

    #[test]
    fn wire_names_match_the_record_store_form() {
        let wizard = student_registration(&IntakeOptions::default()).expect("registration wizard");
        let schema = wizard.schema();
        assert_eq!(schema.wire_name("dob"), Some("dateOfBirth"));
        assert_eq!(schema.wire_name("phone"), Some("phoneNumber"));
        assert_eq!(schema.wire_name("email"), Some("emailAddress"));
        assert_eq!(schema.wire_name("firstName"), Some("firstName"));
        assert_eq!(schema.kind("studentPhoto"), Some(FieldKind::Attachment));
    }

    #[test]
    fn transfer_certificate_depends_on_previous_school() {
        let wizard = student_registration(&IntakeOptions::default()).expect("registration wizard");
        assert_eq!(wizard.schema().dependents_of("previousSchool"), &["transferCertificate".to_string()]);
    }

    #[test]
    fn unknown_option_list_in_configuration_is_fatal() {
        let mut options = IntakeOptions::default();
        options.lists.shift_remove("grades");
        let error = student_registration(&options).expect_err("grades list missing");
        assert!(matches!(error, ConfigurationError::UnknownOptionList { .. }));
    }

    #[test]
    fn phone_must_be_ten_digits() {
        let wizard = student_registration(&IntakeOptions::default()).expect("registration wizard");
        let mut session = wizard.start_session();

        let error = wizard.set_input(&mut session, "phone", "98765").expect("set phone");
        assert_eq!(error.as_deref(), Some("Phone number must be 10 digits"));
        assert!(wizard.set_input(&mut session, "phone", "9876543210").expect("set phone").is_none());
    }
}
