//! Strongly typed intake schema definitions shared across the engine and CLI.
//!
//! An intake is a declarative description of a multi-step data-collection
//! form: the fields it collects, the rules each field must satisfy, and the
//! ordered steps the fields are grouped into. Definitions preserve authoring
//! order (via `IndexMap`) so steps and payloads come out in a predictable
//! sequence.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub mod validation;

/// Complete intake definition as authored in YAML or built in code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntakeDefinition {
    /// Canonical identifier used in logs (for example, `student_registration`).
    pub intake: String,
    /// Optional human-readable title.
    #[serde(default)]
    pub title: Option<String>,
    /// Record-store path the completed intake is posted to.
    #[serde(default)]
    pub submit_path: Option<String>,
    /// Field definitions keyed by field name, preserving author order.
    #[serde(default)]
    pub fields: IndexMap<String, FieldDefinition>,
    /// Ordered steps partitioning the fields.
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

/// Metadata for a single collectible field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDefinition {
    /// Label rendered next to the input.
    #[serde(default)]
    pub label: Option<String>,
    /// Primitive kind of the value.
    pub kind: FieldKind,
    /// Multipart key used on submission; defaults to the field name.
    #[serde(default)]
    pub wire_name: Option<String>,
    /// Raw input text the field starts with.
    #[serde(default)]
    pub default: Option<String>,
    /// Rules evaluated in order; the first failure wins.
    #[serde(default)]
    pub rules: Vec<FieldRule>,
}

impl FieldDefinition {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            label: None,
            kind,
            wire_name: None,
            default: None,
            rules: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_wire_name(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = Some(wire_name.into());
        self
    }

    pub fn with_rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }
}

/// Primitive kinds a field can hold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Date,
    /// Single choice from an enumerated option list.
    Choice,
    Number,
    /// Binary payload staged through the attachment stager.
    Attachment,
}

/// Declarative validation rule attached to a field.
///
/// Rules carry an optional custom message; when absent the evaluator builds
/// one from the field label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum FieldRule {
    /// Value must be present and, for text, not blank.
    Required {
        #[serde(default)]
        message: Option<String>,
    },
    /// Text must match the regular expression. Blank values pass; pair with
    /// `required` to reject them.
    Pattern {
        pattern: String,
        #[serde(default)]
        message: Option<String>,
    },
    /// Value must be numeric.
    Numeric {
        #[serde(default)]
        message: Option<String>,
    },
    /// Text must look like an email address.
    Email {
        #[serde(default)]
        message: Option<String>,
    },
    /// Choice must belong to the named option list.
    OneOf {
        options: String,
        #[serde(default)]
        message: Option<String>,
    },
    /// Attachment must not exceed `limit` bytes (or the configured ceiling).
    MaxBytes {
        #[serde(default)]
        limit: Option<u64>,
        #[serde(default)]
        message: Option<String>,
    },
    /// Value is required whenever `field` is non-blank.
    RequiredWith {
        field: String,
        #[serde(default)]
        message: Option<String>,
    },
    /// Value must be a calendar date that is not in the future.
    PastDate {
        #[serde(default)]
        message: Option<String>,
    },
}

impl FieldRule {
    pub fn required() -> Self {
        Self::Required { message: None }
    }

    pub fn pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            message: Some(message.into()),
        }
    }

    /// Name of another field this rule reads, if any.
    pub fn referenced_field(&self) -> Option<&str> {
        match self {
            Self::RequiredWith { field, .. } => Some(field.as_str()),
            _ => None,
        }
    }

    pub fn custom_message(&self) -> Option<&str> {
        match self {
            Self::Required { message }
            | Self::Pattern { message, .. }
            | Self::Numeric { message }
            | Self::Email { message }
            | Self::OneOf { message, .. }
            | Self::MaxBytes { message, .. }
            | Self::RequiredWith { message, .. }
            | Self::PastDate { message } => message.as_deref(),
        }
    }
}

/// Ordered, named group of fields that gate forward navigation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepDefinition {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub fields: Vec<String>,
}

/// Metadata describing a staged binary. The bytes themselves stay with the
/// attachment slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachmentRef {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// Current value of a field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    #[default]
    Empty,
    Text(String),
    Date(NaiveDate),
    Choice(String),
    /// Parsed number plus the text it was entered as, which is what gets sent.
    Number { value: f64, raw: String },
    Attachment(AttachmentRef),
}

impl FieldValue {
    /// Interpret raw user input according to the field kind.
    ///
    /// Input that does not parse as the kind is kept as text so the rules can
    /// report it instead of losing it.
    pub fn from_input(kind: FieldKind, raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        match kind {
            FieldKind::Text | FieldKind::Attachment => Self::Text(raw.to_string()),
            FieldKind::Choice => Self::Choice(trimmed.to_string()),
            FieldKind::Number => match validation::parse_number(trimmed) {
                Some(value) => Self::Number {
                    value,
                    raw: trimmed.to_string(),
                },
                None => Self::Text(raw.to_string()),
            },
            FieldKind::Date => validation::parse_form_date(trimmed)
                .map(Self::Date)
                .unwrap_or_else(|| Self::Text(raw.to_string())),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) | Self::Choice(text) => validation::is_blank(text),
            _ => false,
        }
    }

    pub fn as_attachment(&self) -> Option<&AttachmentRef> {
        match self {
            Self::Attachment(reference) => Some(reference),
            _ => None,
        }
    }

    /// Flat textual form used for multipart scalar fields.
    ///
    /// Attachments have no scalar form; they travel as file parts.
    pub fn wire_text(&self) -> Option<String> {
        match self {
            Self::Empty => Some(String::new()),
            Self::Text(text) | Self::Choice(text) => Some(text.clone()),
            Self::Date(date) => Some(date.format("%Y-%m-%d").to_string()),
            Self::Number { raw, .. } => Some(raw.clone()),
            Self::Attachment(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_input_keeps_unparseable_numbers_as_text() {
        assert_eq!(
            FieldValue::from_input(FieldKind::Number, " 12500 "),
            FieldValue::Number {
                value: 12500.0,
                raw: "12500".to_string()
            }
        );
        assert_eq!(
            FieldValue::from_input(FieldKind::Number, "twelve"),
            FieldValue::Text("twelve".to_string())
        );
        assert_eq!(FieldValue::from_input(FieldKind::Number, "   "), FieldValue::Empty);
    }

    #[test]
    fn from_input_parses_dates() {
        let parsed = FieldValue::from_input(FieldKind::Date, "2015-06-01");
        assert_eq!(parsed, FieldValue::Date(NaiveDate::from_ymd_opt(2015, 6, 1).unwrap()));
        assert_eq!(
            FieldValue::from_input(FieldKind::Date, "June first"),
            FieldValue::Text("June first".to_string())
        );
    }

    #[test]
    fn wire_text_sends_numbers_as_entered() {
        for entered in ["007", "18500.50", "1e3"] {
            let value = FieldValue::from_input(FieldKind::Number, entered);
            assert!(matches!(value, FieldValue::Number { .. }), "{entered} should parse");
            assert_eq!(value.wire_text().as_deref(), Some(entered));
        }
        assert_eq!(FieldValue::Empty.wire_text().as_deref(), Some(""));
        let attachment = FieldValue::Attachment(AttachmentRef {
            file_name: "photo.png".into(),
            mime_type: "image/png".into(),
            size_bytes: 10,
        });
        assert!(attachment.wire_text().is_none());
    }

    #[test]
    fn rules_deserialize_from_tagged_yaml() {
        let yaml = r#"
- rule: required
- rule: pattern
  pattern: "^[0-9]{10}$"
  message: "Phone number must be 10 digits"
- rule: max_bytes
  limit: 2048
- rule: required_with
  field: previous_school
"#;
        let rules: Vec<FieldRule> = serde_yaml::from_str(yaml).expect("parse rules");
        assert_eq!(rules.len(), 4);
        assert_eq!(rules[0], FieldRule::required());
        assert_eq!(rules[1].custom_message(), Some("Phone number must be 10 digits"));
        assert_eq!(rules[3].referenced_field(), Some("previous_school"));
    }
}
