//! Shared type definitions for SchoolHub intake workflows.
//!
//! The declarative pieces (field kinds, rules, steps, option lists) live here so
//! the engine, the API client, and the CLI agree on one vocabulary without
//! depending on each other.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub mod intake;
pub mod options;

pub use intake::{
    AttachmentRef, FieldDefinition, FieldKind, FieldRule, FieldValue, IntakeDefinition, StepDefinition,
    validation::{is_blank, is_email_shaped, parse_form_date, parse_number},
};
pub use options::{DEFAULT_ATTACHMENT_CEILING_BYTES, IntakeOptions};

/// Identifier assigned by the record store to a newly created record.
///
/// The store may answer with either a string or a numeric id; both are
/// normalized to their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(text) if !text.trim().is_empty() => Ok(Self(text)),
            Value::Number(number) => Ok(Self(number.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "record id must be a non-empty string or a number, got {other}"
            ))),
        }
    }
}
