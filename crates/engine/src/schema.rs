//! Field schema: per-field kind, default, and compiled validation rules.
//!
//! The schema is built once from an [`IntakeDefinition`] and the configured
//! [`IntakeOptions`]. Everything that can be wrong with a rule (bad regex,
//! unknown option list, dangling cross-field reference) is reported at
//! construction as a [`ConfigurationError`]; afterwards validation is a pure
//! function of the candidate value set.

use std::collections::HashMap;

use chrono::{Local, NaiveDate};
use indexmap::IndexMap;
use regex::Regex;
use schoolhub_types::{
    FieldDefinition, FieldKind, FieldRule, FieldValue, IntakeDefinition, IntakeOptions, is_email_shaped, parse_number,
};

use crate::error::ConfigurationError;

/// Current values keyed by field name.
pub type FieldValues = IndexMap<String, FieldValue>;

#[derive(Debug, Clone)]
enum CompiledRule {
    Required { message: String },
    Pattern { regex: Regex, message: String },
    Numeric { message: String },
    Email { message: String },
    OneOf { options: Vec<String>, message: String },
    MaxBytes { limit: u64, message: String },
    RequiredWith { other: String, message: String },
    PastDate { message: String },
}

#[derive(Debug, Clone)]
struct SchemaField {
    kind: FieldKind,
    label: String,
    wire_name: String,
    default: FieldValue,
    rules: Vec<CompiledRule>,
}

/// Declarative description of every collectible value and its rules.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    fields: IndexMap<String, SchemaField>,
    /// Field name to the fields whose cross-field rules read it.
    dependents: HashMap<String, Vec<String>>,
}

impl FieldSchema {
    /// Compile a schema from its definition, resolving option lists and the
    /// attachment ceiling from `options`.
    pub fn from_definition(definition: &IntakeDefinition, options: &IntakeOptions) -> Result<Self, ConfigurationError> {
        let mut fields = IndexMap::with_capacity(definition.fields.len());
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();

        for (name, field_definition) in &definition.fields {
            let field = compile_field(name, field_definition, options)?;
            for rule in &field_definition.rules {
                if let Some(other) = rule.referenced_field() {
                    if other == name || !definition.fields.contains_key(other) {
                        return Err(ConfigurationError::UnknownRuleReference {
                            field: name.clone(),
                            other: other.to_string(),
                        });
                    }
                    dependents.entry(other.to_string()).or_default().push(name.clone());
                }
            }
            fields.insert(name.clone(), field);
        }

        Ok(Self { fields, dependents })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn kind(&self, name: &str) -> Option<FieldKind> {
        self.fields.get(name).map(|field| field.kind)
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|field| field.label.as_str())
    }

    /// Multipart key the field is submitted under.
    pub fn wire_name(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|field| field.wire_name.as_str())
    }

    pub fn default_value(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).map(|field| field.default.clone())
    }

    /// Fresh value set with every field at its default.
    pub fn default_values(&self) -> FieldValues {
        self.fields
            .iter()
            .map(|(name, field)| (name.clone(), field.default.clone()))
            .collect()
    }

    /// Fields whose cross-field rules reference `name`.
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.dependents.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Validate one field against the full value set.
    ///
    /// Rules run in declaration order and the first failure is returned.
    /// Missing entries in `values` are treated as empty.
    pub fn validate(&self, name: &str, values: &FieldValues) -> Result<(), String> {
        self.validate_on(name, values, Local::now().date_naive())
    }

    pub(crate) fn validate_on(&self, name: &str, values: &FieldValues, today: NaiveDate) -> Result<(), String> {
        let field = self
            .fields
            .get(name)
            .ok_or_else(|| format!("unknown field '{name}'"))?;
        let empty = FieldValue::Empty;
        let value = values.get(name).unwrap_or(&empty);

        for rule in &field.rules {
            check_rule(rule, value, values, today)?;
        }
        Ok(())
    }
}

fn compile_field(name: &str, definition: &FieldDefinition, options: &IntakeOptions) -> Result<SchemaField, ConfigurationError> {
    let label = definition.label.clone().unwrap_or_else(|| name.to_string());
    let kind = definition.kind;

    let default = match definition.default.as_deref() {
        None => FieldValue::Empty,
        Some(_) if kind == FieldKind::Attachment => {
            return Err(ConfigurationError::InvalidDefault {
                field: name.to_string(),
                reason: "attachments cannot have a default".into(),
            });
        }
        Some(raw) => FieldValue::from_input(kind, raw),
    };

    let rules = definition
        .rules
        .iter()
        .map(|rule| compile_rule(name, &label, kind, rule, options))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SchemaField {
        kind,
        label,
        wire_name: definition.wire_name.clone().unwrap_or_else(|| name.to_string()),
        default,
        rules,
    })
}

fn compile_rule(
    name: &str,
    label: &str,
    kind: FieldKind,
    rule: &FieldRule,
    options: &IntakeOptions,
) -> Result<CompiledRule, ConfigurationError> {
    let message = |fallback: String| rule.custom_message().map(str::to_string).unwrap_or(fallback);
    let incompatible = |rule: &'static str| ConfigurationError::IncompatibleRule {
        field: name.to_string(),
        rule,
        kind,
    };

    let compiled = match rule {
        FieldRule::Required { .. } => CompiledRule::Required {
            message: message(format!("{label} is required")),
        },
        FieldRule::Pattern { pattern, .. } => {
            if kind == FieldKind::Attachment {
                return Err(incompatible("pattern"));
            }
            let regex = Regex::new(pattern).map_err(|error| ConfigurationError::InvalidPattern {
                field: name.to_string(),
                pattern: pattern.clone(),
                reason: error.to_string(),
            })?;
            CompiledRule::Pattern {
                regex,
                message: message(format!("{label} has an invalid format")),
            }
        }
        FieldRule::Numeric { .. } => {
            if !matches!(kind, FieldKind::Number | FieldKind::Text) {
                return Err(incompatible("numeric"));
            }
            CompiledRule::Numeric {
                message: message(format!("{label} must be a number")),
            }
        }
        FieldRule::Email { .. } => {
            if kind != FieldKind::Text {
                return Err(incompatible("email"));
            }
            CompiledRule::Email {
                message: message("Invalid email address".to_string()),
            }
        }
        FieldRule::OneOf { options: list, .. } => {
            if !matches!(kind, FieldKind::Choice | FieldKind::Text) {
                return Err(incompatible("one_of"));
            }
            let values = options.list(list).ok_or_else(|| ConfigurationError::UnknownOptionList {
                field: name.to_string(),
                list: list.clone(),
            })?;
            CompiledRule::OneOf {
                options: values.to_vec(),
                message: message(format!("{label} must be one of: {}", values.join(", "))),
            }
        }
        FieldRule::MaxBytes { limit, .. } => {
            if kind != FieldKind::Attachment {
                return Err(incompatible("max_bytes"));
            }
            let limit = limit.unwrap_or(options.attachment_ceiling_bytes);
            CompiledRule::MaxBytes {
                limit,
                message: message(format!("{label} must be at most {}", human_bytes(limit))),
            }
        }
        FieldRule::RequiredWith { field, .. } => CompiledRule::RequiredWith {
            other: field.clone(),
            message: message(format!("{label} is required when {field} is provided")),
        },
        FieldRule::PastDate { .. } => {
            if kind != FieldKind::Date {
                return Err(incompatible("past_date"));
            }
            CompiledRule::PastDate {
                message: message(format!("{label} must be a valid date that is not in the future")),
            }
        }
    };
    Ok(compiled)
}

fn check_rule(rule: &CompiledRule, value: &FieldValue, values: &FieldValues, today: NaiveDate) -> Result<(), String> {
    let fail = |message: &String| -> Result<(), String> { Err(message.clone()) };

    match rule {
        CompiledRule::Required { message } => {
            if value.is_empty() {
                return fail(message);
            }
        }
        // Blank values are the `required` rule's concern from here on.
        _ if value.is_empty() => {}
        CompiledRule::Pattern { regex, message } => match value.wire_text() {
            Some(text) if regex.is_match(text.trim()) => {}
            _ => return fail(message),
        },
        CompiledRule::Numeric { message } => match value {
            FieldValue::Number { .. } => {}
            FieldValue::Text(text) if parse_number(text).is_some() => {}
            _ => return fail(message),
        },
        CompiledRule::Email { message } => match value {
            FieldValue::Text(text) if is_email_shaped(text) => {}
            _ => return fail(message),
        },
        CompiledRule::OneOf { options, message } => match value {
            FieldValue::Choice(choice) | FieldValue::Text(choice) if options.iter().any(|option| option == choice.trim()) => {}
            _ => return fail(message),
        },
        CompiledRule::MaxBytes { limit, message } => match value.as_attachment() {
            Some(reference) if reference.size_bytes <= *limit => {}
            _ => return fail(message),
        },
        CompiledRule::RequiredWith { .. } => {}
        CompiledRule::PastDate { message } => match value {
            FieldValue::Date(date) if *date <= today => {}
            _ => return fail(message),
        },
    }

    if let CompiledRule::RequiredWith { other, message } = rule
        && value.is_empty()
        && values.get(other).is_some_and(|other_value| !other_value.is_empty())
    {
        return fail(message);
    }
    Ok(())
}

fn human_bytes(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    const KIB: u64 = 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{} KB", bytes / KIB)
    } else {
        format!("{bytes} bytes")
    }
}
