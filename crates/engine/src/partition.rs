//! Step partition: the fixed, ordered grouping of fields into wizard steps.

use std::collections::HashMap;

use schoolhub_types::StepDefinition;

use crate::{error::ConfigurationError, schema::FieldSchema};

/// One wizard step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub id: String,
    pub title: String,
    pub fields: Vec<String>,
}

/// Ordered steps covering every schema field exactly once.
#[derive(Debug, Clone)]
pub struct StepPartition {
    steps: Vec<Step>,
    step_by_field: HashMap<String, usize>,
}

impl StepPartition {
    /// Build the partition, checking that it covers `schema` exactly.
    ///
    /// Any mismatch between steps and schema is a configuration error; a
    /// wizard is never constructed around a partial partition.
    pub fn new(definitions: &[StepDefinition], schema: &FieldSchema) -> Result<Self, ConfigurationError> {
        if definitions.is_empty() {
            return Err(ConfigurationError::NoSteps);
        }

        let mut steps = Vec::with_capacity(definitions.len());
        let mut step_by_field: HashMap<String, usize> = HashMap::new();

        for (index, definition) in definitions.iter().enumerate() {
            if definition.fields.is_empty() {
                return Err(ConfigurationError::EmptyStep {
                    step: definition.id.clone(),
                });
            }
            for field in &definition.fields {
                if !schema.contains(field) {
                    return Err(ConfigurationError::UnknownStepField {
                        step: definition.id.clone(),
                        field: field.clone(),
                    });
                }
                if let Some(&previous) = step_by_field.get(field) {
                    return Err(ConfigurationError::DuplicateField {
                        field: field.clone(),
                        first: definitions[previous].id.clone(),
                        second: definition.id.clone(),
                    });
                }
                step_by_field.insert(field.clone(), index);
            }
            steps.push(Step {
                id: definition.id.clone(),
                title: definition.title.clone().unwrap_or_else(|| definition.id.clone()),
                fields: definition.fields.clone(),
            });
        }

        if let Some(uncovered) = schema.names().find(|name| !step_by_field.contains_key(*name)) {
            return Err(ConfigurationError::UncoveredField {
                field: uncovered.to_string(),
            });
        }

        Ok(Self { steps, step_by_field })
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Ordered field names of a step, or `None` past the last step.
    pub fn fields_of(&self, step: usize) -> Option<&[String]> {
        self.steps.get(step).map(|step| step.fields.as_slice())
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Index of the step that owns `field`.
    pub fn step_of(&self, field: &str) -> Option<usize> {
        self.step_by_field.get(field).copied()
    }

    pub fn last_step(&self) -> usize {
        self.steps.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use schoolhub_types::{FieldDefinition, FieldKind, IntakeDefinition, IntakeOptions};

    fn schema(names: &[&str]) -> FieldSchema {
        let fields: IndexMap<String, FieldDefinition> = names
            .iter()
            .map(|name| (name.to_string(), FieldDefinition::new(FieldKind::Text)))
            .collect();
        let definition = IntakeDefinition {
            intake: "test".into(),
            title: None,
            submit_path: None,
            fields,
            steps: Vec::new(),
        };
        FieldSchema::from_definition(&definition, &IntakeOptions::default()).expect("schema")
    }

    fn step(id: &str, fields: &[&str]) -> StepDefinition {
        StepDefinition {
            id: id.into(),
            title: None,
            fields: fields.iter().map(|field| field.to_string()).collect(),
        }
    }

    #[test]
    fn partition_exposes_ordered_fields() {
        let schema = schema(&["a", "b", "c"]);
        let partition = StepPartition::new(&[step("first", &["b", "a"]), step("second", &["c"])], &schema).expect("partition");

        assert_eq!(partition.step_count(), 2);
        assert_eq!(partition.fields_of(0), Some(&["b".to_string(), "a".to_string()][..]));
        assert_eq!(partition.fields_of(2), None);
        assert_eq!(partition.step_of("c"), Some(1));
        assert_eq!(partition.step(1).map(|step| step.title.as_str()), Some("second"));
        assert_eq!(partition.last_step(), 1);
    }

    #[test]
    fn uncovered_field_is_a_configuration_error() {
        let schema = schema(&["a", "b"]);
        let error = StepPartition::new(&[step("only", &["a"])], &schema).expect_err("b uncovered");
        assert_eq!(error, ConfigurationError::UncoveredField { field: "b".into() });
    }

    #[test]
    fn duplicate_and_unknown_fields_are_rejected() {
        let schema = schema(&["a", "b"]);
        let duplicate = StepPartition::new(&[step("one", &["a", "b"]), step("two", &["a"])], &schema).expect_err("duplicate");
        assert_eq!(
            duplicate,
            ConfigurationError::DuplicateField {
                field: "a".into(),
                first: "one".into(),
                second: "two".into(),
            }
        );

        let unknown = StepPartition::new(&[step("one", &["a", "b", "z"])], &schema).expect_err("unknown");
        assert!(matches!(unknown, ConfigurationError::UnknownStepField { .. }));
    }

    #[test]
    fn empty_partitions_are_rejected() {
        let schema = schema(&["a"]);
        assert_eq!(StepPartition::new(&[], &schema).expect_err("no steps"), ConfigurationError::NoSteps);
        assert!(matches!(
            StepPartition::new(&[step("blank", &[]), step("one", &["a"])], &schema),
            Err(ConfigurationError::EmptyStep { .. })
        ));
    }
}
