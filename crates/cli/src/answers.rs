//! Answers files for non-interactive intakes.
//!
//! ```yaml
//! fields:
//!   firstName: Asha
//!   totalFees: 18500
//! attachments:
//!   studentPhoto: ./photos/asha.png
//! ```
//!
//! Attachment paths are tilde-expanded and resolved relative to the answers
//! file's directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use schoolhub_util::expand_tilde;
use serde::Deserialize;
use serde_yaml::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct AnswersDocument {
    fields: IndexMap<String, Value>,
    attachments: IndexMap<String, String>,
}

/// Parsed answers: raw field input text and attachment file locations.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Answers {
    pub fields: IndexMap<String, String>,
    pub attachments: IndexMap<String, PathBuf>,
}

impl Answers {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read answers file: {}", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&content, base_dir).with_context(|| format!("Invalid answers file: {}", path.display()))
    }

    pub fn parse(content: &str, base_dir: &Path) -> Result<Self> {
        let document: AnswersDocument = serde_yaml::from_str(content)?;

        let mut fields = IndexMap::new();
        for (name, value) in document.fields {
            let text = scalar_text(&value).with_context(|| format!("field '{name}'"))?;
            fields.insert(name, text);
        }

        let attachments = document
            .attachments
            .into_iter()
            .map(|(name, location)| {
                let expanded = expand_tilde(&location);
                let resolved = if expanded.is_absolute() { expanded } else { base_dir.join(expanded) };
                (name, resolved)
            })
            .collect();

        Ok(Self { fields, attachments })
    }

    /// Answer names that are neither fields nor attachments of the intake.
    pub fn unknown_names<'a>(&'a self, known: &[&str]) -> Vec<&'a str> {
        self.fields
            .keys()
            .chain(self.attachments.keys())
            .map(String::as_str)
            .filter(|name| !known.contains(name))
            .collect()
    }
}

fn scalar_text(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        _ => bail!("expected a scalar value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_stringifies_scalars_and_resolves_attachment_paths() {
        let answers = Answers::parse(
            r#"
fields:
  firstName: Asha
  totalFees: 18500
  phone: 9876543210
  middleName: ~
attachments:
  studentPhoto: photos/asha.png
  birthCertificate: /srv/docs/bc.pdf
"#,
            Path::new("/home/staff/intake"),
        )
        .expect("answers");

        assert_eq!(answers.fields["firstName"], "Asha");
        assert_eq!(answers.fields["totalFees"], "18500");
        assert_eq!(answers.fields["phone"], "9876543210");
        assert_eq!(answers.fields["middleName"], "");
        assert_eq!(answers.attachments["studentPhoto"], PathBuf::from("/home/staff/intake/photos/asha.png"));
        assert_eq!(answers.attachments["birthCertificate"], PathBuf::from("/srv/docs/bc.pdf"));
    }

    #[test]
    fn parse_rejects_nested_values_and_unknown_sections() {
        assert!(Answers::parse("fields:\n  address:\n    line1: x\n", Path::new(".")).is_err());
        assert!(Answers::parse("extras: {}\n", Path::new(".")).is_err());
    }

    #[test]
    fn unknown_names_lists_unrecognized_answers() {
        let answers = Answers::parse("fields:\n  firstName: Asha\n  nickname: A\n", Path::new(".")).expect("answers");
        assert_eq!(answers.unknown_names(&["firstName"]), vec!["nickname"]);
    }

    #[test]
    fn load_reads_from_disk() {
        let temp_dir = tempfile::tempdir().expect("tempdir");
        let path = temp_dir.path().join("answers.yaml");
        std::fs::write(&path, "attachments:\n  studentPhoto: asha.png\n").expect("write answers");

        let answers = Answers::load(&path).expect("answers");
        assert_eq!(answers.attachments["studentPhoto"], temp_dir.path().join("asha.png"));
    }
}
