//! Static configuration consumed by intake schemas.
//!
//! Option lists (classes, sections, academic years, ...) and the attachment
//! size ceiling are supplied by configuration rather than computed.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default per-attachment size ceiling: 2 MiB.
pub const DEFAULT_ATTACHMENT_CEILING_BYTES: u64 = 2 * 1024 * 1024;

/// Enumerated option lists and limits referenced by field rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IntakeOptions {
    /// Ceiling applied by `max_bytes` rules that omit an explicit limit.
    pub attachment_ceiling_bytes: u64,
    /// Named option lists referenced by `one_of` rules.
    pub lists: IndexMap<String, Vec<String>>,
}

impl Default for IntakeOptions {
    fn default() -> Self {
        let mut lists = IndexMap::new();
        lists.insert("genders".to_string(), strings(&["Male", "Female"]));
        lists.insert("blood_groups".to_string(), strings(&["A+", "B+", "O+", "AB+"]));

        let mut grades = strings(&["Nursery", "PP1", "PP2"]);
        grades.extend(strings(&["I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X"]));
        lists.insert("grades".to_string(), grades);

        lists.insert("sections".to_string(), strings(&["A", "B", "C"]));
        lists.insert(
            "academic_years".to_string(),
            strings(&["2024-2025", "2025-2026", "2026-2027", "2027-2028", "2028-2029"]),
        );
        lists.insert("relationships".to_string(), strings(&["Father", "Mother", "Guardian"]));

        Self {
            attachment_ceiling_bytes: DEFAULT_ATTACHMENT_CEILING_BYTES,
            lists,
        }
    }
}

impl IntakeOptions {
    pub fn list(&self, name: &str) -> Option<&[String]> {
        self.lists.get(name).map(Vec::as_slice)
    }

    /// Merge configured lists over the defaults; lists not mentioned keep
    /// their default contents.
    pub fn overlay(mut self, lists: IndexMap<String, Vec<String>>) -> Self {
        for (name, values) in lists {
            self.lists.insert(name, values);
        }
        self
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
