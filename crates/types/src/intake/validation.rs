//! Primitive predicates shared by field rule evaluation.
//!
//! These helpers are pure and allocation-light so the rule evaluator can run
//! them on every keystroke without side effects.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Input formats accepted for date fields, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Returns true when the text contains nothing but whitespace.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Returns true when the text has the `local@domain.tld` shape.
///
/// # Example
/// ```rust
/// use schoolhub_types::is_email_shaped;
///
/// assert!(is_email_shaped("parent@example.org"));
/// assert!(!is_email_shaped("parent@example"));
/// assert!(!is_email_shaped("two words@example.org"));
/// ```
pub fn is_email_shaped(text: &str) -> bool {
    EMAIL_SHAPE.is_match(text.trim())
}

/// Parse a finite number from user input.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|number| number.is_finite())
}

/// Parse a date typed into a form, accepting ISO and day-first layouts.
pub fn parse_form_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}
