pub mod config;
pub mod http;
pub mod path_processing;

pub use config::{CONFIG_PATH_ENV, ConfigError, SchoolHubConfig, default_config_path, load_config, load_config_from_path};
pub use path_processing::expand_tilde;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static SECRET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization: (?:bearer )?)([^\s]+)",
        r"(?i)([A-Z0-9_]*?(?:KEY|TOKEN|SECRET|PASSWORD)=)([^\s]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("secret pattern compiles"))
    .collect()
});

/// Redacts values that look like secrets in a string.
///
/// # Example
/// ```rust
/// use schoolhub_util::redact_sensitive;
///
/// let line = redact_sensitive("authorization: Bearer abc123");
/// assert_eq!(line, "authorization: Bearer <redacted>");
/// assert_eq!(redact_sensitive("SCHOOLHUB_API_TOKEN=xyz"), "SCHOOLHUB_API_TOKEN=<redacted>");
/// ```
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in SECRET_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |caps: &Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{}<redacted>", prefix)
            })
            .to_string();
    }
    redacted
}
