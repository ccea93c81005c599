//! SchoolHub configuration loading.
//!
//! Configuration lives in a small YAML file at
//! `~/.config/schoolhub/config.yaml` (or wherever `SCHOOLHUB_CONFIG_PATH`
//! points). A missing file is not an error; every key has a default.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use dirs_next::config_dir;
use indexmap::IndexMap;
use schoolhub_types::{DEFAULT_ATTACHMENT_CEILING_BYTES, IntakeOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::expand_tilde;

/// Environment variable allowing callers to override the config file path.
pub const CONFIG_PATH_ENV: &str = "SCHOOLHUB_CONFIG_PATH";

/// Default filename for the YAML payload.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Errors surfaced when reading configuration fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("attachment_ceiling_bytes must be greater than zero")]
    ZeroCeiling,
}

/// Values read from the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SchoolHubConfig {
    /// Base URL of the record store. `SCHOOLHUB_API_BASE` takes precedence.
    pub api_base: String,
    /// Path the registration intake is posted to.
    pub register_path: String,
    /// Size ceiling for attachments without an explicit limit.
    pub attachment_ceiling_bytes: u64,
    /// Option lists overriding the built-in ones (grades, sections, ...).
    pub options: IndexMap<String, Vec<String>>,
}

impl Default for SchoolHubConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:5000/api".to_string(),
            register_path: "/Newregistration/register".to_string(),
            attachment_ceiling_bytes: DEFAULT_ATTACHMENT_CEILING_BYTES,
            options: IndexMap::new(),
        }
    }
}

impl SchoolHubConfig {
    /// Build the option set consumed by intake schemas.
    pub fn intake_options(&self) -> IntakeOptions {
        let mut options = IntakeOptions::default().overlay(self.options.clone());
        options.attachment_ceiling_bytes = self.attachment_ceiling_bytes;
        options
    }
}

/// Returns the configuration path, honoring `SCHOOLHUB_CONFIG_PATH`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("schoolhub")
        .join(CONFIG_FILE_NAME)
}

/// Loads configuration from the default path.
pub fn load_config() -> Result<SchoolHubConfig, ConfigError> {
    load_config_from_path(&default_config_path())
}

/// Loads configuration from a specific path; a missing file yields defaults.
pub fn load_config_from_path(path: &Path) -> Result<SchoolHubConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file; using defaults");
            return Ok(SchoolHubConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if content.trim().is_empty() {
        return Ok(SchoolHubConfig::default());
    }

    let config: SchoolHubConfig = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if config.attachment_ceiling_bytes == 0 {
        return Err(ConfigError::ZeroCeiling);
    }
    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_honors_environment_override() {
        let override_path = "~/custom/schoolhub/config.yaml";
        temp_env::with_var(CONFIG_PATH_ENV, Some(override_path), || {
            assert_eq!(default_config_path(), expand_tilde(override_path));
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config_from_path(&dir.path().join("absent.yaml")).expect("defaults");
        assert_eq!(config, SchoolHubConfig::default());
    }

    #[test]
    fn partial_file_overlays_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "api_base: https://records.example.org/api\nattachment_ceiling_bytes: 1048576\noptions:\n  sections: [Rose, Lily]\n",
        )
        .expect("write config");

        let config = load_config_from_path(&path).expect("load");
        assert_eq!(config.api_base, "https://records.example.org/api");
        assert_eq!(config.register_path, "/Newregistration/register");

        let options = config.intake_options();
        assert_eq!(options.attachment_ceiling_bytes, 1_048_576);
        assert_eq!(options.list("sections").map(<[String]>::len), Some(2));
        assert_eq!(options.list("grades").map(<[String]>::len), Some(13));
    }

    #[test]
    fn unknown_keys_and_zero_ceiling_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");

        fs::write(&path, "api_bsae: http://localhost\n").expect("write config");
        assert!(matches!(load_config_from_path(&path), Err(ConfigError::Parse { .. })));

        fs::write(&path, "attachment_ceiling_bytes: 0\n").expect("write config");
        assert!(matches!(load_config_from_path(&path), Err(ConfigError::ZeroCeiling)));
    }
}
