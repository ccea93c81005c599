use std::path::PathBuf;

use dirs_next::home_dir;

/// Expand a leading `~` to the user's home directory.
///
/// Paths without a leading tilde are returned unchanged (after trimming).
pub fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    let home = || home_dir().unwrap_or_else(|| PathBuf::from("~"));

    if trimmed == "~" {
        return home();
    }
    match trimmed.strip_prefix("~/").or_else(|| trimmed.strip_prefix("~\\")) {
        Some(rest) => home().join(rest),
        None => PathBuf::from(trimmed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_untouched() {
        assert_eq!(expand_tilde(" /etc/schoolhub.yaml "), PathBuf::from("/etc/schoolhub.yaml"));
        assert_eq!(expand_tilde("relative/config.yaml"), PathBuf::from("relative/config.yaml"));
    }

    #[test]
    fn leading_tilde_expands_to_home() {
        if let Some(home) = home_dir() {
            assert_eq!(expand_tilde("~"), home);
            assert_eq!(expand_tilde("~/schoolhub/config.yaml"), home.join("schoolhub/config.yaml"));
        }
    }
}
