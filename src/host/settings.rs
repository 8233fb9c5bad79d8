//! Persistent settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::collection::ConflictPolicy;
use crate::util::Result;

/// Settings that persist between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Which side wins when a collection has both rules and an expression
    pub conflict_policy: ConflictPolicy,

    // Max member lines printed by print_collection (None = all)
    pub print_member_limit: Option<usize>,

    // Default tracing filter for the CLI when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::default(),
            print_member_limit: None,
            log_filter: "warn".to_string(),
        }
    }
}

impl Settings {
    /// Get settings file path
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("usd-collections");
            p.push("settings.json");
            p
        })
    }

    /// Load settings from the user config dir, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %path.display(), %err, "ignoring unreadable settings file");
                Self::default()
            }
        }
    }

    /// Load settings from a specific file
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Save settings to a specific file
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Save settings to the user config dir
    pub fn save(&self) -> Result<()> {
        match Self::path() {
            Some(path) => self.save_to(path),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            conflict_policy: ConflictPolicy::RulesWin,
            print_member_limit: Some(5),
            log_filter: "debug".into(),
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings = serde_json::from_str(r#"{ "conflict_policy": "rules_win" }"#).unwrap();
        assert_eq!(settings.conflict_policy, ConflictPolicy::RulesWin);
        assert_eq!(settings.print_member_limit, None);
        assert_eq!(settings.log_filter, "warn");
    }

    #[test]
    fn test_bad_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }
}
