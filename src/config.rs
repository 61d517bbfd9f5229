//! Tracker Configuration
//!
//! Loaded from a TOML file. Every field has a default, so a missing file
//! gives a working tracker with no exclusion groups and no unlock gates.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::quest::{ExclusiveGroup, QuestRules, UnlockGate};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "QUEST_TRACKER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "quest-tracker.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
    #[serde(default = "default_progress_path")]
    pub progress_path: PathBuf,
    /// Reload the catalog when the file changes
    #[serde(default)]
    pub watch_catalog: bool,
    #[serde(default)]
    pub exclusive_groups: Vec<ExclusiveGroup>,
    #[serde(default)]
    pub unlock_gates: Vec<UnlockGate>,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/quests-data.json")
}

fn default_progress_path() -> PathBuf {
    PathBuf::from("data/progress.json")
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            progress_path: default_progress_path(),
            watch_catalog: false,
            exclusive_groups: Vec::new(),
            unlock_gates: Vec::new(),
        }
    }
}

impl TrackerConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;

        info!(
            "Loaded config from {:?} ({} exclusive groups, {} unlock gates)",
            path,
            config.exclusive_groups.len(),
            config.unlock_gates.len()
        );
        Ok(config)
    }

    /// Load from the path in `QUEST_TRACKER_CONFIG`, or `quest-tracker.toml`
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load(&path)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        // Surface rule errors at load time rather than at first use
        config.rules()?;
        Ok(config)
    }

    /// Build the validated exclusion/unlock rules
    pub fn rules(&self) -> Result<QuestRules, ConfigError> {
        QuestRules::from_parts(self.exclusive_groups.clone(), self.unlock_gates.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = TrackerConfig::load(&temp_dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert!(!config.watch_catalog);
    }

    #[test]
    fn test_load_full_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("quest-tracker.toml");
        std::fs::write(
            &path,
            r#"
catalog_path = "/srv/tarkov/quests-data.json"
watch_catalog = true

[[exclusive_groups]]
id = "ending_choice"
quests = ["savior", "fallen"]

[[unlock_gates]]
npc = "jaeger"
required_npc = "mechanic"
required_quest = "introduction"
"#,
        )
        .unwrap();

        let config = TrackerConfig::load(&path).unwrap();
        assert_eq!(config.catalog_path, PathBuf::from("/srv/tarkov/quests-data.json"));
        assert_eq!(config.progress_path, PathBuf::from("data/progress.json"));
        assert!(config.watch_catalog);

        let rules = config.rules().unwrap();
        assert_eq!(rules.groups().len(), 1);
        assert_eq!(rules.gate_for("jaeger").unwrap().required_npc, "mechanic");
    }

    #[test]
    fn test_invalid_group_rejected() {
        let result = TrackerConfig::from_toml_str(
            r#"
[[exclusive_groups]]
id = "lonely"
quests = ["savior"]
"#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = TrackerConfig::from_toml_str("catalog_path = [");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
