//! Configuration for fixture generation and validation
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (zdd.toml)
//! - Environment variables (ZDD__*)
//!
//! ## Example config file (zdd.toml):
//! ```toml
//! [fixtures]
//! path = "tests/fixtures/messages"
//! codec = "notation"
//!
//! [classes]
//! path = "config/message-classes.json"
//!
//! [validation]
//! fail_fast = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::codec::Codec;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZddConfig {
    /// Where recorded snapshots are stored
    #[serde(default)]
    pub fixtures: FixturesConfig,

    /// Where live class declarations are described
    #[serde(default)]
    pub classes: ClassesConfig,

    /// Validation behaviour
    #[serde(default)]
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixturesConfig {
    /// Root directory of the fixture store
    #[serde(default = "default_fixtures_path")]
    pub path: PathBuf,

    /// Encoding of stored snapshots
    #[serde(default)]
    pub codec: Codec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassesConfig {
    /// JSON file listing live class declarations
    #[serde(default = "default_classes_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Stop at the first incompatible fixture
    #[serde(default)]
    pub fail_fast: bool,
}

fn default_fixtures_path() -> PathBuf {
    PathBuf::from("fixtures/messages")
}

fn default_classes_path() -> PathBuf {
    PathBuf::from("message-classes.json")
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            path: default_fixtures_path(),
            codec: Codec::default(),
        }
    }
}

impl Default for ClassesConfig {
    fn default() -> Self {
        Self {
            path: default_classes_path(),
        }
    }
}

impl ZddConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        for location in ["zdd.toml", ".zdd.toml", "config/zdd.toml"] {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "zdd", "zdd-messages") {
            let xdg_config = dirs.config_dir().join("zdd.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("ZDD")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)
    }

    pub fn to_toml(&self) -> std::io::Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ZddConfig::default();
        assert_eq!(config.fixtures.codec, Codec::Notation);
        assert_eq!(config.fixtures.path, PathBuf::from("fixtures/messages"));
        assert!(!config.validation.fail_fast);
    }

    #[test]
    fn test_serialize_config() {
        let toml_str = ZddConfig::default().to_toml().unwrap();
        assert!(toml_str.contains("[fixtures]"));
        assert!(toml_str.contains("codec = \"notation\""));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[fixtures]\npath = \"snapshots\"\ncodec = \"json\"\n\n[validation]\nfail_fast = true\n",
        )
        .unwrap();

        let config = ZddConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.fixtures.codec, Codec::Json);
        assert_eq!(config.fixtures.path, PathBuf::from("snapshots"));
        assert!(config.validation.fail_fast);
    }
}
