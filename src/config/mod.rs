// ABOUTME: Configuration types and parsing for hoist.yml.
// ABOUTME: Handles YAML parsing, config discovery, and the raw definition sent with releases.

mod build;
mod definition;
mod deserialize;
mod kv;
mod resolve;
mod settings;

pub use build::BuildConfig;
pub use definition::Definition;
pub use kv::parse_kv_pairs;
pub use resolve::{ConfigSource, determine_app_config};
pub use settings::{DEFAULT_API_URL, DEFAULT_GATEWAY_HOST, DEFAULT_REGISTRY, Settings};

use crate::error::{Error, Result};
use crate::types::AppName;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "hoist.yml";
pub const CONFIG_FILENAME_ALT: &str = "hoist.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".hoist/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: Option<AppName>,

    #[serde(default)]
    pub build: Option<BuildConfig>,

    #[serde(default, deserialize_with = "deserialize::deserialize_string_map")]
    pub env: HashMap<String, String>,

    #[serde(default)]
    pub deploy: DeploySection,

    /// File this config was loaded from; `None` when fetched from the platform.
    #[serde(skip)]
    pub path: Option<PathBuf>,

    /// The whole document, forwarded verbatim when creating a release.
    #[serde(skip)]
    pub definition: Definition,
}

/// Settings for following a release once it has been submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploySection {
    /// Strategy requested for new releases; `--strategy` wins over it.
    #[serde(default)]
    pub strategy: Option<String>,

    #[serde(default = "default_wait_timeout", with = "humantime_serde")]
    pub wait_timeout: Duration,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for DeploySection {
    fn default() -> Self {
        Self {
            strategy: None,
            wait_timeout: default_wait_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_wait_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let document: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let mut config: Config = serde_yaml::from_value(document.clone())?;
        config.definition = Definition::from_yaml(&document)?;
        Ok(config)
    }

    /// Build a config from a definition held by the platform.
    pub fn from_definition(definition: Definition) -> Result<Self> {
        let mut config: Config = serde_json::from_value(definition.to_value())
            .map_err(|e| Error::InvalidConfig(format!("remote app config: {e}")))?;
        config.definition = definition;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Find and load the config in `dir`, if there is one.
    pub fn discover(dir: &Path) -> Result<Option<Self>> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path).map(Some);
            }
        }

        Ok(None)
    }

    /// Apply environment overrides to both the typed view and the definition.
    pub fn set_env(&mut self, vars: HashMap<String, String>) {
        self.definition.merge_env(&vars);
        self.env.extend(vars);
    }

    /// Image reference declared in the build section.
    pub fn build_image(&self) -> Option<&str> {
        self.build
            .as_ref()
            .and_then(|b| b.image.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Dockerfile path as written in the build section (relative to the config file).
    pub fn dockerfile(&self) -> Option<&str> {
        self.build
            .as_ref()
            .and_then(|b| b.dockerfile.as_deref())
            .filter(|s| !s.is_empty())
    }

    pub fn docker_build_target(&self) -> Option<&str> {
        self.build
            .as_ref()
            .and_then(|b| b.build_target.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Directory the config was loaded from; relative build paths resolve against it.
    pub fn base_dir(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_a_valid_config() {
        let config = Config::from_yaml("{}").unwrap();
        assert!(config.app.is_none());
        assert!(config.build.is_none());
        assert!(config.definition.is_empty());
        assert_eq!(config.deploy.wait_timeout, Duration::from_secs(300));
    }

    #[test]
    fn deploy_section_parses_humantime_durations() {
        let config = Config::from_yaml(
            r#"
deploy:
  strategy: rolling
  wait_timeout: 10m
  poll_interval: 500ms
"#,
        )
        .unwrap();
        assert_eq!(config.deploy.strategy.as_deref(), Some("rolling"));
        assert_eq!(config.deploy.wait_timeout, Duration::from_secs(600));
        assert_eq!(config.deploy.poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn blank_build_fields_are_treated_as_absent() {
        let config = Config::from_yaml(
            r#"
build:
  image: ""
  dockerfile: ""
"#,
        )
        .unwrap();
        assert!(config.build_image().is_none());
        assert!(config.dockerfile().is_none());
    }

    #[test]
    fn base_dir_is_the_config_files_parent() {
        let mut config = Config::from_yaml("app: web").unwrap();
        config.path = Some(PathBuf::from("/proj/hoist.yml"));
        assert_eq!(config.base_dir(), Some(Path::new("/proj")));
    }
}
