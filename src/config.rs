use crate::error::{ReleaseError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "releasetrain.toml";

/// Represents the complete configuration for release-train.
///
/// Contains branch layout, publish polling, install command and behavior options.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub branches: BranchesConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub install: InstallConfig,

    #[serde(default)]
    pub behavior: BehaviorConfig,
}

fn default_main() -> String {
    "main".to_string()
}

fn default_next() -> String {
    "next".to_string()
}

fn default_release_prefix() -> String {
    "release".to_string()
}

/// Branch layout of the monorepo.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BranchesConfig {
    #[serde(default = "default_main")]
    pub main: String,

    #[serde(default = "default_next")]
    pub next: String,

    /// Release branches are named `{release_prefix}/{name}/{majorMinor}`
    #[serde(default = "default_release_prefix")]
    pub release_prefix: String,
}

impl Default for BranchesConfig {
    fn default() -> Self {
        BranchesConfig {
            main: default_main(),
            next: default_next(),
            release_prefix: default_release_prefix(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_max_wait_secs() -> u64 {
    30 * 60
}

fn default_probe_command() -> String {
    "npm view {name}@{version} version".to_string()
}

/// Publish confirmation polling.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PublishConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,

    /// Command that succeeds once `{name}@{version}` is visible in the registry
    #[serde(default = "default_probe_command")]
    pub probe_command: String,
}

impl PublishConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        PublishConfig {
            poll_interval_secs: default_poll_interval_secs(),
            max_wait_secs: default_max_wait_secs(),
            probe_command: default_probe_command(),
        }
    }
}

fn default_install_command() -> String {
    "pnpm install --no-frozen-lockfile".to_string()
}

/// Dependency installation after ranges change.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct InstallConfig {
    #[serde(default = "default_install_command")]
    pub command: String,
}

impl Default for InstallConfig {
    fn default() -> Self {
        InstallConfig {
            command: default_install_command(),
        }
    }
}

fn default_remote() -> String {
    "origin".to_string()
}

/// Configuration for behavior customization.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BehaviorConfig {
    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default)]
    pub skip_type_tests: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        BehaviorConfig {
            remote: default_remote(),
            skip_type_tests: false,
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `releasetrain.toml` in current directory
/// 3. `.releasetrain.toml` in the user config directory
/// 4. Default configuration if no file found
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)?
    } else if Path::new(CONFIG_FILE_NAME).exists() {
        fs::read_to_string(CONFIG_FILE_NAME)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(format!(".{}", CONFIG_FILE_NAME));
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| ReleaseError::config(format!("Invalid {}: {}", CONFIG_FILE_NAME, e)))?;
    Ok(config)
}
