//! Configuration for the SkillSync notification client
//!
//! Handles loading, saving, and managing configuration for both project-level
//! and global setups. Project configurations take precedence over global ones.
//!
//! # Configuration Hierarchy
//!
//! 1. **Project-level**: `.skillsync/notify.toml` in the project root
//! 2. **Global**: `<user config dir>/skillsync/notify.toml`

use crate::errors::{SyncError, SyncResult};
use crate::model::{DEFAULT_POLL_INTERVAL, DEFAULT_RECENT_LIMIT, DEFAULT_TOAST_DURATION};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub toast: ToastConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// REST backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the SkillSync backend, e.g. `http://localhost:5000/api`.
    pub base_url: String,
    pub auth_token: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Notification poller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

/// Toast queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToastConfig {
    #[serde(default = "default_toast_duration_ms")]
    pub default_duration_ms: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_recent_limit() -> usize {
    DEFAULT_RECENT_LIMIT
}

fn default_toast_duration_ms() -> u64 {
    DEFAULT_TOAST_DURATION.as_millis() as u64
}

impl Default for PollerConfig {
    fn default() -> Self {
        PollerConfig {
            interval_ms: default_interval_ms(),
            recent_limit: default_recent_limit(),
        }
    }
}

impl Default for ToastConfig {
    fn default() -> Self {
        ToastConfig {
            default_duration_ms: default_toast_duration_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api: ApiConfig {
                base_url: "http://localhost:5000/api".to_string(),
                auth_token: None,
                timeout_secs: Some(30),
            },
            poller: PollerConfig::default(),
            toast: ToastConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl ToastConfig {
    pub fn default_duration(&self) -> Duration {
        Duration::from_millis(self.default_duration_ms)
    }
}

/// Loads and persists [`Config`] for a project or the current user.
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Create a manager, preferring project-level config when it exists,
    /// then global, then creating a fresh config at the requested scope.
    pub fn new(project_path: Option<PathBuf>) -> SyncResult<Self> {
        if let Some(ref path) = project_path {
            let project_config_path = Self::config_path_for(Some(path.clone()))?;
            if project_config_path.exists() {
                let config = Self::load_or_create(&project_config_path)?;
                return Ok(ConfigManager {
                    config_path: project_config_path,
                    config,
                });
            }

            // A missing home directory only matters when we actually need
            // the global path, so a probe failure falls through to project
            // config creation.
            if let Ok(global_config_path) = Self::config_path_for(None) {
                if global_config_path.exists() {
                    let config = Self::load_or_create(&global_config_path)?;
                    return Ok(ConfigManager {
                        config_path: global_config_path,
                        config,
                    });
                }
            }

            let config = Self::load_or_create(&project_config_path)?;
            return Ok(ConfigManager {
                config_path: project_config_path,
                config,
            });
        }

        let config_path = Self::config_path_for(None)?;
        let config = Self::load_or_create(&config_path)?;
        Ok(ConfigManager {
            config_path,
            config,
        })
    }

    /// Always create or use project-level configuration, even if a global
    /// config exists. Used by explicit `init` with a project path.
    pub fn new_project_config(project_path: PathBuf) -> SyncResult<Self> {
        let config_path = Self::config_path_for(Some(project_path))?;
        let config = Self::load_or_create(&config_path)?;
        Ok(ConfigManager {
            config_path,
            config,
        })
    }

    /// Resolve the config file path for a project, or the global path.
    pub fn config_path_for(project_path: Option<PathBuf>) -> SyncResult<PathBuf> {
        match project_path {
            Some(path) => Ok(path.join(".skillsync").join("notify.toml")),
            None => {
                let base = BaseDirs::new()
                    .ok_or_else(|| SyncError::config("could not determine user directories"))?;
                Ok(base.config_dir().join("skillsync").join("notify.toml"))
            }
        }
    }

    fn load_or_create(path: &Path) -> SyncResult<Config> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .map_err(|e| SyncError::io_with_source(path, "read config", e))?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            let config = Config::default();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| SyncError::io_with_source(parent, "create config dir", e))?;
            }
            let contents = toml::to_string_pretty(&config)?;
            fs::write(path, contents)
                .map_err(|e| SyncError::io_with_source(path, "write config", e))?;
            Ok(config)
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn save(&self) -> SyncResult<()> {
        let contents = toml::to_string_pretty(&self.config)?;
        fs::write(&self.config_path, contents)
            .map_err(|e| SyncError::io_with_source(&self.config_path, "write config", e))?;
        Ok(())
    }

    /// Look up a dotted configuration key.
    pub fn get_value(&self, key: &str) -> SyncResult<String> {
        match key {
            "api.base_url" => Ok(self.config.api.base_url.clone()),
            "api.auth_token" => Ok(self.config.api.auth_token.clone().unwrap_or_default()),
            "api.timeout_secs" => Ok(self
                .config
                .api
                .timeout_secs
                .map(|t| t.to_string())
                .unwrap_or_default()),
            "poller.interval_ms" => Ok(self.config.poller.interval_ms.to_string()),
            "poller.recent_limit" => Ok(self.config.poller.recent_limit.to_string()),
            "toast.default_duration_ms" => Ok(self.config.toast.default_duration_ms.to_string()),
            "log_level" => Ok(self.config.log_level.clone()),
            _ => Err(SyncError::UnknownConfigKey {
                key: key.to_string(),
            }),
        }
    }

    /// Set a dotted configuration key. The caller is responsible for
    /// calling [`save`](Self::save) afterwards.
    pub fn set_value(&mut self, key: &str, value: &str) -> SyncResult<()> {
        let invalid = || SyncError::InvalidConfigValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "api.base_url" => self.config.api.base_url = value.to_string(),
            "api.auth_token" => {
                self.config.api.auth_token = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
            "api.timeout_secs" => {
                self.config.api.timeout_secs = Some(value.parse().map_err(|_| invalid())?)
            }
            "poller.interval_ms" => {
                self.config.poller.interval_ms = value.parse().map_err(|_| invalid())?
            }
            "poller.recent_limit" => {
                self.config.poller.recent_limit = value.parse().map_err(|_| invalid())?
            }
            "toast.default_duration_ms" => {
                self.config.toast.default_duration_ms = value.parse().map_err(|_| invalid())?
            }
            "log_level" => self.config.log_level = value.to_string(),
            _ => {
                return Err(SyncError::UnknownConfigKey {
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.poller.interval_ms, 5000);
        assert_eq!(config.poller.recent_limit, 20);
        assert_eq!(config.toast.default_duration_ms, 5000);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_create_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::new_project_config(temp_dir.path().to_path_buf()).unwrap();
        assert!(manager.config_path().exists());

        let reloaded = ConfigManager::new_project_config(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(
            reloaded.config().api.base_url,
            manager.config().api.base_url
        );
    }

    #[test]
    fn test_get_set_value() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = ConfigManager::new_project_config(temp_dir.path().to_path_buf()).unwrap();

        manager.set_value("poller.interval_ms", "2500").unwrap();
        assert_eq!(manager.get_value("poller.interval_ms").unwrap(), "2500");

        manager
            .set_value("api.base_url", "http://example.com/api")
            .unwrap();
        assert_eq!(
            manager.get_value("api.base_url").unwrap(),
            "http://example.com/api"
        );

        assert!(manager.set_value("poller.interval_ms", "fast").is_err());
        assert!(manager.set_value("nope.key", "1").is_err());
        assert!(manager.get_value("nope.key").is_err());
    }

    #[test]
    fn test_partial_config_parses_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            base_url = "http://localhost:9000/api"
            "#,
        )
        .unwrap();
        assert_eq!(config.poller.interval_ms, 5000);
        assert_eq!(config.toast.default_duration_ms, 5000);
    }
}
