//! CLI context for shared state
//!
//! Centralizes configuration management and logging setup so the handlers
//! stay decoupled from environment discovery.

use crate::config::ConfigManager;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// CLI execution context containing shared dependencies and configuration.
#[derive(Clone)]
pub struct CliContext {
    pub project_path: Option<PathBuf>,
    pub verbose: bool,
    pub config_manager: Arc<ConfigManager>,
}

impl CliContext {
    /// Create a new CLI context with the specified project path and verbosity.
    pub fn new(project_path: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let resolved_project_path = Self::resolve_project_path(project_path);
        let config_manager = Arc::new(ConfigManager::new(resolved_project_path.clone())?);

        Ok(Self {
            project_path: resolved_project_path,
            verbose,
            config_manager,
        })
    }

    /// Auto-detect a project by looking for `.skillsync/notify.toml` in the
    /// current directory when no explicit path was given.
    fn resolve_project_path(project_path: Option<PathBuf>) -> Option<PathBuf> {
        if let Some(path) = project_path {
            return Some(path);
        }

        if let Ok(current_dir) = std::env::current_dir() {
            let config_path = current_dir.join(".skillsync").join("notify.toml");
            if config_path.exists() {
                return Some(current_dir);
            }
        }

        None
    }

    /// Initialize logging based on verbosity and configuration.
    pub fn init_logging(&self) -> Result<()> {
        let log_level = if self.verbose {
            "debug"
        } else {
            &self.config_manager.config().log_level
        };

        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env().add_directive(
                    log_level
                        .parse()
                        .unwrap_or_else(|_| tracing::Level::INFO.into()),
                ),
            )
            .init();

        if self.verbose {
            tracing::debug!("verbose logging enabled");
            tracing::debug!("project path: {:?}", self.project_path);
            tracing::debug!("config path: {}", self.config_manager.config_path().display());
        }

        Ok(())
    }
}
