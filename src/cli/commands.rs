//! Command definitions and structures for the CLI
//!
//! All clap-based command line argument definitions, including the main CLI
//! structure and all subcommands.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure
#[derive(Parser)]
#[command(name = "skillsync-notify")]
#[command(about = "SkillSync notification polling and toast delivery CLI")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project path for project-level configuration
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize configuration
    Init {
        /// Initialize global configuration (default is project-level)
        #[arg(short, long)]
        global: bool,

        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show the current unread notification count
    Unread,

    /// List recent notifications
    Recent {
        /// Maximum number of notifications to fetch
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print raw JSON instead of formatted lines
        #[arg(long)]
        json: bool,
    },

    /// Mark a single notification as read
    MarkRead {
        /// Notification id
        id: String,
    },

    /// Mark every notification as read
    MarkAllRead,

    /// Poll for notification summaries until interrupted
    Watch {
        /// Polling interval in milliseconds (overrides configuration)
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

/// Configuration management actions
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get configuration value
    Get {
        /// Configuration key (e.g. api.base_url)
        key: String,
    },

    /// Set configuration value
    Set {
        /// Configuration key (e.g. api.base_url)
        key: String,
        /// Value to set
        value: String,
    },
}
