//! CLI module providing command-line interface functionality
//!
//! Handles argument parsing and routing to command handlers.

pub mod commands;
pub mod context;
pub mod handlers;

use anyhow::Result;
use clap::Parser;

pub use commands::{Cli, Commands, ConfigAction};
pub use context::CliContext;
pub use handlers::CommandHandler;

/// Main CLI application entry point.
pub struct CliApp;

impl CliApp {
    /// Parse command line arguments and execute the requested command.
    pub async fn run() -> Result<()> {
        let cli = Cli::parse();

        let context = CliContext::new(cli.project.clone(), cli.verbose)?;
        context.init_logging()?;

        let handler = CommandHandler::new(context);
        handler.handle_command(cli.command).await
    }
}
