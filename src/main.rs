use anyhow::Result;

use skillsync_notify::cli::CliApp;

#[tokio::main]
async fn main() -> Result<()> {
    CliApp::run().await
}
