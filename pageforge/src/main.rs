use anyhow::Result;
use clap::Parser;
use pageforge::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing for the server.
    tracing_subscriber::fmt::init();
    tracing::info!("Server startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("Server exited cleanly"),
        Err(e) => tracing::error!(error = %e, "Server exited with error"),
    }
    result
}
