//! LayerLens CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use layerlens_cli::commands::{dispatch, Cli};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Recoverable data gaps surface as notes inside the report and exit 0.
    // Structural failures (insufficient history, unreadable cache) land
    // here after a partial report was written, and exit non-zero.
    if let Err(e) = dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
