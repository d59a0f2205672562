//! xray-sync CLI binary.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use xray_sync::cli::Cli;

/// Main entry point for the xray-sync CLI.
///
/// Uses tokio's current_thread runtime; all work is sequential network I/O.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Example: RUST_LOG=xray_sync=debug xray-sync sync features/a.feature
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("xray_sync=info,xray_gherkin=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!("Starting xray-sync CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("xray-sync CLI completed successfully");
    Ok(())
}
