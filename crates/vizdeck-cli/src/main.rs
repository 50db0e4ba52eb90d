//! Vizdeck demo shell entry point

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use vizdeck_cli::{app::VizdeckApp, cli::Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let data_dir = resolve_data_dir(&cli);
    info!("starting vizdeck demo shell");

    let app = VizdeckApp::new(data_dir, cli.ephemeral)?;
    app.run_shell().await
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// The directory holding the device-bound guest token
fn resolve_data_dir(cli: &Cli) -> PathBuf {
    if let Some(dir) = &cli.data_dir {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vizdeck")
}
