//! Command-line interface definitions and parsing

use clap::Parser;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Data directory for the device-bound guest token
    #[arg(short, long)]
    pub data_dir: Option<String>,

    /// Keep the guest token in memory only (no disk writes)
    #[arg(long)]
    pub ephemeral: bool,
}
