pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ballot")]
#[command(about = "Resolve, fetch and inspect ballot media stored on IPFS")]
pub struct Args {
    /// Path to the ballot config directory (defaults to ~/.ballot)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: crate::Command,
}
