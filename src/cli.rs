use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "llhls")]
#[command(author, version, about = "Live low-latency HLS packager")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Package synthetic streams and write the result to a directory
    Simulate {
        /// Output directory
        #[arg(short, long, default_value = "llhls-out")]
        output: PathBuf,

        /// Seconds of media to generate
        #[arg(short, long, default_value = "10")]
        seconds: u64,

        /// Pace packets at wall-clock speed
        #[arg(long)]
        realtime: bool,

        /// Add an AAC track to every rendition
        #[arg(long)]
        audio: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
