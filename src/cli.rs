//! Command-line interface for scribed
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Streaming transcription gateway
#[derive(Parser, Debug)]
#[command(
    name = "scribed",
    version,
    about = "Streaming transcription gateway"
)]
pub struct Cli {
    /// Subcommand to execute (defaults to serve)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: partial hypotheses, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the gateway (default when no command is given)
    Serve {
        /// Listen port override
        #[arg(long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// Transcribe one file of raw 16-bit PCM audio and print the transcript
    Transcribe {
        /// Audio file to transcribe
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Load the configuration and print the effective values
    CheckConfig,
}
