//! CLI module - Command-line interface for tubewatch
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tubewatch - keyword video collector
/// Polls the YouTube search API into per-keyword collections and serves them back
#[derive(Parser)]
#[command(name = "tubewatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to load instead of the default search paths
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll for new videos matching a keyword and store them
    #[command(alias = "worker")]
    Ingest {
        /// Search keyword; also the name of the collection written to
        keyword: String,
        /// Run a single poll cycle, wait for its write and exit
        #[arg(long)]
        once: bool,
    },

    /// Serve the paginated video API
    #[command(alias = "server")]
    Serve {
        /// Port to listen on (overrides [server].port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
