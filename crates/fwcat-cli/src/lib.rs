//! fwcat - firmware catalog CLI
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Browse a firmware manifest, resolve package URLs, and download, unpack and
//! verify packages.
//!
//! The manifest is given with `--manifest` or `FWCAT_MANIFEST`, as either an
//! `http(s)://` URL or a local file path.

pub mod cmd;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "fwcat")]
#[command(author, version, about = "fwcat - firmware catalog browser and downloader")]
pub struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Manifest URL or file path
    #[arg(long, global = true, env = "FWCAT_MANIFEST")]
    pub manifest: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, global = true, env = "FWCAT_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Timeout applied to the HTTP client.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

/// Model filter options shared by listing commands.
#[derive(Debug, Clone, Default, Args)]
pub struct ModelArgs {
    /// Keep releases for this model (repeatable, `*` matches all)
    #[arg(long = "model", short = 'm')]
    pub models: Vec<String>,

    /// Keep releases with a model matching this glob
    #[arg(long = "match")]
    pub pattern: Option<String>,

    /// Invert the model filters
    #[arg(long)]
    pub exclude: bool,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show releases in the manifest, grouped by branch
    List {
        /// Model filters
        #[command(flatten)]
        filter: ModelArgs,
        /// Only show this branch
        #[arg(long, short)]
        branch: Option<String>,
    },
    /// Show the most recent release
    Latest {
        /// Model filters
        #[command(flatten)]
        filter: ModelArgs,
        /// Only consider this branch
        #[arg(long, short)]
        branch: Option<String>,
    },
    /// Print the package URL of a release
    Url {
        /// Release version (e.g. 1_4_2)
        version: String,
    },
    /// Download, unpack and verify a release
    Download {
        /// Release version (e.g. 1_4_2)
        version: String,
        /// Directory to unpack into
        #[arg(long, short, default_value = ".")]
        dest: PathBuf,
    },
    /// List files and models in a local package
    Entries {
        /// Path to a .tar.gz package
        file: PathBuf,
    },
}
