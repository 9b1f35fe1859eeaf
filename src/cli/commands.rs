//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// posbridge - incremental POS ingestion connector
#[derive(Parser, Debug)]
#[command(name = "posbridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Connector configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Inline configuration JSON (takes precedence over --config)
    #[arg(long, global = true)]
    pub config_json: Option<String>,

    /// Pretty-print response JSON
    #[arg(short, long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands, one per protocol operation
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate credentials against the source API
    Test,

    /// Resolve and print entity schemas
    Schema {
        /// Entities to resolve (comma-separated, empty = all configured)
        #[arg(long)]
        entities: Option<String>,
    },

    /// Run the extraction pipeline
    Sync {
        /// Entities to sync (comma-separated, empty = all configured)
        #[arg(long)]
        entities: Option<String>,

        /// Cursor state file (JSON) from the previous invocation
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Inline cursor state JSON (takes precedence over --state)
        #[arg(long)]
        state_json: Option<String>,
    },

    /// List configured entities and their aggregates
    Entities,
}
