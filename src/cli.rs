//! Command-line interface.

use clap::Parser;
use std::path::PathBuf;

/// Task-management backend with an acyclic dependency graph.
#[derive(Debug, Parser)]
#[command(name = "taskboard", version, about)]
pub struct Cli {
    /// Path to the SQLite database file (overrides config).
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Port to listen on (overrides config).
    #[arg(long)]
    pub port: Option<u16>,
}
