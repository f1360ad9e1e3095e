//! Taskboard backend server
//!
//! REST backend for tasks, comments, checklists, and the
//! task-dependency graph.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use taskboard::api;
use taskboard::cli::Cli;
use taskboard::config::Config;
use taskboard::db::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load_or_default();

    if let Some(db_path) = cli.db {
        config.server.db_path = db_path;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    config.ensure_db_dir()?;
    let db = Arc::new(Database::open(&config.server.db_path)?);
    info!("Opened database at {}", config.server.db_path.display());

    api::start_server(db, config.server.port).await
}
