//! `modelview` binary - the composition root.
//!
//! Serves the demo notes view over the configured `SQLite` database.

use std::sync::Arc;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use modelview_axum::cli::{Cli, Commands};
use modelview_axum::demo::NoteView;
use modelview_axum::{ServerConfig, start_server};
use modelview_core::{ModelView, NoopRenderer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = command.apply(ServerConfig::from_env()?);
    match command {
        Commands::Serve { .. } => {
            let views: Vec<Arc<dyn ModelView>> = vec![Arc::new(NoteView::new())];
            start_server(config, views, Arc::new(NoopRenderer)).await?;
        }
    }

    Ok(())
}
