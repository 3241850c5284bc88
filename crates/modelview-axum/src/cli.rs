//! Command-line interface of the `modelview` binary.

use clap::{Parser, Subcommand};

use crate::bootstrap::ServerConfig;

/// Serve CRUD views over a `SQLite` database.
#[derive(Parser)]
#[command(name = "modelview")]
#[command(about = "Serve CRUD views over a SQLite database")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides MODELVIEW_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// SQLite connection URL (overrides MODELVIEW_DATABASE_URL)
        #[arg(long = "database-url")]
        database_url: Option<String>,
    },
}

impl Commands {
    /// Apply command-line overrides on top of `config`.
    pub fn apply(&self, mut config: ServerConfig) -> ServerConfig {
        match self {
            Self::Serve { port, database_url } => {
                if let Some(port) = port {
                    config.port = *port;
                }
                if let Some(url) = database_url {
                    config.database_url.clone_from(url);
                }
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_overrides_config() {
        let cli = Cli::parse_from(["modelview", "serve", "--port", "9999"]);
        let command = cli.command.unwrap();
        let config = command.apply(ServerConfig::with_defaults());
        assert_eq!(config.port, 9999);
        assert_eq!(
            config.database_url,
            ServerConfig::with_defaults().database_url
        );
    }
}
