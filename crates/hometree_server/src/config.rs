//! Server configuration.

use clap::Parser;
use hometree_core::{default_log_level, DbTarget};

/// hometree HTTP server command line arguments.
#[derive(Debug, Parser)]
#[command(name = "hometree")]
#[command(about = "CRUD API for users, houses, rooms and devices")]
pub struct Args {
    /// Address to listen on for HTTP requests.
    #[arg(short, long, default_value = "127.0.0.1:8000")]
    pub listen: String,

    /// SQLite database file, or `:memory:` for a throwaway store.
    #[arg(short, long, env = "HOMETREE_DATABASE", default_value = "hometree.db")]
    pub database: String,

    /// Log level (trace|debug|info|warn|error). Defaults by build mode.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files. Logs to stderr when unset.
    #[arg(long)]
    pub log_dir: Option<String>,

    /// Drop all stored entities before serving.
    #[arg(long)]
    pub reset_database: bool,
}

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub database: DbTarget,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub reset_database: bool,
}

impl From<&Args> for ServerConfig {
    fn from(args: &Args) -> Self {
        Self {
            listen_addr: args.listen.clone(),
            database: DbTarget::parse(&args.database),
            log_level: args
                .log_level
                .clone()
                .unwrap_or_else(|| default_log_level().to_string()),
            log_dir: args.log_dir.clone(),
            reset_database: args.reset_database,
        }
    }
}
