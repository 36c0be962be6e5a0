use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::domain::token::DEFAULT_GENERATED_LEN;

/// Single-use access code dispenser backed by a SQLite token pool
#[derive(Parser, Debug, Clone)]
#[command(name = "tokenpool", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "TOKENPOOL_CONFIG", default_value = "tokenpool.toml", global = true)]
    pub config: PathBuf,

    /// SQLite URL of the token pool (overrides storage.url)
    #[arg(long, env = "TOKENPOOL_DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Server host address
    #[arg(long, env = "TOKENPOOL_HOST", global = true)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "TOKENPOOL_PORT", global = true)]
    pub port: Option<u16>,

    /// Log filter, e.g. "info" or "tokenpool=debug,sqlx=warn" (falls back to RUST_LOG, then "info")
    #[arg(long, env = "TOKENPOOL_LOG", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve the dispense endpoint over HTTP (default)
    Serve,

    /// Generate new random codes, add them to the pool and print them
    Provision {
        /// How many codes to generate (at most 100000 per run)
        #[arg(short = 'n', long)]
        count: usize,

        /// Hex digits per code
        #[arg(short, long, default_value_t = DEFAULT_GENERATED_LEN)]
        length: usize,
    },

    /// Add codes from a file, one per line ('#' starts a comment line)
    Import {
        /// File to read codes from
        file: PathBuf,
    },

    /// Print how many codes are left in the pool
    Count,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }

    /// Log filter from `--log-level`/`TOKENPOOL_LOG`, then `RUST_LOG`, then `info`
    pub fn env_filter(&self) -> EnvFilter {
        self.log_level
            .as_deref()
            .and_then(|level| EnvFilter::try_new(level).ok())
            .or_else(|| EnvFilter::try_from_default_env().ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    }
}

/// Pull codes out of an import file: trims each line, skips blanks and comments
pub fn parse_import_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
