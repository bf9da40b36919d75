//! Command-line argument parsing

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Upper bound on concurrent workers (one database connection each)
pub const MAX_WORKERS: u32 = 200;

/// Query used when `--sql` is not given
pub const DEFAULT_SQL: &str = "
    SELECT time_bucket('1 minutes', ts) bucket, COUNT(*) cnt, MAX(usage) max, MIN(usage) min
    FROM cpu_usage
    WHERE host = $1 AND ts >= $2 AND ts <= $3
    GROUP BY bucket
    ORDER BY bucket, max DESC;";

/// Benchmark parameterized query latency against PostgreSQL / TimescaleDB
#[derive(Parser, Debug, Clone)]
#[command(name = "pg-query-bench")]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    // ===== Workload =====
    /// SQL query to execute (uses provided params as $1, $2, ...)
    #[arg(long = "sql")]
    pub sql: Option<String>,

    /// Number of concurrent workers
    #[arg(long = "workers", default_value_t = 1)]
    pub workers: u32,

    /// CSV file containing parameters for the query (default reads stdin)
    #[arg(long = "params")]
    pub params: Option<PathBuf>,

    // ===== Connection Options =====
    /// Database server host or socket directory
    #[arg(long = "host", default_value = "localhost")]
    pub host: String,

    /// Database server port number
    #[arg(long = "port", default_value_t = 5432)]
    pub port: u16,

    /// Database name
    #[arg(long = "database", default_value = "homework")]
    pub database: String,

    /// Connect as specified database user
    #[arg(long = "user", default_value = "postgres")]
    pub user: String,

    /// Connect using a specified password (default none)
    #[arg(long = "password")]
    pub password: Option<String>,

    /// Enable use of SSL mode (`--ssl false` to disable)
    #[arg(long = "ssl", action = ArgAction::Set, default_value_t = true)]
    pub ssl: bool,

    // ===== Output Options =====
    /// Write a detailed per-query log to this file (default none)
    #[arg(long = "log")]
    pub log: Option<PathBuf>,

    /// Quiet mode (errors only, no progress display)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("--workers must be at least 1".to_string());
        }

        if self.workers > MAX_WORKERS {
            return Err(format!("number of workers is limited to {}", MAX_WORKERS));
        }

        if let Some(ref params) = self.params {
            if !params.exists() {
                return Err(format!("params file {} does not exist", params.display()));
            }
        }

        if self.quiet && self.verbose {
            return Err("--quiet and --verbose are mutually exclusive".to_string());
        }

        Ok(())
    }

    /// SQL to benchmark, falling back to the default query
    pub fn effective_sql(&self) -> String {
        match self.sql {
            Some(ref sql) if !sql.trim().is_empty() => sql.clone(),
            _ => DEFAULT_SQL.to_string(),
        }
    }
}
