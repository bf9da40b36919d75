//! Benchmark configuration derived from CLI arguments

use super::cli::CliArgs;
use std::fmt;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Resolved server address
#[derive(Debug, Clone)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Complete benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    // Connection
    pub address: ServerAddress,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    pub ssl: bool,

    // Workload
    pub sql: String,
    pub workers: usize,
    pub params_path: Option<PathBuf>,

    // Output
    pub log_path: Option<PathBuf>,
    pub quiet: bool,
    pub verbose: bool,
}

impl BenchmarkConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self, String> {
        args.validate()?;

        Ok(Self {
            address: ServerAddress {
                host: args.host.clone(),
                port: args.port,
            },
            database: args.database.clone(),
            user: args.user.clone(),
            password: args.password.clone().filter(|p| !p.is_empty()),
            ssl: args.ssl,

            sql: args.effective_sql(),
            workers: args.workers as usize,
            params_path: args.params.clone(),

            log_path: args.log.clone(),
            quiet: args.quiet,
            verbose: args.verbose,
        })
    }

    /// libpq-style key/value connection string
    ///
    /// With SSL on, the session must be encrypted but the server certificate
    /// is not verified.
    pub fn connection_string(&self) -> String {
        let mut conn = format!(
            "user={} dbname={} host={} port={}",
            self.user, self.database, self.address.host, self.address.port
        );
        if let Some(ref password) = self.password {
            let _ = write!(conn, " password={}", password);
        }
        if self.ssl {
            conn.push_str(" sslmode=require");
        } else {
            conn.push_str(" sslmode=disable");
        }
        conn
    }
}
