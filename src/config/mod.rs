//! Configuration module

pub mod benchmark_config;
pub mod cli;

pub use benchmark_config::{BenchmarkConfig, ServerAddress};
pub use cli::{CliArgs, DEFAULT_SQL, MAX_WORKERS};
