//! pg-query-bench library
//!
//! Replays parameterized queries from a CSV stream against PostgreSQL,
//! spreads them over a fixed pool of workers by a stable key hash, and
//! reports latency statistics.

pub mod benchmark;
pub mod client;
pub mod config;
pub mod dataset;
pub mod metrics;
pub mod utils;
