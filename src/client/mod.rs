//! Database client layer
//!
//! This module provides:
//! - `Connector` / `QuerySession`: the seam between workers and the backend
//! - `PgConnector`: PostgreSQL implementation (one connection per worker)

pub mod pg;

use std::time::Duration;

use crate::utils::Result;

pub use pg::{PgConnector, PgSession, PING_SQL};

/// One open backend connection, owned by a single worker for its lifetime.
///
/// The connection is released when the session is dropped.
pub trait QuerySession {
    /// Run the benchmarked query with `params` as `$1, $2, ...` and return
    /// the elapsed wall-clock time.
    fn timed_query(&mut self, params: &[String]) -> Result<Duration>;
}

/// Opens sessions for workers
pub trait Connector: Send + Sync {
    type Session: QuerySession;

    fn connect(&self) -> Result<Self::Session>;
}
