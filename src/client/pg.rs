//! PostgreSQL backend
//!
//! Parameters arrive as CSV strings and the query decides their types
//! (`host = $1 AND ts >= $2`), so they are sent in text format and left for
//! the server to parse, instead of being bound to Rust types.

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use postgres::config::Host;
use postgres::types::{to_sql_checked, Format, IsNull, ToSql, Type};
use postgres::{Client, Config};
use postgres_native_tls::MakeTlsConnector;

use super::{Connector, QuerySession};
use crate::utils::{BenchmarkError, ConnectionError, Result};

/// Cheap query used to verify connectivity before a run
pub const PING_SQL: &str = "SELECT 'DBD::Pg ping test'";

const DEFAULT_PORT: u16 = 5432;

/// Query parameter sent verbatim in text format
#[derive(Debug)]
struct TextParam<'a>(&'a str);

impl ToSql for TextParam<'_> {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn Error + Sync + Send>> {
        out.extend_from_slice(self.0.as_bytes());
        Ok(IsNull::No)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, _ty: &Type) -> Format {
        Format::Text
    }

    to_sql_checked!();
}

/// Opens PostgreSQL connections for workers
#[derive(Clone)]
pub struct PgConnector {
    config: Config,
    tls: MakeTlsConnector,
    sql: Arc<str>,
}

impl PgConnector {
    /// Build a connector from a libpq-style connection string and the query
    /// every session will run.
    pub fn new(connection_string: &str, sql: &str) -> Result<Self> {
        let config: Config = connection_string
            .parse()
            .map_err(|e| BenchmarkError::Config(format!("Invalid connection string: {}", e)))?;

        // sslmode=require semantics: encrypt, but accept any server certificate.
        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(ConnectionError::from)?;

        Ok(Self {
            config,
            tls: MakeTlsConnector::new(tls),
            sql: Arc::from(sql),
        })
    }

    /// First configured host and port, for error messages
    pub fn endpoint(&self) -> (String, u16) {
        let host = match self.config.get_hosts().first() {
            Some(Host::Tcp(host)) => host.clone(),
            Some(other) => format!("{:?}", other),
            None => "localhost".to_string(),
        };
        let port = self
            .config
            .get_ports()
            .first()
            .copied()
            .unwrap_or(DEFAULT_PORT);
        (host, port)
    }

    fn open(&self) -> Result<Client> {
        self.config.connect(self.tls.clone()).map_err(|source| {
            let (host, port) = self.endpoint();
            BenchmarkError::Connection(ConnectionError::ConnectFailed { host, port, source })
        })
    }

    /// Connect once and run `PING_SQL`
    pub fn ping(&self) -> Result<()> {
        let mut client = self.open()?;
        client
            .simple_query(PING_SQL)
            .map_err(ConnectionError::PingFailed)?;
        Ok(())
    }
}

impl Connector for PgConnector {
    type Session = PgSession;

    fn connect(&self) -> Result<PgSession> {
        Ok(PgSession {
            client: self.open()?,
            sql: Arc::clone(&self.sql),
        })
    }
}

/// A single worker's connection
pub struct PgSession {
    client: Client,
    sql: Arc<str>,
}

impl QuerySession for PgSession {
    fn timed_query(&mut self, params: &[String]) -> Result<Duration> {
        let text_params: Vec<TextParam<'_>> = params.iter().map(|p| TextParam(p)).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = text_params
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect();

        let start = Instant::now();
        self.client.query(&*self.sql, &refs)?;
        Ok(start.elapsed())
    }
}
