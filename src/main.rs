//! pg-query-bench - query latency benchmark for PostgreSQL / TimescaleDB
//!
//! Reads query parameters as CSV, routes each row to a worker by its first
//! field, runs the query on the worker's own connection and prints latency
//! statistics once every row has been processed.

use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use pg_query_bench::benchmark::{BenchmarkWorker, RunCounters, TracingLog, WorkerPool};
use pg_query_bench::client::PgConnector;
use pg_query_bench::config::{BenchmarkConfig, CliArgs};
use pg_query_bench::dataset::CsvRecordSource;

fn setup_logging(config: &BenchmarkConfig) -> Result<()> {
    // A log file gets every per-query line; otherwise stderr only shows
    // problems and the run summary.
    if let Some(ref path) = config.log_path {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false)
            .with_thread_names(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .context("Failed to set tracing subscriber")?;
        return Ok(());
    }

    let level = if config.quiet {
        Level::ERROR
    } else if config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {pos} queries ({per_sec})")
    {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn run() -> Result<()> {
    let args = CliArgs::parse_args();

    let config = BenchmarkConfig::from_cli(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    setup_logging(&config)?;

    info!(
        "pg-query-bench v{}: {} worker(s) against {}/{}",
        env!("CARGO_PKG_VERSION"),
        config.workers,
        config.address,
        config.database
    );

    let connector = Arc::new(PgConnector::new(&config.connection_string(), &config.sql)?);
    connector.ping()?;

    // Open the input before starting any threads so a bad path fails fast.
    let mut source = CsvRecordSource::open(config.params_path.as_deref())?;

    let counters = Arc::new(RunCounters::new());
    let pool = WorkerPool::new(config.workers)?
        .with_counters(Arc::clone(&counters))
        .with_progress(progress_bar(config.quiet));
    let worker = BenchmarkWorker::new(connector, Arc::new(TracingLog), Arc::clone(&counters));

    let start = Instant::now();
    let outcome = pool.run(
        move |feed| {
            let rows = source.for_each_record(|record| {
                if let Err(e) = feed.dispatch(record) {
                    warn!("Dropping record: {}", e);
                }
                Ok(())
            })?;
            debug!("Input exhausted after {} rows", rows);
            Ok(())
        },
        move |ctx| {
            let summary = worker.run(ctx);
            debug!(
                "Worker {} exiting: {} ok, {} failed",
                summary.worker_id, summary.queries_succeeded, summary.queries_failed
            );
        },
    );
    let elapsed = start.elapsed();

    let snapshot = counters.snapshot();
    info!(
        "Dispatched {} records, {} queries finished, {} failed in {:.2?}",
        snapshot.records_dispatched, snapshot.queries_finished, snapshot.queries_failed, elapsed
    );
    if snapshot.connect_failures > 0 {
        warn!("{} worker(s) could not connect", snapshot.connect_failures);
    }

    let results = match outcome {
        Ok(results) => results,
        Err(aborted) => {
            warn!(
                "Run aborted with {} measurement(s) collected",
                aborted.partial.count()
            );
            return Err(aborted.into());
        }
    };

    results.dump_stats().context("Failed to write report")?;
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
