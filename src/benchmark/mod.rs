//! Benchmark dispatch and workers
//!
//! This module provides the multi-threaded benchmark execution system:
//! - Router: stable key hash that picks a worker for each record
//! - WorkerPool: per-worker job channels, result aggregation, idle timeout
//! - BenchmarkWorker: runs the query per record on its own connection
//! - RunCounters: atomic counters for the end-of-run summary

pub mod counters;
pub mod dispatcher;
pub mod router;
pub mod worker;

pub use counters::{CounterSnapshot, RunCounters};
pub use dispatcher::{JobFeed, Record, WorkerContext, WorkerPool, RESULTS_IDLE_TIMEOUT};
pub use router::{fnv1a_32, route};
pub use worker::{BenchmarkWorker, ExecutionLog, TracingLog, WorkerSummary};
