//! Run-wide atomic counters
//!
//! Workers and the producer bump these as they go; the binary reads them for
//! the end-of-run summary. They are never used for coordination, which goes
//! through the dispatcher's channels only.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared between the producer and all workers
#[derive(Debug, Default)]
pub struct RunCounters {
    /// Records handed to a worker channel
    records_dispatched: AtomicU64,

    /// Queries that completed and produced a measurement
    queries_finished: AtomicU64,

    /// Queries that returned an error
    queries_failed: AtomicU64,

    /// Workers that could not open their connection
    connect_failures: AtomicU64,
}

/// Point-in-time copy of `RunCounters`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub records_dispatched: u64,
    pub queries_finished: u64,
    pub queries_failed: u64,
    pub connect_failures: u64,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_dispatched(&self) {
        self.records_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_finished(&self) {
        self.queries_finished.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failed(&self) {
        self.queries_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_connect_failure(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            records_dispatched: self.records_dispatched.load(Ordering::Relaxed),
            queries_finished: self.queries_finished.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
        }
    }
}
