//! Benchmark worker
//!
//! Each worker owns one backend session for its whole lifetime: opened when
//! the worker starts, closed when its job channel is drained. Query failures
//! are logged and skipped; they never stop the worker and are never retried.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use super::counters::RunCounters;
use super::dispatcher::WorkerContext;
use crate::client::{Connector, QuerySession};
use crate::utils::BenchmarkError;

/// Sink for per-query events, handed to workers explicitly
pub trait ExecutionLog: Send + Sync {
    fn query_succeeded(&self, worker_id: usize, elapsed: Duration);

    fn query_failed(&self, worker_id: usize, error: &BenchmarkError);

    fn connect_failed(&self, worker_id: usize, error: &BenchmarkError);
}

/// `ExecutionLog` backed by `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl ExecutionLog for TracingLog {
    fn query_succeeded(&self, worker_id: usize, elapsed: Duration) {
        debug!(worker = worker_id, ?elapsed, "query finished");
    }

    fn query_failed(&self, worker_id: usize, error: &BenchmarkError) {
        warn!("Worker {}: {}", worker_id, error);
    }

    fn connect_failed(&self, worker_id: usize, error: &BenchmarkError) {
        error!("Worker {}: {}", worker_id, error);
    }
}

/// Result from a worker thread
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    /// Worker ID
    pub worker_id: usize,
    /// Whether the session was opened
    pub connected: bool,
    /// Queries that produced a measurement
    pub queries_succeeded: u64,
    /// Queries that returned an error
    pub queries_failed: u64,
}

/// Executes routed records against the backend and reports their latency
pub struct BenchmarkWorker<C: Connector> {
    connector: Arc<C>,
    log: Arc<dyn ExecutionLog>,
    counters: Arc<RunCounters>,
}

impl<C: Connector> BenchmarkWorker<C> {
    pub fn new(connector: Arc<C>, log: Arc<dyn ExecutionLog>, counters: Arc<RunCounters>) -> Self {
        Self {
            connector,
            log,
            counters,
        }
    }

    /// Main worker loop
    pub fn run(&self, ctx: WorkerContext) -> WorkerSummary {
        let mut summary = WorkerSummary {
            worker_id: ctx.id(),
            ..Default::default()
        };

        let mut session = match self.connector.connect() {
            Ok(session) => session,
            Err(e) => {
                self.counters.record_connect_failure();
                self.log.connect_failed(ctx.id(), &e);
                return summary;
            }
        };
        summary.connected = true;

        for record in ctx.jobs() {
            match session.timed_query(&record) {
                Ok(elapsed) => {
                    self.log.query_succeeded(ctx.id(), elapsed);
                    if !ctx.report(elapsed) {
                        debug!("Worker {}: results channel closed, stopping", ctx.id());
                        break;
                    }
                    self.counters.record_finished();
                    summary.queries_succeeded += 1;
                }
                Err(e) => {
                    self.counters.record_failed();
                    summary.queries_failed += 1;
                    self.log.query_failed(ctx.id(), &e);
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::dispatcher::WorkerPool;
    use crate::utils::Result;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeConnector {
        fail_connect: bool,
        opened: AtomicUsize,
        closed: Arc<AtomicUsize>,
    }

    impl FakeConnector {
        fn new(fail_connect: bool) -> Self {
            Self {
                fail_connect,
                opened: AtomicUsize::new(0),
                closed: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    /// Fails any record whose first field is "bad", otherwise reports the
    /// field count in microseconds
    struct FakeSession {
        closed: Arc<AtomicUsize>,
    }

    impl Drop for FakeSession {
        fn drop(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl QuerySession for FakeSession {
        fn timed_query(&mut self, params: &[String]) -> Result<Duration> {
            if params.first().map(String::as_str) == Some("bad") {
                return Err(BenchmarkError::Worker("syntax error".to_string()));
            }
            Ok(Duration::from_micros(params.len() as u64))
        }
    }

    impl Connector for FakeConnector {
        type Session = FakeSession;

        fn connect(&self) -> Result<FakeSession> {
            if self.fail_connect {
                return Err(BenchmarkError::Worker("connection refused".to_string()));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(FakeSession {
                closed: Arc::clone(&self.closed),
            })
        }
    }

    #[derive(Default)]
    struct RecordingLog {
        succeeded: Mutex<Vec<(usize, Duration)>>,
        failed: Mutex<Vec<(usize, String)>>,
        connect_failed: Mutex<Vec<usize>>,
    }

    impl ExecutionLog for RecordingLog {
        fn query_succeeded(&self, worker_id: usize, elapsed: Duration) {
            self.succeeded.lock().push((worker_id, elapsed));
        }

        fn query_failed(&self, worker_id: usize, error: &BenchmarkError) {
            self.failed.lock().push((worker_id, error.to_string()));
        }

        fn connect_failed(&self, worker_id: usize, _error: &BenchmarkError) {
            self.connect_failed.lock().push(worker_id);
        }
    }

    fn record(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    fn run_pool(
        connector: Arc<FakeConnector>,
        log: Arc<RecordingLog>,
        counters: Arc<RunCounters>,
        workers: usize,
        records: Vec<Vec<String>>,
    ) -> (crate::metrics::Measurements, Arc<Mutex<Vec<WorkerSummary>>>) {
        let summaries = Arc::new(Mutex::new(Vec::new()));
        let summaries_in_workers = Arc::clone(&summaries);
        let worker = BenchmarkWorker::new(connector, log, Arc::clone(&counters));

        let results = WorkerPool::new(workers)
            .unwrap()
            .with_counters(counters)
            .run(
                move |feed| {
                    for r in records {
                        feed.dispatch(r)?;
                    }
                    Ok(())
                },
                move |ctx| {
                    let summary = worker.run(ctx);
                    summaries_in_workers.lock().push(summary);
                },
            )
            .unwrap();

        (results, summaries)
    }

    #[test]
    fn test_failures_are_skipped() {
        let connector = Arc::new(FakeConnector::new(false));
        let log = Arc::new(RecordingLog::default());
        let counters = Arc::new(RunCounters::new());

        let (results, summaries) = run_pool(
            Arc::clone(&connector),
            Arc::clone(&log),
            Arc::clone(&counters),
            1,
            vec![
                record(&["host_1", "a", "b"]),
                record(&["bad", "a"]),
                record(&["host_2", "a"]),
            ],
        );

        assert_eq!(results.count(), 2);
        assert_eq!(results.sum(), Duration::from_micros(5));
        assert_eq!(log.failed.lock().len(), 1);
        assert_eq!(log.succeeded.lock().len(), 2);

        let snap = counters.snapshot();
        assert_eq!(snap.queries_finished, 2);
        assert_eq!(snap.queries_failed, 1);
        assert_eq!(snap.records_dispatched, 3);

        let summaries = summaries.lock();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].queries_succeeded, 2);
        assert_eq!(summaries[0].queries_failed, 1);
    }

    #[test]
    fn test_one_session_per_worker() {
        let connector = Arc::new(FakeConnector::new(false));
        let log = Arc::new(RecordingLog::default());
        let records = (0..40).map(|i| record(&[&format!("host_{:06}", i), "x"])).collect();

        let (results, _) = run_pool(
            Arc::clone(&connector),
            log,
            Arc::new(RunCounters::new()),
            5,
            records,
        );

        assert_eq!(results.count(), 40);
        assert_eq!(connector.opened.load(Ordering::SeqCst), 5);
        assert_eq!(connector.closed.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_connect_failure_produces_no_measurements() {
        let connector = Arc::new(FakeConnector::new(true));
        let log = Arc::new(RecordingLog::default());
        let counters = Arc::new(RunCounters::new());
        let summaries = Arc::new(Mutex::new(Vec::new()));
        let summaries_in_workers = Arc::clone(&summaries);
        let worker = BenchmarkWorker::new(connector, log.clone(), Arc::clone(&counters));

        let results = WorkerPool::new(3)
            .unwrap()
            .run(
                |feed| {
                    // Workers without a session drop their channel; sends fail.
                    assert!(feed.dispatch(vec!["host_000001".to_string()]).is_err());
                    Ok(())
                },
                move |ctx| {
                    summaries_in_workers.lock().push(worker.run(ctx));
                },
            )
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(log.connect_failed.lock().len(), 3);
        assert_eq!(counters.snapshot().connect_failures, 3);
        assert!(summaries.lock().iter().all(|s| !s.connected));
    }

    #[test]
    fn test_unreported_measurement_is_not_counted() {
        let connector = Arc::new(FakeConnector::new(false));
        let log = Arc::new(RecordingLog::default());
        let counters = Arc::new(RunCounters::new());
        let worker = BenchmarkWorker::new(connector, log.clone(), Arc::clone(&counters));

        let (jobs_tx, jobs_rx) = crossbeam_channel::bounded(2);
        let (results_tx, results_rx) = crossbeam_channel::bounded(0);
        jobs_tx.send(record(&["host_1", "a"])).unwrap();
        jobs_tx.send(record(&["host_2", "a"])).unwrap();
        drop(jobs_tx);
        // Aggregator already gone, as after a timeout.
        drop(results_rx);

        let summary = worker.run(WorkerContext::new(0, jobs_rx, results_tx));

        assert!(summary.connected);
        assert_eq!(summary.queries_succeeded, 0);
        assert_eq!(counters.snapshot().queries_finished, 0);
        assert_eq!(log.succeeded.lock().len(), 1);
    }
}
