//! Worker pool and result aggregation
//!
//! The pool owns one rendezvous channel per worker, a shared results channel
//! and a shared completion channel. `run` starts one thread per worker plus a
//! producer thread, then collects durations on the calling thread until every
//! worker has reported completion.
//!
//! All hand-offs are zero-capacity channels: a send blocks until the other
//! side receives, so a slow aggregator throttles the workers and a slow
//! worker throttles the producer. Records sent to one worker are processed
//! in order; there is no ordering across workers.
//!
//! The only abort path is the inactivity timeout. If neither a measurement
//! nor a completion signal arrives for `RESULTS_IDLE_TIMEOUT`, `run` returns
//! what it has collected so far. Outstanding threads are detached, not
//! cancelled, and may keep their connections open until they notice their
//! channels are gone.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use indicatif::ProgressBar;
use tracing::debug;

use super::counters::RunCounters;
use super::router::route;
use crate::metrics::Measurements;
use crate::utils::{BenchmarkError, Result, RunAborted};

/// How long the aggregator waits for any event before giving up
pub const RESULTS_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// One input row: the query's positional parameters, routing key first
pub type Record = Vec<String>;

/// Everything a worker thread receives from the pool
pub struct WorkerContext {
    id: usize,
    jobs: Receiver<Record>,
    results: Sender<Duration>,
}

impl WorkerContext {
    #[cfg(test)]
    pub(crate) fn new(id: usize, jobs: Receiver<Record>, results: Sender<Duration>) -> Self {
        Self { id, jobs, results }
    }

    /// Worker index in `[0, worker_count)`
    pub fn id(&self) -> usize {
        self.id
    }

    /// Blocking iterator over this worker's records; ends once the producer
    /// has finished and the channel is drained.
    pub fn jobs(&self) -> crossbeam_channel::Iter<'_, Record> {
        self.jobs.iter()
    }

    /// Hand a measurement to the aggregator.
    ///
    /// Blocks until it is received. Returns `false` if the aggregator is gone
    /// (the run already timed out).
    pub fn report(&self, elapsed: Duration) -> bool {
        self.results.send(elapsed).is_ok()
    }
}

/// Producer-side handle onto the job channels.
///
/// Dropping the feed closes every job channel, which is how workers learn
/// there is no more input. The pool drops it as soon as the producer returns.
pub struct JobFeed {
    senders: Vec<Sender<Record>>,
    counters: Arc<RunCounters>,
}

impl JobFeed {
    /// Route a record by its first field and send it to that worker.
    ///
    /// Returns the chosen worker index.
    pub fn dispatch(&self, record: Record) -> Result<usize> {
        let key = record.first().map(String::as_str).unwrap_or_default();
        let worker = route(key, self.senders.len());
        self.send_to(worker, record)?;
        Ok(worker)
    }

    /// Send a record to an explicit worker, bypassing the router
    pub fn send_to(&self, worker: usize, record: Record) -> Result<()> {
        let sender = self.senders.get(worker).ok_or_else(|| {
            BenchmarkError::Worker(format!(
                "worker index {} out of range (pool has {})",
                worker,
                self.senders.len()
            ))
        })?;

        sender.send(record).map_err(|_| {
            BenchmarkError::Worker(format!("worker {} is no longer accepting records", worker))
        })?;
        self.counters.record_dispatched();
        Ok(())
    }
}

/// Sends the completion signal when the worker thread exits, including on
/// panic, so each worker is counted exactly once.
struct CompletionGuard {
    worker_id: usize,
    done: Sender<()>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if self.done.send(()).is_err() {
            debug!("Worker {}: aggregator already gone", self.worker_id);
        }
    }
}

/// Fixed-size pool of benchmark workers
pub struct WorkerPool {
    job_senders: Vec<Sender<Record>>,
    job_receivers: Vec<Receiver<Record>>,
    results_tx: Sender<Duration>,
    results_rx: Receiver<Duration>,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
    idle_timeout: Duration,
    counters: Arc<RunCounters>,
    progress: ProgressBar,
}

impl WorkerPool {
    /// Allocate channels for `worker_count` workers. Nothing runs yet.
    pub fn new(worker_count: usize) -> Result<Self> {
        if worker_count == 0 {
            return Err(BenchmarkError::Config(
                "worker pool needs at least one worker".to_string(),
            ));
        }

        let (job_senders, job_receivers): (Vec<Sender<Record>>, Vec<Receiver<Record>>) =
            (0..worker_count).map(|_| bounded(0)).unzip();
        let (results_tx, results_rx) = bounded(0);
        let (done_tx, done_rx) = bounded(worker_count);

        Ok(Self {
            job_senders,
            job_receivers,
            results_tx,
            results_rx,
            done_tx,
            done_rx,
            idle_timeout: RESULTS_IDLE_TIMEOUT,
            counters: Arc::new(RunCounters::new()),
            progress: ProgressBar::hidden(),
        })
    }

    /// Share run counters with the caller (dispatched records are counted here)
    pub fn with_counters(mut self, counters: Arc<RunCounters>) -> Self {
        self.counters = counters;
        self
    }

    /// Tick `progress` once per collected measurement
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn worker_count(&self) -> usize {
        self.job_senders.len()
    }

    /// Run the benchmark.
    ///
    /// `execute` is called once per worker on its own thread and should
    /// consume `WorkerContext::jobs` until it ends. `produce` runs on a
    /// separate thread and feeds records through the `JobFeed`; its error, if
    /// any, is returned after the workers have drained.
    pub fn run<P, E>(self, produce: P, execute: E) -> std::result::Result<Measurements, RunAborted>
    where
        P: FnOnce(&JobFeed) -> Result<()> + Send + 'static,
        E: Fn(WorkerContext) + Send + Sync + 'static,
    {
        let WorkerPool {
            job_senders,
            job_receivers,
            results_tx,
            results_rx,
            done_tx,
            done_rx,
            idle_timeout,
            counters,
            progress,
        } = self;

        let worker_count = job_receivers.len();
        let execute = Arc::new(execute);

        for (id, jobs) in job_receivers.into_iter().enumerate() {
            let ctx = WorkerContext {
                id,
                jobs,
                results: results_tx.clone(),
            };
            let guard = CompletionGuard {
                worker_id: id,
                done: done_tx.clone(),
            };
            let execute = Arc::clone(&execute);

            thread::Builder::new()
                .name(format!("bench-worker-{}", id))
                .spawn(move || {
                    let _guard = guard;
                    execute(ctx);
                })
                .map_err(|e| RunAborted::new(BenchmarkError::Io(e), Measurements::new()))?;
        }

        // The producer's outcome comes back over a channel so that a stuck
        // producer cannot block the aggregator past the idle timeout.
        let (produced_tx, produced_rx) = bounded::<Result<()>>(1);
        let feed = JobFeed {
            senders: job_senders,
            counters,
        };
        thread::Builder::new()
            .name("bench-producer".to_string())
            .spawn(move || {
                let outcome = produce(&feed);
                drop(feed);
                let _ = produced_tx.send(outcome);
            })
            .map_err(|e| RunAborted::new(BenchmarkError::Io(e), Measurements::new()))?;

        let mut results = Measurements::new();
        let mut workers_done = 0usize;

        while workers_done < worker_count {
            select! {
                recv(results_rx) -> msg => {
                    if let Ok(elapsed) = msg {
                        results.push(elapsed);
                        progress.inc(1);
                    }
                }
                recv(done_rx) -> msg => {
                    if msg.is_ok() {
                        workers_done += 1;
                        debug!("{}/{} workers done", workers_done, worker_count);
                    }
                }
                default(idle_timeout) => {
                    progress.abandon();
                    return Err(RunAborted::new(BenchmarkError::Timeout(idle_timeout), results));
                }
            }
        }
        progress.finish_and_clear();

        // Keep our own senders alive for the whole loop so the channels never
        // read as disconnected while workers are still running.
        drop(results_tx);
        drop(done_tx);

        // Every worker is gone, so the producer can only be stuck on its own
        // input. That is a producer failure, not an aggregation timeout.
        match produced_rx.recv_timeout(idle_timeout) {
            Ok(Ok(())) => Ok(results),
            Ok(Err(e)) => Err(RunAborted::new(e, results)),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(RunAborted::new(
                BenchmarkError::Worker(format!(
                    "producer still running {:?} after all workers finished",
                    idle_timeout
                )),
                results,
            )),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(RunAborted::new(
                BenchmarkError::Worker("producer thread panicked".to_string()),
                results,
            )),
        }
    }
}
