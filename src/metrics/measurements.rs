//! Latency sample container and summary statistics
//!
//! `Measurements` holds the execution time of every successful query from a
//! single run. All statistics are computed after collection has finished;
//! nothing here is updated incrementally.

use std::io::{self, Write};
use std::time::Duration;

use super::select::select_nth;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Execution durations collected from one benchmark run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Measurements {
    samples: Vec<Duration>,
}

impl Measurements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample
    pub fn push(&mut self, sample: Duration) {
        self.samples.push(sample);
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Total number of queries measured
    pub fn count(&self) -> usize {
        self.samples.len()
    }

    /// Total duration of all queries across all workers
    pub fn sum(&self) -> Duration {
        self.samples.iter().sum()
    }

    pub fn min(&self) -> Duration {
        self.samples.iter().min().copied().unwrap_or(Duration::ZERO)
    }

    pub fn max(&self) -> Duration {
        self.samples.iter().max().copied().unwrap_or(Duration::ZERO)
    }

    /// Mean execution time, truncated to whole nanoseconds
    pub fn avg(&self) -> Duration {
        if self.is_empty() {
            return Duration::ZERO;
        }
        nanos_to_duration(self.sum().as_nanos() / self.count() as u128)
    }

    /// Median execution time
    ///
    /// For an even number of samples this is the mean of the two middle
    /// order statistics. Computed by selection on a private copy, so the
    /// stored samples keep their arrival order.
    pub fn median(&self) -> Duration {
        let n = self.count();
        if n == 0 {
            return Duration::ZERO;
        }

        let mut work = self.samples.clone();
        let mid = n / 2;
        let Some(upper) = select_nth(&mut work, mid) else {
            return Duration::ZERO;
        };
        if n % 2 == 1 {
            return upper;
        }

        // select_nth leaves everything below `mid` no greater than `upper`,
        // so the lower middle value is the largest of that prefix.
        let lower = work[..mid].iter().max().copied().unwrap_or(upper);
        (lower + upper) / 2
    }

    /// The `k`-th smallest sample (0-based), or `None` if out of range
    pub fn nth(&self, k: usize) -> Option<Duration> {
        let mut work = self.samples.clone();
        select_nth(&mut work, k)
    }

    /// Population standard deviation
    ///
    /// Squared deviations are accumulated as `f64` nanoseconds; the result is
    /// truncated to whole nanoseconds.
    pub fn sdev(&self) -> Duration {
        if self.is_empty() {
            return Duration::ZERO;
        }

        let mean = self.avg().as_nanos() as f64;
        let sum_sq: f64 = self
            .samples
            .iter()
            .map(|d| {
                let diff = d.as_nanos() as f64 - mean;
                diff * diff
            })
            .sum();

        let sdev = (sum_sq / self.count() as f64).sqrt();
        Duration::from_nanos(sdev as u64)
    }

    /// Write the summary report; writes nothing when there are no samples
    pub fn write_stats<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        writeln!(out, "total db queries: {}", self.count())?;
        writeln!(out, "total time: {:?}", self.sum())?;
        writeln!(out, "min time: {:?}", self.min())?;
        writeln!(out, "max time: {:?}", self.max())?;
        writeln!(out, "avg time: {:?}", self.avg())?;
        writeln!(out, "median time: {:?}", self.median())?;
        writeln!(out, "standard deviation: {:?}", self.sdev())?;
        Ok(())
    }

    /// Print the summary report to stdout
    pub fn dump_stats(&self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.write_stats(&mut out)?;
        out.flush()
    }
}

impl From<Vec<Duration>> for Measurements {
    fn from(samples: Vec<Duration>) -> Self {
        Self { samples }
    }
}

fn nanos_to_duration(nanos: u128) -> Duration {
    let secs = u64::try_from(nanos / NANOS_PER_SEC).unwrap_or(u64::MAX);
    Duration::new(secs, (nanos % NANOS_PER_SEC) as u32)
}
