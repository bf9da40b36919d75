//! Latency statistics
//!
//! This module provides:
//! - `Measurements`: collected query durations with count/sum/min/max/avg,
//!   median and standard deviation
//! - Quickselect used for order statistics

pub mod measurements;
pub mod select;

pub use measurements::Measurements;
pub use select::select_nth;
