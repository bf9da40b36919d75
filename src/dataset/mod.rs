//! Query parameter input

pub mod source;

pub use source::CsvRecordSource;
