//! CSV query parameter source
//!
//! The first line is a header and is always skipped. Its field count fixes
//! the field count for every following row; a row of any other width is a
//! parse error and ends the input.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::benchmark::Record;
use crate::utils::{Result, SourceError};

/// Streams query parameter records from CSV input
pub struct CsvRecordSource<R: Read> {
    reader: csv::Reader<R>,
    row: StringRecord,
}

impl CsvRecordSource<Box<dyn Read + Send>> {
    /// Read from `path`, or from stdin when no path is given
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let input: Box<dyn Read + Send> = match path {
            Some(path) => {
                let file = File::open(path).map_err(|source| SourceError::OpenFailed {
                    path: path.display().to_string(),
                    source,
                })?;
                Box::new(BufReader::new(file))
            }
            None => Box::new(io::stdin()),
        };
        Ok(Self::from_reader(input))
    }
}

impl<R: Read> CsvRecordSource<R> {
    pub fn from_reader(input: R) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(input);
        Self {
            reader,
            row: StringRecord::new(),
        }
    }

    /// Read the next row, `None` at end of input
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        let more = self
            .reader
            .read_record(&mut self.row)
            .map_err(SourceError::from)?;
        if !more {
            return Ok(None);
        }
        Ok(Some(self.row.iter().map(str::to_string).collect()))
    }

    /// Call `f` for every row until input ends or an error occurs.
    ///
    /// Returns the number of rows passed to `f`.
    pub fn for_each_record<F>(&mut self, mut f: F) -> Result<u64>
    where
        F: FnMut(Record) -> Result<()>,
    {
        let mut rows = 0u64;
        while let Some(record) = self.next_record()? {
            f(record)?;
            rows += 1;
        }
        Ok(rows)
    }
}

impl<R: Read> Iterator for CsvRecordSource<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
