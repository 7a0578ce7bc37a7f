use csv::{ReaderBuilder, StringRecordsIntoIter, Terminator, Trim};
use serde::de::DeserializeOwned;
use std::{cell::RefCell, fs::File, io::Read, path::Path};

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    error::BatchError,
};

/// A CSV item reader deserializing one row per `read` call.
///
/// Uses a `RefCell` around the record iterator so that `read` can take `&self`.
/// Once the source is exhausted every further `read` returns `Ok(None)`.
pub struct CsvItemReader<R> {
    records: RefCell<StringRecordsIntoIter<R>>,
}

/// Maps a CSV error onto the reader error taxonomy.
fn to_batch_error(error: csv::Error) -> BatchError {
    if error.is_io_error() {
        BatchError::TransientItemReader(error.to_string())
    } else {
        BatchError::ItemReader(error.to_string())
    }
}

impl<R: Read, T: DeserializeOwned> ItemReader<T> for CsvItemReader<R> {
    /// Reads the next row and deserializes it into `T`.
    ///
    /// # Returns
    /// - `Ok(Some(record))` if a record is successfully read
    /// - `Ok(None)` if there are no more records to read
    /// - `Err(BatchError::TransientItemReader)` if the source failed
    /// - `Err(BatchError::ItemReader)` if the row is malformed
    fn read(&self) -> ItemReaderResult<T> {
        match self.records.borrow_mut().next() {
            Some(Ok(string_record)) => string_record
                .deserialize(None)
                .map(Some)
                .map_err(to_batch_error),
            Some(Err(error)) => Err(to_batch_error(error)),
            None => Ok(None),
        }
    }
}

/// A builder for configuring CSV item reading.
///
/// # Default Configuration
///
/// - Delimiter: comma (,)
/// - Terminator: CRLF
/// - Headers: disabled
/// - Trimming: all fields trimmed
pub struct CsvItemReaderBuilder {
    delimiter: u8,
    terminator: Terminator,
    has_headers: bool,
}

impl Default for CsvItemReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvItemReaderBuilder {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            terminator: Terminator::CRLF,
            has_headers: false,
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn terminator(mut self, terminator: Terminator) -> Self {
        self.terminator = terminator;
        self
    }

    /// When enabled, the first row holds the column names and is not returned as an item.
    pub fn has_headers(mut self, yes: bool) -> Self {
        self.has_headers = yes;
        self
    }

    fn reader_builder(&self) -> ReaderBuilder {
        let mut builder = ReaderBuilder::new();
        builder
            .trim(Trim::All)
            .delimiter(self.delimiter)
            .terminator(self.terminator)
            .has_headers(self.has_headers)
            .flexible(false);
        builder
    }

    /// Creates a `CsvItemReader` from any `Read` source.
    pub fn from_reader<R: Read>(self, rdr: R) -> CsvItemReader<R> {
        let records = self.reader_builder().from_reader(rdr).into_records();

        CsvItemReader {
            records: RefCell::new(records),
        }
    }

    /// Creates a `CsvItemReader` reading the file at `path`.
    ///
    /// # Errors
    /// `BatchError::Configuration` if the file cannot be opened.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvItemReader<File>, BatchError> {
        let rdr = self
            .reader_builder()
            .from_path(path.as_ref())
            .map_err(|error| {
                BatchError::Configuration(format!(
                    "cannot open {}: {}",
                    path.as_ref().display(),
                    error
                ))
            })?;

        Ok(CsvItemReader {
            records: RefCell::new(rdr.into_records()),
        })
    }
}
