//! Ordered row sequences with optional headers and lookahead sampling.

use std::collections::VecDeque;
use std::io::{Cursor, Read};
use std::path::Path;

use super::StreamError;

/// An ordered sequence of string rows, first row optionally a header.
///
/// Rows are pulled lazily from the underlying source; [`sample`] buffers
/// lookahead rows without consuming them, so schema intuition can inspect
/// the head of the stream and the build can still write every row.
///
/// [`sample`]: RowStream::sample
pub struct RowStream {
    headers: Option<Vec<String>>,
    buffered: VecDeque<Vec<String>>,
    inner: Box<dyn Iterator<Item = Result<Vec<String>, StreamError>>>,
}

impl RowStream {
    /// Stream a local CSV file, treating the first row as headers.
    pub fn from_csv_path(path: &Path) -> Result<Self, StreamError> {
        let reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_path(path)?;
        Self::from_csv_reader(reader)
    }

    /// Stream CSV text already held in memory (zip entries, fetched bodies).
    pub fn from_csv_bytes(bytes: Vec<u8>) -> Result<Self, StreamError> {
        let reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(Cursor::new(bytes));
        Self::from_csv_reader(reader)
    }

    fn from_csv_reader<R: Read + 'static>(mut reader: csv::Reader<R>) -> Result<Self, StreamError> {
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let headers = if headers.is_empty() { None } else { Some(headers) };
        let inner = reader.into_records().map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(StreamError::from)
        });
        Ok(Self {
            headers,
            buffered: VecDeque::new(),
            inner: Box::new(inner),
        })
    }

    /// Wrap rows already materialized in memory (workbook sheets).
    pub fn from_rows(headers: Option<Vec<String>>, rows: Vec<Vec<String>>) -> Self {
        Self {
            headers,
            buffered: VecDeque::new(),
            inner: Box::new(rows.into_iter().map(Ok)),
        }
    }

    /// Column headers, when the source had any.
    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    /// Pull the next data row.
    pub fn next_row(&mut self) -> Option<Result<Vec<String>, StreamError>> {
        if let Some(row) = self.buffered.pop_front() {
            return Some(Ok(row));
        }
        self.inner.next()
    }

    /// Buffer up to `n` lookahead rows and return a copy of them.
    ///
    /// The sampled rows are still yielded by [`next_row`] afterwards.
    ///
    /// [`next_row`]: RowStream::next_row
    pub fn sample(&mut self, n: usize) -> Result<Vec<Vec<String>>, StreamError> {
        while self.buffered.len() < n {
            match self.inner.next() {
                Some(Ok(row)) => self.buffered.push_back(row),
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }
        Ok(self.buffered.iter().cloned().collect())
    }
}
