//! RecordSource - streaming CSV reader producing normalized records
//!
//! Rows are pulled from the file in windows of `chunk_size`; only the
//! current window is held in memory. The first failure (I/O, CSV framing or
//! coercion) is yielded once and the iterator is fused afterwards.

use std::collections::VecDeque;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use contracts::{NormalizedRecord, SourceColumns};
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, instrument};

use crate::error::{IngestionError, Result};

/// Header name pandas gives an unnamed index column
const UNNAMED_INDEX: &str = "Unnamed: 0";

/// Resolved column positions
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    row_index: usize,
    datetime: usize,
    duration: usize,
    title: usize,
    genres: usize,
    release_date: usize,
    movie_id: usize,
    user_id: usize,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, columns: &SourceColumns) -> Result<Self> {
        let find = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| IngestionError::MissingColumn {
                    column: name.to_string(),
                })
        };

        // 行号列：空表头与 "Unnamed: 0" 互为别名
        let row_index = if columns.row_index.is_empty() || columns.row_index == UNNAMED_INDEX {
            headers
                .iter()
                .position(|h| h.is_empty() || h == UNNAMED_INDEX)
                .ok_or_else(|| IngestionError::MissingColumn {
                    column: UNNAMED_INDEX.to_string(),
                })?
        } else {
            find(&columns.row_index)?
        };

        Ok(Self {
            row_index,
            datetime: find(&columns.datetime)?,
            duration: find(&columns.duration)?,
            title: find(&columns.title)?,
            genres: find(&columns.genres)?,
            release_date: find(&columns.release_date)?,
            movie_id: find(&columns.movie_id)?,
            user_id: find(&columns.user_id)?,
        })
    }
}

/// Lazy, finite, non-restartable record stream
pub struct RecordSource<R> {
    reader: csv::Reader<R>,
    index: ColumnIndex,
    chunk_size: usize,
    /// Current window: (1-based data row, raw row)
    window: VecDeque<(u64, StringRecord)>,
    /// Error hit while filling the window, yielded after the rows before it
    deferred: Option<IngestionError>,
    rows_read: u64,
    windows_read: u64,
    eof: bool,
    fused: bool,
}

impl RecordSource<File> {
    /// Open a CSV file and resolve its header
    #[instrument(name = "record_source_open", skip(path, columns), fields(path = %path.as_ref().display()))]
    pub fn open(
        path: impl AsRef<Path>,
        chunk_size: usize,
        columns: &SourceColumns,
    ) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file, chunk_size, columns)
    }
}

impl<R: Read> RecordSource<R> {
    /// Wrap any reader producing CSV with a header row
    pub fn from_reader(reader: R, chunk_size: usize, columns: &SourceColumns) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let index = ColumnIndex::resolve(&headers, columns)?;
        debug!(columns = headers.len(), chunk_size, "source header resolved");

        Ok(Self {
            reader,
            index,
            chunk_size: chunk_size.max(1),
            window: VecDeque::with_capacity(chunk_size.clamp(1, 65_536)),
            deferred: None,
            rows_read: 0,
            windows_read: 0,
            eof: false,
            fused: false,
        })
    }

    /// Data rows pulled from the underlying reader so far
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Windows pulled so far
    pub fn windows_read(&self) -> u64 {
        self.windows_read
    }

    fn fill_window(&mut self) {
        while self.window.len() < self.chunk_size {
            let mut raw = StringRecord::new();
            match self.reader.read_record(&mut raw) {
                Ok(true) => {
                    self.rows_read += 1;
                    self.window.push_back((self.rows_read, raw));
                }
                Ok(false) => {
                    self.eof = true;
                    break;
                }
                Err(e) => {
                    self.deferred = Some(self.classify(e));
                    break;
                }
            }
        }
        if !self.window.is_empty() {
            self.windows_read += 1;
            debug!(window = self.windows_read, rows = self.window.len(), "read source window");
        }
    }

    /// Row-shaped CSV errors are malformed records; the rest are read errors
    fn classify(&self, err: csv::Error) -> IngestionError {
        let row_shaped = match err.kind() {
            csv::ErrorKind::UnequalLengths {
                expected_len, len, ..
            } => Some(format!("expected {expected_len} fields, found {len}")),
            csv::ErrorKind::Utf8 { .. } => Some("invalid UTF-8".to_string()),
            _ => None,
        };
        match row_shaped {
            Some(message) => IngestionError::malformed(self.rows_read + 1, "<row>", message),
            None => IngestionError::Csv(err),
        }
    }

    fn normalize(&self, row: u64, raw: &StringRecord) -> Result<NormalizedRecord> {
        let text = |pos: usize, field: &str| cell(raw, row, pos, field).map(str::to_string);

        Ok(NormalizedRecord {
            row_id: parse_row_id(row, cell(raw, row, self.index.row_index, "row_id")?)?,
            timestamp: text(self.index.datetime, "datetime")?,
            duration_seconds: parse_duration(row, cell(raw, row, self.index.duration, "duration")?)?,
            title: text(self.index.title, "title")?,
            genres: text(self.index.genres, "genres")?,
            release_date: text(self.index.release_date, "release_date")?,
            movie_id: text(self.index.movie_id, "movie_id")?,
            user_id: text(self.index.user_id, "user_id")?,
        })
    }
}

impl<R: Read> Iterator for RecordSource<R> {
    type Item = Result<NormalizedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        if self.window.is_empty() && self.deferred.is_none() && !self.eof {
            self.fill_window();
        }

        let Some((row, raw)) = self.window.pop_front() else {
            self.fused = true;
            return self.deferred.take().map(Err);
        };

        let result = self.normalize(row, &raw);
        if result.is_err() {
            self.fused = true;
        }
        Some(result)
    }
}

fn cell<'a>(raw: &'a StringRecord, row: u64, pos: usize, field: &str) -> Result<&'a str> {
    raw.get(pos)
        .ok_or_else(|| IngestionError::malformed(row, field, "missing value"))
}

/// Integer row index; integral floats such as `12.0` are accepted
fn parse_row_id(row: u64, raw: &str) -> Result<i64> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(IngestionError::malformed(row, "row_id", "empty value"));
    }
    if let Ok(id) = value.parse::<i64>() {
        return Ok(id);
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(f as i64),
        _ => Err(IngestionError::malformed(
            row,
            "row_id",
            format!("'{value}' is not an integer"),
        )),
    }
}

fn parse_duration(row: u64, raw: &str) -> Result<f64> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(IngestionError::malformed(row, "duration", "empty value"));
    }
    value.parse::<f64>().map_err(|_| {
        IngestionError::malformed(row, "duration", format!("'{value}' is not a number"))
    })
}
