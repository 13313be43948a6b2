//! Trace input for MRC simulation
//!
//! Traces are CSV files read as byte records: keys are opaque and never need
//! to be valid UTF-8. A [`FormatProfile`] says which column holds which field.
//!
//! Reading is streaming. [`TraceReader`] yields one `Result` per row:
//! [`TraceError::Field`] describes a single bad row and the caller may carry
//! on, while [`TraceError::Io`] means the stream itself failed and ends the
//! iteration. Rows are read as flexible byte records, so ragged rows and
//! non-UTF-8 bytes surface as field errors rather than csv errors.

use std::fs::File;
use std::io::{self, BufReader};
use std::num::ParseIntError;
use std::path::Path;

use csv::ByteRecord;
use thiserror::Error;

use crate::error::SimError;
use crate::models::{FormatProfile, Request};

/// Why a field could not be converted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldErrorKind {
    /// The row ended before this column.
    #[error("missing")]
    Missing,

    /// The column was present but not an unsigned integer.
    #[error("invalid value {value:?}")]
    Invalid {
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// A single field of a row failed conversion
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field `{field}` {kind}")]
pub struct FieldParseError {
    /// Name of the offending field
    pub field: &'static str,
    #[source]
    pub kind: FieldErrorKind,
}

impl FieldParseError {
    fn missing(field: &'static str) -> Self {
        Self {
            field,
            kind: FieldErrorKind::Missing,
        }
    }
}

/// Errors produced while reading a trace
#[derive(Debug, Error)]
pub enum TraceError {
    /// One field of the row could not be converted; the row is skipped.
    #[error("line {line}: {source}")]
    Field {
        line: u64,
        #[source]
        source: FieldParseError,
    },

    /// Reading the underlying stream failed.
    #[error("{0}")]
    Io(#[source] io::Error),
}

impl TraceError {
    /// Returns true if reading cannot continue past this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TraceError::Io(_))
    }

    /// Line number of the offending row, when known.
    pub fn line(&self) -> Option<u64> {
        match self {
            TraceError::Field { line, .. } => Some(*line),
            TraceError::Io(_) => None,
        }
    }
}

fn field<'r>(
    record: &'r ByteRecord,
    index: usize,
    name: &'static str,
) -> Result<&'r [u8], FieldParseError> {
    record
        .get(index)
        .ok_or_else(|| FieldParseError::missing(name))
}

fn number(record: &ByteRecord, index: usize, name: &'static str) -> Result<u64, FieldParseError> {
    let raw = field(record, index, name)?;
    let text = String::from_utf8_lossy(raw);
    text.trim().parse::<u64>().map_err(|source| FieldParseError {
        field: name,
        kind: FieldErrorKind::Invalid {
            value: text.into_owned(),
            source,
        },
    })
}

/// Converts one CSV row into a [`Request`] according to `profile`.
pub fn parse_record(
    record: &ByteRecord,
    profile: FormatProfile,
) -> Result<Request, FieldParseError> {
    let layout = profile.layout();
    Ok(Request {
        timestamp: number(record, layout.timestamp, "timestamp")?,
        key: field(record, layout.key, "key")?.to_vec(),
        key_size: number(record, layout.key_size, "key_size")?,
        value_size: number(record, layout.value_size, "value_size")?,
        tenant: number(record, layout.tenant, "client")?,
        operation: String::from_utf8_lossy(field(record, layout.operation, "operation")?)
            .into_owned(),
    })
}

/// Streaming reader over a trace
pub struct TraceReader<R: io::Read = BufReader<File>> {
    reader: csv::Reader<R>,
    record: ByteRecord,
    profile: FormatProfile,
    rows_read: u64,
    failed: bool,
}

impl TraceReader<BufReader<File>> {
    /// Opens a trace file. Fails before any row is read if the file cannot
    /// be opened.
    pub fn open<P: AsRef<Path>>(path: P, profile: FormatProfile) -> Result<Self, SimError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SimError::io(path, e))?;
        // 1MB buffer for large traces
        Ok(Self::from_reader(
            BufReader::with_capacity(1024 * 1024, file),
            profile,
        ))
    }
}

impl<R: io::Read> TraceReader<R> {
    /// Reads a trace from any byte source
    pub fn from_reader(reader: R, profile: FormatProfile) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(profile.layout().has_headers)
            .flexible(true)
            .from_reader(reader);
        Self {
            reader,
            record: ByteRecord::new(),
            profile,
            rows_read: 0,
            failed: false,
        }
    }

    /// Rows read so far, good or bad, excluding any header
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    pub fn profile(&self) -> FormatProfile {
        self.profile
    }
}

impl<R: io::Read> Iterator for TraceReader<R> {
    type Item = Result<Request, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.reader.read_byte_record(&mut self.record) {
            Ok(false) => None,
            Ok(true) => {
                self.rows_read += 1;
                let line = self.record.position().map_or(0, |p| p.line());
                Some(
                    parse_record(&self.record, self.profile)
                        .map_err(|source| TraceError::Field { line, source }),
                )
            }
            // Flexible byte records leave I/O as the only way reading can fail
            Err(err) => {
                self.failed = true;
                let source = match err.into_kind() {
                    csv::ErrorKind::Io(source) => source,
                    other => io::Error::new(io::ErrorKind::Other, format!("{other:?}")),
                };
                Some(Err(TraceError::Io(source)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(data: &str, profile: FormatProfile) -> Vec<Result<Request, TraceError>> {
        TraceReader::from_reader(data.as_bytes(), profile).collect()
    }

    #[test]
    fn test_twitter_row() {
        let rows = read_all("5,user:1,6,100,42,get,0\n", FormatProfile::Twitter);
        assert_eq!(rows.len(), 1);
        let request = rows[0].as_ref().unwrap();
        assert_eq!(request, &Request::new(5, "user:1", 6, 100, 42, "get"));
    }

    #[test]
    fn test_facebook_row_skips_header() {
        let data = "op_time,key,key_size,op,op_count,size,cache_hits,ttl,usecase\n\
                    10,abc,3,GET,1,900,0,0,7\n";
        let rows = read_all(data, FormatProfile::Facebook);
        assert_eq!(rows.len(), 1);
        let request = rows[0].as_ref().unwrap();
        assert_eq!(request.timestamp, 10);
        assert_eq!(request.value_size, 900);
        assert_eq!(request.tenant, 7);
        assert_eq!(request.operation, "GET");
    }

    #[test]
    fn test_invalid_field_names_field_and_line() {
        let rows = read_all(
            "1,a,1,1,1,get\n2,b,xx,1,1,get\n3,c,1,1,1,get\n",
            FormatProfile::Twitter,
        );
        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_ok());
        assert!(rows[2].is_ok());

        match &rows[1] {
            Err(TraceError::Field { line, source }) => {
                assert_eq!(*line, 2);
                assert_eq!(source.field, "key_size");
                assert!(matches!(
                    &source.kind,
                    FieldErrorKind::Invalid { value, .. } if value == "xx"
                ));
            }
            other => panic!("expected field error, got {other:?}"),
        }
    }

    #[test]
    fn test_short_row_reports_missing_field() {
        let rows = read_all("1,a,1\n", FormatProfile::Twitter);
        match &rows[0] {
            Err(err @ TraceError::Field { source, .. }) => {
                assert_eq!(source, &FieldParseError::missing("value_size"));
                assert!(!err.is_fatal());
                assert_eq!(err.line(), Some(1));
            }
            other => panic!("expected field error, got {other:?}"),
        }
    }

    #[test]
    fn test_binary_keys_are_kept_verbatim() {
        let data: &[u8] = b"1,\xff\xfe,2,3,4,get\n";
        let rows: Vec<_> = TraceReader::from_reader(data, FormatProfile::Twitter).collect();
        assert_eq!(rows[0].as_ref().unwrap().key, vec![0xff, 0xfe]);
    }

    #[test]
    fn test_rows_read_counts_bad_rows() {
        let mut reader = TraceReader::from_reader(
            "1,a,1,1,1,get\nbad\n\n2,b,1,1,1,get\n".as_bytes(),
            FormatProfile::Twitter,
        );
        let results: Vec<_> = reader.by_ref().collect();
        assert_eq!(results.len(), 3);
        assert_eq!(reader.rows_read(), 3);
    }

    struct BrokenPipe;

    impl io::Read for BrokenPipe {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "trace source went away"))
        }
    }

    #[test]
    fn test_read_failure_is_fatal_and_ends_stream() {
        let source = io::Read::chain("1,a,1,1,1,get\n".as_bytes(), BrokenPipe);
        let rows: Vec<_> = TraceReader::from_reader(source, FormatProfile::Twitter).collect();

        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_ok());
        match &rows[1] {
            Err(err @ TraceError::Io(source)) => {
                assert!(err.is_fatal());
                assert_eq!(err.line(), None);
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
            }
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_messages() {
        let err = TraceError::Field {
            line: 9,
            source: FieldParseError::missing("client"),
        };
        assert_eq!(err.to_string(), "line 9: field `client` missing");
    }
}
