//! Delimited-file adapter.
//!
//! Turns a comma-separated file into the [`Row`]s the record store consumes.
//! Cells stay text; numeric coercion belongs to [`RecordSet::load`](crate::RecordSet::load).
//! Quoting follows RFC 4180: quoted fields may hold commas, newlines and
//! doubled quotes. Empty cells become [`Value::Null`].

use std::fs::File;
use std::path::Path;

use memchr::{memchr, memchr2};
use memmap2::Mmap;
use tracing::{debug, info};

use crate::processor::{ProcessorError, Result, Value, row_store::Row};

/// Reads every data row of the CSV file at `path`.
///
/// # Errors
/// - [`ProcessorError::Io`] if the file cannot be opened or mapped
/// - [`ProcessorError::Parse`] for a missing header, an unterminated quote,
///   or a row whose field count differs from the header
/// - [`ProcessorError::Utf8`] for a cell that is not valid UTF-8
pub fn load_csv(path: &Path) -> Result<Vec<Row>> {
    let file = File::open(path)?;

    // Mapping a zero-length file fails on most platforms.
    let rows = if file.metadata()?.len() == 0 {
        parse_csv(&[])?
    } else {
        let mmap = unsafe { Mmap::map(&file)? };
        parse_csv(&mmap[..])?
    };

    info!(path = %path.display(), rows = rows.len(), "read delimited source");
    Ok(rows)
}

/// Parses CSV bytes; the first record is the header.
pub fn parse_csv(buf: &[u8]) -> Result<Vec<Row>> {
    let buf = buf.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(buf);
    let mut records = RecordSplitter::new(buf).filter(|(_, raw)| !raw.is_empty());

    let (header_line, header) = records.next().ok_or_else(|| ProcessorError::Parse {
        line: 1,
        reason: "missing header line".into(),
    })?;
    let headers = split_fields(header, header_line)?;
    debug!(columns = ?headers, "parsed header");

    let mut rows = Vec::new();
    for (line, raw) in records {
        let fields = split_fields(raw, line)?;
        if fields.len() != headers.len() {
            return Err(ProcessorError::Parse {
                line,
                reason: format!("expected {} fields, got {}", headers.len(), fields.len()),
            });
        }

        rows.push(
            headers
                .iter()
                .cloned()
                .zip(fields.into_iter().map(cell))
                .collect(),
        );
    }

    Ok(rows)
}

fn cell(text: String) -> Value {
    if text.is_empty() {
        Value::Null
    } else {
        Value::Str(text)
    }
}

/// Splits a buffer into raw records, keeping quoted newlines inside their record.
/// Yields the 1-based line each record starts on.
struct RecordSplitter<'a> {
    buf: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> RecordSplitter<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0, line: 1 }
    }
}

impl<'a> Iterator for RecordSplitter<'a> {
    type Item = (usize, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.buf.len() {
            return None;
        }

        let start = self.pos;
        let first_line = self.line;
        let mut cursor = start;
        let mut quoted = false;

        loop {
            let Some(offset) = memchr2(b'\n', b'"', &self.buf[cursor..]) else {
                self.pos = self.buf.len();
                return Some((first_line, trim_cr(&self.buf[start..])));
            };

            let at = cursor + offset;
            cursor = at + 1;
            if self.buf[at] == b'"' {
                quoted = !quoted;
                continue;
            }

            self.line += 1;
            if !quoted {
                self.pos = cursor;
                return Some((first_line, trim_cr(&self.buf[start..at])));
            }
        }
    }
}

fn trim_cr(raw: &[u8]) -> &[u8] {
    raw.strip_suffix(b"\r").unwrap_or(raw)
}

fn split_fields(raw: &[u8], line: usize) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut field: Vec<u8> = Vec::new();
    let mut rest = raw;
    let mut quoted = false;

    loop {
        if quoted {
            let Some(at) = memchr(b'"', rest) else {
                return Err(ProcessorError::Parse {
                    line,
                    reason: "unterminated quoted field".into(),
                });
            };
            field.extend_from_slice(&rest[..at]);
            if rest.get(at + 1) == Some(&b'"') {
                field.push(b'"');
                rest = &rest[at + 2..];
            } else {
                quoted = false;
                rest = &rest[at + 1..];
            }
        } else {
            let Some(at) = memchr2(b',', b'"', rest) else {
                field.extend_from_slice(rest);
                fields.push(into_string(field)?);
                return Ok(fields);
            };
            field.extend_from_slice(&rest[..at]);
            if rest[at] == b'"' {
                quoted = true;
            } else {
                fields.push(into_string(std::mem::take(&mut field))?);
            }
            rest = &rest[at + 1..];
        }
    }
}

fn into_string(bytes: Vec<u8>) -> Result<String> {
    Ok(String::from_utf8(bytes).map_err(|e| e.utf8_error())?)
}
