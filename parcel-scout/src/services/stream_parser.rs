//! NDJSON stream parser
//!
//! [`LineBuffer`] turns successive byte chunks into complete lines and decodes each
//! line as one [`Parcel`]. A record split across chunk boundaries (including inside a
//! multi-byte character) is reassembled from the leftover bytes kept between calls.
//! The leftover is raw bytes split on `\n`; that byte never occurs inside a UTF-8
//! multi-byte sequence, so per-line decoding matches a stateful decoder.
//!
//! Malformed lines are dropped with a warning. [`parse_stream`] wraps the buffer as a
//! lazy `Stream` over any chunked byte source.

use crate::error::ScoutError;
use futures::{Stream, StreamExt};
use parcel_common::Parcel;
use std::fmt;

/// Malformed-line samples kept for reporting; the count is always exact
const MAX_RETAINED_ERRORS: usize = 20;

/// One dropped line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line number within the stream, blank lines included
    pub line_number: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line_number, self.message)
    }
}

/// Parse statistics at end of stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Non-blank lines seen (valid and malformed)
    pub lines: usize,
    pub malformed_lines: usize,
    /// First few malformed lines
    pub errors: Vec<ParseError>,
}

/// Result of [`LineBuffer::finish`]
#[derive(Debug)]
pub struct FinishedParse {
    /// Record decoded from the unterminated final line, if any
    pub last: Option<Parcel>,
    pub stats: ParseStats,
}

/// Incremental newline splitter and record decoder
///
/// One instance per stream; [`LineBuffer::finish`] consumes it.
#[derive(Debug, Default)]
pub struct LineBuffer {
    leftover: Vec<u8>,
    line_number: usize,
    stats: ParseStats,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the records completed by it, in order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Parcel> {
        let mut buf = std::mem::take(&mut self.leftover);
        // Bytes already buffered hold no newline
        let mut scan_from = buf.len();
        buf.extend_from_slice(chunk);

        let mut parcels = Vec::new();
        let mut line_start = 0;
        while let Some(offset) = buf[scan_from..].iter().position(|&b| b == b'\n') {
            let line_end = scan_from + offset;
            self.line_number += 1;
            if let Some(parcel) = self.parse_line(&buf[line_start..line_end]) {
                parcels.push(parcel);
            }
            line_start = line_end + 1;
            scan_from = line_start;
        }

        buf.drain(..line_start);
        self.leftover = buf;
        parcels
    }

    /// Parse the unterminated tail, if any, and return final statistics
    pub fn finish(mut self) -> FinishedParse {
        let tail = std::mem::take(&mut self.leftover);
        if !tail.is_empty() {
            self.line_number += 1;
        }
        let last = self.parse_line(&tail);
        FinishedParse {
            last,
            stats: self.stats,
        }
    }

    /// Bytes waiting for a newline
    pub fn pending_bytes(&self) -> usize {
        self.leftover.len()
    }

    pub fn malformed_lines(&self) -> usize {
        self.stats.malformed_lines
    }

    /// Statistics for the lines completed so far
    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    fn parse_line(&mut self, raw: &[u8]) -> Option<Parcel> {
        let line = trim_ascii(raw);
        if line.is_empty() {
            return None;
        }

        self.stats.lines += 1;

        match Parcel::from_json_slice(line) {
            Ok(parcel) => Some(parcel),
            Err(e) => {
                self.stats.malformed_lines += 1;
                tracing::warn!(
                    line = self.line_number,
                    error = %e,
                    "Skipping malformed parcel line"
                );
                if self.stats.errors.len() < MAX_RETAINED_ERRORS {
                    self.stats.errors.push(ParseError {
                        line_number: self.line_number,
                        message: e.to_string(),
                    });
                }
                None
            }
        }
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// Item produced by [`parse_stream`]
#[derive(Debug)]
pub enum StreamItem {
    /// One decoded record, in arrival order
    Parcel(Parcel),
    /// Source closed cleanly; always the last item of a successful stream
    End(ParseStats),
    /// Source failed; statistics for the complete lines, followed by the error
    Interrupted(ParseStats),
}

/// Lazily decode a chunked byte stream into parcels
///
/// Yields `Ok(StreamItem::Parcel)` per record, then `Ok(StreamItem::End)` when the
/// source closes. A source error yields `Ok(StreamItem::Interrupted)` followed by one
/// `Err(ScoutError::Transport)` and ends the stream; the incomplete tail is discarded.
pub fn parse_stream<S, B, E>(source: S) -> impl Stream<Item = Result<StreamItem, ScoutError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    async_stream::stream! {
        let mut buffer = LineBuffer::new();
        let mut failure = None;
        futures::pin_mut!(source);

        while let Some(chunk) = source.next().await {
            match chunk {
                Ok(bytes) => {
                    for parcel in buffer.push(bytes.as_ref()) {
                        yield Ok(StreamItem::Parcel(parcel));
                    }
                }
                Err(e) => {
                    failure = Some(e.to_string());
                    break;
                }
            }
        }

        match failure {
            Some(message) => {
                yield Ok(StreamItem::Interrupted(buffer.stats().clone()));
                yield Err(ScoutError::Transport(message));
            }
            None => {
                let finished = buffer.finish();
                if let Some(parcel) = finished.last {
                    yield Ok(StreamItem::Parcel(parcel));
                }
                yield Ok(StreamItem::End(finished.stats));
            }
        }
    }
}
