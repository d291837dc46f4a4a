//! FASTA streaming parser
//!
//! # Format
//!
//! FASTA format consists of:
//! - Header line starting with '>' followed by sequence identifier
//! - One or more sequence lines (can be wrapped)
//!
//! Example:
//! ```text
//! >sp|P0C1Z0|TX1_CONMA Alpha-conotoxin
//! GCCSDPRCNMNNPDYC
//! >sp|P68225|LYSC_HUMAN
//! KVFERCELARTLKRLGMDGYRGISLANWMCLAKWESGYNTRATNYNAGDRSTDYGIFQINSRYWCNDGKTPGAVNACHLSCSALLQDNIADAVACAKRVVRDPQGIRAWVAWRNRCQNRDVRQYVQGCGV
//! ```
//!
//! Wrapped sequence lines are concatenated with all whitespace removed.
//! Residues are kept exactly as written (no case folding, no alphabet check).

use crate::error::{ProtoxError, Result};
use crate::io::compression::{CompressedReader, DataSource};
use crate::types::FastaRecord;
use std::io::BufRead;
use std::path::Path;

/// FASTA streaming parser, one record in memory at a time
///
/// # Example
///
/// ```no_run
/// use protox::FastaStream;
///
/// let stream = FastaStream::from_path("toxins.fasta.gz")?;
/// for record in stream {
///     let record = record?;
///     println!("{}: {} aa", record.id, record.len());
/// }
/// # Ok::<(), protox::ProtoxError>(())
/// ```
pub struct FastaStream<R: BufRead> {
    reader: R,
    line_buffer: String,
    line_number: usize,
    finished: bool,
    /// Peek buffer for look-ahead (to detect next record start)
    next_line: Option<String>,
}

impl FastaStream<CompressedReader> {
    /// Create a FASTA stream from a data source (plain or gzip)
    pub fn new(source: DataSource) -> Result<Self> {
        let compressed_reader = CompressedReader::new(source)?;
        Ok(Self::from_reader(compressed_reader))
    }

    /// Create a FASTA stream from a local file path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(DataSource::from_path(path))
    }
}

impl<R: BufRead> FastaStream<R> {
    /// Create a FASTA stream from any buffered reader
    ///
    /// This is useful for testing or reading from in-memory sources.
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line_buffer: String::with_capacity(256),
            line_number: 0,
            finished: false,
            next_line: None,
        }
    }

    /// Read the next non-empty line, trimmed
    fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            self.line_buffer.clear();
            if self.reader.read_line(&mut self.line_buffer)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.line_buffer.trim();
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
    }

    /// Read a single FASTA record
    fn read_record(&mut self) -> Result<Option<FastaRecord>> {
        if self.finished {
            return Ok(None);
        }

        let header = match self.next_line.take() {
            Some(peeked) => peeked,
            None => match self.read_line()? {
                Some(line) => line,
                None => {
                    self.finished = true;
                    return Ok(None);
                }
            },
        };
        let header_line = self.line_number;

        let Some(header) = header.strip_prefix('>') else {
            // Without a header the record boundaries are lost
            self.finished = true;
            return Err(ProtoxError::InvalidFastaFormat {
                line: header_line,
                msg: format!("Expected '>' at start of header, got: {}", header),
            });
        };

        // ID is the first whitespace-delimited token, the rest is description
        let header = header.trim_start();
        let (id, description) = match header.split_once(char::is_whitespace) {
            Some((id, rest)) => (id.to_string(), rest.trim().to_string()),
            None => (header.to_string(), String::new()),
        };

        let mut sequence = String::new();
        loop {
            match self.read_line()? {
                None => {
                    self.finished = true;
                    break;
                }
                Some(line) if line.starts_with('>') => {
                    self.next_line = Some(line);
                    break;
                }
                Some(line) => {
                    sequence.extend(line.chars().filter(|c| !c.is_whitespace()));
                }
            }
        }

        if sequence.is_empty() {
            return Err(ProtoxError::InvalidFastaFormat {
                line: header_line,
                msg: format!("Record '{}' has no sequence", id),
            });
        }

        Ok(Some(FastaRecord::new(id, sequence).with_description(description)))
    }
}

impl<R: BufRead> Iterator for FastaStream<R> {
    type Item = Result<FastaRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                // A record without sequence leaves the next header peeked, so
                // parsing resumes there; I/O failures end the stream
                if matches!(e, ProtoxError::Io(_)) {
                    self.finished = true;
                    self.next_line = None;
                }
                Some(Err(e))
            }
        }
    }
}

/// Read every sequence of a FASTA source, in file order
///
/// # Errors
///
/// The first I/O or format error encountered.
pub fn read_sequences<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    FastaStream::from_path(path)?
        .map(|record| record.map(|record| record.sequence))
        .collect()
}
