//! Data sources with transparent gzip handling
//!
//! Readers sniff the gzip magic bytes (`1f 8b`) and decompress on the fly,
//! so `toxins.fasta` and `toxins.fasta.gz` are read the same way. Multi-member
//! streams (bgzip) are decoded in full.
//!
//! Writers compress when the destination path ends in `.gz`.

use crate::error::Result;
use flate2::bufread::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Gzip magic bytes
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Where input comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Local file path
    Local(PathBuf),
    /// Standard input
    Stdin,
}

impl DataSource {
    /// Create a local file data source
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        DataSource::Local(path.as_ref().to_path_buf())
    }

    /// Local file, or standard input for the conventional `-`
    pub fn from_arg<P: AsRef<Path>>(path: P) -> Self {
        if path.as_ref() == Path::new("-") {
            DataSource::Stdin
        } else {
            Self::from_path(path)
        }
    }

    /// Open the data source and return a buffered reader
    pub fn open(&self) -> Result<Box<dyn BufRead + Send>> {
        match self {
            DataSource::Local(path) => {
                let file = File::open(path)?;
                Ok(Box::new(BufReader::new(file)))
            }
            DataSource::Stdin => Ok(Box::new(BufReader::new(io::stdin()))),
        }
    }
}

/// Buffered reader that decompresses gzip input when it sees the magic bytes
///
/// # Example
///
/// ```no_run
/// use protox::io::compression::{CompressedReader, DataSource};
/// use std::io::BufRead;
///
/// let reader = CompressedReader::new(DataSource::from_path("toxins.fasta.gz"))?;
/// for line in reader.lines() {
///     println!("{}", line?);
/// }
/// # Ok::<(), protox::ProtoxError>(())
/// ```
pub struct CompressedReader {
    inner: Box<dyn BufRead + Send>,
}

impl CompressedReader {
    /// Open a data source, detecting compression from its first two bytes
    pub fn new(source: DataSource) -> Result<Self> {
        let reader = source.open()?;
        Self::from_reader(reader)
    }

    /// Wrap an already-open reader, detecting compression
    pub fn from_reader(mut reader: Box<dyn BufRead + Send>) -> Result<Self> {
        let is_gzipped = {
            let peeked = reader.fill_buf()?;
            peeked.len() >= 2 && peeked[..2] == GZIP_MAGIC
        };

        if is_gzipped {
            Ok(Self {
                inner: Box::new(BufReader::new(MultiGzDecoder::new(reader))),
            })
        } else {
            Ok(Self { inner: reader })
        }
    }

    /// Get the inner buffered reader
    pub fn into_inner(self) -> Box<dyn BufRead + Send> {
        self.inner
    }
}

impl Read for CompressedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for CompressedReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

/// Output writer, gzip-compressed when the path ends in `.gz`
///
/// Call [`CompressedWriter::finish`] to flush and write the gzip trailer;
/// dropping the writer without it may truncate the output.
pub enum CompressedWriter {
    /// Uncompressed output
    Plain(BufWriter<File>),
    /// Gzip output
    Gzip(GzEncoder<BufWriter<File>>),
}

impl CompressedWriter {
    /// Create (or truncate) `path`
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let file = BufWriter::new(File::create(path)?);
        if is_gz_path(path) {
            Ok(CompressedWriter::Gzip(GzEncoder::new(file, Compression::default())))
        } else {
            Ok(CompressedWriter::Plain(file))
        }
    }

    /// Flush all data and finalize the stream
    pub fn finish(self) -> io::Result<()> {
        match self {
            CompressedWriter::Plain(mut writer) => writer.flush(),
            CompressedWriter::Gzip(encoder) => encoder.finish()?.flush(),
        }
    }
}

impl Write for CompressedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            CompressedWriter::Plain(writer) => writer.write(buf),
            CompressedWriter::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            CompressedWriter::Plain(writer) => writer.flush(),
            CompressedWriter::Gzip(encoder) => encoder.flush(),
        }
    }
}

fn is_gz_path(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "gz")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(mut reader: CompressedReader) -> String {
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_plain_passthrough() {
        let reader = CompressedReader::from_reader(Box::new(Cursor::new(b">p1\nMKT\n".to_vec())))
            .unwrap();
        assert_eq!(read_all(reader), ">p1\nMKT\n");
    }

    #[test]
    fn test_gzip_detected() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b">p1\nMKT\n").unwrap();
        let compressed = encoder.finish().unwrap();

        let reader = CompressedReader::from_reader(Box::new(Cursor::new(compressed))).unwrap();
        assert_eq!(read_all(reader), ">p1\nMKT\n");
    }

    #[test]
    fn test_empty_input() {
        let reader = CompressedReader::from_reader(Box::new(Cursor::new(Vec::new()))).unwrap();
        assert_eq!(read_all(reader), "");
    }

    #[test]
    fn test_writer_roundtrip_gz() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt.gz");

        let mut writer = CompressedWriter::create(&path).unwrap();
        assert!(matches!(writer, CompressedWriter::Gzip(_)));
        writer.write_all(b"hello").unwrap();
        writer.finish().unwrap();

        let reader = CompressedReader::new(DataSource::from_path(&path)).unwrap();
        assert_eq!(read_all(reader), "hello");
    }

    #[test]
    fn test_from_arg_dash_is_stdin() {
        assert_eq!(DataSource::from_arg("-"), DataSource::Stdin);
        assert_eq!(
            DataSource::from_arg("a.fa"),
            DataSource::Local(PathBuf::from("a.fa"))
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = CompressedReader::new(DataSource::from_path("/nonexistent/protox.fa"));
        assert!(matches!(result, Err(crate::ProtoxError::Io(_))));
    }
}
