//! FASTA input: streaming parser for protein collections
//!
//! # Basic Usage
//!
//! ```no_run
//! use protox::io::fasta::FastaStream;
//!
//! let stream = FastaStream::from_path("toxins.fasta")?;
//! for record in stream {
//!     let record = record?;
//!     println!("{}: {} aa", record.id, record.len());
//! }
//! # Ok::<(), protox::ProtoxError>(())
//! ```

mod parser;

pub use parser::{read_sequences, FastaStream};
