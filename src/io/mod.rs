//! I/O module: FASTA input, compression and model artifacts

pub mod artifact;
pub mod compression;
pub mod fasta;

pub use artifact::{ArtifactKind, ARTIFACT_VERSION};
pub use compression::{CompressedReader, CompressedWriter, DataSource};
pub use fasta::{read_sequences, FastaStream};
