//! Sequence featurization: k-mer windowing and vectorization
//!
//! - [`kmer`]: the windowing rule shared by training and inference
//! - [`vectorizer`]: fitted vocabulary and TF-IDF / term-frequency weighting
//! - [`sparse`]: the sparse feature vector consumed by the classifier

pub mod kmer;
pub mod sparse;
pub mod vectorizer;

pub use kmer::{featurize, kmer_counts, kmer_iter, KmerSize, DEFAULT_KMER_SIZE};
pub use sparse::SparseVector;
pub use vectorizer::{KmerVectorizer, Weighting};
