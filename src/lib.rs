//! protox: protein toxicity prediction from k-mer features
//!
//! # Overview
//!
//! A protein sequence is cut into overlapping k-mers (default k = 3), the
//! k-mer multiset is mapped onto a fixed TF-IDF feature space learned at
//! training time, and a seeded random forest scores the probability that the
//! protein is toxic. The label is toxic iff that probability exceeds the
//! decision threshold (default 0.5).
//!
//! ## Quick Start
//!
//! ```no_run
//! use protox::{ProtoxConfig, TrainingSet, train};
//!
//! # fn main() -> protox::Result<()> {
//! let set = TrainingSet::from_fasta("toxin.fasta", "non_toxin.fasta")?;
//! let model = train(&set, &ProtoxConfig::default())?;
//! model.save("models")?;
//!
//! let predictor = protox::ToxicityPredictor::from_dir("models", 0.5)?;
//! let prediction = predictor.predict("MKTAYIAKQRQISFVKSHFSRQ")?;
//! println!("{}", prediction);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`features`]: k-mer featurizer, sparse vectors, TF-IDF vectorizer
//! - [`model`]: CART trees and the random forest
//! - [`io`]: FASTA input, gzip detection, versioned JSON artifacts
//! - [`predictor`]: the immutable prediction service
//! - [`report`]: text and JSON output for predictions, batches and training runs
//! - [`training`]: the offline training pipeline
//! - [`config`]: TOML configuration

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod model;
pub mod predictor;
pub mod report;
pub mod training;
pub mod types;

// Re-export commonly used types
pub use config::{ProtoxConfig, DEFAULT_THRESHOLD};
pub use error::{ProtoxError, Result};
pub use features::{featurize, KmerSize, KmerVectorizer, DEFAULT_KMER_SIZE};
pub use io::FastaStream;
pub use model::{ForestParams, RandomForest};
pub use predictor::{ArtifactPaths, ToxicityPredictor};
pub use report::{write_batch, BatchSummary, OutputFormat};
pub use training::{train, TrainedModel, TrainingSet, TrainingSummary};
pub use types::{FastaRecord, Prediction, ToxicityLabel};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
