//! Prediction service: frozen vectorizer + classifier + decision threshold
//!
//! A [`ToxicityPredictor`] is built once (from freshly trained state or from
//! artifacts on disk) and is read-only afterwards. It is `Send + Sync`, so a
//! long-running front-end can share one instance by reference or `Arc`.
//!
//! # Example
//!
//! ```no_run
//! use protox::{ToxicityPredictor, ProtoxError};
//!
//! let predictor = ToxicityPredictor::from_dir("models", 0.5)?;
//!
//! match predictor.predict("MKTAYIAKQRQISFVKSHFSRQ") {
//!     Ok(prediction) => println!("{}", prediction),
//!     Err(ProtoxError::EmptyInput) => eprintln!("Please enter a protein sequence."),
//!     Err(e) => eprintln!("{}", e),
//! }
//! # Ok::<(), ProtoxError>(())
//! ```

use crate::config::validate_threshold;
use crate::error::{ProtoxError, Result};
use crate::features::{KmerVectorizer, SparseVector};
use crate::io::artifact::{self, ArtifactKind};
use crate::model::RandomForest;
use crate::types::{Prediction, ToxicityLabel};
use std::path::{Path, PathBuf};

/// File name of the persisted vectorizer inside a model directory
pub const VECTORIZER_FILE: &str = "vectorizer.json";

/// File name of the persisted classifier inside a model directory
pub const CLASSIFIER_FILE: &str = "toxicity_model.json";

/// Locations of the two artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Vectorizer artifact
    pub vectorizer: PathBuf,
    /// Classifier artifact
    pub classifier: PathBuf,
}

impl ArtifactPaths {
    /// Standard file names inside `dir`
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            vectorizer: dir.join(VECTORIZER_FILE),
            classifier: dir.join(CLASSIFIER_FILE),
        }
    }
}

/// Immutable toxicity prediction service
#[derive(Debug, Clone)]
pub struct ToxicityPredictor {
    vectorizer: KmerVectorizer,
    forest: RandomForest,
    threshold: f64,
}

impl ToxicityPredictor {
    /// Assemble a predictor from fitted parts
    ///
    /// # Errors
    ///
    /// [`ProtoxError::InvalidParameter`] if the threshold is not within
    /// `[0, 1]`, the forest is structurally invalid, or the vectorizer and
    /// classifier disagree on dimension.
    pub fn new(vectorizer: KmerVectorizer, forest: RandomForest, threshold: f64) -> Result<Self> {
        validate_threshold(threshold)?;
        forest
            .validate()
            .map_err(|msg| ProtoxError::InvalidParameter(format!("invalid classifier: {}", msg)))?;
        if vectorizer.dimension() != forest.n_features() {
            return Err(ProtoxError::InvalidParameter(format!(
                "vectorizer produces {} features but the classifier expects {}",
                vectorizer.dimension(),
                forest.n_features()
            )));
        }
        Ok(Self {
            vectorizer,
            forest,
            threshold,
        })
    }

    /// Load both artifacts
    ///
    /// # Errors
    ///
    /// [`ProtoxError::Load`] when either artifact is missing, malformed or
    /// incompatible with the other; [`ProtoxError::InvalidParameter`] for a
    /// threshold outside `[0, 1]`.
    pub fn load(paths: &ArtifactPaths, threshold: f64) -> Result<Self> {
        validate_threshold(threshold)?;

        let vectorizer: KmerVectorizer = artifact::load(&paths.vectorizer, ArtifactKind::Vectorizer)?;
        let forest: RandomForest = artifact::load(&paths.classifier, ArtifactKind::Classifier)?;

        let predictor = Self::new(vectorizer, forest, threshold)
            .map_err(|e| ProtoxError::load(&paths.classifier, e.to_string()))?;

        tracing::info!(
            vectorizer = %paths.vectorizer.display(),
            classifier = %paths.classifier.display(),
            k = predictor.vectorizer.kmer_size().get(),
            features = predictor.vectorizer.dimension(),
            trees = predictor.forest.trees().len(),
            threshold,
            "loaded toxicity model"
        );
        Ok(predictor)
    }

    /// Load `vectorizer.json` and `toxicity_model.json` from a directory
    pub fn from_dir<P: AsRef<Path>>(dir: P, threshold: f64) -> Result<Self> {
        Self::load(&ArtifactPaths::in_dir(dir), threshold)
    }

    /// Same model, different decision threshold
    pub fn with_threshold(mut self, threshold: f64) -> Result<Self> {
        validate_threshold(threshold)?;
        self.threshold = threshold;
        Ok(self)
    }

    /// Classify one sequence
    ///
    /// Surrounding whitespace is ignored. The probability is the toxic-class
    /// mass; the label is toxic iff it exceeds the threshold.
    ///
    /// # Errors
    ///
    /// - [`ProtoxError::EmptyInput`] for a blank sequence (the classifier is
    ///   not consulted)
    /// - [`ProtoxError::Inference`] if scoring fails
    pub fn predict(&self, sequence: &str) -> Result<Prediction> {
        let sequence = sequence.trim();
        if sequence.is_empty() {
            return Err(ProtoxError::EmptyInput);
        }

        let features = self.vectorizer.transform(sequence);
        let probability = self.forest.predict_proba(&features)?;
        let label = ToxicityLabel::from_probability(probability, self.threshold);

        tracing::debug!(
            residues = sequence.chars().count(),
            known_kmers = features.nnz(),
            probability,
            %label,
            "classified sequence"
        );

        Ok(Prediction { label, probability })
    }

    /// Feature vector the classifier sees for a sequence
    pub fn features(&self, sequence: &str) -> SparseVector {
        self.vectorizer.transform(sequence.trim())
    }

    /// Decision threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Frozen vectorizer
    pub fn vectorizer(&self) -> &KmerVectorizer {
        &self.vectorizer
    }

    /// Frozen classifier
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Write both artifacts
    pub fn save(&self, paths: &ArtifactPaths) -> Result<()> {
        artifact::save(&paths.vectorizer, ArtifactKind::Vectorizer, &self.vectorizer)?;
        artifact::save(&paths.classifier, ArtifactKind::Classifier, &self.forest)?;
        Ok(())
    }
}
