//! K-mer vectorizer: fitted vocabulary + term weighting
//!
//! # Weighting
//!
//! - [`Weighting::TfIdf`] (default): `count(t) · idf(t)` with the smoothed
//!   inverse document frequency `idf(t) = ln((1 + n) / (1 + df(t))) + 1`,
//!   followed by L2 normalization of the row.
//! - [`Weighting::TermFrequency`]: raw k-mer counts.
//!
//! The vocabulary is every k-mer observed while fitting, sorted
//! lexicographically; a k-mer's feature index is its position in that order.
//! K-mers not in the vocabulary are dropped at transform time, so a sequence
//! made only of unseen k-mers becomes the all-zero vector.
//!
//! # Examples
//!
//! ```
//! use protox::features::{KmerSize, KmerVectorizer, Weighting};
//!
//! let corpus = ["MKTAYIAK", "MKTLLV"];
//! let vectorizer = KmerVectorizer::fit(&corpus, KmerSize::default(), Weighting::TfIdf)?;
//!
//! assert_eq!(vectorizer.dimension(), 9);
//! let features = vectorizer.transform("WWWW");
//! assert!(features.is_zero());
//! # Ok::<(), protox::ProtoxError>(())
//! ```

use crate::error::{ProtoxError, Result};
use crate::features::kmer::{kmer_counts, kmer_iter, KmerSize};
use crate::features::sparse::SparseVector;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Term weighting applied to k-mer counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Weighting {
    /// Raw k-mer counts
    #[serde(rename = "term-frequency")]
    TermFrequency,
    /// Smoothed TF-IDF with L2 row normalization
    #[default]
    #[serde(rename = "tfidf")]
    TfIdf,
}

/// Frozen mapping from k-mer multisets to feature vectors
///
/// Built once by [`KmerVectorizer::fit`], then used read-only. The vectorizer
/// carries its own [`KmerSize`] so inference windows sequences exactly as
/// training did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VectorizerState", into = "VectorizerState")]
pub struct KmerVectorizer {
    kmer_size: KmerSize,
    weighting: Weighting,
    vocabulary: Vec<String>,
    idf: Vec<f64>,
    index: HashMap<String, usize>,
}

/// Persisted form of [`KmerVectorizer`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VectorizerState {
    kmer_size: KmerSize,
    weighting: Weighting,
    vocabulary: Vec<String>,
    #[serde(default)]
    idf: Vec<f64>,
}

impl KmerVectorizer {
    /// Learn the vocabulary (and document frequencies) from a corpus
    ///
    /// # Errors
    ///
    /// [`ProtoxError::InvalidTrainingData`] when the corpus is empty or no
    /// sequence is long enough to yield a single k-mer.
    pub fn fit<S: AsRef<str>>(
        sequences: &[S],
        kmer_size: KmerSize,
        weighting: Weighting,
    ) -> Result<Self> {
        if sequences.is_empty() {
            return Err(ProtoxError::InvalidTrainingData(
                "cannot fit vectorizer on an empty corpus".to_string(),
            ));
        }

        // BTreeMap keeps the vocabulary in lexicographic order
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for sequence in sequences {
            let unique: HashSet<&str> = kmer_iter(sequence.as_ref(), kmer_size).collect();
            for kmer in unique {
                *document_frequency.entry(kmer.to_string()).or_insert(0) += 1;
            }
        }

        if document_frequency.is_empty() {
            return Err(ProtoxError::InvalidTrainingData(format!(
                "empty vocabulary: no sequence has at least {} residues",
                kmer_size
            )));
        }

        let n_documents = sequences.len() as f64;
        let (vocabulary, idf): (Vec<String>, Vec<f64>) = document_frequency
            .into_iter()
            .map(|(kmer, df)| {
                let idf = ((1.0 + n_documents) / (1.0 + df as f64)).ln() + 1.0;
                (kmer, idf)
            })
            .unzip();

        let idf = match weighting {
            Weighting::TfIdf => idf,
            Weighting::TermFrequency => Vec::new(),
        };

        tracing::debug!(
            documents = sequences.len(),
            vocabulary = vocabulary.len(),
            k = kmer_size.get(),
            "fitted k-mer vectorizer"
        );

        Ok(Self::from_parts(kmer_size, weighting, vocabulary, idf))
    }

    /// Fit on a corpus and transform the same corpus
    pub fn fit_transform<S: AsRef<str>>(
        sequences: &[S],
        kmer_size: KmerSize,
        weighting: Weighting,
    ) -> Result<(Self, Vec<SparseVector>)> {
        let vectorizer = Self::fit(sequences, kmer_size, weighting)?;
        let rows = sequences
            .iter()
            .map(|sequence| vectorizer.transform(sequence.as_ref()))
            .collect();
        Ok((vectorizer, rows))
    }

    fn from_parts(
        kmer_size: KmerSize,
        weighting: Weighting,
        vocabulary: Vec<String>,
        idf: Vec<f64>,
    ) -> Self {
        let index = vocabulary
            .iter()
            .enumerate()
            .map(|(position, kmer)| (kmer.clone(), position))
            .collect();
        Self {
            kmer_size,
            weighting,
            vocabulary,
            idf,
            index,
        }
    }

    /// Map a sequence to its feature vector
    ///
    /// Out-of-vocabulary k-mers are ignored. Never fails: sequences shorter
    /// than k, or made only of unseen k-mers, give the zero vector.
    pub fn transform(&self, sequence: &str) -> SparseVector {
        let mut pairs: Vec<(usize, f64)> = kmer_counts(sequence, self.kmer_size)
            .into_iter()
            .filter_map(|(kmer, count)| {
                self.index.get(kmer).map(|&feature| {
                    let weight = match self.weighting {
                        Weighting::TfIdf => self.idf[feature],
                        Weighting::TermFrequency => 1.0,
                    };
                    (feature, count as f64 * weight)
                })
            })
            .collect();
        pairs.sort_unstable_by_key(|&(feature, _)| feature);

        // Vocabulary positions are unique and below the dimension
        let mut vector = SparseVector::from_sorted_pairs(self.dimension(), pairs);

        if self.weighting == Weighting::TfIdf {
            vector.normalize_l2();
        }
        vector
    }

    /// Number of features (vocabulary size)
    pub fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    /// Window length used for featurization
    pub fn kmer_size(&self) -> KmerSize {
        self.kmer_size
    }

    /// Term weighting scheme
    pub fn weighting(&self) -> Weighting {
        self.weighting
    }

    /// Vocabulary in feature-index order
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Feature index of a k-mer, if it is in the vocabulary
    pub fn feature_index(&self, kmer: &str) -> Option<usize> {
        self.index.get(kmer).copied()
    }

    /// Inverse document frequency of a feature (1.0 for term-frequency weighting)
    pub fn idf(&self, feature: usize) -> Option<f64> {
        match self.weighting {
            Weighting::TfIdf => self.idf.get(feature).copied(),
            Weighting::TermFrequency => (feature < self.dimension()).then_some(1.0),
        }
    }
}

impl TryFrom<VectorizerState> for KmerVectorizer {
    type Error = String;

    fn try_from(state: VectorizerState) -> std::result::Result<Self, String> {
        if state.vocabulary.is_empty() {
            return Err("vectorizer has an empty vocabulary".to_string());
        }

        for window in state.vocabulary.windows(2) {
            if window[0] >= window[1] {
                return Err(format!(
                    "vocabulary is not sorted and unique near {:?}",
                    window[1]
                ));
            }
        }

        for kmer in &state.vocabulary {
            if kmer.chars().count() != state.kmer_size.get() {
                return Err(format!(
                    "vocabulary entry {:?} does not have {} residues",
                    kmer, state.kmer_size
                ));
            }
        }

        match state.weighting {
            Weighting::TfIdf => {
                if state.idf.len() != state.vocabulary.len() {
                    return Err(format!(
                        "idf has {} weights for {} vocabulary entries",
                        state.idf.len(),
                        state.vocabulary.len()
                    ));
                }
                if let Some(bad) = state.idf.iter().find(|w| !w.is_finite() || **w <= 0.0) {
                    return Err(format!("invalid idf weight {}", bad));
                }
            }
            Weighting::TermFrequency => {
                if !state.idf.is_empty() {
                    return Err("term-frequency vectorizer must not carry idf weights".to_string());
                }
            }
        }

        Ok(Self::from_parts(
            state.kmer_size,
            state.weighting,
            state.vocabulary,
            state.idf,
        ))
    }
}

impl From<KmerVectorizer> for VectorizerState {
    fn from(vectorizer: KmerVectorizer) -> Self {
        Self {
            kmer_size: vectorizer.kmer_size,
            weighting: vectorizer.weighting,
            vocabulary: vectorizer.vocabulary,
            idf: vectorizer.idf,
        }
    }
}
