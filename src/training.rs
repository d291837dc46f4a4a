//! Offline training: two FASTA collections in, two artifacts out

use crate::config::ProtoxConfig;
use crate::error::{ProtoxError, Result};
use crate::features::KmerVectorizer;
use crate::io::artifact::{self, ArtifactKind};
use crate::io::read_sequences;
use crate::model::RandomForest;
use crate::predictor::{ArtifactPaths, ToxicityPredictor};
use crate::types::ToxicityLabel;
use serde::Serialize;
use std::path::Path;

/// Labelled sequences in training order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrainingSet {
    sequences: Vec<String>,
    labels: Vec<ToxicityLabel>,
}

impl TrainingSet {
    /// Empty training set
    pub fn new() -> Self {
        Self::default()
    }

    /// Read toxic and non-toxic FASTA collections (toxic first)
    pub fn from_fasta<P: AsRef<Path>, Q: AsRef<Path>>(toxic: P, non_toxic: Q) -> Result<Self> {
        let mut set = Self::new();
        set.extend(ToxicityLabel::Toxic, read_sequences(toxic.as_ref())?);
        set.extend(ToxicityLabel::NonToxic, read_sequences(non_toxic.as_ref())?);

        let (toxic_count, non_toxic_count) = set.counts();
        tracing::info!(
            toxic = %toxic.as_ref().display(),
            non_toxic = %non_toxic.as_ref().display(),
            toxic_count,
            non_toxic_count,
            "read training sequences"
        );
        Ok(set)
    }

    /// Add one labelled sequence
    pub fn push(&mut self, sequence: impl Into<String>, label: ToxicityLabel) {
        self.sequences.push(sequence.into());
        self.labels.push(label);
    }

    /// Add many sequences sharing a label
    pub fn extend<I, S>(&mut self, label: ToxicityLabel, sequences: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for sequence in sequences {
            self.push(sequence, label);
        }
    }

    /// Sequences in training order
    pub fn sequences(&self) -> &[String] {
        &self.sequences
    }

    /// Labels aligned with [`sequences`](Self::sequences)
    pub fn labels(&self) -> &[ToxicityLabel] {
        &self.labels
    }

    /// Number of sequences
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// No sequences yet
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// `(toxic, non_toxic)` sample counts
    pub fn counts(&self) -> (usize, usize) {
        let toxic = self
            .labels
            .iter()
            .filter(|label| **label == ToxicityLabel::Toxic)
            .count();
        (toxic, self.labels.len() - toxic)
    }
}

/// What a training run produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingSummary {
    /// Toxic samples
    pub toxic: usize,
    /// Non-toxic samples
    pub non_toxic: usize,
    /// Vectorizer dimension
    pub vocabulary: usize,
    /// Fitted trees
    pub trees: usize,
    /// Fraction of training samples classified correctly at the configured threshold
    pub training_accuracy: f64,
}

/// Fitted vectorizer and forest, ready to save or serve
#[derive(Debug, Clone)]
pub struct TrainedModel {
    /// Fitted vectorizer
    pub vectorizer: KmerVectorizer,
    /// Fitted forest
    pub forest: RandomForest,
    /// Run statistics
    pub summary: TrainingSummary,
}

impl TrainedModel {
    /// Write `vectorizer.json` and `toxicity_model.json` into `dir`, creating it if needed
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<ArtifactPaths> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let paths = ArtifactPaths::in_dir(dir);
        artifact::save(&paths.vectorizer, ArtifactKind::Vectorizer, &self.vectorizer)?;
        artifact::save(&paths.classifier, ArtifactKind::Classifier, &self.forest)?;

        tracing::info!(dir = %dir.display(), "saved model artifacts");
        Ok(paths)
    }

    /// Serve predictions from the in-memory model
    pub fn into_predictor(self, threshold: f64) -> Result<ToxicityPredictor> {
        ToxicityPredictor::new(self.vectorizer, self.forest, threshold)
    }
}

/// Fit the vectorizer and the forest on a training set
///
/// # Errors
///
/// - [`ProtoxError::InvalidTrainingData`] if the set is empty, lacks one of
///   the two classes, or yields no k-mers
/// - [`ProtoxError::Config`] if the configuration is invalid
pub fn train(set: &TrainingSet, config: &ProtoxConfig) -> Result<TrainedModel> {
    config.validate()?;
    if set.is_empty() {
        return Err(ProtoxError::InvalidTrainingData(
            "training set is empty".to_string(),
        ));
    }

    let (vectorizer, rows) = KmerVectorizer::fit_transform(
        set.sequences(),
        config.features.kmer_size,
        config.features.weighting,
    )?;
    let forest = RandomForest::fit(&rows, set.labels(), &config.forest)?;

    let threshold = config.prediction.threshold;
    let mut correct = 0usize;
    for (row, label) in rows.iter().zip(set.labels()) {
        if forest.predict(row, threshold)? == *label {
            correct += 1;
        }
    }

    let (toxic, non_toxic) = set.counts();
    let summary = TrainingSummary {
        toxic,
        non_toxic,
        vocabulary: vectorizer.dimension(),
        trees: forest.trees().len(),
        training_accuracy: correct as f64 / set.len() as f64,
    };

    tracing::info!(
        toxic,
        non_toxic,
        vocabulary = summary.vocabulary,
        trees = summary.trees,
        training_accuracy = summary.training_accuracy,
        "training complete"
    );

    Ok(TrainedModel {
        vectorizer,
        forest,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::KmerSize;

    fn small_set() -> TrainingSet {
        let mut set = TrainingSet::new();
        set.extend(
            ToxicityLabel::Toxic,
            ["GCCSDPRCAW", "GCCSNPVCHL", "GCCSHPACAG", "ECCNPACGRH"],
        );
        set.extend(
            ToxicityLabel::NonToxic,
            ["MKTAYIAKQR", "MKVLAAGIVG", "MSDKIIHLTD", "MKTLLVLAVV"],
        );
        set
    }

    fn small_config() -> ProtoxConfig {
        let mut config = ProtoxConfig::default();
        config.forest.n_estimators = 20;
        config.forest.threads = 2;
        config
    }

    #[test]
    fn test_counts() {
        let set = small_set();
        assert_eq!(set.len(), 8);
        assert_eq!(set.counts(), (4, 4));
        assert_eq!(set.labels()[0], ToxicityLabel::Toxic);
        assert_eq!(set.labels()[7], ToxicityLabel::NonToxic);
    }

    #[test]
    fn test_train_summary() {
        let model = train(&small_set(), &small_config()).unwrap();
        assert_eq!(model.summary.toxic, 4);
        assert_eq!(model.summary.non_toxic, 4);
        assert_eq!(model.summary.trees, 20);
        assert_eq!(model.summary.vocabulary, model.vectorizer.dimension());
        assert_eq!(model.forest.n_features(), model.vectorizer.dimension());
        assert!((0.0..=1.0).contains(&model.summary.training_accuracy));
    }

    #[test]
    fn test_train_fits_separable_data() {
        // Disjoint alphabets: every tree separates the classes
        let mut set = TrainingSet::new();
        set.extend(ToxicityLabel::Toxic, ["CCCCCC", "CCCCCCC", "CCCCC"]);
        set.extend(ToxicityLabel::NonToxic, ["AAAAAA", "AAAAAAA", "AAAAA"]);
        let model = train(&set, &small_config()).unwrap();
        assert_eq!(model.summary.training_accuracy, 1.0);
    }

    #[test]
    fn test_train_rejects_empty_set() {
        let result = train(&TrainingSet::new(), &small_config());
        assert!(matches!(result, Err(ProtoxError::InvalidTrainingData(_))));
    }

    #[test]
    fn test_train_rejects_single_class() {
        let mut set = TrainingSet::new();
        set.extend(ToxicityLabel::Toxic, ["GCCSDPRCAW", "GCCSNPVCHL"]);
        let result = train(&set, &small_config());
        assert!(matches!(result, Err(ProtoxError::InvalidTrainingData(_))));
    }

    #[test]
    fn test_train_respects_kmer_size() {
        let mut config = small_config();
        config.features.kmer_size = KmerSize::new(2).unwrap();
        let model = train(&small_set(), &config).unwrap();
        assert_eq!(model.vectorizer.kmer_size().get(), 2);
        assert!(model.vectorizer.vocabulary().iter().all(|kmer| kmer.len() == 2));
    }

    #[test]
    fn test_save_creates_directory() {
        let model = train(&small_set(), &small_config()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("models");

        let paths = model.save(&out).unwrap();
        assert!(paths.vectorizer.ends_with("vectorizer.json"));
        assert!(paths.classifier.ends_with("toxicity_model.json"));
        assert!(paths.vectorizer.exists());
        assert!(paths.classifier.exists());
    }

    #[test]
    fn test_from_fasta_orders_toxic_first() {
        let dir = tempfile::tempdir().unwrap();
        let toxic = dir.path().join("toxic.fasta");
        let non_toxic = dir.path().join("non_toxic.fasta");
        std::fs::write(&toxic, ">t1\nGCCSDPRCAW\n>t2\nGCCS\nNPVCHL\n").unwrap();
        std::fs::write(&non_toxic, ">n1\nMKTAYIAKQR\n").unwrap();

        let set = TrainingSet::from_fasta(&toxic, &non_toxic).unwrap();
        assert_eq!(set.sequences(), &["GCCSDPRCAW", "GCCSNPVCHL", "MKTAYIAKQR"]);
        assert_eq!(
            set.labels(),
            &[
                ToxicityLabel::Toxic,
                ToxicityLabel::Toxic,
                ToxicityLabel::NonToxic
            ]
        );
    }

    #[test]
    fn test_from_fasta_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = TrainingSet::from_fasta(dir.path().join("a.fa"), dir.path().join("b.fa"));
        assert!(matches!(result, Err(ProtoxError::Io(_))));
    }
}
