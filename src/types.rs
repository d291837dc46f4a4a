//! Common types used throughout protox

use serde::{Deserialize, Serialize};
use std::fmt;

/// A FASTA record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    /// Sequence identifier (without '>' prefix)
    pub id: String,
    /// Free-text description following the identifier (may be empty)
    pub description: String,
    /// Protein sequence, wrapped lines concatenated
    pub sequence: String,
}

impl FastaRecord {
    /// Create a new FASTA record without description
    pub fn new(id: String, sequence: String) -> Self {
        Self {
            id,
            description: String::new(),
            sequence,
        }
    }

    /// Attach a description to the record
    pub fn with_description(mut self, description: String) -> Self {
        self.description = description;
        self
    }

    /// Sequence length in residues
    pub fn len(&self) -> usize {
        self.sequence.chars().count()
    }

    /// Check if the record has an empty sequence
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Binary toxicity class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToxicityLabel {
    /// Class 1 in the training data
    Toxic,
    /// Class 0 in the training data
    NonToxic,
}

impl ToxicityLabel {
    /// Numeric class used by the classifier (toxic = 1, non-toxic = 0)
    pub fn class_index(self) -> u8 {
        match self {
            ToxicityLabel::Toxic => 1,
            ToxicityLabel::NonToxic => 0,
        }
    }

    /// Label from a toxic-class probability and a decision threshold
    ///
    /// Toxic iff `probability > threshold`, so a probability sitting exactly
    /// on the threshold is non-toxic.
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        if probability > threshold {
            ToxicityLabel::Toxic
        } else {
            ToxicityLabel::NonToxic
        }
    }
}

impl fmt::Display for ToxicityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToxicityLabel::Toxic => f.write_str("Toxic"),
            ToxicityLabel::NonToxic => f.write_str("Non-Toxic"),
        }
    }
}

/// Result of classifying one sequence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Discrete class
    pub label: ToxicityLabel,
    /// Probability mass assigned to the toxic class, in `[0, 1]`
    pub probability: f64,
}

impl Prediction {
    /// Probability of the predicted class, `max(p, 1 - p)`
    ///
    /// # Examples
    ///
    /// ```
    /// use protox::{Prediction, ToxicityLabel};
    ///
    /// let prediction = Prediction {
    ///     label: ToxicityLabel::NonToxic,
    ///     probability: 0.2,
    /// };
    /// assert!((prediction.confidence() - 0.8).abs() < 1e-12);
    /// ```
    pub fn confidence(&self) -> f64 {
        self.probability.max(1.0 - self.probability)
    }

    /// True when the label is [`ToxicityLabel::Toxic`]
    pub fn is_toxic(&self) -> bool {
        self.label == ToxicityLabel::Toxic
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (probability of being toxic: {:.2}%, confidence: {:.2}%)",
            self.label,
            self.probability * 100.0,
            self.confidence() * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_threshold_is_strict() {
        assert_eq!(ToxicityLabel::from_probability(0.5, 0.5), ToxicityLabel::NonToxic);
        assert_eq!(ToxicityLabel::from_probability(0.51, 0.5), ToxicityLabel::Toxic);
        assert_eq!(ToxicityLabel::from_probability(0.0, 0.0), ToxicityLabel::NonToxic);
        assert_eq!(ToxicityLabel::from_probability(1.0, 1.0), ToxicityLabel::NonToxic);
    }

    #[test]
    fn test_prediction_display() {
        let prediction = Prediction {
            label: ToxicityLabel::Toxic,
            probability: 0.87,
        };
        assert_eq!(
            prediction.to_string(),
            "Toxic (probability of being toxic: 87.00%, confidence: 87.00%)"
        );
    }

    #[test]
    fn test_label_serializes_snake_case() {
        let json = serde_json::to_string(&ToxicityLabel::NonToxic).unwrap();
        assert_eq!(json, "\"non_toxic\"");
    }

    #[test]
    fn test_record_len_counts_residues() {
        let record = FastaRecord::new("p1".into(), "MKTAYIAK".into());
        assert_eq!(record.len(), 8);
        assert!(!record.is_empty());
    }
}
