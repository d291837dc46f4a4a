//! Labelled feature matrix used while fitting

use crate::error::{ProtoxError, Result};
use crate::features::SparseVector;
use crate::types::ToxicityLabel;

/// Training rows with their class labels
///
/// All rows share one dimension and both classes are present, so every tree
/// fitted on it has something to separate.
#[derive(Debug, Clone)]
pub struct TrainingMatrix<'a> {
    rows: &'a [SparseVector],
    classes: Vec<u8>,
    n_features: usize,
}

impl<'a> TrainingMatrix<'a> {
    /// Pair feature rows with labels
    ///
    /// # Errors
    ///
    /// [`ProtoxError::InvalidTrainingData`] if the inputs are empty, differ in
    /// length, mix dimensions, or contain a single class.
    pub fn new(rows: &'a [SparseVector], labels: &[ToxicityLabel]) -> Result<Self> {
        if rows.is_empty() {
            return Err(ProtoxError::InvalidTrainingData(
                "no training samples".to_string(),
            ));
        }
        if rows.len() != labels.len() {
            return Err(ProtoxError::InvalidTrainingData(format!(
                "{} feature rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }

        let n_features = rows[0].dimension();
        if let Some(row) = rows.iter().find(|row| row.dimension() != n_features) {
            return Err(ProtoxError::InvalidTrainingData(format!(
                "feature rows have mixed dimensions ({} and {})",
                n_features,
                row.dimension()
            )));
        }
        if n_features == 0 {
            return Err(ProtoxError::InvalidTrainingData(
                "feature rows have no columns".to_string(),
            ));
        }

        let classes: Vec<u8> = labels.iter().map(|label| label.class_index()).collect();
        let toxic = classes.iter().filter(|&&class| class == 1).count();
        if toxic == 0 || toxic == classes.len() {
            return Err(ProtoxError::InvalidTrainingData(format!(
                "both classes are required (toxic: {}, non-toxic: {})",
                toxic,
                classes.len() - toxic
            )));
        }

        Ok(Self {
            rows,
            classes,
            n_features,
        })
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    /// Number of feature columns
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Feature value of one sample
    #[inline]
    pub fn value(&self, sample: usize, feature: usize) -> f64 {
        self.rows[sample].get(feature)
    }

    /// Class of one sample (toxic = 1)
    #[inline]
    pub fn class(&self, sample: usize) -> u8 {
        self.classes[sample]
    }

    /// Feature row of one sample
    pub fn row(&self, sample: usize) -> &SparseVector {
        &self.rows[sample]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(dimension: usize, pairs: Vec<(usize, f64)>) -> SparseVector {
        SparseVector::from_pairs(dimension, pairs).unwrap()
    }

    #[test]
    fn test_matrix_accessors() {
        let rows = vec![row(3, vec![(0, 1.0)]), row(3, vec![(2, 0.5)])];
        let labels = [ToxicityLabel::Toxic, ToxicityLabel::NonToxic];
        let matrix = TrainingMatrix::new(&rows, &labels).unwrap();

        assert_eq!(matrix.n_samples(), 2);
        assert_eq!(matrix.n_features(), 3);
        assert_eq!(matrix.value(0, 0), 1.0);
        assert_eq!(matrix.value(1, 0), 0.0);
        assert_eq!(matrix.class(0), 1);
        assert_eq!(matrix.class(1), 0);
    }

    #[test]
    fn test_single_class_rejected() {
        let rows = vec![row(2, vec![(0, 1.0)]), row(2, vec![(1, 1.0)])];
        let labels = [ToxicityLabel::Toxic, ToxicityLabel::Toxic];
        assert!(matches!(
            TrainingMatrix::new(&rows, &labels),
            Err(ProtoxError::InvalidTrainingData(_))
        ));
    }

    #[test]
    fn test_mismatched_inputs_rejected() {
        let rows = vec![row(2, vec![]), row(3, vec![])];
        let labels = [ToxicityLabel::Toxic, ToxicityLabel::NonToxic];
        assert!(TrainingMatrix::new(&rows, &labels).is_err());
        assert!(TrainingMatrix::new(&rows[..1], &labels).is_err());
        assert!(TrainingMatrix::new(&[], &[]).is_err());
    }
}
