//! Sparse feature vectors

/// Fixed-dimension sparse vector with strictly increasing indices
///
/// Only non-zero entries are stored. A vector with no entries is the
/// all-zero vector of its dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVector {
    dimension: usize,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseVector {
    /// All-zero vector
    pub fn zeros(dimension: usize) -> Self {
        Self {
            dimension,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from `(index, value)` pairs
    ///
    /// Pairs are sorted by index, zero values dropped. Indices at or beyond
    /// `dimension` and duplicate indices are rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use protox::features::SparseVector;
    ///
    /// let v = SparseVector::from_pairs(5, vec![(3, 1.0), (1, 2.0)]).unwrap();
    /// assert_eq!(v.get(1), 2.0);
    /// assert_eq!(v.get(0), 0.0);
    /// assert_eq!(v.nnz(), 2);
    /// ```
    pub fn from_pairs(dimension: usize, mut pairs: Vec<(usize, f64)>) -> Result<Self, String> {
        pairs.retain(|&(_, value)| value != 0.0);
        pairs.sort_unstable_by_key(|&(index, _)| index);

        for window in pairs.windows(2) {
            if window[0].0 == window[1].0 {
                return Err(format!("duplicate feature index {}", window[0].0));
            }
        }
        if let Some(&(index, _)) = pairs.last() {
            if index >= dimension {
                return Err(format!(
                    "feature index {} out of range for dimension {}",
                    index, dimension
                ));
            }
        }

        let (indices, values) = pairs.into_iter().unzip();
        Ok(Self {
            dimension,
            indices,
            values,
        })
    }

    /// Build from pairs already sorted by strictly increasing, in-range index
    pub(crate) fn from_sorted_pairs(dimension: usize, pairs: Vec<(usize, f64)>) -> Self {
        debug_assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0));
        debug_assert!(pairs.last().map_or(true, |&(index, _)| index < dimension));

        let (indices, values) = pairs
            .into_iter()
            .filter(|&(_, value)| value != 0.0)
            .unzip();
        Self {
            dimension,
            indices,
            values,
        }
    }

    /// Dimension of the vector
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored (non-zero) entries
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// True when every component is zero
    pub fn is_zero(&self) -> bool {
        self.indices.is_empty()
    }

    /// Component at `index` (zero when not stored)
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(position) => self.values[position],
            Err(_) => 0.0,
        }
    }

    /// Iterate stored `(index, value)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Euclidean norm
    pub fn l2_norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Scale to unit L2 norm; the zero vector is left unchanged
    pub fn normalize_l2(&mut self) {
        let norm = self.l2_norm();
        if norm > 0.0 {
            for value in &mut self.values {
                *value /= norm;
            }
        }
    }

    /// Dense copy of the vector
    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.dimension];
        for (index, value) in self.iter() {
            dense[index] = value;
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let v = SparseVector::zeros(4);
        assert!(v.is_zero());
        assert_eq!(v.dimension(), 4);
        assert_eq!(v.to_dense(), vec![0.0; 4]);
        assert_eq!(v.l2_norm(), 0.0);
    }

    #[test]
    fn test_from_pairs_sorts_and_drops_zeros() {
        let v = SparseVector::from_pairs(6, vec![(4, 2.0), (0, 0.0), (2, 1.0)]).unwrap();
        assert_eq!(v.iter().collect::<Vec<_>>(), vec![(2, 1.0), (4, 2.0)]);
    }

    #[test]
    fn test_from_pairs_rejects_out_of_range() {
        assert!(SparseVector::from_pairs(3, vec![(3, 1.0)]).is_err());
    }

    #[test]
    fn test_from_pairs_rejects_duplicates() {
        assert!(SparseVector::from_pairs(3, vec![(1, 1.0), (1, 2.0)]).is_err());
    }

    #[test]
    fn test_from_sorted_pairs_drops_zeros() {
        let v = SparseVector::from_sorted_pairs(5, vec![(0, 1.5), (2, 0.0), (4, 3.0)]);
        assert_eq!(v.iter().collect::<Vec<_>>(), vec![(0, 1.5), (4, 3.0)]);
        assert_eq!(v, SparseVector::from_pairs(5, vec![(4, 3.0), (0, 1.5)]).unwrap());
    }

    #[test]
    fn test_normalize_l2() {
        let mut v = SparseVector::from_pairs(3, vec![(0, 3.0), (2, 4.0)]).unwrap();
        v.normalize_l2();
        assert!((v.get(0) - 0.6).abs() < 1e-12);
        assert!((v.get(2) - 0.8).abs() < 1e-12);
        assert!((v.l2_norm() - 1.0).abs() < 1e-12);

        let mut zero = SparseVector::zeros(3);
        zero.normalize_l2();
        assert!(zero.is_zero());
    }
}
