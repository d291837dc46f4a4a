//! Random forest of CART trees
//!
//! # Defaults
//!
//! 100 trees, bootstrap resampling, `sqrt(n_features)` candidate features per
//! node, fully grown trees, seed 42.
//!
//! # Determinism
//!
//! Tree `i` draws its bootstrap sample and feature order from its own RNG
//! seeded with `seed + i`, so a forest depends only on the data and the
//! parameters, never on how many threads fitted it. The generator is
//! ChaCha8, whose output stream is fixed across `rand` releases, so a seed
//! keeps reproducing the same forest after dependency upgrades.
//!
//! # Examples
//!
//! ```
//! use protox::features::SparseVector;
//! use protox::model::{ForestParams, RandomForest};
//! use protox::ToxicityLabel;
//!
//! let rows = vec![
//!     SparseVector::from_pairs(2, vec![(0, 1.0)]).unwrap(),
//!     SparseVector::from_pairs(2, vec![(1, 1.0)]).unwrap(),
//! ];
//! let labels = [ToxicityLabel::Toxic, ToxicityLabel::NonToxic];
//! let params = ForestParams { n_estimators: 10, ..ForestParams::default() };
//!
//! let forest = RandomForest::fit(&rows, &labels, &params)?;
//! let p = forest.predict_proba(&rows[0])?;
//! assert!((0.0..=1.0).contains(&p));
//! # Ok::<(), protox::ProtoxError>(())
//! ```

use crate::error::{ProtoxError, Result};
use crate::features::SparseVector;
use crate::model::dataset::TrainingMatrix;
use crate::model::tree::{DecisionTree, TreeParams};
use crate::types::ToxicityLabel;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Default number of trees
pub const DEFAULT_N_ESTIMATORS: usize = 100;

/// Default RNG seed
pub const DEFAULT_SEED: u64 = 42;

/// Default training thread count
pub const DEFAULT_THREADS: usize = 4;

/// Forest hyperparameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForestParams {
    /// Number of trees
    pub n_estimators: usize,
    /// RNG seed for bootstrap and feature sampling
    pub seed: u64,
    /// Maximum tree depth, 0 = unlimited
    pub max_depth: usize,
    /// Minimum distinct samples needed to split a node
    pub min_samples_split: usize,
    /// Minimum distinct samples in each leaf
    pub min_samples_leaf: usize,
    /// Resample the training set per tree
    pub bootstrap: bool,
    /// Threads used to fit trees
    pub threads: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: DEFAULT_N_ESTIMATORS,
            seed: DEFAULT_SEED,
            max_depth: 0,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            threads: DEFAULT_THREADS,
        }
    }
}

impl ForestParams {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ProtoxError::InvalidParameter(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(ProtoxError::InvalidParameter(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(ProtoxError::InvalidParameter(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if self.threads == 0 {
            return Err(ProtoxError::InvalidParameter(
                "threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn tree_params(&self, n_features: usize) -> TreeParams {
        TreeParams {
            max_depth: (self.max_depth > 0).then_some(self.max_depth),
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: max_features(n_features),
        }
    }
}

/// Candidate features per node: `max(1, floor(sqrt(n_features)))`
pub fn max_features(n_features: usize) -> usize {
    ((n_features as f64).sqrt() as usize).max(1)
}

/// Fitted random forest
///
/// Deserialization runs [`RandomForest::validate`], so every instance, fitted
/// or loaded, predicts without panicking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ForestState")]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<DecisionTree>,
}

#[derive(Deserialize)]
struct ForestState {
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl TryFrom<ForestState> for RandomForest {
    type Error = String;

    fn try_from(state: ForestState) -> std::result::Result<Self, String> {
        let forest = RandomForest {
            n_features: state.n_features,
            trees: state.trees,
        };
        forest.validate()?;
        Ok(forest)
    }
}

impl RandomForest {
    /// Fit a forest on labelled feature rows
    ///
    /// Trees are fitted on a bounded rayon pool; if the pool cannot be
    /// created they are fitted sequentially with identical results.
    ///
    /// # Errors
    ///
    /// [`ProtoxError::InvalidParameter`] for out-of-range parameters,
    /// [`ProtoxError::InvalidTrainingData`] for unusable training data.
    pub fn fit(
        rows: &[SparseVector],
        labels: &[ToxicityLabel],
        params: &ForestParams,
    ) -> Result<Self> {
        params.validate()?;
        let matrix = TrainingMatrix::new(rows, labels)?;
        let tree_params = params.tree_params(matrix.n_features());

        tracing::info!(
            samples = matrix.n_samples(),
            features = matrix.n_features(),
            trees = params.n_estimators,
            max_features = tree_params.max_features,
            threads = params.threads,
            "fitting random forest"
        );

        let trees: Vec<DecisionTree> = match rayon::ThreadPoolBuilder::new()
            .num_threads(params.threads)
            .build()
        {
            Ok(pool) => {
                use rayon::prelude::*;
                pool.install(|| {
                    (0..params.n_estimators)
                        .into_par_iter()
                        .map(|tree_index| fit_tree(&matrix, &tree_params, params, tree_index))
                        .collect()
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "thread pool unavailable, fitting trees sequentially");
                (0..params.n_estimators)
                    .map(|tree_index| fit_tree(&matrix, &tree_params, params, tree_index))
                    .collect()
            }
        };

        Ok(Self {
            n_features: matrix.n_features(),
            trees,
        })
    }

    /// Toxic-class probability: mean of the trees' leaf fractions
    ///
    /// # Errors
    ///
    /// [`ProtoxError::Inference`] if the row's dimension differs from the
    /// training dimension or the result is not a probability.
    pub fn predict_proba(&self, row: &SparseVector) -> Result<f64> {
        if row.dimension() != self.n_features {
            return Err(ProtoxError::Inference(format!(
                "feature vector has dimension {} but the classifier expects {}",
                row.dimension(),
                self.n_features
            )));
        }
        if self.trees.is_empty() {
            return Err(ProtoxError::Inference("classifier has no trees".to_string()));
        }

        let sum: f64 = self.trees.iter().map(|tree| tree.predict_proba(row)).sum();
        let probability = sum / self.trees.len() as f64;

        if !probability.is_finite() {
            return Err(ProtoxError::Inference(format!(
                "classifier produced a non-finite probability ({})",
                probability
            )));
        }
        // Averaging fractions in [0, 1] can only leave the range through rounding
        Ok(probability.clamp(0.0, 1.0))
    }

    /// Predicted class at a decision threshold
    pub fn predict(&self, row: &SparseVector, threshold: f64) -> Result<ToxicityLabel> {
        let probability = self.predict_proba(row)?;
        Ok(ToxicityLabel::from_probability(probability, threshold))
    }

    /// Feature dimension the forest was trained on
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Fitted trees
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Check invariants of a deserialized forest
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.n_features == 0 {
            return Err("forest has zero features".to_string());
        }
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|msg| format!("tree {}: {}", index, msg))?;
        }
        Ok(())
    }
}

fn fit_tree(
    matrix: &TrainingMatrix<'_>,
    tree_params: &TreeParams,
    params: &ForestParams,
    tree_index: usize,
) -> DecisionTree {
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(tree_index as u64));
    let n = matrix.n_samples();

    let mut weights = vec![0u32; n];
    if params.bootstrap {
        for _ in 0..n {
            weights[rng.gen_range(0..n)] += 1;
        }
    } else {
        weights.fill(1);
    }

    DecisionTree::fit(matrix, &weights, tree_params, &mut rng)
}
