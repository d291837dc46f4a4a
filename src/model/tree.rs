//! CART decision tree (Gini impurity) over sparse feature rows
//!
//! # Fitting
//!
//! Each node draws candidate features uniformly without replacement. After
//! `max_features` draws the search stops as soon as a valid split has been
//! found; otherwise it keeps drawing until one is found or every feature has
//! been tried. Constant features never yield a split.
//!
//! For a candidate feature the node's samples are sorted by value and every
//! boundary between two distinct values is scored by the weighted Gini
//! impurity of the two children. The split threshold is the midpoint of the
//! boundary values; samples with `x[feature] <= threshold` go left.
//!
//! Sample weights are bootstrap multiplicities: impurities and leaf fractions
//! are weighted, while `min_samples_split` / `min_samples_leaf` count distinct
//! samples.

use crate::features::SparseVector;
use crate::model::dataset::TrainingMatrix;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    /// Maximum depth (root has depth 0); `None` grows until leaves are pure
    pub max_depth: Option<usize>,
    /// Minimum distinct samples a node needs to be split
    pub min_samples_split: usize,
    /// Minimum distinct samples in each child of a split
    pub min_samples_leaf: usize,
    /// Candidate features drawn per node before settling for the best split
    pub max_features: usize,
}

/// Tree node; children always sit at larger indices than their parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Internal node
    Split {
        /// Feature tested at this node
        feature: usize,
        /// Samples with `x[feature] <= threshold` go left
        threshold: f64,
        /// Index of the left child
        left: usize,
        /// Index of the right child
        right: usize,
    },
    /// Terminal node
    Leaf {
        /// Weighted fraction of toxic training samples reaching the leaf
        toxic_fraction: f64,
        /// Distinct training samples reaching the leaf
        samples: usize,
    },
}

/// Fitted decision tree, nodes stored in a flat vector rooted at index 0
///
/// Deserialization checks the node structure, so a loaded tree can always be
/// walked without indexing out of bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TreeState")]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

#[derive(Deserialize)]
struct TreeState {
    nodes: Vec<Node>,
}

impl TryFrom<TreeState> for DecisionTree {
    type Error = String;

    fn try_from(state: TreeState) -> std::result::Result<Self, String> {
        let tree = DecisionTree { nodes: state.nodes };
        // Feature bounds are checked by the owning forest
        tree.validate(usize::MAX)?;
        Ok(tree)
    }
}

/// Node waiting to be grown
struct Pending {
    index: usize,
    samples: Vec<usize>,
    depth: usize,
}

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTree {
    /// Grow a tree on the samples with non-zero weight
    ///
    /// `weights` holds one multiplicity per sample of `matrix`.
    pub fn fit<R: Rng + ?Sized>(
        matrix: &TrainingMatrix<'_>,
        weights: &[u32],
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let samples: Vec<usize> = (0..matrix.n_samples())
            .filter(|&sample| weights[sample] > 0)
            .collect();

        let placeholder = Node::Leaf {
            toxic_fraction: 0.0,
            samples: 0,
        };
        let mut nodes = vec![placeholder.clone()];
        let mut stack = vec![Pending {
            index: 0,
            samples,
            depth: 0,
        }];
        let mut features: Vec<usize> = (0..matrix.n_features()).collect();
        let mut scratch: Vec<(f64, usize)> = Vec::new();

        while let Some(pending) = stack.pop() {
            let (total, toxic) = class_weights(matrix, weights, &pending.samples);
            let count = pending.samples.len();

            let splittable = toxic > 0.0
                && toxic < total
                && count >= params.min_samples_split
                && count >= 2 * params.min_samples_leaf
                && params.max_depth.map_or(true, |max| pending.depth < max);

            let split = if splittable {
                best_split(
                    matrix,
                    weights,
                    &pending.samples,
                    (total, toxic),
                    params,
                    &mut features,
                    &mut scratch,
                    rng,
                )
            } else {
                None
            };

            let Some(split) = split else {
                nodes[pending.index] = Node::Leaf {
                    toxic_fraction: if total > 0.0 { toxic / total } else { 0.0 },
                    samples: count,
                };
                continue;
            };

            let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = pending
                .samples
                .into_iter()
                .partition(|&sample| matrix.value(sample, split.feature) <= split.threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(placeholder.clone());
            nodes.push(placeholder.clone());
            nodes[pending.index] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };

            stack.push(Pending {
                index: right,
                samples: right_samples,
                depth: pending.depth + 1,
            });
            stack.push(Pending {
                index: left,
                samples: left_samples,
                depth: pending.depth + 1,
            });
        }

        Self { nodes }
    }

    /// Toxic-class probability for one feature row
    ///
    /// Features beyond the row's stored entries read as zero.
    pub fn predict_proba(&self, row: &SparseVector) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { toxic_fraction, .. } => return *toxic_fraction,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row.get(*feature) <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// All nodes, root first
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of leaves
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf { .. }))
            .count()
    }

    /// Length of the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.nodes.len()];
        let mut max_depth = 0;
        for (index, node) in self.nodes.iter().enumerate() {
            if let Node::Split { left, right, .. } = node {
                depths[*left] = depths[index] + 1;
                depths[*right] = depths[index] + 1;
                max_depth = max_depth.max(depths[index] + 1);
            }
        }
        max_depth
    }

    /// Check structural invariants of a deserialized tree
    ///
    /// Children must point forward inside the node vector (which also rules
    /// out cycles), features must be below `n_features`, thresholds finite and
    /// leaf fractions within `[0, 1]`.
    pub fn validate(&self, n_features: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        let mut referenced = vec![false; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {} tests feature {} but only {} features exist",
                            index, feature, n_features
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} has a non-finite threshold", index));
                    }
                    for &child in [left, right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(format!(
                                "node {} has invalid child index {}",
                                index, child
                            ));
                        }
                        if referenced[child] {
                            return Err(format!("node {} has more than one parent", child));
                        }
                        referenced[child] = true;
                    }
                }
                Node::Leaf { toxic_fraction, .. } => {
                    if !(0.0..=1.0).contains(toxic_fraction) {
                        return Err(format!(
                            "leaf {} has probability {} outside [0, 1]",
                            index, toxic_fraction
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Weighted (total, toxic) mass of a node
fn class_weights(matrix: &TrainingMatrix<'_>, weights: &[u32], samples: &[usize]) -> (f64, f64) {
    samples.iter().fold((0.0, 0.0), |(total, toxic), &sample| {
        let weight = f64::from(weights[sample]);
        let toxic_weight = if matrix.class(sample) == 1 { weight } else { 0.0 };
        (total + weight, toxic + toxic_weight)
    })
}

/// Gini impurity of a binary node: 2p(1 - p)
#[inline]
fn gini(toxic: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    let p = toxic / total;
    2.0 * p * (1.0 - p)
}

#[allow(clippy::too_many_arguments)]
fn best_split<R: Rng + ?Sized>(
    matrix: &TrainingMatrix<'_>,
    weights: &[u32],
    samples: &[usize],
    (total, toxic): (f64, f64),
    params: &TreeParams,
    features: &mut [usize],
    scratch: &mut Vec<(f64, usize)>,
    rng: &mut R,
) -> Option<BestSplit> {
    let n_features = features.len();
    let mut best: Option<BestSplit> = None;

    for drawn in 0..n_features {
        if drawn >= params.max_features && best.is_some() {
            break;
        }

        // Incremental Fisher-Yates: features[..drawn] are this node's draws so far
        let pick = rng.gen_range(drawn..n_features);
        features.swap(drawn, pick);
        let feature = features[drawn];

        scratch.clear();
        scratch.extend(
            samples
                .iter()
                .map(|&sample| (matrix.value(sample, feature), sample)),
        );
        scratch.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let (first, last) = (scratch[0].0, scratch[scratch.len() - 1].0);
        if first == last {
            continue;
        }

        let mut left_total = 0.0;
        let mut left_toxic = 0.0;
        for position in 0..scratch.len() - 1 {
            let (value, sample) = scratch[position];
            let weight = f64::from(weights[sample]);
            left_total += weight;
            if matrix.class(sample) == 1 {
                left_toxic += weight;
            }

            let next = scratch[position + 1].0;
            if value == next {
                continue;
            }

            let left_count = position + 1;
            let right_count = scratch.len() - left_count;
            if left_count < params.min_samples_leaf || right_count < params.min_samples_leaf {
                continue;
            }

            let right_total = total - left_total;
            let right_toxic = toxic - left_toxic;
            let impurity = left_total * gini(left_toxic, left_total)
                + right_total * gini(right_toxic, right_total);

            if best.map_or(true, |current| impurity < current.impurity) {
                let mut threshold = value / 2.0 + next / 2.0;
                if threshold >= next || !threshold.is_finite() {
                    threshold = value;
                }
                best = Some(BestSplit {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToxicityLabel;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn row(dimension: usize, pairs: Vec<(usize, f64)>) -> SparseVector {
        SparseVector::from_pairs(dimension, pairs).unwrap()
    }

    fn params(max_features: usize) -> TreeParams {
        TreeParams {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features,
        }
    }

    /// Feature 0 separates the classes, feature 1 is noise, feature 2 is constant
    fn separable() -> (Vec<SparseVector>, Vec<ToxicityLabel>) {
        let rows = vec![
            row(3, vec![(0, 0.9), (1, 0.1)]),
            row(3, vec![(0, 0.8), (1, 0.7)]),
            row(3, vec![(0, 0.7)]),
            row(3, vec![(0, 0.1), (1, 0.6)]),
            row(3, vec![(1, 0.2)]),
            row(3, vec![(0, 0.2), (1, 0.9)]),
        ];
        let labels = vec![
            ToxicityLabel::Toxic,
            ToxicityLabel::Toxic,
            ToxicityLabel::Toxic,
            ToxicityLabel::NonToxic,
            ToxicityLabel::NonToxic,
            ToxicityLabel::NonToxic,
        ];
        (rows, labels)
    }

    #[test]
    fn test_fits_training_data() {
        let (rows, labels) = separable();
        let matrix = TrainingMatrix::new(&rows, &labels).unwrap();
        let weights = vec![1; rows.len()];
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let tree = DecisionTree::fit(&matrix, &weights, &params(3), &mut rng);

        for (row, label) in rows.iter().zip(&labels) {
            let p = tree.predict_proba(row);
            let expected = if *label == ToxicityLabel::Toxic { 1.0 } else { 0.0 };
            assert_eq!(p, expected);
        }
        assert!(tree.validate(3).is_ok());
    }

    #[test]
    fn test_best_feature_chosen_at_root() {
        let (rows, labels) = separable();
        let matrix = TrainingMatrix::new(&rows, &labels).unwrap();
        let weights = vec![1; rows.len()];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = DecisionTree::fit(&matrix, &weights, &params(3), &mut rng);

        match &tree.nodes()[0] {
            Node::Split {
                feature, threshold, ..
            } => {
                assert_eq!(*feature, 0);
                assert!((*threshold - 0.45).abs() < 1e-12);
            }
            Node::Leaf { .. } => panic!("root should split"),
        }
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_zero_weight_samples_ignored() {
        let (rows, labels) = separable();
        let matrix = TrainingMatrix::new(&rows, &labels).unwrap();
        // Only toxic samples carry weight: the root is a pure leaf
        let weights = vec![2, 1, 1, 0, 0, 0];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let tree = DecisionTree::fit(&matrix, &weights, &params(3), &mut rng);

        assert_eq!(tree.nodes().len(), 1);
        assert_eq!(tree.predict_proba(&rows[4]), 1.0);
    }

    #[test]
    fn test_max_depth_zero_gives_weighted_leaf() {
        let (rows, labels) = separable();
        let matrix = TrainingMatrix::new(&rows, &labels).unwrap();
        let weights = vec![3, 1, 0, 1, 1, 0];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let limits = TreeParams {
            max_depth: Some(0),
            ..params(3)
        };
        let tree = DecisionTree::fit(&matrix, &weights, &limits, &mut rng);

        assert_eq!(tree.nodes().len(), 1);
        assert!((tree.predict_proba(&rows[0]) - 4.0 / 6.0).abs() < 1e-12);
        match &tree.nodes()[0] {
            Node::Leaf { samples, .. } => assert_eq!(*samples, 4),
            Node::Split { .. } => panic!("depth limit ignored"),
        }
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let (rows, labels) = separable();
        let matrix = TrainingMatrix::new(&rows, &labels).unwrap();
        let weights = vec![1; rows.len()];
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let limits = TreeParams {
            min_samples_leaf: 2,
            ..params(3)
        };
        let tree = DecisionTree::fit(&matrix, &weights, &limits, &mut rng);

        for node in tree.nodes() {
            if let Node::Leaf { samples, .. } = node {
                assert!(*samples >= 2);
            }
        }
    }

    #[test]
    fn test_constant_features_yield_leaf() {
        let rows = vec![row(2, vec![(0, 1.0)]), row(2, vec![(0, 1.0)])];
        let labels = [ToxicityLabel::Toxic, ToxicityLabel::NonToxic];
        let matrix = TrainingMatrix::new(&rows, &labels).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let tree = DecisionTree::fit(&matrix, &[1, 1], &params(1), &mut rng);

        assert_eq!(tree.nodes().len(), 1);
        assert_eq!(tree.predict_proba(&rows[0]), 0.5);
    }

    #[test]
    fn test_same_seed_same_tree() {
        let (rows, labels) = separable();
        let matrix = TrainingMatrix::new(&rows, &labels).unwrap();
        let weights = vec![1; rows.len()];
        let a = DecisionTree::fit(&matrix, &weights, &params(1), &mut ChaCha8Rng::seed_from_u64(5));
        let b = DecisionTree::fit(&matrix, &weights, &params(1), &mut ChaCha8Rng::seed_from_u64(5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_validate_rejects_bad_structure() {
        let backwards = DecisionTree {
            nodes: vec![Node::Split {
                feature: 0,
                threshold: 0.5,
                left: 0,
                right: 0,
            }],
        };
        assert!(backwards.validate(1).is_err());

        let bad_feature = DecisionTree {
            nodes: vec![
                Node::Split {
                    feature: 4,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                },
                Node::Leaf {
                    toxic_fraction: 0.0,
                    samples: 1,
                },
                Node::Leaf {
                    toxic_fraction: 1.0,
                    samples: 1,
                },
            ],
        };
        assert!(bad_feature.validate(4).is_err());
        assert!(bad_feature.validate(5).is_ok());

        let bad_leaf = DecisionTree {
            nodes: vec![Node::Leaf {
                toxic_fraction: 1.5,
                samples: 1,
            }],
        };
        assert!(bad_leaf.validate(1).is_err());
        assert!(DecisionTree { nodes: vec![] }.validate(1).is_err());
    }

    #[test]
    fn test_deserialize_rejects_dangling_children() {
        let json = r#"{"nodes":[{"kind":"split","feature":0,"threshold":0.5,"left":7,"right":8}]}"#;
        let err = serde_json::from_str::<DecisionTree>(json).unwrap_err();
        assert!(err.to_string().contains("invalid child index 7"));

        let json = r#"{"nodes":[{"kind":"leaf","toxic_fraction":0.5,"samples":2}]}"#;
        let tree: DecisionTree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.n_leaves(), 1);
    }

    #[test]
    fn test_node_serde_tagged() {
        let leaf = Node::Leaf {
            toxic_fraction: 0.25,
            samples: 4,
        };
        let json = serde_json::to_string(&leaf).unwrap();
        assert_eq!(json, r#"{"kind":"leaf","toxic_fraction":0.25,"samples":4}"#);
    }
}
