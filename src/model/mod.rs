//! Toxicity classifier: random forest of CART trees
//!
//! - [`forest`]: the ensemble, its hyperparameters and parallel fitting
//! - [`tree`]: a single Gini decision tree
//! - [`dataset`]: labelled training rows

pub mod dataset;
pub mod forest;
pub mod tree;

pub use dataset::TrainingMatrix;
pub use forest::{max_features, ForestParams, RandomForest};
pub use tree::{DecisionTree, Node, TreeParams};
