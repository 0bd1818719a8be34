//! Model training module
//!
//! Native classifiers used by the model search:
//! - Decision trees and Random Forests
//! - Gradient boosting
//! - Logistic regression (one-vs-rest beyond two classes)
//! - AdaBoost
//!
//! plus the hyperparameter grids, cross-validation splitter and the search
//! routine that picks the best model from a catalog.

pub mod adaboost;
pub mod catalog;
pub mod classifier;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod labels;
pub mod linear_models;
pub mod params;
pub mod random_forest;
pub mod search;

pub use adaboost::AdaBoostClassifier;
pub use catalog::{default_catalog, SearchSpec};
pub use classifier::{Classifier, ModelKind};
pub use cross_validation::{CVSplit, CVStrategy, CrossValidator};
pub use decision_tree::{Criterion, DecisionTree, MaxFeatures, Splitter, TreeNode};
pub use gradient_boosting::{BoostingLoss, GradientBoostingClassifier, GradientBoostingConfig};
pub use labels::ClassEncoding;
pub use linear_models::{ClassWeight, LogisticRegression, Penalty};
pub use params::{ParamGrid, ParamValue, Params};
pub use random_forest::RandomForest;
pub use search::{evaluate_models, select_best, ModelReport, ReportEntry, SearchConfig, SearchStrategy};
