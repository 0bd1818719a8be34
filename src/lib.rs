//! Network security - phishing-domain classifier training
//!
//! This crate trains the classifier behind the phishing-domain detector:
//! - Model search over a catalog of classifiers with grid or randomized search
//! - Best-model selection and classification metrics
//! - Experiment tracking against MLflow or a local `file:` store
//! - A served bundle pairing the fitted preprocessor with the classifier
//!
//! # Modules
//!
//! - [`training`] - Classifiers, hyperparameter grids, cross-validation and search
//! - [`preprocessing`] - KNN imputation applied before classification
//! - [`metrics`] - Precision, recall, F1 and held-out scoring
//! - [`tracking`] - Experiment tracker trait, MLflow client and file store
//! - [`components`] - The model trainer stage
//! - [`estimator`] - The persisted preprocessor + classifier bundle
//! - [`cloud`] - Bucket sync through the `aws` CLI
//! - [`cli`] - Command-line interface

pub mod error;

pub mod metrics;
pub mod preprocessing;
pub mod training;

pub mod components;
pub mod constants;
pub mod entity;
pub mod estimator;
pub mod tracking;
pub mod utils;

pub mod cli;
pub mod cloud;

pub use error::{NetworkSecurityError, Result};
