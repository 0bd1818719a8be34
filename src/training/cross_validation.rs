//! Cross-validation splitters

use super::decision_tree::{class_position, unique_sorted};
use crate::error::{NetworkSecurityError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Cross-validation strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CVStrategy {
    /// Contiguous folds over the sample order
    KFold { n_splits: usize, shuffle: bool },
    /// Folds that keep each class's share roughly constant
    StratifiedKFold { n_splits: usize, shuffle: bool },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::StratifiedKFold {
            n_splits: 3,
            shuffle: false,
        }
    }
}

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter
pub struct CrossValidator {
    strategy: CVStrategy,
    random_state: u64,
}

impl CrossValidator {
    pub fn new(strategy: CVStrategy) -> Self {
        Self {
            strategy,
            random_state: 0,
        }
    }

    /// Seed used when the strategy shuffles
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Generate train/test splits for `y`
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        let (n_splits, shuffle) = match self.strategy {
            CVStrategy::KFold { n_splits, shuffle } | CVStrategy::StratifiedKFold { n_splits, shuffle } => {
                (n_splits, shuffle)
            }
        };
        let n_samples = y.len();
        if n_splits < 2 {
            return Err(NetworkSecurityError::ValidationError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < n_splits {
            return Err(NetworkSecurityError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, n_splits
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let folds = match self.strategy {
            CVStrategy::KFold { .. } => {
                let mut indices: Vec<usize> = (0..n_samples).collect();
                if shuffle {
                    indices.shuffle(&mut rng);
                }
                chunk(&indices, n_splits)
            }
            CVStrategy::StratifiedKFold { .. } => {
                let classes = unique_sorted(y);
                let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
                // Deal class by class, continuing the rotation so fold sizes stay even
                let mut dealt = 0;
                for class in 0..classes.len() {
                    let mut members: Vec<usize> = (0..n_samples)
                        .filter(|&i| class_position(&classes, y[i]) == class)
                        .collect();
                    if shuffle {
                        members.shuffle(&mut rng);
                    }
                    for idx in members {
                        folds[dealt % n_splits].push(idx);
                        dealt += 1;
                    }
                }
                folds
            }
        };

        Ok(folds
            .iter()
            .enumerate()
            .map(|(fold_idx, test)| {
                let mut test_indices = test.clone();
                test_indices.sort_unstable();
                let train_indices = folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect::<Vec<_>>();
                let mut train_indices = train_indices;
                train_indices.sort_unstable();
                CVSplit {
                    train_indices,
                    test_indices,
                    fold_idx,
                }
            })
            .collect())
    }
}

/// Split `items` into `n` contiguous chunks whose sizes differ by at most one
fn chunk(items: &[usize], n: usize) -> Vec<Vec<usize>> {
    let base = items.len() / n;
    let remainder = items.len() % n;
    let mut out = Vec::with_capacity(n);
    let mut start = 0;
    for i in 0..n {
        let size = if i < remainder { base + 1 } else { base };
        out.push(items[start..start + size].to_vec());
        start += size;
    }
    out
}
