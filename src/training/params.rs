//! Hyperparameter values, grids and candidate enumeration

use crate::error::{NetworkSecurityError, Result};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Absent value (e.g. unlimited depth, no penalty)
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ParamValue::None)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::None => write!(f, "None"),
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

/// One concrete hyperparameter assignment, in grid declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params(pub Vec<(String, ParamValue)>);

impl Params {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, "}}")
    }
}

/// Map from hyperparameter name to the values to try
///
/// An empty grid yields a single candidate with no overrides, so the
/// estimator's defaults are used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    entries: Vec<(String, Vec<ParamValue>)>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hyperparameter with its candidate values
    pub fn with<I, V>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        let values = values.into_iter().map(Into::into).collect();
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some((_, existing)) => *existing = values,
            None => self.entries.push((name.to_string(), values)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hyperparameter names with their candidate values, in declaration order
    pub fn entries(&self) -> &[(String, Vec<ParamValue>)] {
        &self.entries
    }

    /// Number of points in the cartesian product
    pub fn n_candidates(&self) -> usize {
        self.entries
            .iter()
            .fold(1usize, |acc, (_, values)| acc.saturating_mul(values.len()))
    }

    fn validate(&self) -> Result<()> {
        for (name, values) in &self.entries {
            if values.is_empty() {
                return Err(NetworkSecurityError::InvalidParameter {
                    name: name.clone(),
                    value: "[]".to_string(),
                    reason: "a grid entry needs at least one value".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Decode the `index`-th point of the product; the last entry varies fastest.
    fn candidate(&self, mut index: usize) -> Params {
        let mut picked = vec![ParamValue::None; self.entries.len()];
        for (slot, (_, values)) in self.entries.iter().enumerate().rev() {
            picked[slot] = values[index % values.len()].clone();
            index /= values.len();
        }
        Params(
            self.entries
                .iter()
                .map(|(k, _)| k.clone())
                .zip(picked)
                .collect(),
        )
    }

    /// Every combination of the grid
    pub fn grid_candidates(&self) -> Result<Vec<Params>> {
        self.validate()?;
        Ok((0..self.n_candidates()).map(|i| self.candidate(i)).collect())
    }

    /// `n_iter` distinct combinations drawn without replacement
    ///
    /// When the grid holds fewer than `n_iter` points, every point is returned.
    pub fn sampled_candidates(&self, n_iter: usize, seed: u64) -> Result<Vec<Params>> {
        self.validate()?;
        if n_iter == 0 {
            return Err(NetworkSecurityError::InvalidParameter {
                name: "n_iter".to_string(),
                value: "0".to_string(),
                reason: "randomized search needs at least one iteration".to_string(),
            });
        }
        let total = self.n_candidates();
        let amount = n_iter.min(total);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Ok(sample(&mut rng, total, amount)
            .into_iter()
            .map(|i| self.candidate(i))
            .collect())
    }
}

pub(crate) fn unknown_param(model: &str, name: &str) -> NetworkSecurityError {
    NetworkSecurityError::InvalidParameter {
        name: name.to_string(),
        value: String::new(),
        reason: format!("not a hyperparameter of {}", model),
    }
}

pub(crate) fn invalid_param(name: &str, value: &ParamValue, reason: &str) -> NetworkSecurityError {
    NetworkSecurityError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub(crate) fn expect_usize(name: &str, value: &ParamValue, min: usize) -> Result<usize> {
    match value.as_int() {
        Some(v) if v >= min as i64 => Ok(v as usize),
        _ => Err(invalid_param(
            name,
            value,
            &format!("expected an integer >= {}", min),
        )),
    }
}

pub(crate) fn expect_opt_usize(name: &str, value: &ParamValue, min: usize) -> Result<Option<usize>> {
    if value.is_none() {
        Ok(None)
    } else {
        expect_usize(name, value, min).map(Some)
    }
}

pub(crate) fn expect_positive(name: &str, value: &ParamValue) -> Result<f64> {
    match value.as_float() {
        Some(v) if v > 0.0 && v.is_finite() => Ok(v),
        _ => Err(invalid_param(name, value, "expected a positive number")),
    }
}

pub(crate) fn expect_fraction(name: &str, value: &ParamValue) -> Result<f64> {
    match value.as_float() {
        Some(v) if v > 0.0 && v <= 1.0 => Ok(v),
        _ => Err(invalid_param(name, value, "expected a number in (0, 1]")),
    }
}

pub(crate) fn expect_bool(name: &str, value: &ParamValue) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| invalid_param(name, value, "expected a boolean"))
}

pub(crate) fn expect_str<'a>(name: &str, value: &'a ParamValue) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| invalid_param(name, value, "expected a string"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> ParamGrid {
        ParamGrid::new()
            .with("criterion", ["gini", "entropy"])
            .with("max_depth", [ParamValue::None, ParamValue::Int(3), ParamValue::Int(5)])
    }

    #[test]
    fn test_grid_enumerates_full_product() {
        let candidates = grid().grid_candidates().unwrap();
        assert_eq!(candidates.len(), 6);
        assert_eq!(candidates[0].get("criterion"), Some(&ParamValue::from("gini")));
        assert_eq!(candidates[0].get("max_depth"), Some(&ParamValue::None));
        assert_eq!(candidates[1].get("max_depth"), Some(&ParamValue::Int(3)));
        assert_eq!(candidates[5].get("criterion"), Some(&ParamValue::from("entropy")));
        assert_eq!(candidates[5].get("max_depth"), Some(&ParamValue::Int(5)));
    }

    #[test]
    fn test_empty_grid_yields_default_candidate() {
        let candidates = ParamGrid::new().grid_candidates().unwrap();
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].is_empty());
    }

    #[test]
    fn test_empty_value_list_rejected() {
        let grid = ParamGrid::new().with("n_estimators", Vec::<i64>::new());
        assert!(grid.grid_candidates().is_err());
    }

    #[test]
    fn test_sampled_candidates_distinct_and_seeded() {
        let a = grid().sampled_candidates(4, 7).unwrap();
        let b = grid().sampled_candidates(4, 7).unwrap();
        assert_eq!(a.len(), 4);
        assert_eq!(a, b);
        for i in 0..a.len() {
            for j in (i + 1)..a.len() {
                assert_ne!(a[i], a[j]);
            }
        }
    }

    #[test]
    fn test_sampled_candidates_capped_at_grid_size() {
        assert_eq!(grid().sampled_candidates(100, 1).unwrap().len(), 6);
        assert!(grid().sampled_candidates(0, 1).is_err());
    }

    #[test]
    fn test_with_replaces_existing_entry() {
        let grid = ParamGrid::new().with("C", [0.1, 1.0]).with("C", [10.0]);
        assert_eq!(grid.n_candidates(), 1);
    }

    #[test]
    fn test_params_display() {
        let params = Params(vec![
            ("max_depth".to_string(), ParamValue::None),
            ("criterion".to_string(), ParamValue::from("gini")),
        ]);
        assert_eq!(params.to_string(), "{max_depth: None, criterion: gini}");
    }
}
