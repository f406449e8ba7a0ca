//! Strongly-typed sample collections
//!
//! A `SampleCollection` maps group labels to observations for one measured
//! variable. Labels keep insertion order for reporting; no computation in the
//! pipeline depends on that order.

use crate::error::{AnalysisError, Result};
use aprender::stats::DescriptiveStats;
use serde::{Deserialize, Serialize};
use trueno::Vector;

/// Observations recorded under one experimental condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleGroup {
    /// Condition label (e.g. "Transparent", "Yellow", "Red")
    pub label: String,
    /// Observations, missing values already removed
    pub values: Vec<f64>,
}

impl SampleGroup {
    pub fn new(label: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Arithmetic mean (NaN for an empty group)
    pub fn mean(&self) -> f64 {
        mean(&self.values)
    }

    /// Sample variance with n-1 denominator (0 for fewer than 2 values)
    pub fn variance(&self) -> f64 {
        variance(&self.values)
    }
}

/// Ordered mapping from unique group label to observations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleCollection {
    groups: Vec<SampleGroup>,
}

impl SampleCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection, rejecting duplicate labels
    pub fn from_groups(groups: Vec<SampleGroup>) -> Result<Self> {
        let mut collection = Self::new();
        for group in groups {
            collection.insert(group.label, group.values)?;
        }
        Ok(collection)
    }

    /// Append a group at the end of the reporting order
    pub fn insert(&mut self, label: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let label = label.into();
        if self.get(&label).is_some() {
            return Err(AnalysisError::Precondition(format!(
                "duplicate group label '{}'",
                label
            )));
        }
        self.groups.push(SampleGroup { label, values });
        Ok(())
    }

    /// Builder-style insert for literals in tests and benchmarks
    pub fn with_group(mut self, label: &str, values: &[f64]) -> Result<Self> {
        self.insert(label, values.to_vec())?;
        Ok(self)
    }

    pub fn get(&self, label: &str) -> Option<&SampleGroup> {
        self.groups.iter().find(|g| g.label == label)
    }

    pub fn groups(&self) -> &[SampleGroup] {
        &self.groups
    }

    pub fn labels(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.label.as_str()).collect()
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.groups.iter().map(SampleGroup::len).collect()
    }

    /// Number of groups (k)
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of observations (N)
    pub fn total_len(&self) -> usize {
        self.groups.iter().map(SampleGroup::len).sum()
    }

    /// All observations pooled in group order
    pub fn pooled(&self) -> Vec<f64> {
        self.groups
            .iter()
            .flat_map(|g| g.values.iter().copied())
            .collect()
    }

    /// Apply a transformation to every group, keeping labels and order
    pub fn map_values<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(&SampleGroup) -> Result<Vec<f64>>,
    {
        let groups = self
            .groups
            .iter()
            .map(|g| Ok(SampleGroup::new(g.label.clone(), f(g)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { groups })
    }

    /// Check the k-group pipeline preconditions: at least 2 groups, none empty,
    /// all values finite.
    pub fn validate(&self) -> Result<()> {
        if self.groups.len() < 2 {
            return Err(AnalysisError::Precondition(format!(
                "need at least 2 groups, got {}",
                self.groups.len()
            )));
        }
        self.validate_groups()
    }

    /// Check every group is non-empty and finite
    pub fn validate_groups(&self) -> Result<()> {
        for group in &self.groups {
            if group.is_empty() {
                return Err(AnalysisError::Precondition(format!(
                    "group '{}' is empty",
                    group.label
                )));
            }
            if let Some(bad) = group.values.iter().find(|v| !v.is_finite()) {
                return Err(AnalysisError::Precondition(format!(
                    "group '{}' contains non-finite value {}",
                    group.label, bad
                )));
            }
        }
        Ok(())
    }

    /// Unique unordered index pairs (i, j), i < j, in collection order
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let k = self.groups.len();
        (0..k)
            .flat_map(|i| ((i + 1)..k).map(move |j| (i, j)))
            .collect()
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// Observations narrowed to the f32 precision aprender computes in
pub(crate) fn as_f32(values: &[f64]) -> Vec<f32> {
    values.iter().map(|&v| v as f32).collect()
}

/// R-7 quantile (`q` in [0, 1]) through aprender's `DescriptiveStats`
///
/// A result that is exactly the f32 image of an observation maps back to that
/// observation, so order-statistic quantiles stay exact in f64. `None` for
/// empty or NaN-bearing input.
pub(crate) fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return None;
    }
    let data = Vector::from_slice(&as_f32(values));
    let estimate = DescriptiveStats::new(&data).quantile(q.clamp(0.0, 1.0)).ok()?;
    Some(
        values
            .iter()
            .copied()
            .find(|&v| v as f32 == estimate)
            .unwrap_or(f64::from(estimate)),
    )
}

/// Median of unsorted values (NaN for empty input)
pub(crate) fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5).unwrap_or(f64::NAN)
}

/// Linear-interpolated percentile, `q` in [0, 100]
pub(crate) fn percentile(values: &[f64], q: f64) -> f64 {
    quantile(values, q / 100.0).unwrap_or(f64::NAN)
}
