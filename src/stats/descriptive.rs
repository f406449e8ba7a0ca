//! Descriptive summary per group

use crate::error::{AnalysisError, Result};
use crate::journal::{AnalysisLog, LogRecord};
use crate::samples::{median, SampleCollection, SampleGroup};
use serde::{Deserialize, Serialize};

/// min/max/median/mean/std of one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub label: String,
    pub n: usize,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub mean: f64,
    /// Sample standard deviation (n-1); 0 for a single observation
    pub std: f64,
}

impl GroupSummary {
    pub fn of(group: &SampleGroup) -> Result<Self> {
        if group.is_empty() {
            return Err(AnalysisError::Precondition(format!(
                "cannot describe empty group '{}'",
                group.label
            )));
        }
        let min = group.values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = group.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(Self {
            label: group.label.clone(),
            n: group.len(),
            min,
            max,
            median: median(&group.values),
            mean: group.mean(),
            std: group.variance().sqrt(),
        })
    }
}

/// Summarize every group, one log record each
pub fn describe(
    variable: &str,
    samples: &SampleCollection,
    log: &mut dyn AnalysisLog,
) -> Result<Vec<GroupSummary>> {
    samples
        .groups()
        .iter()
        .map(|group| {
            let summary = GroupSummary::of(group)?;
            log.record(
                LogRecord::new(
                    "describe",
                    format!(
                        "{}: n={} [{}, {}] median={} mean={} +- {}",
                        summary.label,
                        summary.n,
                        summary.min,
                        summary.max,
                        summary.median,
                        summary.mean,
                        summary.std
                    ),
                )
                .variable(variable),
            );
            Ok(summary)
        })
        .collect()
}
