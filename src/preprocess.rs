//! Per-variable preprocessing applied before any test runs
//!
//! Order: missing-value removal, floor filter, symmetric percentile trim,
//! Box-Cox transform. Every stage keeps group labels and insertion order.

use crate::config::{AnalysisConfig, BoxCox};
use crate::error::{AnalysisError, Result};
use crate::samples::{percentile, SampleCollection, SampleGroup};
use serde::{Deserialize, Serialize};

/// Search interval for the Box-Cox maximum-likelihood lambda
const LAMBDA_BOUNDS: (f64, f64) = (-5.0, 5.0);
const GOLDEN: f64 = 0.618_033_988_749_894_8;

/// Raw observations for one group; `None` marks a missing value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGroup {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

/// What preprocessing removed or changed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreprocessSummary {
    pub missing_dropped: usize,
    pub floor_dropped: usize,
    pub trim_dropped: usize,
    /// Lambda used by the Box-Cox transform, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub box_cox_lambda: Option<f64>,
}

/// Drop missing and non-finite observations
pub fn drop_missing(values: &[Option<f64>]) -> Vec<f64> {
    values
        .iter()
        .filter_map(|v| v.filter(|x| x.is_finite()))
        .collect()
}

/// Drop observations at or below `floor`
pub fn apply_floor(values: &[f64], floor: f64) -> Vec<f64> {
    values.iter().copied().filter(|&v| v > floor).collect()
}

/// Symmetric percentile trim: `fraction / 2` from each tail, inclusive bounds
pub fn trim(values: &[f64], fraction: f64) -> Result<Vec<f64>> {
    if !(0.0..1.0).contains(&fraction) {
        return Err(AnalysisError::Precondition(format!(
            "trim fraction must be in [0, 1), got {}",
            fraction
        )));
    }
    if values.is_empty() {
        return Ok(Vec::new());
    }
    let one_side = 100.0 * fraction / 2.0;
    let lower = percentile(values, one_side);
    let upper = percentile(values, 100.0 - one_side);
    Ok(values
        .iter()
        .copied()
        .filter(|&v| lower <= v && v <= upper)
        .collect())
}

fn require_positive(values: &[f64]) -> Result<()> {
    match values.iter().find(|&&v| v <= 0.0) {
        Some(v) => Err(AnalysisError::Precondition(format!(
            "Box-Cox needs strictly positive data, found {}",
            v
        ))),
        None => Ok(()),
    }
}

/// Box-Cox transform with a given lambda (`ln x` at lambda = 0)
pub fn box_cox(values: &[f64], lambda: f64) -> Result<Vec<f64>> {
    require_positive(values)?;
    Ok(values
        .iter()
        .map(|&x| {
            if lambda.abs() < 1e-12 {
                x.ln()
            } else {
                (x.powf(lambda) - 1.0) / lambda
            }
        })
        .collect())
}

/// Box-Cox profile log-likelihood
pub fn box_cox_log_likelihood(values: &[f64], lambda: f64) -> Result<f64> {
    let transformed = box_cox(values, lambda)?;
    let n = values.len() as f64;
    let mean = transformed.iter().sum::<f64>() / n;
    let variance = transformed.iter().map(|y| (y - mean).powi(2)).sum::<f64>() / n;
    let log_sum: f64 = values.iter().map(|x| x.ln()).sum();
    Ok((lambda - 1.0) * log_sum - n / 2.0 * variance.ln())
}

/// Maximum-likelihood lambda by golden-section search
pub fn estimate_box_cox_lambda(values: &[f64]) -> Result<f64> {
    if values.len() < 2 {
        return Err(AnalysisError::Precondition(format!(
            "Box-Cox estimation needs at least 2 observations, got {}",
            values.len()
        )));
    }
    require_positive(values)?;
    let first = values[0];
    if values.iter().all(|&v| v == first) {
        return Err(AnalysisError::Degenerate(
            "Box-Cox lambda undefined for constant data".into(),
        ));
    }

    let objective = |lambda: f64| box_cox_log_likelihood(values, lambda);
    let (mut a, mut b) = LAMBDA_BOUNDS;
    let mut c = b - GOLDEN * (b - a);
    let mut d = a + GOLDEN * (b - a);
    let (mut fc, mut fd) = (objective(c)?, objective(d)?);
    for _ in 0..200 {
        if (b - a).abs() < 1e-9 {
            break;
        }
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - GOLDEN * (b - a);
            fc = objective(c)?;
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + GOLDEN * (b - a);
            fd = objective(d)?;
        }
    }
    let lambda = 0.5 * (a + b);
    if !lambda.is_finite() {
        return Err(AnalysisError::NonConvergence(
            "Box-Cox lambda search did not converge".into(),
        ));
    }
    Ok(lambda)
}

/// Run every configured stage for one variable
pub fn prepare(
    variable: &str,
    groups: &[RawGroup],
    config: &AnalysisConfig,
) -> Result<(SampleCollection, PreprocessSummary)> {
    let mut summary = PreprocessSummary::default();
    let floor = config
        .floor_filter
        .as_ref()
        .filter(|f| variable.contains(&f.column_contains))
        .map(|f| f.floor);

    let mut cleaned = Vec::with_capacity(groups.len());
    for group in groups {
        let mut values = drop_missing(&group.values);
        summary.missing_dropped += group.values.len() - values.len();

        if let Some(floor) = floor {
            let before = values.len();
            values = apply_floor(&values, floor);
            summary.floor_dropped += before - values.len();
        }
        if let Some(fraction) = config.trim_fraction {
            let before = values.len();
            values = trim(&values, fraction)?;
            summary.trim_dropped += before - values.len();
        }
        cleaned.push(SampleGroup::new(group.label.clone(), values));
    }
    let mut samples = SampleCollection::from_groups(cleaned)?;

    let lambda = match config.box_cox {
        BoxCox::None => None,
        BoxCox::Fixed(lambda) => Some(lambda),
        BoxCox::Estimate => Some(estimate_box_cox_lambda(&samples.pooled())?),
    };
    if let Some(lambda) = lambda {
        samples = samples.map_values(|g| box_cox(&g.values, lambda))?;
        summary.box_cox_lambda = Some(lambda);
    }

    tracing::debug!(
        variable,
        missing = summary.missing_dropped,
        floor = summary.floor_dropped,
        trimmed = summary.trim_dropped,
        lambda = ?summary.box_cox_lambda,
        "preprocessed"
    );
    Ok((samples, summary))
}
