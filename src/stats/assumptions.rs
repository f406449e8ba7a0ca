//! ANOVA assumption checks
//!
//! Four independent checks: equal cell sizes, normality, homoscedasticity and
//! similarity of shape. Only the first three feed the routing decision.

use super::distributions::{chi2_sf, f_sf, normal_quantile, normal_sf};
use super::TestResult;
use crate::error::{AnalysisError, Result};
use crate::journal::{AnalysisLog, LogRecord};
use crate::plot::DiagnosticRenderer;
use crate::samples::{median, SampleCollection};
use aprender::stats::hypothesis::chisquare;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shapiro-Wilk coefficient polynomials (Royston 1995, AS R94)
const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.5440, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

/// Outcome of a single assumption check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Check {
    /// Whether the assumption holds
    pub passed: bool,
    /// Underlying test, absent when it is undefined for the data
    pub result: Option<TestResult>,
}

/// Shapiro-Wilk outcome for one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNormality {
    pub label: String,
    pub n: usize,
    pub result: TestResult,
    /// p < alpha
    pub rejected: bool,
    /// Rejected but large enough for the CLT override
    pub clt_tolerated: bool,
}

/// Normality check across all groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalityOutcome {
    pub passed: bool,
    pub groups: Vec<GroupNormality>,
}

fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Chi-square goodness-of-fit of group sizes against a uniform expectation
///
/// aprender's `chisquare` supplies the statistic; the p-value comes from the
/// exact chi-square distribution.
pub fn chi_square_sizes(sizes: &[usize]) -> Result<TestResult> {
    if sizes.len() < 2 {
        return Err(AnalysisError::Precondition(format!(
            "need at least 2 groups, got {}",
            sizes.len()
        )));
    }
    let total: usize = sizes.iter().sum();
    if total == 0 {
        return Err(AnalysisError::Precondition(
            "cannot compare sizes of groups with zero total observations".into(),
        ));
    }
    let observed: Vec<f32> = sizes.iter().map(|&o| o as f32).collect();
    let expected = vec![total as f32 / sizes.len() as f32; sizes.len()];
    let chi2 = chisquare(&observed, &expected)
        .map_err(|e| AnalysisError::Precondition(format!("chi-square: {}", e)))?;
    let statistic = f64::from(chi2.statistic);
    let pvalue = chi2_sf(statistic, chi2.df as f64)?;
    Ok(TestResult::new(statistic, pvalue))
}

/// Equal cell sizes: holds when p > alpha
pub fn equal_size_samples(
    variable: &str,
    samples: &SampleCollection,
    alpha: f64,
    log: &mut dyn AnalysisLog,
) -> Result<Check> {
    let observed = samples.sizes();
    let result = chi_square_sizes(&observed)?;
    let passed = result.pvalue > alpha;
    let message = if passed {
        format!(
            "Fail to reject the null hypothesis: the counts {:?} are roughly evenly distributed.",
            observed
        )
    } else {
        format!(
            "Reject the null hypothesis: the counts {:?} are not evenly distributed.",
            observed
        )
    };
    log.record(
        LogRecord::new("chi_square_sizes", message)
            .variable(variable)
            .test(result.statistic, result.pvalue),
    );
    Ok(Check {
        passed,
        result: Some(result),
    })
}

/// Shapiro-Wilk W test for normality (Royston's approximation, 3 <= n <= 5000)
///
/// Zero-range samples report W = 1, p = 1.
pub fn shapiro_wilk(values: &[f64]) -> Result<TestResult> {
    let n = values.len();
    if n < 3 {
        return Err(AnalysisError::Precondition(format!(
            "Shapiro-Wilk needs at least 3 observations, got {}",
            n
        )));
    }
    if n > 5000 {
        tracing::warn!(n, "Shapiro-Wilk p-value may be inaccurate for n > 5000");
    }

    let mut x = values.to_vec();
    x.sort_by(|a, b| a.total_cmp(b));
    if x[n - 1] - x[0] < 1e-19 {
        return Ok(TestResult::new(1.0, 1.0));
    }

    let nf = n as f64;
    let a = if n == 3 {
        vec![-std::f64::consts::FRAC_1_SQRT_2, 0.0, std::f64::consts::FRAC_1_SQRT_2]
    } else {
        let m = (1..=n)
            .map(|i| normal_quantile((i as f64 - 0.375) / (nf + 0.25)))
            .collect::<Result<Vec<f64>>>()?;
        let summ2: f64 = m.iter().map(|v| v * v).sum();
        let ssumm2 = summ2.sqrt();
        let rsn = 1.0 / nf.sqrt();
        let an = m[n - 1] / ssumm2 + poly(&C1, rsn);

        let mut a = vec![0.0; n];
        a[n - 1] = an;
        a[0] = -an;
        if n > 5 {
            let an1 = m[n - 2] / ssumm2 + poly(&C2, rsn);
            let fac = ((summ2 - 2.0 * m[n - 1].powi(2) - 2.0 * m[n - 2].powi(2))
                / (1.0 - 2.0 * an.powi(2) - 2.0 * an1.powi(2)))
            .sqrt();
            a[n - 2] = an1;
            a[1] = -an1;
            for i in 2..n - 2 {
                a[i] = m[i] / fac;
            }
        } else {
            let fac = ((summ2 - 2.0 * m[n - 1].powi(2)) / (1.0 - 2.0 * an.powi(2))).sqrt();
            for i in 1..n - 1 {
                a[i] = m[i] / fac;
            }
        }
        a
    };

    let mean = x.iter().sum::<f64>() / nf;
    let ss: f64 = x.iter().map(|v| (v - mean).powi(2)).sum();
    let numerator: f64 = a.iter().zip(&x).map(|(ai, xi)| ai * xi).sum();
    let w = (numerator * numerator / ss).min(1.0);

    let pvalue = if n == 3 {
        let p = 6.0 / std::f64::consts::PI
            * (w.sqrt().asin() - (0.75f64).sqrt().asin());
        p.clamp(0.0, 1.0)
    } else if n <= 11 {
        let gamma = poly(&G, nf);
        let mu = poly(&C3, nf);
        let sigma = poly(&C4, nf).exp();
        let y = (1.0 - w).ln();
        if y >= gamma {
            0.0
        } else {
            normal_sf((-(gamma - y).ln() - mu) / sigma)
        }
    } else {
        let ln_n = nf.ln();
        let mu = poly(&C5, ln_n);
        let sigma = poly(&C6, ln_n).exp();
        normal_sf(((1.0 - w).ln() - mu) / sigma)
    };

    Ok(TestResult::new(w, pvalue.clamp(0.0, 1.0)))
}

/// Normality: Shapiro-Wilk per group with the large-sample CLT override
///
/// A group fails only when p < alpha and its size is below `clt_min_size`.
/// Writes one probability plot per group into `output_dir`.
pub fn normality(
    variable: &str,
    samples: &SampleCollection,
    renderer: &dyn DiagnosticRenderer,
    output_dir: &Path,
    alpha: f64,
    clt_min_size: usize,
    log: &mut dyn AnalysisLog,
) -> Result<NormalityOutcome> {
    let mut passed = true;
    let mut groups = Vec::with_capacity(samples.len());

    for group in samples.groups() {
        let result = shapiro_wilk(&group.values)?;
        let rejected = result.pvalue < alpha;
        let clt_tolerated = rejected && group.len() >= clt_min_size;

        let message = if rejected {
            if clt_tolerated {
                format!(
                    "Reject the null hypothesis: the sample {} is not normally distributed. \
                     Sample size {} is at least {} and can be considered sufficient for CLT to hold.",
                    group.label,
                    group.len(),
                    clt_min_size
                )
            } else {
                passed = false;
                format!(
                    "Reject the null hypothesis: the sample {} is not normally distributed.",
                    group.label
                )
            }
        } else {
            format!(
                "Fail to reject the null hypothesis: the sample {} is roughly normally distributed.",
                group.label
            )
        };
        log.record(
            LogRecord::new("shapiro_wilk", message)
                .variable(variable)
                .test(result.statistic, result.pvalue),
        );

        if let Err(e) = renderer.probability_plot(group, output_dir) {
            tracing::warn!(group = %group.label, "probability plot not written: {}", e);
            log.record(
                LogRecord::new(
                    "probability_plot",
                    format!("Probability plot for {} not written: {}", group.label, e),
                )
                .variable(variable),
            );
        }

        groups.push(GroupNormality {
            label: group.label.clone(),
            n: group.len(),
            result,
            rejected,
            clt_tolerated,
        });
    }

    Ok(NormalityOutcome { passed, groups })
}

/// Levene's test (median-centred, Brown-Forsythe variant)
///
/// Undefined when every observation equals its group median.
pub fn levene(groups: &[&[f64]]) -> Result<TestResult> {
    let k = groups.len();
    if k < 2 {
        return Err(AnalysisError::Precondition(format!(
            "Levene's test needs at least 2 groups, got {}",
            k
        )));
    }
    if let Some(i) = groups.iter().position(|g| g.is_empty()) {
        return Err(AnalysisError::Precondition(format!(
            "Levene's test got an empty group at position {}",
            i
        )));
    }
    let total: usize = groups.iter().map(|g| g.len()).sum();
    if total <= k {
        return Err(AnalysisError::Precondition(format!(
            "Levene's test needs more observations ({}) than groups ({})",
            total, k
        )));
    }

    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| {
            let center = median(g);
            g.iter().map(|x| (x - center).abs()).collect()
        })
        .collect();
    let group_means: Vec<f64> = deviations
        .iter()
        .map(|d| d.iter().sum::<f64>() / d.len() as f64)
        .collect();
    let grand_mean = deviations.iter().flatten().sum::<f64>() / total as f64;

    let between: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(d, m)| d.len() as f64 * (m - grand_mean).powi(2))
        .sum();
    let within: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(d, m)| d.iter().map(|z| (z - m).powi(2)).sum::<f64>())
        .sum();

    if within == 0.0 {
        if between == 0.0 {
            return Err(AnalysisError::Degenerate(
                "Levene's test is undefined: every group has zero spread".into(),
            ));
        }
        return Ok(TestResult::new(f64::INFINITY, 0.0));
    }

    let df1 = (k - 1) as f64;
    let df2 = (total - k) as f64;
    let statistic = (df2 / df1) * between / within;
    Ok(TestResult::new(statistic, f_sf(statistic, df1, df2)?))
}

/// Homoscedasticity: holds when Levene's p > alpha; an undefined test fails
pub fn equal_variances(
    variable: &str,
    samples: &SampleCollection,
    alpha: f64,
    log: &mut dyn AnalysisLog,
) -> Result<Check> {
    let groups: Vec<&[f64]> = samples.groups().iter().map(|g| g.values.as_slice()).collect();
    match levene(&groups) {
        Ok(result) => {
            let passed = result.pvalue > alpha;
            let message = if passed {
                "Fail to reject the null hypothesis: samples' variances are roughly equal."
            } else {
                "Reject the null hypothesis: samples' variances are not equal."
            };
            log.record(
                LogRecord::new("levene", message)
                    .variable(variable)
                    .test(result.statistic, result.pvalue),
            );
            Ok(Check {
                passed,
                result: Some(result),
            })
        }
        Err(AnalysisError::Degenerate(reason)) => {
            log.record(
                LogRecord::new(
                    "levene",
                    format!("{}; homoscedasticity cannot be assumed.", reason),
                )
                .variable(variable),
            );
            Ok(Check {
                passed: false,
                result: None,
            })
        }
        Err(e) => Err(e),
    }
}

/// Similarity of shape: writes the distribution plot for manual inspection
///
/// Never contributes to routing.
pub fn similarity_of_shape(
    factor: &str,
    variable: &str,
    samples: &SampleCollection,
    renderer: &dyn DiagnosticRenderer,
    output_dir: &Path,
    log: &mut dyn AnalysisLog,
) {
    let message = match renderer.distribution_plot(factor, variable, samples, output_dir) {
        Ok(Some(path)) => format!(
            "Shape should be verified manually in the distribution plot {}.",
            path.display()
        ),
        Ok(None) => "Shape should be verified manually; plot rendering is disabled.".to_string(),
        Err(e) => {
            tracing::warn!(variable, "distribution plot not written: {}", e);
            format!("Distribution plot not written: {}", e)
        }
    };
    log.record(LogRecord::new("similarity_of_shape", message).variable(variable));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::MemoryLog;
    use crate::plot::NullRenderer;

    fn close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() < tol,
            "expected {} +- {}, got {}",
            expected,
            tol,
            actual
        );
    }

    #[test]
    fn test_chi_square_equal_sizes_is_zero() {
        let result = chi_square_sizes(&[10, 10, 10]).unwrap();
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.pvalue, 1.0);
    }

    #[test]
    fn test_chi_square_unbalanced() {
        // expected 20 each: (225 + 900 + 225) / 20
        let result = chi_square_sizes(&[5, 50, 5]).unwrap();
        close(result.statistic, 67.5, 1e-12);
        assert!(result.pvalue < 1e-10);
    }

    #[test]
    fn test_chi_square_zero_total() {
        assert!(matches!(
            chi_square_sizes(&[0, 0]),
            Err(AnalysisError::Precondition(_))
        ));
    }

    #[test]
    fn test_shapiro_three_points() {
        let result = shapiro_wilk(&[1.0, 2.0, 4.0]).unwrap();
        close(result.statistic, 0.964286, 1e-5);
        close(result.pvalue, 0.6369, 1e-3);
    }

    #[test]
    fn test_shapiro_zero_range() {
        let result = shapiro_wilk(&[1.0; 5]).unwrap();
        assert_eq!(result, TestResult::new(1.0, 1.0));
    }

    #[test]
    fn test_shapiro_too_small() {
        assert!(shapiro_wilk(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_shapiro_accepts_normal_scores() {
        let values: Vec<f64> = (1..=25)
            .map(|i| normal_quantile((i as f64 - 0.5) / 25.0).unwrap())
            .collect();
        let result = shapiro_wilk(&values).unwrap();
        assert!(result.statistic > 0.97, "W = {}", result.statistic);
        assert!(result.pvalue > 0.5, "p = {}", result.pvalue);
    }

    #[test]
    fn test_shapiro_rejects_skewed() {
        let values: Vec<f64> = (0..20).map(|i| (i as f64 * 0.35).exp()).collect();
        let result = shapiro_wilk(&values).unwrap();
        assert!(result.pvalue < 0.01, "p = {}", result.pvalue);
    }

    #[test]
    fn test_levene_equal_spread() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [11.0, 12.0, 13.0, 14.0, 15.0];
        let result = levene(&[&a, &b]).unwrap();
        close(result.statistic, 0.0, 1e-12);
        close(result.pvalue, 1.0, 1e-12);
    }

    #[test]
    fn test_levene_unequal_spread() {
        let a = [9.9, 10.0, 10.1, 10.0, 9.9, 10.1, 10.0];
        let b = [1.0, 20.0, 5.0, 15.0, 0.0, 25.0, 10.0];
        let result = levene(&[&a, &b]).unwrap();
        assert!(result.pvalue < 0.05, "p = {}", result.pvalue);
    }

    #[test]
    fn test_levene_zero_spread_is_degenerate() {
        let a = [1.0; 5];
        let b = [100.0; 5];
        assert!(matches!(
            levene(&[&a, &b]),
            Err(AnalysisError::Degenerate(_))
        ));
    }

    #[test]
    fn test_equal_variances_degenerate_fails_assumption() {
        let samples = SampleCollection::new()
            .with_group("A", &[1.0; 5])
            .unwrap()
            .with_group("B", &[100.0; 5])
            .unwrap();
        let mut log = MemoryLog::new();
        let check = equal_variances("R bucket", &samples, 0.05, &mut log).unwrap();
        assert!(!check.passed);
        assert!(check.result.is_none());
        assert!(log.contains("cannot be assumed"));
    }

    #[test]
    fn test_normality_clt_override() {
        let skewed: Vec<f64> = (0..40).map(|i| (i as f64 * 0.2).exp()).collect();
        let small_skewed: Vec<f64> = (0..12).map(|i| (i as f64 * 0.6).exp()).collect();
        let mut log = MemoryLog::new();

        let large = SampleCollection::new()
            .with_group("Large", &skewed)
            .unwrap()
            .with_group("Normal", &[-1.2, -0.5, 0.0, 0.4, 1.1, 0.2, -0.3])
            .unwrap();
        let outcome = normality(
            "R bucket",
            &large,
            &NullRenderer,
            Path::new("."),
            0.05,
            30,
            &mut log,
        )
        .unwrap();
        assert!(outcome.groups[0].rejected);
        assert!(outcome.groups[0].clt_tolerated);
        assert!(outcome.passed);

        let small = SampleCollection::new()
            .with_group("Small", &small_skewed)
            .unwrap()
            .with_group("Normal", &[-1.2, -0.5, 0.0, 0.4, 1.1, 0.2, -0.3])
            .unwrap();
        let outcome = normality(
            "R bucket",
            &small,
            &NullRenderer,
            Path::new("."),
            0.05,
            30,
            &mut log,
        )
        .unwrap();
        assert!(outcome.groups[0].rejected);
        assert!(!outcome.groups[0].clt_tolerated);
        assert!(!outcome.passed);
        assert!(log.contains("sufficient for CLT"));
    }

    #[test]
    fn test_shape_similarity_logs_manual_note() {
        let samples = SampleCollection::new()
            .with_group("A", &[1.0, 2.0])
            .unwrap()
            .with_group("B", &[3.0, 4.0])
            .unwrap();
        let mut log = MemoryLog::new();
        similarity_of_shape("TTFF", "R bucket", &samples, &NullRenderer, Path::new("."), &mut log);
        assert_eq!(log.steps("similarity_of_shape").len(), 1);
        assert!(log.contains("verified manually"));
    }
}
