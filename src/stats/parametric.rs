//! Parametric tests: one-way ANOVA, Tukey HSD and the independent t-test

use super::distributions::{
    f_sf, studentized_range_quantile, studentized_range_sf, t_two_sided,
};
use super::{PairwiseComparison, PairwiseTable, Significance, TestResult};
use crate::error::{AnalysisError, Result};
use crate::samples::{as_f32, mean, SampleCollection};
use aprender::stats::hypothesis::{f_oneway, ttest_ind};
use serde::{Deserialize, Serialize};

/// Result of an independent two-sample t-test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TTestResult {
    pub statistic: f64,
    pub pvalue: f64,
    /// Degrees of freedom (Welch-Satterthwaite when variances differ)
    pub df: f64,
    /// Whether the pooled-variance (Student) form was used
    pub equal_var: bool,
}

impl From<TTestResult> for TestResult {
    fn from(t: TTestResult) -> Self {
        TestResult::new(t.statistic, t.pvalue)
    }
}

/// Within-group sum of squares and the N - k degrees of freedom
fn within_group(samples: &SampleCollection) -> (f64, usize) {
    let ss: f64 = samples
        .groups()
        .iter()
        .map(|g| {
            let m = g.mean();
            g.values.iter().map(|x| (x - m).powi(2)).sum::<f64>()
        })
        .sum();
    (ss, samples.total_len() - samples.len())
}

/// One-way ANOVA F-test for equality of group means
///
/// aprender's `f_oneway` supplies the F ratio; the p-value comes from the
/// exact F distribution. With zero within-group variance the F ratio is
/// infinite when the means differ (p = 0) and zero when they do not (p = 1).
pub fn one_way_anova(samples: &SampleCollection) -> Result<TestResult> {
    samples.validate()?;
    let k = samples.len();
    let n = samples.total_len();
    if n <= k {
        return Err(AnalysisError::Precondition(format!(
            "ANOVA needs more observations ({}) than groups ({})",
            n, k
        )));
    }

    let grand_mean = mean(&samples.pooled());
    let ss_between: f64 = samples
        .groups()
        .iter()
        .map(|g| g.len() as f64 * (g.mean() - grand_mean).powi(2))
        .sum();
    let (ss_within, df_within) = within_group(samples);
    let df_between = k - 1;

    if ss_within == 0.0 {
        return Ok(if ss_between > 0.0 {
            TestResult::new(f64::INFINITY, 0.0)
        } else {
            TestResult::new(0.0, 1.0)
        });
    }

    let groups: Vec<Vec<f32>> = samples.groups().iter().map(|g| as_f32(&g.values)).collect();
    let anova = f_oneway(&groups)
        .map_err(|e| AnalysisError::Precondition(format!("one-way ANOVA: {}", e)))?;
    let statistic = f64::from(anova.statistic);
    if !statistic.is_finite() {
        return Err(AnalysisError::Degenerate(format!(
            "within-group variance vanishes at f32 precision (F = {})",
            statistic
        )));
    }
    let pvalue = f_sf(statistic, df_between as f64, df_within as f64)?;
    Ok(TestResult::new(statistic, pvalue))
}

/// p-value of a pairwise difference scaled by a (possibly zero) standard error
pub(crate) fn range_pvalue(diff: f64, stderr: f64, k: usize, df: f64) -> Result<(f64, f64)> {
    if stderr == 0.0 {
        return Ok(if diff == 0.0 {
            (0.0, 1.0)
        } else {
            (f64::INFINITY, 0.0)
        });
    }
    let q = diff.abs() / stderr;
    Ok((q, studentized_range_sf(q, k, df)?))
}

/// Tukey's honestly significant difference for all pairs
///
/// Statistic is the mean difference (A - B); intervals are simultaneous at
/// the 1 - alpha family-wise confidence level.
pub fn tukey_hsd(
    samples: &SampleCollection,
    alpha: f64,
    marginal_alpha: f64,
) -> Result<PairwiseTable> {
    samples.validate()?;
    let k = samples.len();
    let (ss_within, df_within) = within_group(samples);
    if df_within == 0 {
        return Err(AnalysisError::Precondition(
            "Tukey HSD needs more observations than groups".into(),
        ));
    }
    let mse = ss_within / df_within as f64;
    let df = df_within as f64;
    let q_crit = studentized_range_quantile(1.0 - alpha, k, df)?;
    let groups = samples.groups();

    let rows = samples
        .pairs()
        .into_iter()
        .map(|(i, j)| {
            let (a, b) = (&groups[i], &groups[j]);
            let diff = a.mean() - b.mean();
            let stderr = (mse / 2.0 * (1.0 / a.len() as f64 + 1.0 / b.len() as f64)).sqrt();
            let (_, pvalue) = range_pvalue(diff, stderr, k, df)?;
            let half_width = q_crit * stderr;
            Ok(PairwiseComparison {
                group_a: a.label.clone(),
                group_b: b.label.clone(),
                statistic: diff,
                pvalue,
                ci_low: Some(diff - half_width),
                ci_high: Some(diff + half_width),
                verdict: Significance::from_pvalue(pvalue, alpha, marginal_alpha),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PairwiseTable {
        method: "Tukey HSD".to_string(),
        rows,
    })
}

/// Independent two-sample t-test (Student's when `equal_var`, else Welch's)
///
/// The statistic and degrees of freedom come from aprender's `ttest_ind`.
/// Zero standard error gives t = 0, p = 1 for equal means and an infinite t
/// with p = 0 otherwise.
pub fn t_test_ind(a: &[f64], b: &[f64], equal_var: bool) -> Result<TTestResult> {
    let (n1, n2) = (a.len(), b.len());
    if n1 < 2 || n2 < 2 {
        return Err(AnalysisError::Precondition(format!(
            "t-test needs at least 2 observations per group, got {} and {}",
            n1, n2
        )));
    }
    let t = ttest_ind(&as_f32(a), &as_f32(b), equal_var)
        .map_err(|e| AnalysisError::Precondition(format!("t-test: {}", e)))?;

    let df = match f64::from(t.df) {
        df if df.is_finite() && df > 0.0 => df,
        _ => (n1 + n2 - 2) as f64,
    };
    let (statistic, pvalue) = match f64::from(t.statistic) {
        s if s.is_nan() => (0.0, 1.0),
        s if s.is_infinite() => (s, 0.0),
        s => (s, t_two_sided(s, df)?),
    };
    Ok(TTestResult {
        statistic,
        pvalue,
        df,
        equal_var,
    })
}
