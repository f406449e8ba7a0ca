//! Variance-robust and rank-based tests
//!
//! - Welch's ANOVA + Games-Howell (unequal variances)
//! - Kruskal-Wallis + Dunn's test (non-normal data)
//! - Mann-Whitney U (two groups)

use super::correction::adjust_pvalues;
use super::distributions::{chi2_sf, f_sf, normal_sf, studentized_range_quantile};
use super::parametric::range_pvalue;
use super::{PairwiseComparison, PairwiseTable, Significance, TestResult};
use crate::config::CorrectionMethod;
use crate::error::{AnalysisError, Result};
use crate::samples::{mean, SampleCollection};

/// Average ranks (1-based) of `values` plus the tie term `sum(t^3 - t)`
pub(crate) fn rank_with_ties(values: &[f64]) -> (Vec<f64>, f64) {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut tie_sum = 0.0;
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let average = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = average;
        }
        let t = (end - start) as f64;
        tie_sum += t * t * t - t;
        start = end;
    }
    (ranks, tie_sum)
}

/// Ranks of the pooled collection split back into groups
fn grouped_ranks(samples: &SampleCollection) -> (Vec<Vec<f64>>, f64) {
    let (ranks, tie_sum) = rank_with_ties(&samples.pooled());
    let mut offset = 0;
    let grouped = samples
        .groups()
        .iter()
        .map(|g| {
            let slice = ranks[offset..offset + g.len()].to_vec();
            offset += g.len();
            slice
        })
        .collect();
    (grouped, tie_sum)
}

fn require_min_size(samples: &SampleCollection, min: usize, test: &str) -> Result<()> {
    if let Some(g) = samples.groups().iter().find(|g| g.len() < min) {
        return Err(AnalysisError::Precondition(format!(
            "{} needs at least {} observations per group, '{}' has {}",
            test,
            min,
            g.label,
            g.len()
        )));
    }
    Ok(())
}

/// Welch's heteroscedastic one-way ANOVA
///
/// A zero-variance group carries infinite weight, so the weighted mean
/// collapses onto its mean and it drops out of the numerator. Constant groups
/// with different means give F = inf (p = 0). When every group is constant
/// and the means coincide, F = 0 (p = 1). Several constant groups sharing a
/// mean split their weight in proportion to size.
pub fn welch_anova(samples: &SampleCollection) -> Result<TestResult> {
    samples.validate()?;
    require_min_size(samples, 2, "Welch's ANOVA")?;
    let k = samples.len() as f64;

    let (constant, varying): (Vec<(f64, f64, f64)>, Vec<(f64, f64, f64)>) = samples
        .groups()
        .iter()
        .map(|g| (g.len() as f64, g.mean(), g.variance()))
        .partition(|&(_, _, v)| v == 0.0);

    let (center, lambda) = match constant.first() {
        None => {
            let weight_sum: f64 = varying.iter().map(|&(n, _, v)| n / v).sum();
            let center = varying.iter().map(|&(n, m, v)| n / v * m).sum::<f64>() / weight_sum;
            let lambda = varying
                .iter()
                .map(|&(n, _, v)| (1.0 - n / v / weight_sum).powi(2) / (n - 1.0))
                .sum::<f64>();
            (center, lambda)
        }
        Some(&(_, anchor, _)) => {
            if constant.iter().any(|&(_, m, _)| m != anchor) {
                return Ok(TestResult::new(f64::INFINITY, 0.0));
            }
            if varying.is_empty() {
                return Ok(TestResult::new(0.0, 1.0));
            }
            let constant_n: f64 = constant.iter().map(|&(n, _, _)| n).sum();
            let lambda = varying.iter().map(|&(n, _, _)| 1.0 / (n - 1.0)).sum::<f64>()
                + constant
                    .iter()
                    .map(|&(n, _, _)| (1.0 - n / constant_n).powi(2) / (n - 1.0))
                    .sum::<f64>();
            (anchor, lambda)
        }
    };

    let numerator = varying
        .iter()
        .map(|&(n, m, v)| n / v * (m - center).powi(2))
        .sum::<f64>()
        / (k - 1.0);
    let denominator = 1.0 + 2.0 * (k - 2.0) / (k * k - 1.0) * lambda;

    let statistic = numerator / denominator;
    let df1 = k - 1.0;
    let df2 = (k * k - 1.0) / (3.0 * lambda);
    Ok(TestResult::new(statistic, f_sf(statistic, df1, df2)?))
}

/// Games-Howell pairwise comparisons (unequal variances and sizes)
///
/// Statistic is the mean difference (A - B); intervals at 1 - alpha.
pub fn games_howell(
    samples: &SampleCollection,
    alpha: f64,
    marginal_alpha: f64,
) -> Result<PairwiseTable> {
    samples.validate()?;
    require_min_size(samples, 2, "Games-Howell")?;
    let k = samples.len();
    let groups = samples.groups();

    let rows = samples
        .pairs()
        .into_iter()
        .map(|(i, j)| {
            let (a, b) = (&groups[i], &groups[j]);
            let (na, nb) = (a.len() as f64, b.len() as f64);
            let (sa, sb) = (a.variance() / na, b.variance() / nb);
            let diff = a.mean() - b.mean();
            let se = (sa + sb).sqrt();

            let (pvalue, half_width) = if se == 0.0 {
                (range_pvalue(diff, 0.0, k, f64::INFINITY)?.1, 0.0)
            } else {
                let df = (sa + sb).powi(2) / (sa.powi(2) / (na - 1.0) + sb.powi(2) / (nb - 1.0));
                // q = |t| sqrt(2) with the studentized range standard error se / sqrt(2)
                let range_se = se / std::f64::consts::SQRT_2;
                let (_, p) = range_pvalue(diff, range_se, k, df)?;
                let q_crit = studentized_range_quantile(1.0 - alpha, k, df)?;
                (p, q_crit * range_se)
            };

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
        method: "Games-Howell".to_string(),
        rows,
    })
}

/// Kruskal-Wallis H test with tie correction
pub fn kruskal_wallis(samples: &SampleCollection) -> Result<TestResult> {
    samples.validate()?;
    let n = samples.total_len() as f64;
    let (ranks, tie_sum) = grouped_ranks(samples);

    let correction = 1.0 - tie_sum / (n * n * n - n);
    if correction <= 0.0 {
        return Err(AnalysisError::Degenerate(
            "Kruskal-Wallis undefined: all observations are identical".into(),
        ));
    }

    let rank_term: f64 = ranks
        .iter()
        .map(|r| r.iter().sum::<f64>().powi(2) / r.len() as f64)
        .sum();
    let h = (12.0 / (n * (n + 1.0)) * rank_term - 3.0 * (n + 1.0)) / correction;
    let pvalue = chi2_sf(h, (samples.len() - 1) as f64)?;
    Ok(TestResult::new(h, pvalue))
}

/// Dunn's test on mean ranks, p-values adjusted across all C(k, 2) pairs
///
/// Statistic is the z score of the mean-rank difference (A - B).
pub fn dunn(
    samples: &SampleCollection,
    correction: CorrectionMethod,
    alpha: f64,
    marginal_alpha: f64,
) -> Result<PairwiseTable> {
    samples.validate()?;
    let n = samples.total_len() as f64;
    let (ranks, tie_sum) = grouped_ranks(samples);
    let mean_ranks: Vec<f64> = ranks.iter().map(|r| mean(r)).collect();
    let variance = n * (n + 1.0) / 12.0 - tie_sum / (12.0 * (n - 1.0));
    if !(variance > 0.0) {
        return Err(AnalysisError::Degenerate(
            "Dunn's test undefined: all observations are identical".into(),
        ));
    }

    let groups = samples.groups();
    let pairs = samples.pairs();
    let (z_scores, raw): (Vec<f64>, Vec<f64>) = pairs
        .iter()
        .map(|&(i, j)| {
            let se = (variance * (1.0 / groups[i].len() as f64 + 1.0 / groups[j].len() as f64))
                .sqrt();
            let z = (mean_ranks[i] - mean_ranks[j]) / se;
            (z, (2.0 * normal_sf(z.abs())).min(1.0))
        })
        .unzip();
    let adjusted = adjust_pvalues(&raw, correction);

    let rows = pairs
        .iter()
        .zip(z_scores.iter().zip(&adjusted))
        .map(|(&(i, j), (&z, &p))| PairwiseComparison {
            group_a: groups[i].label.clone(),
            group_b: groups[j].label.clone(),
            statistic: z,
            pvalue: p,
            ci_low: None,
            ci_high: None,
            verdict: Significance::from_pvalue(p, alpha, marginal_alpha),
        })
        .collect();

    Ok(PairwiseTable {
        method: format!("Dunn ({})", correction.name()),
        rows,
    })
}

/// Mann-Whitney U test, two-sided normal approximation with tie and
/// continuity correction. Statistic is U of the first sample.
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> Result<TestResult> {
    if a.is_empty() || b.is_empty() {
        return Err(AnalysisError::Precondition(
            "Mann-Whitney U needs at least 1 observation per group".into(),
        ));
    }
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let pooled: Vec<f64> = a.iter().chain(b).copied().collect();
    let (ranks, tie_sum) = rank_with_ties(&pooled);
    let rank_sum_a: f64 = ranks[..a.len()].iter().sum();

    let u1 = rank_sum_a - n1 * (n1 + 1.0) / 2.0;
    let u2 = n1 * n2 - u1;
    let n = n1 + n2;
    let mu = n1 * n2 / 2.0;
    let sigma = (n1 * n2 / 12.0 * ((n + 1.0) - tie_sum / (n * (n - 1.0)))).sqrt();
    if !(sigma > 0.0) {
        return Ok(TestResult::new(u1, 1.0));
    }

    let z = (u1.max(u2) - mu - 0.5) / sigma;
    let pvalue = (2.0 * normal_sf(z)).clamp(0.0, 1.0);
    Ok(TestResult::new(u1, pvalue))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(groups: &[(&str, &[f64])]) -> SampleCollection {
        groups
            .iter()
            .fold(SampleCollection::new(), |acc, (label, values)| {
                acc.with_group(label, values).unwrap()
            })
    }

    #[test]
    fn test_rank_with_ties() {
        let (ranks, tie_sum) = rank_with_ties(&[10.0, 20.0, 10.0, 30.0]);
        assert_eq!(ranks, vec![1.5, 3.0, 1.5, 4.0]);
        assert_eq!(tie_sum, 6.0);
    }

    #[test]
    fn test_welch_reference_value() {
        let samples = collection(&[
            ("A", &[1.0, 2.0, 3.0, 4.0, 5.0]),
            ("B", &[2.0, 4.0, 6.0, 8.0, 10.0]),
            ("C", &[3.0, 4.0, 5.0, 6.0, 7.0]),
        ]);
        let result = welch_anova(&samples).unwrap();
        assert!((result.statistic - 2.6553).abs() < 1e-3, "F = {}", result.statistic);
        assert!((result.pvalue - 0.1336).abs() < 2e-3, "p = {}", result.pvalue);
    }

    #[test]
    fn test_welch_zero_variance_degenerate_rule() {
        let differ = collection(&[("A", &[1.0; 5]), ("B", &[100.0; 5])]);
        assert_eq!(welch_anova(&differ).unwrap(), TestResult::new(f64::INFINITY, 0.0));
        let same = collection(&[("A", &[1.0; 5]), ("B", &[1.0; 5])]);
        assert_eq!(welch_anova(&same).unwrap(), TestResult::new(0.0, 1.0));
    }

    #[test]
    fn test_welch_single_constant_group_stays_finite() {
        let samples = collection(&[
            ("A", &[5.0; 5]),
            ("B", &[4.0, 6.0, 3.0, 7.0, 5.2]),
            ("C", &[4.5, 5.5, 6.0, 4.0, 5.1]),
        ]);
        let result = welch_anova(&samples).unwrap();
        assert!((result.statistic - 0.0028354).abs() < 1e-6, "F = {}", result.statistic);
        assert!((result.pvalue - 0.99717).abs() < 1e-4, "p = {}", result.pvalue);
    }

    #[test]
    fn test_welch_constant_groups_with_different_means() {
        let samples = collection(&[
            ("A", &[5.0; 5]),
            ("B", &[9.0; 5]),
            ("C", &[4.5, 5.5, 6.0, 4.0, 5.1]),
        ]);
        assert_eq!(welch_anova(&samples).unwrap(), TestResult::new(f64::INFINITY, 0.0));

        let shared = collection(&[
            ("A", &[5.0; 5]),
            ("B", &[5.0; 5]),
            ("C", &[4.0, 6.0, 3.0, 7.0, 5.2]),
        ]);
        let result = welch_anova(&shared).unwrap();
        assert!(result.statistic.is_finite());
        assert!(result.pvalue > 0.9, "p = {}", result.pvalue);
    }

    #[test]
    fn test_games_howell_zero_variance() {
        let samples = collection(&[("A", &[1.0; 5]), ("B", &[100.0; 5]), ("C", &[1.0; 5])]);
        let table = games_howell(&samples, 0.05, 0.10).unwrap();
        assert_eq!(table.row("A", "B").unwrap().verdict, Significance::Significant);
        assert_eq!(table.row("B", "C").unwrap().verdict, Significance::Significant);
        assert_eq!(table.row("A", "C").unwrap().verdict, Significance::NotSignificant);
    }

    #[test]
    fn test_games_howell_separated_means() {
        let samples = collection(&[
            ("A", &[1.0, 2.0, 3.0, 4.0, 5.0]),
            ("B", &[20.0, 24.0, 28.0, 32.0, 36.0]),
            ("C", &[2.0, 3.0, 4.0, 5.0, 6.0]),
        ]);
        let table = games_howell(&samples, 0.05, 0.10).unwrap();
        assert_eq!(table.rows.len(), 3);
        let ab = table.row("A", "B").unwrap();
        assert!(ab.pvalue < 0.01, "p = {}", ab.pvalue);
        assert!(ab.ci_high.unwrap() < 0.0);
        let ac = table.row("A", "C").unwrap();
        assert!(ac.pvalue > 0.3, "p = {}", ac.pvalue);
    }

    #[test]
    fn test_kruskal_reference_value() {
        // No ties: H = 12/(12*13) * 4 * (2.5^2 + 6.5^2 + 10.5^2) - 39
        let samples = collection(&[
            ("A", &[1.0, 2.0, 3.0, 4.0]),
            ("B", &[5.0, 6.0, 7.0, 8.0]),
            ("C", &[9.0, 10.0, 11.0, 12.0]),
        ]);
        let result = kruskal_wallis(&samples).unwrap();
        assert!((result.statistic - 9.846153846).abs() < 1e-6);
        assert!((result.pvalue - (-9.846153846f64 / 2.0).exp()).abs() < 1e-6);
    }

    #[test]
    fn test_kruskal_all_identical_is_degenerate() {
        let samples = collection(&[("A", &[3.0; 4]), ("B", &[3.0; 4])]);
        assert!(matches!(
            kruskal_wallis(&samples),
            Err(AnalysisError::Degenerate(_))
        ));
    }

    #[test]
    fn test_dunn_pairs_and_correction() {
        let samples = collection(&[
            ("A", &[1.0, 2.0, 3.0, 4.0]),
            ("B", &[5.0, 6.0, 7.0, 8.0]),
            ("C", &[9.0, 10.0, 11.0, 12.0]),
        ]);
        let holm = dunn(&samples, CorrectionMethod::Holm, 0.05, 0.10).unwrap();
        let bonferroni = dunn(&samples, CorrectionMethod::Bonferroni, 0.05, 0.10).unwrap();
        assert_eq!(holm.rows.len(), 3);

        // mean ranks 2.5, 6.5, 10.5; se = sqrt(13 * 0.5); z(A, C) = -8 / 2.5495
        let ac = holm.row("A", "C").unwrap();
        assert!((ac.statistic + 8.0 / 6.5f64.sqrt()).abs() < 1e-9);
        assert_eq!(ac.verdict, Significance::Significant);

        for (h, b) in holm.rows.iter().zip(&bonferroni.rows) {
            assert!(h.pvalue <= b.pvalue + 1e-15);
        }
        assert!(holm.method.contains("Holm"));
    }

    #[test]
    fn test_mann_whitney_separated() {
        let result = mann_whitney_u(&[1.0, 2.0, 3.0, 4.0, 5.0], &[6.0, 7.0, 8.0, 9.0, 10.0]).unwrap();
        assert_eq!(result.statistic, 0.0);
        assert!((result.pvalue - 0.01219).abs() < 2e-4, "p = {}", result.pvalue);
    }

    #[test]
    fn test_mann_whitney_identical() {
        let result = mann_whitney_u(&[2.0, 2.0], &[2.0, 2.0, 2.0]).unwrap();
        assert_eq!(result.pvalue, 1.0);
    }
}
