//! Effect sizes for the omnibus tests
//!
//! - [`anova_eta_squared`]: proportion of variance explained by group
//! - [`anova_cohen_f`]: Cohen's f derived from eta-squared
//! - [`kruskal_wallis_epsilon_squared`]: rank-based analogue from H

use crate::error::{AnalysisError, Result};
use crate::samples::SampleCollection;

/// Eta-squared: `SS_between / SS_total`
///
/// Undefined when every observation is identical (SS_total = 0).
pub fn anova_eta_squared(samples: &SampleCollection) -> Result<f64> {
    samples.validate()?;
    let grand_mean = crate::samples::mean(&samples.pooled());
    let ss_between: f64 = samples
        .groups()
        .iter()
        .map(|g| g.len() as f64 * (g.mean() - grand_mean).powi(2))
        .sum();
    let ss_total: f64 = samples
        .groups()
        .iter()
        .flat_map(|g| g.values.iter())
        .map(|x| (x - grand_mean).powi(2))
        .sum();

    if ss_total == 0.0 {
        return Err(AnalysisError::Degenerate(
            "eta-squared undefined: total sum of squares is zero".into(),
        ));
    }
    Ok((ss_between / ss_total).clamp(0.0, 1.0))
}

/// Cohen's f from eta-squared: `sqrt(eta / (1 - eta))`
pub fn cohen_f_from_eta(eta_squared: f64) -> Result<f64> {
    if eta_squared >= 1.0 {
        return Err(AnalysisError::Degenerate(
            "Cohen's f undefined: eta-squared is 1 (no within-group variance)".into(),
        ));
    }
    Ok((eta_squared / (1.0 - eta_squared)).sqrt())
}

/// Cohen's f for the collection
pub fn anova_cohen_f(samples: &SampleCollection) -> Result<f64> {
    cohen_f_from_eta(anova_eta_squared(samples)?)
}

/// Epsilon-squared for Kruskal-Wallis: `(H - k + 1) / (N - k)`
pub fn epsilon_squared_from_h(h: f64, k: usize, n: usize) -> Result<f64> {
    if n <= k {
        return Err(AnalysisError::Degenerate(format!(
            "epsilon-squared undefined: N ({}) must exceed k ({})",
            n, k
        )));
    }
    Ok((h - k as f64 + 1.0) / (n - k) as f64)
}

/// Epsilon-squared for the collection (runs Kruskal-Wallis for H)
pub fn kruskal_wallis_epsilon_squared(samples: &SampleCollection) -> Result<f64> {
    let h = super::nonparametric::kruskal_wallis(samples)?.statistic;
    epsilon_squared_from_h(h, samples.len(), samples.total_len())
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
    fn test_eta_squared_no_effect() {
        let samples = collection(&[("A", &[1.0, 2.0, 3.0]), ("B", &[1.0, 2.0, 3.0])]);
        assert_eq!(anova_eta_squared(&samples).unwrap(), 0.0);
    }

    #[test]
    fn test_eta_squared_known_value() {
        // grand mean 3.5; SSB = 3*(2-3.5)^2*2 = 13.5; SST = 13.5 + 4 = 17.5
        let samples = collection(&[("A", &[1.0, 2.0, 3.0]), ("B", &[4.0, 5.0, 6.0])]);
        let eta = anova_eta_squared(&samples).unwrap();
        assert!((eta - 13.5 / 17.5).abs() < 1e-12);
        let f = anova_cohen_f(&samples).unwrap();
        assert!((f - (13.5f64 / 4.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_eta_squared_degenerate() {
        let samples = collection(&[("A", &[2.0, 2.0]), ("B", &[2.0, 2.0])]);
        assert!(matches!(
            anova_eta_squared(&samples),
            Err(AnalysisError::Degenerate(_))
        ));
    }

    #[test]
    fn test_cohen_f_undefined_at_eta_one() {
        let samples = collection(&[("A", &[1.0, 1.0]), ("B", &[100.0, 100.0])]);
        assert_eq!(anova_eta_squared(&samples).unwrap(), 1.0);
        assert!(matches!(
            anova_cohen_f(&samples),
            Err(AnalysisError::Degenerate(_))
        ));
    }

    #[test]
    fn test_epsilon_squared_guard() {
        assert!(epsilon_squared_from_h(3.0, 3, 3).is_err());
        assert!((epsilon_squared_from_h(5.0, 3, 13).unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_kruskal_epsilon_separated_groups() {
        let samples = collection(&[
            ("A", &[1.0, 2.0, 3.0, 4.0]),
            ("B", &[5.0, 6.0, 7.0, 8.0]),
            ("C", &[9.0, 10.0, 11.0, 12.0]),
        ]);
        let eps = kruskal_wallis_epsilon_squared(&samples).unwrap();
        assert!(eps > 0.8 && eps <= 1.0, "epsilon-squared = {}", eps);
    }
}
