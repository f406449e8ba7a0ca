//! Multiple-comparison p-value adjustment

use crate::config::CorrectionMethod;

/// Adjust a family of p-values; output order matches input order
///
/// # Example
/// ```
/// use goggles::config::CorrectionMethod;
/// use goggles::stats::adjust_pvalues;
///
/// let adjusted = adjust_pvalues(&[0.01, 0.04, 0.03], CorrectionMethod::Holm);
/// assert!((adjusted[0] - 0.03).abs() < 1e-12);
/// assert!((adjusted[1] - 0.06).abs() < 1e-12);
/// assert!((adjusted[2] - 0.06).abs() < 1e-12);
/// ```
pub fn adjust_pvalues(pvalues: &[f64], method: CorrectionMethod) -> Vec<f64> {
    let m = pvalues.len();
    if m == 0 {
        return Vec::new();
    }
    let mf = m as f64;

    match method {
        CorrectionMethod::Bonferroni => pvalues.iter().map(|p| (p * mf).min(1.0)).collect(),
        CorrectionMethod::Sidak => pvalues
            .iter()
            .map(|p| (1.0 - (1.0 - p).powf(mf)).min(1.0))
            .collect(),
        CorrectionMethod::Holm => {
            let order = ascending_order(pvalues);
            let mut adjusted = vec![0.0; m];
            let mut running_max: f64 = 0.0;
            for (rank, &idx) in order.iter().enumerate() {
                let value = ((mf - rank as f64) * pvalues[idx]).min(1.0);
                running_max = running_max.max(value);
                adjusted[idx] = running_max;
            }
            adjusted
        }
        CorrectionMethod::FdrBh => {
            let order = ascending_order(pvalues);
            let mut adjusted = vec![0.0; m];
            let mut running_min: f64 = 1.0;
            for (rank, &idx) in order.iter().enumerate().rev() {
                let value = (mf / (rank as f64 + 1.0) * pvalues[idx]).min(1.0);
                running_min = running_min.min(value);
                adjusted[idx] = running_min;
            }
            adjusted
        }
    }
}

/// Indices sorted by ascending p-value (stable for ties)
fn ascending_order(pvalues: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..pvalues.len()).collect();
    order.sort_by(|&a, &b| pvalues[a].total_cmp(&pvalues[b]));
    order
}
