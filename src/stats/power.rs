//! One-way ANOVA power analysis (noncentral F)
//!
//! power = P(F'(k-1, N-k, f^2 N) > F_crit(1 - alpha)). Solved directly for
//! power, and by bracketed bisection for the minimum detectable Cohen's f or
//! the minimum total sample size.

use super::distributions::{f_critical, noncentral_f_sf};
use crate::error::{AnalysisError, Result};

/// Largest Cohen's f searched when solving for the detectable effect
const MAX_EFFECT: f64 = 10.0;

/// Largest total N searched when solving for sample size
const MAX_NOBS: usize = 10_000_000;

fn check_design(nobs: usize, alpha: f64, k_groups: usize) -> Result<()> {
    if k_groups < 2 {
        return Err(AnalysisError::Precondition(format!(
            "power analysis needs at least 2 groups, got {}",
            k_groups
        )));
    }
    if nobs <= k_groups {
        return Err(AnalysisError::Precondition(format!(
            "power analysis needs N ({}) > k ({})",
            nobs, k_groups
        )));
    }
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(AnalysisError::Precondition(format!(
            "alpha must be in (0, 1), got {}",
            alpha
        )));
    }
    Ok(())
}

/// Power of the one-way ANOVA F test for Cohen's f with N total observations
pub fn anova_power(effect_size: f64, nobs: usize, alpha: f64, k_groups: usize) -> Result<f64> {
    check_design(nobs, alpha, k_groups)?;
    if !(effect_size >= 0.0 && effect_size.is_finite()) {
        return Err(AnalysisError::Precondition(format!(
            "effect size must be finite and non-negative, got {}",
            effect_size
        )));
    }
    let df1 = (k_groups - 1) as f64;
    let df2 = (nobs - k_groups) as f64;
    let critical = f_critical(alpha, df1, df2)?;
    let noncentrality = effect_size * effect_size * nobs as f64;
    noncentral_f_sf(critical, df1, df2, noncentrality)
}

fn check_power(power: f64, alpha: f64) -> Result<()> {
    if !(power > alpha && power < 1.0) {
        return Err(AnalysisError::Precondition(format!(
            "target power must be in (alpha, 1), got {}",
            power
        )));
    }
    Ok(())
}

/// Minimum detectable Cohen's f at the given power
pub fn anova_detectable_effect(
    power: f64,
    nobs: usize,
    alpha: f64,
    k_groups: usize,
) -> Result<f64> {
    check_design(nobs, alpha, k_groups)?;
    check_power(power, alpha)?;

    let objective = |f: f64| anova_power(f, nobs, alpha, k_groups).map(|p| p - power);
    let (mut lo, mut hi) = (0.0, MAX_EFFECT);
    if objective(hi)? < 0.0 {
        return Err(AnalysisError::NonConvergence(format!(
            "power {} not reachable with N={} and k={} for f <= {}",
            power, nobs, k_groups, MAX_EFFECT
        )));
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if objective(mid)? < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-8 {
            break;
        }
    }
    Ok(0.5 * (lo + hi))
}

/// Minimum total sample size reaching the given power for Cohen's f
pub fn anova_required_nobs(
    effect_size: f64,
    power: f64,
    alpha: f64,
    k_groups: usize,
) -> Result<usize> {
    check_design(k_groups + 1, alpha, k_groups)?;
    check_power(power, alpha)?;
    if !(effect_size > 0.0 && effect_size.is_finite()) {
        return Err(AnalysisError::NonConvergence(format!(
            "no sample size reaches power {} for effect size {}",
            power, effect_size
        )));
    }

    let reaches = |n: usize| anova_power(effect_size, n, alpha, k_groups).map(|p| p >= power);
    let mut lo = k_groups + 1;
    if reaches(lo)? {
        return Ok(lo);
    }
    let mut hi = (2 * lo).max(8);
    while !reaches(hi)? {
        lo = hi;
        hi *= 2;
        if hi > MAX_NOBS {
            return Err(AnalysisError::NonConvergence(format!(
                "power {} needs more than {} observations for f = {}",
                power, MAX_NOBS, effect_size
            )));
        }
    }
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if reaches(mid)? {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Ok(hi)
}
