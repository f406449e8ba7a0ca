//! Reference distributions
//!
//! Central distributions come from `statrs`. The noncentral F (for ANOVA
//! power) and the studentized range (for Tukey HSD and Games-Howell) are
//! evaluated numerically here.

use crate::error::{AnalysisError, Result};
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};
use statrs::function::beta::beta_reg;
use statrs::function::erf::erfc;
use statrs::function::gamma::ln_gamma;

/// Simpson intervals for the studentized range integrals (must be even)
const RANGE_INTERVALS: usize = 200;

/// Poisson weight below which noncentral F terms are dropped
const NONCENTRAL_TOLERANCE: f64 = 1e-14;

fn dist_err<E: std::fmt::Display>(err: E) -> AnalysisError {
    AnalysisError::Distribution(err.to_string())
}

/// Standard normal CDF
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Standard normal survival function
pub fn normal_sf(x: f64) -> f64 {
    0.5 * erfc(x / std::f64::consts::SQRT_2)
}

/// Standard normal density
pub fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// Standard normal quantile
pub fn normal_quantile(p: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&p) {
        return Err(AnalysisError::Distribution(format!(
            "probability must be in [0, 1], got {}",
            p
        )));
    }
    let normal = Normal::new(0.0, 1.0).map_err(dist_err)?;
    Ok(normal.inverse_cdf(p))
}

/// Upper tail of the F distribution
pub fn f_sf(x: f64, df1: f64, df2: f64) -> Result<f64> {
    if x.is_nan() {
        return Ok(f64::NAN);
    }
    if x <= 0.0 {
        return Ok(1.0);
    }
    if x.is_infinite() {
        return Ok(0.0);
    }
    let f = FisherSnedecor::new(df1, df2).map_err(dist_err)?;
    Ok(f.sf(x).clamp(0.0, 1.0))
}

/// Critical value of the F distribution at upper-tail probability `alpha`
pub fn f_critical(alpha: f64, df1: f64, df2: f64) -> Result<f64> {
    let f = FisherSnedecor::new(df1, df2).map_err(dist_err)?;
    Ok(f.inverse_cdf(1.0 - alpha))
}

/// Upper tail of the chi-square distribution
pub fn chi2_sf(x: f64, df: f64) -> Result<f64> {
    if x.is_nan() {
        return Ok(f64::NAN);
    }
    if x <= 0.0 {
        return Ok(1.0);
    }
    if x.is_infinite() {
        return Ok(0.0);
    }
    let chi2 = ChiSquared::new(df).map_err(dist_err)?;
    Ok(chi2.sf(x).clamp(0.0, 1.0))
}

/// Two-sided p-value of a t statistic
pub fn t_two_sided(t: f64, df: f64) -> Result<f64> {
    if t.is_nan() {
        return Ok(f64::NAN);
    }
    if t.is_infinite() {
        return Ok(0.0);
    }
    if df.is_infinite() {
        return Ok((2.0 * normal_sf(t.abs())).min(1.0));
    }
    let dist = StudentsT::new(0.0, 1.0, df).map_err(dist_err)?;
    Ok((2.0 * dist.sf(t.abs())).min(1.0))
}

/// Upper tail of the noncentral F distribution
///
/// Poisson mixture of regularized incomplete beta functions:
/// `P(F' > x) = sum_j Pois(j; nc/2) * I_{1-y}(df2/2, df1/2 + j)`,
/// `y = df1 x / (df1 x + df2)`.
pub fn noncentral_f_sf(x: f64, df1: f64, df2: f64, nc: f64) -> Result<f64> {
    if !(df1 > 0.0 && df2 > 0.0 && nc >= 0.0) {
        return Err(AnalysisError::Distribution(format!(
            "noncentral F requires df1 > 0, df2 > 0, nc >= 0 (got {}, {}, {})",
            df1, df2, nc
        )));
    }
    if x <= 0.0 {
        return Ok(1.0);
    }
    if x.is_infinite() {
        return Ok(0.0);
    }

    let y = df1 * x / (df1 * x + df2);
    let half_nc = nc / 2.0;
    if half_nc == 0.0 {
        return Ok(beta_reg(df2 / 2.0, df1 / 2.0, 1.0 - y).clamp(0.0, 1.0));
    }

    // Each beta term grows with j, so the window edges bound the whole sum
    let (a, b) = (df2 / 2.0, df1 / 2.0);
    let beta_term = |j: f64| beta_reg(a, b + j, 1.0 - y);
    let spread = 12.0 * half_nc.sqrt() + 20.0;
    let lowest = (half_nc - spread).max(0.0).floor();
    let highest = (half_nc + spread).ceil();
    if beta_term(lowest) >= 1.0 - NONCENTRAL_TOLERANCE {
        return Ok(1.0);
    }
    if beta_term(highest) <= NONCENTRAL_TOLERANCE {
        return Ok(0.0);
    }

    // Sum outward from the Poisson mode until the weights are negligible
    let mode = half_nc.floor();
    let mode_weight = (-half_nc + mode * half_nc.ln() - ln_gamma(mode + 1.0)).exp();
    let mut total = mode_weight * beta_term(mode);

    let (mut j, mut weight) = (mode, mode_weight);
    while j < highest && weight > NONCENTRAL_TOLERANCE {
        weight *= half_nc / (j + 1.0);
        j += 1.0;
        total += weight * beta_term(j);
    }

    let (mut j, mut weight) = (mode, mode_weight);
    while j > lowest && weight > NONCENTRAL_TOLERANCE {
        weight *= j / half_nc;
        j -= 1.0;
        total += weight * beta_term(j);
    }
    Ok(total.clamp(0.0, 1.0))
}

/// Composite Simpson rule over [a, b]
fn simpson<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, intervals: usize) -> f64 {
    let h = (b - a) / intervals as f64;
    let mut sum = f(a) + f(b);
    for i in 1..intervals {
        let x = a + i as f64 * h;
        sum += if i % 2 == 1 { 4.0 * f(x) } else { 2.0 * f(x) };
    }
    sum * h / 3.0
}

/// CDF of the range of `k` standard normal variables
fn normal_range_cdf(w: f64, k: usize) -> f64 {
    if w <= 0.0 {
        return 0.0;
    }
    if w.is_infinite() {
        return 1.0;
    }
    let kf = k as f64;
    let integrand = |z: f64| {
        let inner = (normal_cdf(z) - normal_cdf(z - w)).max(0.0);
        normal_pdf(z) * inner.powi(k as i32 - 1)
    };
    (kf * simpson(integrand, -8.0, 8.0 + w.min(8.0), RANGE_INTERVALS)).clamp(0.0, 1.0)
}

/// CDF of the studentized range distribution with `k` means and `df`
/// degrees of freedom
///
/// Integrates the normal range CDF over the distribution of
/// `s = sqrt(chi2_df / df)`, in log-space so that small `df` are covered.
pub fn studentized_range_cdf(q: f64, k: usize, df: f64) -> Result<f64> {
    if k < 2 {
        return Err(AnalysisError::Distribution(format!(
            "studentized range needs k >= 2, got {}",
            k
        )));
    }
    if df.is_nan() || df <= 0.0 {
        return Err(AnalysisError::Distribution(format!(
            "studentized range needs df > 0, got {}",
            df
        )));
    }
    if q.is_nan() {
        return Ok(f64::NAN);
    }
    if q <= 0.0 {
        return Ok(0.0);
    }
    if q.is_infinite() {
        return Ok(1.0);
    }
    if df.is_infinite() || df > 25_000.0 {
        return Ok(normal_range_cdf(q, k));
    }

    // Wilson-Hilferty bounds on s^2, 8.5 standard deviations either side
    let c = 2.0 / (9.0 * df);
    let upper = (1.0 - c + 8.5 * c.sqrt()).powi(3);
    let lower_root = 1.0 - c - 8.5 * c.sqrt();
    let lower = if lower_root > 0.0 {
        lower_root.powi(3)
    } else {
        1e-20
    };
    let (u_lo, u_hi) = (0.5 * lower.ln(), 0.5 * upper.ln());

    let log_norm = (df / 2.0) * df.ln() - ln_gamma(df / 2.0) - (df / 2.0 - 1.0) * 2f64.ln();
    let density = |u: f64| {
        // density of u = ln s, i.e. f(s) * s
        let s = u.exp();
        (log_norm + df * u - df * s * s / 2.0).exp()
    };

    let mass = simpson(density, u_lo, u_hi, RANGE_INTERVALS);
    let weighted = simpson(
        |u| density(u) * normal_range_cdf(q * u.exp(), k),
        u_lo,
        u_hi,
        RANGE_INTERVALS,
    );
    if mass <= 0.0 {
        return Err(AnalysisError::Distribution(
            "studentized range integration collapsed".into(),
        ));
    }
    Ok((weighted / mass).clamp(0.0, 1.0))
}

/// Upper tail of the studentized range distribution
pub fn studentized_range_sf(q: f64, k: usize, df: f64) -> Result<f64> {
    let cdf = studentized_range_cdf(q, k, df)?;
    Ok((1.0 - cdf).clamp(0.0, 1.0))
}

/// Quantile of the studentized range distribution (bisection)
pub fn studentized_range_quantile(p: f64, k: usize, df: f64) -> Result<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(AnalysisError::Distribution(format!(
            "probability must be in (0, 1), got {}",
            p
        )));
    }
    let mut lo = 0.0;
    let mut hi = 4.0;
    while studentized_range_cdf(hi, k, df)? < p {
        lo = hi;
        hi *= 2.0;
        if hi > 1e6 {
            return Err(AnalysisError::NonConvergence(format!(
                "studentized range quantile p={} k={} df={} out of range",
                p, k, df
            )));
        }
    }
    for _ in 0..100 {
        let mid = 0.5 * (lo + hi);
        if studentized_range_cdf(mid, k, df)? < p {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-9 {
            break;
        }
    }
    Ok(0.5 * (lo + hi))
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_normal_helpers() {
        close(normal_cdf(0.0), 0.5, 1e-12);
        close(normal_sf(1.959964), 0.025, 1e-6);
        close(normal_quantile(0.975).unwrap(), 1.959964, 1e-5);
        assert!(normal_quantile(1.5).is_err());
    }

    #[test]
    fn test_f_sf_edges() {
        assert_eq!(f_sf(0.0, 2.0, 12.0).unwrap(), 1.0);
        assert_eq!(f_sf(f64::INFINITY, 2.0, 12.0).unwrap(), 0.0);
        assert!(f_sf(f64::NAN, 2.0, 12.0).unwrap().is_nan());
        // F(2, 12) upper 5% point is 3.885
        close(f_sf(3.885294, 2.0, 12.0).unwrap(), 0.05, 1e-5);
    }

    #[test]
    fn test_chi2_sf() {
        // chi2(2) upper 5% point is 5.991
        close(chi2_sf(5.991465, 2.0).unwrap(), 0.05, 1e-6);
    }

    #[test]
    fn test_t_two_sided() {
        // t(10) two-sided 5% point is 2.228
        close(t_two_sided(2.228139, 10.0).unwrap(), 0.05, 1e-5);
        close(t_two_sided(-2.228139, 10.0).unwrap(), 0.05, 1e-5);
        assert_eq!(t_two_sided(f64::INFINITY, 10.0).unwrap(), 0.0);
    }

    #[test]
    fn test_noncentral_f_reduces_to_central() {
        let central = f_sf(2.5, 3.0, 20.0).unwrap();
        close(noncentral_f_sf(2.5, 3.0, 20.0, 0.0).unwrap(), central, 1e-10);
    }

    #[test]
    fn test_noncentral_f_increases_with_noncentrality() {
        let small = noncentral_f_sf(3.0, 2.0, 30.0, 1.0).unwrap();
        let large = noncentral_f_sf(3.0, 2.0, 30.0, 10.0).unwrap();
        assert!(large > small);
        assert!(large <= 1.0);
    }

    #[test]
    fn test_noncentral_f_reference_value() {
        close(noncentral_f_sf(3.0, 2.0, 30.0, 10.0).unwrap(), 0.8086865385, 1e-8);
        close(noncentral_f_sf(3.885, 2.0, 12.0, 2.4).unwrap(), 0.2137688226, 1e-8);
    }

    #[test]
    fn test_noncentral_f_huge_noncentrality_saturates() {
        assert_eq!(noncentral_f_sf(3.885, 2.0, 12.0, 1.5e11).unwrap(), 1.0);
        assert_eq!(noncentral_f_sf(1e9, 2.0, 12.0, 50.0).unwrap(), 0.0);
    }

    #[test]
    fn test_normal_range_two_means() {
        // For k = 2, range / sqrt(2) is |N(0,1)|: P(R < 2.771808) = 0.95
        close(normal_range_cdf(2.771808, 2), 0.95, 1e-5);
    }

    #[test]
    fn test_studentized_range_table_values() {
        // Upper 5% points from standard tables
        close(studentized_range_quantile(0.95, 3, 12.0).unwrap(), 3.773, 5e-3);
        close(studentized_range_quantile(0.95, 4, 20.0).unwrap(), 3.958, 5e-3);
        close(studentized_range_quantile(0.95, 2, 10.0).unwrap(), 3.151, 5e-3);
    }

    #[test]
    fn test_studentized_range_large_df_is_normal_range() {
        close(
            studentized_range_cdf(3.314, 3, f64::INFINITY).unwrap(),
            0.95,
            1e-3,
        );
    }

    #[test]
    fn test_studentized_range_rejects_bad_parameters() {
        assert!(studentized_range_cdf(1.0, 1, 10.0).is_err());
        assert!(studentized_range_cdf(1.0, 3, 0.0).is_err());
    }
}
