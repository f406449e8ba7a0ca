// Configuration for the assumption-gated comparison pipeline
//
// Thresholds are shared by every (factor, variable) evaluation in a batch.
// Loaded from goggles.toml, overridable from the command line.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Multiple-comparison correction applied to Dunn's pairwise p-values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionMethod {
    /// Holm step-down, controls the family-wise error rate
    #[default]
    Holm,
    /// Single-step Bonferroni
    Bonferroni,
    /// Single-step Sidak
    Sidak,
    /// Benjamini-Hochberg false discovery rate
    FdrBh,
}

impl CorrectionMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Holm => "Holm-Bonferroni",
            Self::Bonferroni => "Bonferroni",
            Self::Sidak => "Sidak",
            Self::FdrBh => "Benjamini-Hochberg",
        }
    }
}

/// Power transform applied before testing
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxCox {
    /// Leave observations untransformed
    #[default]
    None,
    /// Transform with a fixed lambda
    Fixed(f64),
    /// Estimate lambda by maximum likelihood on the pooled observations
    Estimate,
}

/// Drop observations at or below `floor` for variables whose name contains
/// `column_contains` (e.g. fixations on the bucket under 11 ms are artefacts)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorFilter {
    pub column_contains: String,
    pub floor: f64,
}

/// Configuration for assumption checks, test selection and reporting
///
/// # Example
/// ```
/// use goggles::config::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.alpha, 0.05);
/// assert_eq!(config.marginal_alpha, 0.10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Significance level for assumption checks and "significant" verdicts
    ///
    /// - 0.05 (default): 95% family-wise confidence for Tukey intervals
    /// - 0.01: stricter
    pub alpha: f64,

    /// Looser threshold for "marginally significant" verdicts
    ///
    /// Omnibus tests report a signal when p <= marginal_alpha; post-hoc
    /// comparisons then run. Must not be tighter than `alpha`.
    pub marginal_alpha: f64,

    /// Correction for Dunn's pairwise comparisons
    pub correction: CorrectionMethod,

    /// Groups at least this large tolerate a Shapiro-Wilk rejection
    /// (Central Limit Theorem)
    pub clt_min_size: usize,

    /// Desired power for the minimum detectable effect report
    pub target_power: f64,

    /// Symmetric trimming fraction split across both tails (0.2 keeps the
    /// 10th to 90th percentile)
    pub trim_fraction: Option<f64>,

    /// Box-Cox power transform
    pub box_cox: BoxCox,

    /// Domain floor filter
    pub floor_filter: Option<FloorFilter>,

    /// Write Q-Q and distribution plots
    pub render_plots: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            marginal_alpha: 0.10,
            correction: CorrectionMethod::Holm,
            clt_min_size: 30,
            target_power: 0.8,
            trim_fraction: None,
            box_cox: BoxCox::None,
            floor_filter: None,
            render_plots: true,
        }
    }
}

impl AnalysisConfig {
    /// Strict thresholds (fewer false positives)
    pub fn strict() -> Self {
        Self {
            alpha: 0.01,
            marginal_alpha: 0.05,
            correction: CorrectionMethod::Bonferroni,
            ..Self::default()
        }
    }

    /// Permissive thresholds (flag weaker evidence)
    pub fn permissive() -> Self {
        Self {
            alpha: 0.10,
            marginal_alpha: 0.15,
            correction: CorrectionMethod::FdrBh,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML string; missing keys take defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(format!("alpha must be in (0, 1), got {}", self.alpha));
        }

        if !(self.marginal_alpha >= self.alpha && self.marginal_alpha < 1.0) {
            return Err(format!(
                "marginal_alpha must be in [alpha, 1), got {} (alpha = {})",
                self.marginal_alpha, self.alpha
            ));
        }

        if self.clt_min_size < 3 {
            return Err(format!(
                "clt_min_size must be >= 3, got {}",
                self.clt_min_size
            ));
        }

        if !(self.target_power > self.alpha && self.target_power < 1.0) {
            return Err(format!(
                "target_power must be in (alpha, 1), got {} (alpha = {})",
                self.target_power, self.alpha
            ));
        }

        if let Some(fraction) = self.trim_fraction {
            if !(0.0..1.0).contains(&fraction) {
                return Err(format!(
                    "trim_fraction must be in [0, 1), got {}",
                    fraction
                ));
            }
        }

        if let BoxCox::Fixed(lambda) = self.box_cox {
            if !lambda.is_finite() {
                return Err(format!("box_cox lambda must be finite, got {}", lambda));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.alpha, 0.05);
        assert_eq!(config.marginal_alpha, 0.10);
        assert_eq!(config.correction, CorrectionMethod::Holm);
        assert_eq!(config.clt_min_size, 30);
        assert!(config.render_plots);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strict_config() {
        let config = AnalysisConfig::strict();
        assert_eq!(config.alpha, 0.01);
        assert_eq!(config.correction, CorrectionMethod::Bonferroni);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_permissive_config() {
        let config = AnalysisConfig::permissive();
        assert_eq!(config.alpha, 0.10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml = r#"
            alpha = 0.01
            correction = "fdr_bh"
            trim_fraction = 0.2
        "#;

        let config = AnalysisConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.alpha, 0.01);
        assert_eq!(config.marginal_alpha, 0.10);
        assert_eq!(config.correction, CorrectionMethod::FdrBh);
        assert_eq!(config.trim_fraction, Some(0.2));
        assert_eq!(config.box_cox, BoxCox::None);
    }

    #[test]
    fn test_parse_box_cox_and_floor() {
        let toml = r#"
            box_cox = { fixed = -2.0 }

            [floor_filter]
            column_contains = "bucket"
            floor = 11.0
        "#;

        let config = AnalysisConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.box_cox, BoxCox::Fixed(-2.0));
        let filter = config.floor_filter.unwrap();
        assert_eq!(filter.column_contains, "bucket");
        assert_eq!(filter.floor, 11.0);
    }

    #[test]
    fn test_parse_box_cox_estimate() {
        let config = AnalysisConfig::from_toml_str(r#"box_cox = "estimate""#).unwrap();
        assert_eq!(config.box_cox, BoxCox::Estimate);
    }

    #[test]
    fn test_rejects_unknown_correction() {
        assert!(AnalysisConfig::from_toml_str(r#"correction = "tukey""#).is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_alpha() {
        let mut config = AnalysisConfig::default();
        config.alpha = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_marginal_tighter_than_alpha() {
        let mut config = AnalysisConfig::default();
        config.marginal_alpha = 0.01;
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_trim_fraction() {
        let mut config = AnalysisConfig::default();
        config.trim_fraction = Some(1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_clt_min_size() {
        let mut config = AnalysisConfig::default();
        config.clt_min_size = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_target_power_must_exceed_alpha() {
        let mut config = AnalysisConfig::default();
        config.target_power = 0.04;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_correction_names() {
        assert_eq!(CorrectionMethod::Holm.name(), "Holm-Bonferroni");
        assert_eq!(CorrectionMethod::FdrBh.name(), "Benjamini-Hochberg");
    }
}
