// Per-variable analysis reports
//
// Everything the orchestrator decides is kept here so a batch run can be
// serialized to JSON and rendered as text after the fact.

use super::routing::{AssumptionOutcomes, Route};
use crate::error::{AnalysisError, Result};
use crate::stats::assumptions::Check;
use crate::stats::parametric::TTestResult;
use crate::stats::{GroupSummary, NormalityOutcome, PairwiseTable, Significance, TestResult};
use serde::{Deserialize, Serialize};

/// A quantity that may be undefined for the data at hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Estimate {
    Value { value: f64 },
    /// Degenerate data (e.g. eta-squared of 1)
    Undefined { reason: String },
    /// Root finding failed to bracket a solution
    NotDeterminable { reason: String },
}

impl Estimate {
    /// Convert a computation result, keeping fatal errors as errors
    pub fn from_result(result: Result<f64>) -> Result<Self> {
        match result {
            Ok(value) => Ok(Self::Value { value }),
            Err(AnalysisError::Degenerate(reason)) => Ok(Self::Undefined { reason }),
            Err(AnalysisError::NonConvergence(reason)) => Ok(Self::NotDeterminable { reason }),
            Err(e) => Err(e),
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value { value } => Some(*value),
            _ => None,
        }
    }
}

impl std::fmt::Display for Estimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value { value } => write!(f, "{:.4}", value),
            Self::Undefined { reason } => write!(f, "undefined ({})", reason),
            Self::NotDeterminable { reason } => write!(f, "not determinable ({})", reason),
        }
    }
}

/// Effect size for the omnibus test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSizeReport {
    /// "eta_squared" or "epsilon_squared"
    pub measure: String,
    pub estimate: Estimate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cohen_f: Option<Estimate>,
}

/// Achieved power and sensitivity of a parametric design
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerReport {
    pub nobs: usize,
    pub groups: usize,
    /// Power at the observed Cohen's f
    pub achieved_power: Estimate,
    pub target_power: f64,
    /// Minimum Cohen's f detectable at `target_power`
    pub detectable_effect: Estimate,
}

/// Assumption checks with their underlying tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssumptionReport {
    pub outcomes: AssumptionOutcomes,
    pub equal_sizes: Check,
    pub normality: NormalityOutcome,
    pub homoscedasticity: Check,
}

/// Full evaluation of one (factor, variable) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub factor: String,
    pub variable: String,
    pub descriptives: Vec<GroupSummary>,
    pub assumptions: AssumptionReport,
    pub route: Route,
    pub omnibus: TestResult,
    pub omnibus_verdict: Significance,
    /// Present only when the omnibus test showed at least a marginal signal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posthoc: Option<PairwiseTable>,
    pub effect_size: EffectSizeReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<PowerReport>,
    /// At least one post-hoc pair is significant at alpha
    pub any_pairwise_difference: bool,
}

impl AnalysisReport {
    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        report.push_str(&format!("{} / {}\n", self.factor, self.variable));
        for d in &self.descriptives {
            report.push_str(&format!(
                "  {:<14} n={:<4} min={:.3} max={:.3} median={:.3} mean={:.3} std={:.3}\n",
                d.label, d.n, d.min, d.max, d.median, d.mean, d.std
            ));
        }

        let failed = self.assumptions.outcomes.failed();
        if failed.is_empty() {
            report.push_str("\nAll ANOVA assumptions have passed.\n");
        } else {
            report.push_str(&format!("\nFailed assumptions: {}\n", failed.join(", ")));
        }

        report.push_str(&format!(
            "\n{}: statistic={:.4}, p={:.4} (significant: {})\n",
            self.route.omnibus_name(),
            self.omnibus.statistic,
            self.omnibus.pvalue,
            self.omnibus_verdict
        ));

        match &self.posthoc {
            Some(table) => {
                report.push_str(&format!("\n{}:\n", table.method));
                report.push_str(&table.to_table_string());
            }
            None => report.push_str("No evidence of group differences; post-hoc skipped.\n"),
        }

        report.push_str(&format!(
            "\nEffect size ({}): {}\n",
            self.effect_size.measure, self.effect_size.estimate
        ));
        if let Some(f) = &self.effect_size.cohen_f {
            report.push_str(&format!("Cohen's f: {}\n", f));
        }
        if let Some(power) = &self.power {
            report.push_str(&format!(
                "Achieved power (N={}): {}\n",
                power.nobs, power.achieved_power
            ));
            report.push_str(&format!(
                "Minimum detectable f at power {}: {}\n",
                power.target_power, power.detectable_effect
            ));
        }

        report.push_str(&format!(
            "\nPairwise difference found: {}\n",
            if self.any_pairwise_difference { "yes" } else { "no" }
        ));
        report
    }
}

/// Two-condition comparison (e.g. experienced vs inexperienced participants)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoGroupReport {
    pub variable: String,
    pub group_a: GroupSummary,
    pub group_b: GroupSummary,
    pub equal_variances: Check,
    pub t_test: TTestResult,
    pub t_verdict: Significance,
    pub mann_whitney: TestResult,
    pub mann_whitney_verdict: Significance,
}

impl TwoGroupReport {
    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        format!(
            "{}\n  {} mean={:.3} (n={})\n  {} mean={:.3} (n={})\n  {}'s t={:.4}, df={:.2}, p={:.4} (significant: {})\n  Mann-Whitney U={:.1}, p={:.4} (significant: {})\n",
            self.variable,
            self.group_a.label,
            self.group_a.mean,
            self.group_a.n,
            self.group_b.label,
            self.group_b.mean,
            self.group_b.n,
            if self.t_test.equal_var { "Student" } else { "Welch" },
            self.t_test.statistic,
            self.t_test.df,
            self.t_test.pvalue,
            self.t_verdict,
            self.mann_whitney.statistic,
            self.mann_whitney.pvalue,
            self.mann_whitney_verdict
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_from_result() {
        assert_eq!(
            Estimate::from_result(Ok(0.25)).unwrap(),
            Estimate::Value { value: 0.25 }
        );
        let undefined =
            Estimate::from_result(Err(AnalysisError::Degenerate("eta = 1".into()))).unwrap();
        assert!(undefined.to_string().starts_with("undefined"));
        assert_eq!(undefined.value(), None);

        let nd = Estimate::from_result(Err(AnalysisError::NonConvergence("x".into()))).unwrap();
        assert!(matches!(nd, Estimate::NotDeterminable { .. }));

        assert!(Estimate::from_result(Err(AnalysisError::Precondition("x".into()))).is_err());
    }

    #[test]
    fn test_estimate_serializes_with_status_tag() {
        let json = serde_json::to_string(&Estimate::Value { value: 0.5 }).unwrap();
        assert_eq!(json, r#"{"status":"value","value":0.5}"#);
    }
}
