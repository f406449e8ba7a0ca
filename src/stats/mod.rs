// Hypothesis tests, assumption checks and effect sizes
//
// Every test returns a `TestResult` (statistic, p-value). Verdicts come from
// the shared dual-threshold interpreter: alpha for "significant", a looser
// marginal-alpha for "marginally significant".
//
// Implementation:
// - Uses statrs for the F, t, chi-square and normal distributions
// - Noncentral F and studentized range are evaluated in `distributions`
// - Sample variance uses the n-1 denominator throughout

pub mod assumptions;
pub mod correction;
pub mod descriptive;
pub mod distributions;
pub mod effect_size;
pub mod nonparametric;
pub mod parametric;
pub mod power;

pub use assumptions::{
    equal_size_samples, equal_variances, levene, normality, shapiro_wilk, similarity_of_shape,
    NormalityOutcome,
};
pub use correction::adjust_pvalues;
pub use descriptive::{describe, GroupSummary};
pub use effect_size::{anova_cohen_f, anova_eta_squared, kruskal_wallis_epsilon_squared};
pub use nonparametric::{
    dunn, games_howell, kruskal_wallis, mann_whitney_u, welch_anova,
};
pub use parametric::{one_way_anova, t_test_ind, tukey_hsd};
pub use power::{anova_power, anova_required_nobs, anova_detectable_effect};

use serde::{Deserialize, Serialize};

/// Result of a hypothesis test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Test statistic (F, H, W, t, U, chi-square)
    pub statistic: f64,
    /// p-value in [0, 1] (NaN only when the statistic is undefined)
    pub pvalue: f64,
}

impl TestResult {
    pub fn new(statistic: f64, pvalue: f64) -> Self {
        Self { statistic, pvalue }
    }
}

/// Three-level reading of a p-value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    /// p <= alpha
    Significant,
    /// alpha < p <= marginal_alpha
    Marginal,
    /// p > marginal_alpha (or undefined)
    NotSignificant,
}

impl Significance {
    /// Interpret a p-value: the marginal band is checked first, then
    /// tightened by alpha.
    ///
    /// # Example
    /// ```
    /// use goggles::stats::Significance;
    ///
    /// assert_eq!(Significance::from_pvalue(0.03, 0.05, 0.10), Significance::Significant);
    /// assert_eq!(Significance::from_pvalue(0.07, 0.05, 0.10), Significance::Marginal);
    /// assert_eq!(Significance::from_pvalue(0.20, 0.05, 0.10), Significance::NotSignificant);
    /// ```
    pub fn from_pvalue(pvalue: f64, alpha: f64, marginal_alpha: f64) -> Self {
        let mut verdict = Self::NotSignificant;
        if pvalue <= marginal_alpha {
            verdict = Self::Marginal;
        }
        if pvalue <= alpha {
            verdict = Self::Significant;
        }
        verdict
    }

    /// At least marginally significant
    pub fn has_signal(&self) -> bool {
        !matches!(self, Self::NotSignificant)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Significant => "yes",
            Self::Marginal => "marginally",
            Self::NotSignificant => "no",
        }
    }
}

impl std::fmt::Display for Significance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a pairwise comparison table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseComparison {
    pub group_a: String,
    pub group_b: String,
    /// Mean difference (Tukey, Games-Howell) or z statistic (Dunn)
    pub statistic: f64,
    /// p-value (adjusted for Dunn's test)
    pub pvalue: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_high: Option<f64>,
    pub verdict: Significance,
}

/// Pairwise comparisons for all C(k, 2) unordered pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseTable {
    /// Procedure name (e.g. "Tukey HSD")
    pub method: String,
    pub rows: Vec<PairwiseComparison>,
}

impl PairwiseTable {
    /// Whether any pair is significant at alpha
    pub fn any_significant(&self, alpha: f64) -> bool {
        self.rows.iter().any(|r| r.pvalue <= alpha)
    }

    /// Find the row for an unordered pair of labels
    pub fn row(&self, a: &str, b: &str) -> Option<&PairwiseComparison> {
        self.rows.iter().find(|r| {
            (r.group_a == a && r.group_b == b) || (r.group_a == b && r.group_b == a)
        })
    }

    /// Render as an aligned text table for the log
    pub fn to_table_string(&self) -> String {
        let mut out = format!(
            "{:<14} {:<14} {:>10} {:>10} {:>10} {:>10}  Significant\n",
            "Group 1", "Group 2", "Statistic", "p-value", "Lower CI", "Upper CI"
        );
        for row in &self.rows {
            let ci = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |x| format!("{:.4}", x));
            out.push_str(&format!(
                "{:<14} {:<14} {:>10.4} {:>10.4} {:>10} {:>10}  {}\n",
                row.group_a,
                row.group_b,
                row.statistic,
                row.pvalue,
                ci(row.ci_low),
                ci(row.ci_high),
                row.verdict
            ));
        }
        out
    }
}
