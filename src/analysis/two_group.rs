// Two-condition comparison (e.g. experienced vs inexperienced participants)
//
// Levene's test decides between Student's and Welch's t; Mann-Whitney U is
// reported alongside as the rank-based check.

use super::report::TwoGroupReport;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::journal::{AnalysisLog, LogRecord};
use crate::samples::SampleCollection;
use crate::stats::descriptive::GroupSummary;
use crate::stats::{equal_variances, mann_whitney_u, t_test_ind, Significance};

/// Compare exactly two groups of one variable
pub fn compare_two_groups(
    variable: &str,
    samples: &SampleCollection,
    config: &AnalysisConfig,
    log: &mut dyn AnalysisLog,
) -> Result<TwoGroupReport> {
    samples.validate_groups()?;
    let [a, b] = samples.groups() else {
        return Err(AnalysisError::Precondition(format!(
            "two-group comparison needs exactly 2 groups, got {}",
            samples.len()
        )));
    };

    let group_a = GroupSummary::of(a)?;
    let group_b = GroupSummary::of(b)?;
    for summary in [&group_a, &group_b] {
        log.record(
            LogRecord::new("describe", format!("{} mean: {}", summary.label, summary.mean))
                .variable(variable),
        );
    }

    let check = equal_variances(variable, samples, config.alpha, log)?;
    let t_test = t_test_ind(&a.values, &b.values, check.passed)?;
    let t_verdict = Significance::from_pvalue(t_test.pvalue, config.alpha, config.marginal_alpha);
    let name = if t_test.equal_var { "Student's t-test" } else { "Welch's t-test" };
    let message = if t_verdict.has_signal() {
        format!(
            "{}: Reject the null hypothesis: the means of {} and {} differ (significant: {}).",
            name, a.label, b.label, t_verdict
        )
    } else {
        format!(
            "{}: Fail to reject the null hypothesis: the means of {} and {} are assumed equal.",
            name, a.label, b.label
        )
    };
    log.record(
        LogRecord::new("t_test", message)
            .variable(variable)
            .test(t_test.statistic, t_test.pvalue)
            .verdict(t_verdict),
    );

    let mann_whitney = mann_whitney_u(&a.values, &b.values)?;
    let mann_whitney_verdict =
        Significance::from_pvalue(mann_whitney.pvalue, config.alpha, config.marginal_alpha);
    log.record(
        LogRecord::new(
            "mann_whitney",
            format!(
                "Mann-Whitney U for {} vs {} (significant: {})",
                a.label, b.label, mann_whitney_verdict
            ),
        )
        .variable(variable)
        .test(mann_whitney.statistic, mann_whitney.pvalue)
        .verdict(mann_whitney_verdict),
    );

    Ok(TwoGroupReport {
        variable: variable.to_string(),
        group_a,
        group_b,
        equal_variances: check,
        t_test,
        t_verdict,
        mann_whitney,
        mann_whitney_verdict,
    })
}
