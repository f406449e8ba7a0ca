// Assumption-gated group comparison
//
// Given one measured variable split into k experimental conditions, check the
// ANOVA assumptions and route to the test family they allow:
//
// - all hold (or only equal cell sizes fails): one-way ANOVA + Tukey HSD
// - unequal variances: Welch's ANOVA + Games-Howell
// - non-normal data with equal variances: Kruskal-Wallis + Dunn's test
//
// Post-hoc comparisons run only when the omnibus test is at least marginally
// significant. Effect size and power are reported for every route; degenerate
// data leaves them undefined instead of failing the variable.
//
// References:
// [1] Welch, B. L. (1951). On the comparison of several mean values: an
//     alternative approach. Biometrika 38.
// [2] Games, P. A., & Howell, J. F. (1976). Pairwise multiple comparison
//     procedures with unequal n's and/or variances. J. Educ. Stat. 1.
// [3] Dunn, O. J. (1964). Multiple comparisons using rank sums.
//     Technometrics 6.

mod batch;
mod orchestrator;
mod report;
mod routing;
mod two_group;

pub use batch::{
    run_batch, variable_output_dir, BatchMode, BatchSummary, VariableOutcome, VariableStatus,
};
pub use orchestrator::analysis_of_variance;
pub use report::{
    AnalysisReport, AssumptionReport, EffectSizeReport, Estimate, PowerReport, TwoGroupReport,
};
pub use routing::{select_route, AssumptionOutcomes, Route};
pub use two_group::compare_two_groups;
