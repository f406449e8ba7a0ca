// Assumption-gated analysis of variance for one (factor, variable) pair
//
// Steps:
// 1. Descriptive summary
// 2. Assumption checks (equal sizes, normality, homoscedasticity) plus the
//    shape-similarity plot
// 3. Route selection from the assumption outcomes
// 4. Omnibus test, interpreted with the dual alpha / marginal-alpha scheme
// 5. Post-hoc comparisons only on an at-least-marginal omnibus
// 6. Effect size, and power/sensitivity for the ANOVA-family routes

use super::report::{AnalysisReport, AssumptionReport, EffectSizeReport, Estimate, PowerReport};
use super::routing::{select_route, AssumptionOutcomes, Route};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::journal::{AnalysisLog, LogRecord};
use crate::plot::DiagnosticRenderer;
use crate::samples::SampleCollection;
use crate::stats::{
    anova_cohen_f, anova_detectable_effect, anova_eta_squared, anova_power, describe, dunn,
    equal_size_samples, equal_variances, games_howell, kruskal_wallis,
    kruskal_wallis_epsilon_squared, normality, one_way_anova, similarity_of_shape, tukey_hsd,
    welch_anova, PairwiseTable, Significance, TestResult,
};
use std::path::Path;

/// Run the full pipeline for one variable
///
/// Plots go to `output_dir`; every statistical step emits a record to `log`.
///
/// # Example
/// ```
/// use goggles::analysis::{analysis_of_variance, Route};
/// use goggles::config::AnalysisConfig;
/// use goggles::journal::MemoryLog;
/// use goggles::plot::NullRenderer;
/// use goggles::samples::SampleCollection;
/// use std::path::Path;
///
/// let samples = SampleCollection::new()
///     .with_group("Transparent", &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap()
///     .with_group("Yellow", &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap()
///     .with_group("Red", &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
///
/// let mut log = MemoryLog::new();
/// let report = analysis_of_variance(
///     "TTFF", "R bucket", &samples, &AnalysisConfig::default(),
///     &NullRenderer, Path::new("."), &mut log,
/// ).unwrap();
/// assert_eq!(report.route, Route::ParametricAnova);
/// assert!(report.posthoc.is_none());
/// ```
pub fn analysis_of_variance(
    factor: &str,
    variable: &str,
    samples: &SampleCollection,
    config: &AnalysisConfig,
    renderer: &dyn DiagnosticRenderer,
    output_dir: &Path,
    log: &mut dyn AnalysisLog,
) -> Result<AnalysisReport> {
    samples.validate()?;
    let alpha = config.alpha;

    let descriptives = describe(variable, samples, log)?;

    let equal_sizes = equal_size_samples(variable, samples, alpha, log)?;
    let normality = normality(
        variable,
        samples,
        renderer,
        output_dir,
        alpha,
        config.clt_min_size,
        log,
    )?;
    let homoscedasticity = equal_variances(variable, samples, alpha, log)?;
    similarity_of_shape(factor, variable, samples, renderer, output_dir, log);

    let outcomes = AssumptionOutcomes {
        equal_sizes: equal_sizes.passed,
        normality: normality.passed,
        homoscedasticity: homoscedasticity.passed,
        shape_checked_manually: true,
    };
    let route = select_route(&outcomes);
    log_route(&outcomes, route, variable, log);

    let omnibus = match route {
        Route::ParametricAnova => one_way_anova(samples)?,
        Route::WelchAnova => welch_anova(samples)?,
        Route::KruskalWallis => kruskal_wallis(samples)?,
    };
    let omnibus_verdict = interpret_omnibus(route, omnibus, config, variable, log);

    let posthoc = if omnibus_verdict.has_signal() {
        let table = run_posthoc(route, samples, config)?;
        log_posthoc(&table, alpha, variable, log);
        Some(table)
    } else {
        None
    };
    let any_pairwise_difference = posthoc
        .as_ref()
        .is_some_and(|table| table.any_significant(alpha));

    let (effect_size, power) = effect_size_and_power(route, samples, config, variable, log)?;

    Ok(AnalysisReport {
        factor: factor.to_string(),
        variable: variable.to_string(),
        descriptives,
        assumptions: AssumptionReport {
            outcomes,
            equal_sizes,
            normality,
            homoscedasticity,
        },
        route,
        omnibus,
        omnibus_verdict,
        posthoc,
        effect_size,
        power,
        any_pairwise_difference,
    })
}

fn log_route(outcomes: &AssumptionOutcomes, route: Route, variable: &str, log: &mut dyn AnalysisLog) {
    let message = if outcomes.all_passed() {
        format!(
            "All ANOVA assumptions have passed. Running {} ({} on signal).",
            route.omnibus_name(),
            route.posthoc_name()
        )
    } else {
        format!(
            "Not all ANOVA assumptions have passed ({} failed). Running {} ({} on signal).",
            outcomes.failed().join(", "),
            route.omnibus_name(),
            route.posthoc_name()
        )
    };
    log.record(LogRecord::new("route", message).variable(variable));
}

/// Shared dual-threshold reading of an omnibus result
fn interpret_omnibus(
    route: Route,
    result: TestResult,
    config: &AnalysisConfig,
    variable: &str,
    log: &mut dyn AnalysisLog,
) -> Significance {
    let verdict = Significance::from_pvalue(result.pvalue, config.alpha, config.marginal_alpha);
    let message = match verdict {
        Significance::Significant => format!(
            "{}: Reject the null hypothesis: at least one group mean differs.",
            route.omnibus_name()
        ),
        Significance::Marginal => format!(
            "{}: At least one group mean differs at the marginal level.",
            route.omnibus_name()
        ),
        Significance::NotSignificant => format!(
            "{}: Fail to reject the null hypothesis: no evidence of group differences.",
            route.omnibus_name()
        ),
    };
    log.record(
        LogRecord::new("omnibus", message)
            .variable(variable)
            .test(result.statistic, result.pvalue)
            .verdict(verdict),
    );
    verdict
}

fn run_posthoc(
    route: Route,
    samples: &SampleCollection,
    config: &AnalysisConfig,
) -> Result<PairwiseTable> {
    match route {
        Route::ParametricAnova => tukey_hsd(samples, config.alpha, config.marginal_alpha),
        Route::WelchAnova => games_howell(samples, config.alpha, config.marginal_alpha),
        Route::KruskalWallis => dunn(
            samples,
            config.correction,
            config.alpha,
            config.marginal_alpha,
        ),
    }
}

fn log_posthoc(table: &PairwiseTable, alpha: f64, variable: &str, log: &mut dyn AnalysisLog) {
    log.record(
        LogRecord::new(
            "posthoc",
            format!(
                "{} pairwise comparisons at {:.1}% confidence\n{}",
                table.method,
                (1.0 - alpha) * 100.0,
                table.to_table_string()
            ),
        )
        .variable(variable),
    );
    let summary = if table.any_significant(alpha) {
        format!("At least one pair differs significantly by {}.", table.method)
    } else {
        format!("No significant pairwise differences by {}.", table.method)
    };
    log.record(LogRecord::new("posthoc", summary).variable(variable));
}

fn effect_size_and_power(
    route: Route,
    samples: &SampleCollection,
    config: &AnalysisConfig,
    variable: &str,
    log: &mut dyn AnalysisLog,
) -> Result<(EffectSizeReport, Option<PowerReport>)> {
    if route == Route::KruskalWallis {
        let estimate = Estimate::from_result(kruskal_wallis_epsilon_squared(samples))?;
        log.record(
            LogRecord::new("effect_size", format!("Epsilon-squared: {}", estimate))
                .variable(variable),
        );
        return Ok((
            EffectSizeReport {
                measure: "epsilon_squared".to_string(),
                estimate,
                cohen_f: None,
            },
            None,
        ));
    }

    let eta = Estimate::from_result(anova_eta_squared(samples))?;
    let cohen_f = Estimate::from_result(anova_cohen_f(samples))?;
    log.record(
        LogRecord::new(
            "effect_size",
            format!("Eta-squared: {}, Cohen's f: {}", eta, cohen_f),
        )
        .variable(variable),
    );

    let nobs = samples.total_len();
    let k = samples.len();
    let achieved_power = match cohen_f.value() {
        Some(f) => Estimate::from_result(anova_power(f, nobs, config.alpha, k))?,
        None => Estimate::Undefined {
            reason: "Cohen's f is undefined".to_string(),
        },
    };
    let detectable_effect = Estimate::from_result(anova_detectable_effect(
        config.target_power,
        nobs,
        config.alpha,
        k,
    ))?;
    log.record(
        LogRecord::new(
            "power",
            format!(
                "Achieved power with N={}: {}; minimum detectable f at power {}: {}",
                nobs, achieved_power, config.target_power, detectable_effect
            ),
        )
        .variable(variable),
    );

    Ok((
        EffectSizeReport {
            measure: "eta_squared".to_string(),
            estimate: eta,
            cohen_f: Some(cohen_f),
        },
        Some(PowerReport {
            nobs,
            groups: k,
            achieved_power,
            target_power: config.target_power,
            detectable_effect,
        }),
    ))
}
