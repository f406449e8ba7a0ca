// Per-variable driver loop
//
// Each variable gets its own output directory `<root>/<factor>/<variable>`.
// A failure aborts only that variable: it is logged with factor, variable and
// group names, recorded in the summary, and the loop moves on.

use super::orchestrator::analysis_of_variance;
use super::report::{AnalysisReport, TwoGroupReport};
use super::two_group::compare_two_groups;
use crate::config::AnalysisConfig;
use crate::dataset::{Dataset, Variable};
use crate::error::Result;
use crate::journal::{AnalysisLog, LogRecord};
use crate::plot::{file_stem, DiagnosticRenderer};
use crate::preprocess::{prepare, PreprocessSummary};
use crate::stats::Significance;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which comparison to run for every variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// k-group assumption-gated analysis of variance
    #[default]
    Anova,
    /// Two-condition t-test / Mann-Whitney comparison
    TwoGroup,
}

/// Result of one variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VariableStatus {
    Completed { report: Box<AnalysisReport> },
    Compared { report: Box<TwoGroupReport> },
    Failed { error: String },
}

/// One entry of the batch summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableOutcome {
    pub variable: String,
    pub output_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprocessing: Option<PreprocessSummary>,
    #[serde(flatten)]
    pub status: VariableStatus,
}

/// Everything a batch run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub factor: String,
    pub mode: BatchMode,
    pub config: AnalysisConfig,
    pub variables: Vec<VariableOutcome>,
}

impl BatchSummary {
    pub fn failed(&self) -> Vec<&VariableOutcome> {
        self.variables
            .iter()
            .filter(|v| matches!(v.status, VariableStatus::Failed { .. }))
            .collect()
    }

    /// Variables where some pair of conditions differs significantly
    pub fn with_differences(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|v| match &v.status {
                VariableStatus::Completed { report } => report.any_pairwise_difference,
                VariableStatus::Compared { report } => report.t_verdict == Significance::Significant,
                VariableStatus::Failed { .. } => false,
            })
            .map(|v| v.variable.as_str())
            .collect()
    }

    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = format!(
            "{}: {} variables, {} failed\n",
            self.factor,
            self.variables.len(),
            self.failed().len()
        );
        for outcome in &self.variables {
            report.push_str("\n--------------------------------------------------------------------------\n");
            match &outcome.status {
                VariableStatus::Completed { report: r } => report.push_str(&r.to_report_string()),
                VariableStatus::Compared { report: r } => report.push_str(&r.to_report_string()),
                VariableStatus::Failed { error } => {
                    report.push_str(&format!("{}: FAILED ({})\n", outcome.variable, error))
                }
            }
        }
        report
    }
}

/// Output directory for one variable
pub fn variable_output_dir(root: &Path, factor: &str, variable: &str) -> PathBuf {
    root.join(file_stem(factor)).join(file_stem(variable))
}

/// Evaluate every variable of the dataset
pub fn run_batch(
    dataset: &Dataset,
    config: &AnalysisConfig,
    mode: BatchMode,
    renderer: &dyn DiagnosticRenderer,
    output_root: &Path,
    log: &mut dyn AnalysisLog,
) -> BatchSummary {
    let variables = dataset
        .variables
        .iter()
        .map(|variable| {
            let output_dir = variable_output_dir(output_root, &dataset.factor, &variable.name);
            log.record(
                LogRecord::new("variable", format!("Variable: {}", variable.name))
                    .variable(&variable.name),
            );

            let mut preprocessing = None;
            let status = match evaluate_variable(
                &dataset.factor,
                variable,
                config,
                mode,
                renderer,
                &output_dir,
                &mut preprocessing,
                log,
            ) {
                Ok(status) => status,
                Err(e) => {
                    let groups: Vec<&str> =
                        variable.groups.iter().map(|g| g.label.as_str()).collect();
                    tracing::error!(
                        factor = %dataset.factor,
                        variable = %variable.name,
                        groups = ?groups,
                        "analysis failed: {}",
                        e
                    );
                    log.record(
                        LogRecord::new(
                            "error",
                            format!(
                                "{} / {} (groups: {}) failed: {}",
                                dataset.factor,
                                variable.name,
                                groups.join(", "),
                                e
                            ),
                        )
                        .variable(&variable.name),
                    );
                    VariableStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };

            VariableOutcome {
                variable: variable.name.clone(),
                output_dir,
                preprocessing,
                status,
            }
        })
        .collect();

    BatchSummary {
        factor: dataset.factor.clone(),
        mode,
        config: config.clone(),
        variables,
    }
}

#[allow(clippy::too_many_arguments)]
fn evaluate_variable(
    factor: &str,
    variable: &Variable,
    config: &AnalysisConfig,
    mode: BatchMode,
    renderer: &dyn DiagnosticRenderer,
    output_dir: &Path,
    preprocessing: &mut Option<PreprocessSummary>,
    log: &mut dyn AnalysisLog,
) -> Result<VariableStatus> {
    std::fs::create_dir_all(output_dir)?;
    let (samples, summary) = prepare(&variable.name, &variable.groups, config)?;
    if let Some(lambda) = summary.box_cox_lambda {
        log.record(
            LogRecord::new("box_cox", format!("{} lambda {}", variable.name, lambda))
                .variable(&variable.name),
        );
    }
    *preprocessing = Some(summary);

    match mode {
        BatchMode::Anova => {
            let report = analysis_of_variance(
                factor,
                &variable.name,
                &samples,
                config,
                renderer,
                output_dir,
                log,
            )?;
            Ok(VariableStatus::Completed {
                report: Box::new(report),
            })
        }
        BatchMode::TwoGroup => {
            let report = compare_two_groups(&variable.name, &samples, config, log)?;
            Ok(VariableStatus::Compared {
                report: Box::new(report),
            })
        }
    }
}
