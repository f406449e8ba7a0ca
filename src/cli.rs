//! CLI argument parsing for Goggles

use crate::analysis::BatchMode;
use crate::config::{AnalysisConfig, BoxCox, CorrectionMethod, FloorFilter};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Threshold preset used as the base configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// alpha 0.05, marginal 0.10, Holm (default)
    Default,
    /// alpha 0.01, marginal 0.05, Bonferroni
    Strict,
    /// alpha 0.10, marginal 0.15
    Permissive,
}

/// Multiple-comparison correction for Dunn's test
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Correction {
    Holm,
    Bonferroni,
    Sidak,
    FdrBh,
}

impl From<Correction> for CorrectionMethod {
    fn from(value: Correction) -> Self {
        match value {
            Correction::Holm => Self::Holm,
            Correction::Bonferroni => Self::Bonferroni,
            Correction::Sidak => Self::Sidak,
            Correction::FdrBh => Self::FdrBh,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "goggles")]
#[command(version)]
#[command(
    about = "Assumption-gated ANOVA / Welch / Kruskal-Wallis comparison of experimental conditions",
    long_about = None
)]
pub struct Cli {
    /// Dataset JSON: {"factor": ..., "variables": [{"name": ..., "groups": [...]}]}
    #[arg(value_name = "DATASET")]
    pub dataset: PathBuf,

    /// TOML configuration file (CLI flags override its values)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base threshold preset when no configuration file is given
    #[arg(long, value_enum, default_value = "default")]
    pub preset: Preset,

    /// Output root; plots go to <OUTPUT>/<factor>/<variable>/
    #[arg(short, long, value_name = "DIR", default_value = "results")]
    pub output: PathBuf,

    /// Significance level
    #[arg(long, value_name = "ALPHA")]
    pub alpha: Option<f64>,

    /// Marginal significance level
    #[arg(long = "marginal-alpha", value_name = "ALPHA")]
    pub marginal_alpha: Option<f64>,

    /// Correction for Dunn's pairwise p-values
    #[arg(long, value_enum)]
    pub correction: Option<Correction>,

    /// Symmetric percentile trim fraction (e.g. 0.2 keeps 10th-90th percentile)
    #[arg(long, value_name = "FRACTION")]
    pub trim: Option<f64>,

    /// Box-Cox transform with a fixed lambda
    #[arg(long = "box-cox-lambda", value_name = "LAMBDA", conflicts_with = "estimate_box_cox")]
    pub box_cox_lambda: Option<f64>,

    /// Box-Cox transform with lambda estimated by maximum likelihood
    #[arg(long = "estimate-box-cox")]
    pub estimate_box_cox: bool,

    /// Drop values at or below FLOOR for variables whose name contains PATTERN
    #[arg(long = "floor", value_names = ["PATTERN", "FLOOR"], num_args = 2)]
    pub floor: Option<Vec<String>>,

    /// Compare exactly two conditions with t-test and Mann-Whitney U
    #[arg(long = "two-group")]
    pub two_group: bool,

    /// Skip writing diagnostic plots
    #[arg(long = "no-plots")]
    pub no_plots: bool,

    /// Print the batch summary as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Enable debug tracing output
    #[arg(long)]
    pub debug: bool,

    /// Write tracing output to FILE instead of stderr
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Base configuration before command-line overrides
    pub fn preset_config(&self) -> AnalysisConfig {
        match self.preset {
            Preset::Default => AnalysisConfig::default(),
            Preset::Strict => AnalysisConfig::strict(),
            Preset::Permissive => AnalysisConfig::permissive(),
        }
    }

    /// Apply command-line overrides on top of `config`
    pub fn apply_overrides(&self, config: &mut AnalysisConfig) -> Result<(), String> {
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(marginal) = self.marginal_alpha {
            config.marginal_alpha = marginal;
        }
        if let Some(correction) = self.correction {
            config.correction = correction.into();
        }
        if let Some(trim) = self.trim {
            config.trim_fraction = Some(trim);
        }
        if let Some(lambda) = self.box_cox_lambda {
            config.box_cox = BoxCox::Fixed(lambda);
        }
        if self.estimate_box_cox {
            config.box_cox = BoxCox::Estimate;
        }
        if let Some([pattern, floor]) = self.floor.as_deref() {
            let floor = floor
                .parse::<f64>()
                .map_err(|e| format!("invalid --floor value '{}': {}", floor, e))?;
            config.floor_filter = Some(FloorFilter {
                column_contains: pattern.clone(),
                floor,
            });
        }
        if self.no_plots {
            config.render_plots = false;
        }
        config.validate()
    }

    pub fn mode(&self) -> BatchMode {
        if self.two_group {
            BatchMode::TwoGroup
        } else {
            BatchMode::Anova
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_dataset() {
        let cli = Cli::parse_from(["goggles", "data.json"]);
        assert_eq!(cli.dataset, PathBuf::from("data.json"));
        assert_eq!(cli.output, PathBuf::from("results"));
        assert_eq!(cli.mode(), BatchMode::Anova);
    }

    #[test]
    fn test_cli_requires_dataset() {
        assert!(Cli::try_parse_from(["goggles"]).is_err());
    }

    #[test]
    fn test_cli_overrides_thresholds() {
        let cli = Cli::parse_from([
            "goggles",
            "data.json",
            "--alpha",
            "0.01",
            "--marginal-alpha",
            "0.05",
            "--correction",
            "fdr-bh",
            "--no-plots",
        ]);
        let mut config = cli.preset_config();
        cli.apply_overrides(&mut config).unwrap();
        assert_eq!(config.alpha, 0.01);
        assert_eq!(config.marginal_alpha, 0.05);
        assert_eq!(config.correction, CorrectionMethod::FdrBh);
        assert!(!config.render_plots);
    }

    #[test]
    fn test_cli_rejects_inverted_alphas() {
        let cli = Cli::parse_from(["goggles", "data.json", "--alpha", "0.2"]);
        let mut config = cli.preset_config();
        assert!(cli.apply_overrides(&mut config).is_err());
    }

    #[test]
    fn test_cli_box_cox_flags_conflict() {
        let result = Cli::try_parse_from([
            "goggles",
            "data.json",
            "--box-cox-lambda",
            "0.5",
            "--estimate-box-cox",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_floor_filter() {
        let cli = Cli::parse_from(["goggles", "data.json", "--floor", "bucket", "11"]);
        let mut config = cli.preset_config();
        cli.apply_overrides(&mut config).unwrap();
        let floor = config.floor_filter.unwrap();
        assert_eq!(floor.column_contains, "bucket");
        assert_eq!(floor.floor, 11.0);
    }

    #[test]
    fn test_cli_strict_preset_and_two_group() {
        let cli = Cli::parse_from(["goggles", "data.json", "--preset", "strict", "--two-group"]);
        assert_eq!(cli.preset_config().alpha, 0.01);
        assert_eq!(cli.mode(), BatchMode::TwoGroup);
    }
}
