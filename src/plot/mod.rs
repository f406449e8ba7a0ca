// Diagnostic plot rendering
//
// Assumption checks ask a `DiagnosticRenderer` for their artifacts:
// - one normal probability plot per group (`<group>.svg`)
// - one grouped distribution plot per variable (`distplot_<variable>.svg`)
//
// Rendering failures surface as `AnalysisError::Render`; callers log them and
// carry on, since plots never change a statistical decision.

pub mod charts;
pub mod palette;
pub mod svg;

use crate::error::{AnalysisError, Result};
use crate::samples::{SampleCollection, SampleGroup};
use std::path::{Path, PathBuf};

/// Produces diagnostic plots for the assumption checks
pub trait DiagnosticRenderer {
    /// Normal probability plot for one group; `None` when rendering is off
    fn probability_plot(&self, group: &SampleGroup, output_dir: &Path) -> Result<Option<PathBuf>>;

    /// Grouped histogram with box strip; `None` when rendering is off
    fn distribution_plot(
        &self,
        factor: &str,
        variable: &str,
        samples: &SampleCollection,
        output_dir: &Path,
    ) -> Result<Option<PathBuf>>;
}

/// Renders nothing (plots disabled, tests)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl DiagnosticRenderer for NullRenderer {
    fn probability_plot(&self, _group: &SampleGroup, _output_dir: &Path) -> Result<Option<PathBuf>> {
        Ok(None)
    }

    fn distribution_plot(
        &self,
        _factor: &str,
        _variable: &str,
        _samples: &SampleCollection,
        _output_dir: &Path,
    ) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// Writes standalone SVG documents
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgRenderer;

/// Replace characters that are unsafe in file names
///
/// Empty names and the `.` / `..` path components become underscores so a
/// stem never leaves its parent directory.
pub fn file_stem(name: &str) -> String {
    match name {
        "" => "_".to_string(),
        "." | ".." => "_".repeat(name.len()),
        _ => name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c => c,
            })
            .collect(),
    }
}

fn write_svg(output_dir: &Path, file_name: String, document: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|e| {
        AnalysisError::Render(format!("cannot create {}: {}", output_dir.display(), e))
    })?;
    let path = output_dir.join(file_name);
    std::fs::write(&path, document)
        .map_err(|e| AnalysisError::Render(format!("cannot write {}: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), "plot written");
    Ok(path)
}

impl DiagnosticRenderer for SvgRenderer {
    fn probability_plot(&self, group: &SampleGroup, output_dir: &Path) -> Result<Option<PathBuf>> {
        let document = charts::probability_plot_svg(group)?;
        write_svg(output_dir, format!("{}.svg", file_stem(&group.label)), &document).map(Some)
    }

    fn distribution_plot(
        &self,
        factor: &str,
        variable: &str,
        samples: &SampleCollection,
        output_dir: &Path,
    ) -> Result<Option<PathBuf>> {
        let document = charts::distribution_plot_svg(factor, variable, samples)?;
        write_svg(
            output_dir,
            format!("distplot_{}.svg", file_stem(variable)),
            &document,
        )
        .map(Some)
    }
}
