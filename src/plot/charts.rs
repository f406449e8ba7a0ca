//! Chart layouts: normal probability plot and grouped distribution plot

use super::palette::assign_colors;
use super::svg::{Anchor, SvgBuilder, SvgElement};
use crate::error::{AnalysisError, Result};
use crate::samples::{median, percentile, SampleCollection, SampleGroup};
use crate::stats::distributions::normal_quantile;

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 520.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 150.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const AXIS: &str = "#444444";
const GRID: &str = "#E5ECF6";

/// Linear map from data space to pixel space
#[derive(Debug, Clone, Copy)]
struct Scale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl Scale {
    fn new(lo: f64, hi: f64, range: (f64, f64)) -> Self {
        // Pad zero-width domains so points land mid-axis
        let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) };
        Self {
            domain: (lo, hi),
            range,
        }
    }

    fn map(&self, v: f64) -> f64 {
        let t = (v - self.domain.0) / (self.domain.1 - self.domain.0);
        self.range.0 + t * (self.range.1 - self.range.0)
    }

    fn ticks(&self, count: usize) -> Vec<f64> {
        let (lo, hi) = self.domain;
        (0..=count)
            .map(|i| lo + (hi - lo) * i as f64 / count as f64)
            .collect()
    }
}

fn axes(x: &Scale, y: &Scale, x_label: &str, y_label: &str) -> Vec<SvgElement> {
    let (left, right) = x.range;
    let (bottom, top) = y.range;
    let mut elements = Vec::new();

    for tick in y.ticks(5) {
        let py = y.map(tick);
        elements.push(SvgElement::Line {
            x1: left,
            y1: py,
            x2: right,
            y2: py,
            stroke: GRID.into(),
            width: 1.0,
        });
        elements.push(SvgElement::Text {
            x: left - 8.0,
            y: py + 4.0,
            content: format!("{:.3}", tick),
            size: 11.0,
            anchor: Anchor::End,
        });
    }
    for tick in x.ticks(5) {
        elements.push(SvgElement::Text {
            x: x.map(tick),
            y: bottom + 18.0,
            content: format!("{:.3}", tick),
            size: 11.0,
            anchor: Anchor::Middle,
        });
    }
    elements.push(SvgElement::Line {
        x1: left,
        y1: bottom,
        x2: right,
        y2: bottom,
        stroke: AXIS.into(),
        width: 1.0,
    });
    elements.push(SvgElement::Line {
        x1: left,
        y1: bottom,
        x2: left,
        y2: top,
        stroke: AXIS.into(),
        width: 1.0,
    });
    elements.push(SvgElement::Text {
        x: (left + right) / 2.0,
        y: bottom + 42.0,
        content: x_label.to_string(),
        size: 13.0,
        anchor: Anchor::Middle,
    });
    elements.push(SvgElement::Text {
        x: 16.0,
        y: (top + bottom) / 2.0,
        content: y_label.to_string(),
        size: 13.0,
        anchor: Anchor::Start,
    });
    elements
}

/// Filliben's estimate of the uniform order statistic medians
pub(crate) fn order_statistic_medians(n: usize) -> Vec<f64> {
    let nf = n as f64;
    let last = 0.5f64.powf(1.0 / nf);
    (1..=n)
        .map(|i| match i {
            1 => 1.0 - last,
            i if i == n => last,
            i => (i as f64 - 0.3175) / (nf + 0.365),
        })
        .collect()
}

/// Least-squares slope and intercept of y on x
fn least_squares(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let sxx: f64 = x.iter().map(|a| (a - mx).powi(2)).sum();
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    (slope, my - slope * mx)
}

/// Ordered values against theoretical normal quantiles, with the fitted line
pub fn probability_plot_svg(group: &SampleGroup) -> Result<String> {
    if group.len() < 2 {
        return Err(AnalysisError::Render(format!(
            "probability plot for '{}' needs at least 2 observations",
            group.label
        )));
    }
    let mut ordered = group.values.clone();
    ordered.sort_by(|a, b| a.total_cmp(b));
    let theoretical = order_statistic_medians(ordered.len())
        .into_iter()
        .map(normal_quantile)
        .collect::<Result<Vec<f64>>>()?;
    let (slope, intercept) = least_squares(&theoretical, &ordered);

    let x_lo = theoretical[0];
    let x_hi = theoretical[theoretical.len() - 1];
    let fit_lo = slope * x_lo + intercept;
    let fit_hi = slope * x_hi + intercept;
    let y_lo = ordered[0].min(fit_lo).min(fit_hi);
    let y_hi = ordered[ordered.len() - 1].max(fit_lo).max(fit_hi);
    let x = Scale::new(x_lo, x_hi, (MARGIN_LEFT, WIDTH - MARGIN_RIGHT));
    let y = Scale::new(y_lo, y_hi, (HEIGHT - MARGIN_BOTTOM, MARGIN_TOP));

    let points = theoretical
        .iter()
        .zip(&ordered)
        .map(|(&t, &v)| SvgElement::Circle {
            cx: x.map(t),
            cy: y.map(v),
            r: 3.5,
            fill: "#1F77B4".into(),
        })
        .collect();

    let title = format!("Probability Plot - {} Goggles", group.label);
    Ok(SvgBuilder::new(WIDTH, HEIGHT)
        .title(&title)
        .group("axes", axes(&x, &y, "Theoretical quantiles", "Ordered Values"))
        .group("points", points)
        .line(x.map(x_lo), y.map(fit_lo), x.map(x_hi), y.map(fit_hi), "#D62728", 1.5)
        .text(WIDTH / 2.0, 28.0, &title, 16.0, Anchor::Middle)
        .build())
}

/// Five-number box summary with 1.5 IQR whiskers
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BoxSummary {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
}

impl BoxSummary {
    pub(crate) fn of(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let q1 = percentile(&sorted, 25.0);
        let q3 = percentile(&sorted, 75.0);
        let iqr = q3 - q1;
        let lower_whisker = sorted
            .iter()
            .copied()
            .find(|&v| v >= q1 - 1.5 * iqr)
            .unwrap_or(q1);
        let upper_whisker = sorted
            .iter()
            .rev()
            .copied()
            .find(|&v| v <= q3 + 1.5 * iqr)
            .unwrap_or(q3);
        Self {
            lower_whisker,
            q1,
            median: median(&sorted),
            q3,
            upper_whisker,
        }
    }
}

/// Histogram bin count (Sturges)
fn bin_count(n: usize) -> usize {
    ((n as f64).log2().ceil() as usize + 1).clamp(1, 50)
}

/// Overlaid per-group histograms with a box-plot strip above
pub fn distribution_plot_svg(
    factor: &str,
    variable: &str,
    samples: &SampleCollection,
) -> Result<String> {
    let pooled = samples.pooled();
    if pooled.is_empty() {
        return Err(AnalysisError::Render(format!(
            "distribution plot for '{}' has no observations",
            variable
        )));
    }
    let lo = pooled.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = pooled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let bins = bin_count(pooled.len());
    let width = if hi > lo { (hi - lo) / bins as f64 } else { 1.0 };

    let counts: Vec<Vec<usize>> = samples
        .groups()
        .iter()
        .map(|g| {
            let mut counts = vec![0usize; bins];
            for v in &g.values {
                let idx = (((v - lo) / width) as usize).min(bins - 1);
                counts[idx] += 1;
            }
            counts
        })
        .collect();
    let max_count = counts.iter().flatten().copied().max().unwrap_or(1).max(1);

    let box_strip = 26.0 * samples.len() as f64;
    let plot_top = MARGIN_TOP + box_strip + 10.0;
    let x = Scale::new(lo, lo + width * bins as f64, (MARGIN_LEFT, WIDTH - MARGIN_RIGHT));
    let y = Scale::new(0.0, max_count as f64, (HEIGHT - MARGIN_BOTTOM, plot_top));

    let labels = samples.labels();
    let colors = assign_colors(&labels);
    let mut builder = SvgBuilder::new(WIDTH, HEIGHT)
        .title(&format!("{} by {}", variable, factor))
        .group("axes", axes(&x, &y, variable, "count"));

    for (idx, (group, color)) in samples.groups().iter().zip(&colors).enumerate() {
        let bars = counts[idx]
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(bin, &c)| {
                let x0 = x.map(lo + width * bin as f64);
                let x1 = x.map(lo + width * (bin + 1) as f64);
                SvgElement::Rect {
                    x: x0,
                    y: y.map(c as f64),
                    width: x1 - x0,
                    height: y.map(0.0) - y.map(c as f64),
                    fill: color.to_string(),
                    opacity: 0.5,
                    stroke: None,
                }
            })
            .collect();
        builder = builder.group(&format!("hist-{}", group.label), bars);

        let summary = BoxSummary::of(&group.values);
        let cy = MARGIN_TOP + 13.0 + 26.0 * idx as f64;
        let box_left = x.map(summary.q1);
        let box_width = (x.map(summary.q3) - box_left).max(1.0);
        builder = builder
            .line(x.map(summary.lower_whisker), cy, box_left, cy, color, 1.5)
            .line(x.map(summary.q3), cy, x.map(summary.upper_whisker), cy, color, 1.5)
            .rect(box_left, cy - 8.0, box_width, 16.0, color, 0.5)
            .rect_outlined(box_left, cy - 8.0, box_width, 16.0, color)
            .line(x.map(summary.median), cy - 8.0, x.map(summary.median), cy + 8.0, color, 2.0);

        let legend_y = plot_top + 20.0 * idx as f64;
        builder = builder
            .rect(WIDTH - MARGIN_RIGHT + 20.0, legend_y - 10.0, 12.0, 12.0, color, 1.0)
            .text(WIDTH - MARGIN_RIGHT + 38.0, legend_y, &group.label, 12.0, Anchor::Start);
    }

    Ok(builder
        .text(WIDTH - MARGIN_RIGHT + 20.0, plot_top - 16.0, factor, 12.0, Anchor::Start)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_statistic_medians_symmetric() {
        let m = order_statistic_medians(5);
        assert_eq!(m.len(), 5);
        assert!((m[0] + m[4] - 1.0).abs() < 1e-12);
        assert!((m[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_box_summary_whiskers_exclude_outliers() {
        let summary = BoxSummary::of(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]);
        assert_eq!(summary.lower_whisker, 1.0);
        assert_eq!(summary.upper_whisker, 5.0);
        assert_eq!(summary.median, 3.5);
    }

    #[test]
    fn test_probability_plot_has_point_per_value() {
        let group = SampleGroup::new("Red", vec![3.0, 1.0, 2.0, 5.0]);
        let svg = probability_plot_svg(&group).unwrap();
        assert_eq!(svg.matches("<circle").count(), 4);
        assert!(svg.contains("Probability Plot - Red Goggles"));
    }

    #[test]
    fn test_probability_plot_needs_two_points() {
        let group = SampleGroup::new("Red", vec![3.0]);
        assert!(matches!(
            probability_plot_svg(&group),
            Err(AnalysisError::Render(_))
        ));
    }

    #[test]
    fn test_distribution_plot_lists_groups() {
        let samples = SampleCollection::new()
            .with_group("Transparent", &[1.0, 2.0, 2.5])
            .unwrap()
            .with_group("Red", &[4.0, 4.5, 6.0])
            .unwrap();
        let svg = distribution_plot_svg("Goggles", "TTFF", &samples).unwrap();
        assert!(svg.contains("#636EFA"));
        assert!(svg.contains("#EF553B"));
        assert!(svg.contains(">Transparent</text>"));
        assert!(svg.contains("id=\"hist-Red\""));
    }

    #[test]
    fn test_distribution_plot_constant_data() {
        let samples = SampleCollection::new()
            .with_group("A", &[2.0, 2.0])
            .unwrap()
            .with_group("B", &[2.0])
            .unwrap();
        assert!(distribution_plot_svg("Goggles", "TTFF", &samples).is_ok());
    }
}
