//! Chart specifications and the policies that produce them.
//!
//! A [`ChartSpec`] is a plain value describing what to draw: chart kind,
//! series, labels, colours and overlays. Builders in this module decide
//! *what* is plotted (bin edges, which bars, sampled points, the trend
//! line); a [`ChartRenderer`](crate::render::ChartRenderer) only rasterizes
//! the spec. Builders fail with [`ChartError`] on data that cannot be
//! charted, which callers turn into a `null` chart.
//!
//! ```
//! use u_compare::chart::{histogram, ChartKind};
//!
//! let spec = histogram("score", &[1.0, 2.0, 3.0, 4.0, 5.0], 10).unwrap();
//! assert_eq!(spec.kind, ChartKind::Histogram);
//! assert_eq!(spec.title, "Histogram of score");
//! ```

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats;

// ── Colours ───────────────────────────────────────────────────────────

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Fill for histograms and category bars.
pub const SKYBLUE: Rgb = Rgb(135, 206, 235);
/// Scatter point colour.
pub const STEELBLUE: Rgb = Rgb(70, 130, 180);
/// Trend line colour.
pub const TREND_RED: Rgb = Rgb(214, 39, 40);
/// Bar outlines.
pub const EDGE_BLACK: Rgb = Rgb(0, 0, 0);

/// Viridis control points at t = 0, 1/8, ..., 1.
const VIRIDIS: [Rgb; 9] = [
    Rgb(68, 1, 84),
    Rgb(71, 45, 123),
    Rgb(59, 82, 139),
    Rgb(44, 114, 142),
    Rgb(33, 145, 140),
    Rgb(40, 174, 128),
    Rgb(94, 201, 98),
    Rgb(173, 220, 48),
    Rgb(253, 231, 37),
];

/// Samples the viridis colour map at `t ∈ [0, 1]` (clamped).
pub fn viridis(t: f64) -> Rgb {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let lo = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let frac = scaled - lo as f64;
    let (a, b) = (VIRIDIS[lo], VIRIDIS[lo + 1]);
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
    Rgb(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Colours for `n` ranked bars, spread evenly over viridis 0.3..=0.9.
pub fn rank_gradient(n: usize) -> Vec<Rgb> {
    match n {
        0 => Vec::new(),
        1 => vec![viridis(0.3)],
        _ => (0..n)
            .map(|i| viridis(0.3 + 0.6 * i as f64 / (n - 1) as f64))
            .collect(),
    }
}

// ── ChartSpec ─────────────────────────────────────────────────────────

/// Kind of chart to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    /// Vertical bars over contiguous numeric bins.
    Histogram,
    /// Vertical bars over categories.
    Bar,
    /// Horizontal bars over categories, first entry at the top.
    Barh,
    /// Points in the plane.
    Scatter,
}

/// One histogram bin. The last bin is closed on both sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// One bar of a bar or barh chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub color: Rgb,
    /// Text drawn at the end of the bar.
    pub annotation: Option<String>,
}

/// Data drawn by a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Series {
    Bins(Vec<HistogramBin>),
    Bars(Vec<Bar>),
    Points(Vec<(f64, f64)>),
}

/// Straight line overlay spanning `[x_start, x_end]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
    pub x_start: f64,
    pub x_end: f64,
}

impl TrendLine {
    /// The two endpoints of the visible segment.
    pub fn endpoints(&self) -> [(f64, f64); 2] {
        [
            (self.x_start, self.slope * self.x_start + self.intercept),
            (self.x_end, self.slope * self.x_end + self.intercept),
        ]
    }
}

/// Complete, renderer-independent description of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Series,
    /// Fill used when bars do not carry their own colour.
    pub fill: Rgb,
    /// Rotation of category tick labels, in degrees. The SVG renderer only
    /// turns text by quarter turns, so any non-zero angle is drawn at 90°.
    pub label_rotation: Option<f64>,
    pub trend_line: Option<TrendLine>,
    /// Free text placed in the top-left corner of the plot area.
    pub annotation: Option<String>,
}

// ── Errors ────────────────────────────────────────────────────────────

/// Data that cannot be turned into a chart.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    /// Nothing to plot.
    #[error("no data to plot for '{column}'")]
    NoData { column: String },
    /// Axis range is not finite, or too wide to pad without overflowing.
    #[error("autodetected range of [{min}, {max}] is not finite")]
    NonFiniteRange { min: f64, max: f64 },
    /// Histogram needs at least one bin.
    #[error("bin count must be positive")]
    ZeroBins,
}

/// Why a trend line could not be fitted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrendLineError {
    #[error("need at least 2 points for a trend line, got {0}")]
    TooFewPoints(usize),
    #[error("x values are constant or non-finite")]
    Degenerate,
}

// ── Axis extents ──────────────────────────────────────────────────────

/// Pads `[lo, hi]` by 5% of its width on each side, or by 1 when the range
/// is a single point. `None` when a bound or the padded extent is not
/// finite, or when padding cannot separate the bounds.
///
/// ```
/// use u_compare::chart::padded_range;
///
/// assert_eq!(padded_range(0.0, 10.0), Some((-0.5, 10.5)));
/// assert_eq!(padded_range(3.0, 3.0), Some((2.0, 4.0)));
/// assert_eq!(padded_range(-1e308, 1e308), None);
/// ```
pub fn padded_range(lo: f64, hi: f64) -> Option<(f64, f64)> {
    if !(lo.is_finite() && hi.is_finite()) {
        return None;
    }
    let (lo, hi) = if hi > lo {
        // Halves keep the width itself from overflowing.
        let pad = (hi / 2.0 - lo / 2.0) * 0.1;
        (lo - pad, hi + pad)
    } else {
        (lo - 1.0, hi + 1.0)
    };
    let width = hi / 2.0 - lo / 2.0;
    (lo.is_finite() && hi.is_finite() && hi > lo && (width * 2.0).is_finite()).then_some((lo, hi))
}

/// Value axis of a bar chart whose bars grow from zero, with 15% headroom
/// past the largest value for annotations.
pub fn bar_value_range(values: &[f64]) -> Option<(f64, f64)> {
    if values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let min = values.iter().copied().fold(0.0_f64, f64::min);
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    let lo = if min < 0.0 { padded_range(min, max)?.0 } else { 0.0 };
    let headroom = (max / 2.0 - min / 2.0).max(0.5) * 0.3;
    let hi = max + headroom;
    let width = hi / 2.0 - lo / 2.0;
    (hi.is_finite() && (width * 2.0).is_finite()).then_some((lo, hi))
}

/// Smallest and largest of `values`, `(inf, -inf)` when empty.
fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

// ── Builders ──────────────────────────────────────────────────────────

/// Splits `values` into `bins` equal-width bins over `[min, max]`.
///
/// A constant column is widened to `[v − 0.5, v + 0.5]`.
pub fn histogram_bins(values: &[f64], bins: usize) -> Result<Vec<HistogramBin>, ChartError> {
    if bins == 0 {
        return Err(ChartError::ZeroBins);
    }
    let (min, max) = match (stats::min(values), stats::max(values)) {
        (Some(lo), Some(hi)) => (lo, hi),
        _ => {
            return Err(ChartError::NoData {
                column: String::new(),
            })
        }
    };
    if !min.is_finite() || !max.is_finite() || !(max - min).is_finite() {
        return Err(ChartError::NonFiniteRange { min, max });
    }
    let (lo, hi) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };

    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in values {
        let slot = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[slot] += 1;
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: lo + width * i as f64,
            upper: if i + 1 == bins {
                hi
            } else {
                lo + width * (i + 1) as f64
            },
            count,
        })
        .collect())
}

/// Histogram of a numeric column's present values.
pub fn histogram(column: &str, values: &[f64], bins: usize) -> Result<ChartSpec, ChartError> {
    let bins = histogram_bins(values, bins).map_err(|e| match e {
        ChartError::NoData { .. } => ChartError::NoData {
            column: column.to_string(),
        },
        other => other,
    })?;
    Ok(ChartSpec {
        kind: ChartKind::Histogram,
        title: format!("Histogram of {column}"),
        x_label: column.to_string(),
        y_label: "Frequency".to_string(),
        series: Series::Bins(bins),
        fill: SKYBLUE,
        label_rotation: None,
        trend_line: None,
        annotation: None,
    })
}

/// Bar chart of the most frequent values, already ordered by frequency.
pub fn top_values_bar(
    column: &str,
    counts: &[(String, usize)],
    label_rotation: f64,
) -> Result<ChartSpec, ChartError> {
    if counts.is_empty() {
        return Err(ChartError::NoData {
            column: column.to_string(),
        });
    }
    let bars = counts
        .iter()
        .map(|(label, count)| Bar {
            label: label.clone(),
            value: *count as f64,
            color: SKYBLUE,
            annotation: None,
        })
        .collect();
    Ok(ChartSpec {
        kind: ChartKind::Bar,
        title: format!("Top values of {column}"),
        x_label: column.to_string(),
        y_label: "Count".to_string(),
        series: Series::Bars(bars),
        fill: SKYBLUE,
        label_rotation: Some(label_rotation),
        trend_line: None,
        annotation: None,
    })
}

/// Horizontal bar chart of group means, highest first.
///
/// `means` must already be sorted descending; bars take a viridis
/// gradient by rank and are annotated with the mean to two decimals.
pub fn group_means_barh(
    group_col: &str,
    value_col: &str,
    means: &[(String, f64)],
) -> Result<ChartSpec, ChartError> {
    if means.is_empty() {
        return Err(ChartError::NoData {
            column: group_col.to_string(),
        });
    }
    let values: Vec<f64> = means.iter().map(|(_, m)| *m).collect();
    if bar_value_range(&values).is_none() {
        let (min, max) = bounds(values.into_iter());
        return Err(ChartError::NonFiniteRange { min, max });
    }
    let bars = means
        .iter()
        .zip(rank_gradient(means.len()))
        .map(|((label, mean), color)| Bar {
            label: label.clone(),
            value: *mean,
            color,
            annotation: Some(format!("{mean:.2}")),
        })
        .collect();
    Ok(ChartSpec {
        kind: ChartKind::Barh,
        title: format!("Average {value_col} by {group_col} (Sorted)"),
        x_label: format!("Average {value_col}"),
        y_label: group_col.to_string(),
        series: Series::Bars(bars),
        fill: SKYBLUE,
        label_rotation: None,
        trend_line: None,
        annotation: None,
    })
}

/// Fits the degree-1 trend line drawn over a scatter plot.
pub fn fit_trend_line(points: &[(f64, f64)]) -> Result<TrendLine, TrendLineError> {
    if points.len() < 2 {
        return Err(TrendLineError::TooFewPoints(points.len()));
    }
    let (xs, ys): (Vec<f64>, Vec<f64>) = points.iter().copied().unzip();
    let fit = stats::linear_fit(&xs, &ys).ok_or(TrendLineError::Degenerate)?;
    let (x_start, x_end) = match (stats::min(&xs), stats::max(&xs)) {
        (Some(lo), Some(hi)) => (lo, hi),
        _ => return Err(TrendLineError::Degenerate),
    };
    let line = TrendLine {
        slope: fit.slope,
        intercept: fit.intercept,
        x_start,
        x_end,
    };
    if line.endpoints().iter().all(|(x, y)| x.is_finite() && y.is_finite()) {
        Ok(line)
    } else {
        Err(TrendLineError::Degenerate)
    }
}

/// Scatter plot of (sampled) points with the full-data correlation noted.
///
/// The trend line is fitted on `points`; if that fails the plot is kept
/// without it and the reason is returned alongside.
pub fn scatter(
    x_col: &str,
    y_col: &str,
    points: Vec<(f64, f64)>,
    correlation: f64,
) -> Result<(ChartSpec, Option<TrendLineError>), ChartError> {
    if points.is_empty() {
        return Err(ChartError::NoData {
            column: x_col.to_string(),
        });
    }
    for (lo, hi) in [
        bounds(points.iter().map(|p| p.0)),
        bounds(points.iter().map(|p| p.1)),
    ] {
        if padded_range(lo, hi).is_none() {
            return Err(ChartError::NonFiniteRange { min: lo, max: hi });
        }
    }
    let (trend_line, trend_error) = match fit_trend_line(&points) {
        Ok(line) => (Some(line), None),
        Err(e) => (None, Some(e)),
    };
    let spec = ChartSpec {
        kind: ChartKind::Scatter,
        title: format!("{y_col} vs {x_col}"),
        x_label: x_col.to_string(),
        y_label: y_col.to_string(),
        series: Series::Points(points),
        fill: STEELBLUE,
        label_rotation: None,
        trend_line,
        annotation: Some(format!("Correlation: {correlation:.3}")),
    };
    Ok((spec, trend_error))
}

/// Picks `amount` distinct row indices out of `len`, uniformly without
/// replacement, returned in ascending order. When `len <= amount` every
/// index is returned.
pub fn sample_indices(len: usize, amount: usize, seed: Option<u64>) -> Vec<usize> {
    if len <= amount {
        return (0..len).collect();
    }
    let mut picked = match seed {
        Some(seed) => index::sample(&mut StdRng::seed_from_u64(seed), len, amount).into_vec(),
        None => index::sample(&mut rand::rng(), len, amount).into_vec(),
    };
    picked.sort_unstable();
    picked
}

// ── Tests ─────────────────────────────────────────────────────────────
