//! Chart rasterization behind the [`ChartRenderer`] boundary.
//!
//! A renderer turns a [`ChartSpec`] into a transport-ready string. The
//! bundled [`SvgRenderer`] draws with `plotters` into an in-memory SVG
//! document and base64-encodes it; each call builds and drops its own
//! drawing area.
//!
//! [`chart_or_null`] applies the isolation policy: any chart or render
//! failure is logged and becomes `None` for that one field.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use plotters::coord::Shift;
use plotters::prelude::*;
use thiserror::Error;
use tracing::warn;

use crate::chart::{
    bar_value_range, padded_range, Bar, ChartError, ChartKind, ChartSpec, HistogramBin, Rgb, Series,
    EDGE_BLACK, TREND_RED,
};

/// Rendering backend failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// The drawing backend reported an error.
    #[error("render backend failed: {0}")]
    Backend(String),
    /// The spec's series does not fit its chart kind.
    #[error("{kind:?} chart cannot draw this series")]
    SeriesMismatch { kind: ChartKind },
}

/// Turns a chart spec into an encoded image.
pub trait ChartRenderer {
    /// Renders `spec` and returns the encoded image.
    fn render(&self, spec: &ChartSpec) -> Result<String, RenderError>;
}

/// Builds the chart field of a result: `None` when the spec could not be
/// built or rendered, with the reason logged.
pub fn chart_or_null<R: ChartRenderer + ?Sized>(
    renderer: &R,
    spec: Result<ChartSpec, ChartError>,
    context: &str,
) -> Option<String> {
    let spec = match spec {
        Ok(spec) => spec,
        Err(e) => {
            warn!(context, error = %e, "chart skipped");
            return None;
        }
    };
    match renderer.render(&spec) {
        Ok(image) => Some(image),
        Err(e) => {
            warn!(context, error = %e, "chart rendering failed");
            None
        }
    }
}

// ── SvgRenderer ───────────────────────────────────────────────────────

/// Renders charts as base64-encoded SVG documents.
///
/// ```
/// use u_compare::chart::histogram;
/// use u_compare::render::{ChartRenderer, SvgRenderer};
///
/// let spec = histogram("x", &[1.0, 2.0, 2.5, 4.0], 10).unwrap();
/// let encoded = SvgRenderer::default().render(&spec).unwrap();
/// assert!(!encoded.is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SvgRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

impl SvgRenderer {
    /// Creates a renderer with a custom canvas size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Renders `spec` to a raw SVG document.
    pub fn render_svg(&self, spec: &ChartSpec) -> Result<String, RenderError> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(backend)?;
            match (spec.kind, &spec.series) {
                (ChartKind::Histogram, Series::Bins(bins)) => draw_histogram(&root, spec, bins)?,
                (ChartKind::Bar, Series::Bars(bars)) => draw_bars(&root, spec, bars)?,
                (ChartKind::Barh, Series::Bars(bars)) => draw_barh(&root, spec, bars)?,
                (ChartKind::Scatter, Series::Points(points)) => draw_scatter(&root, spec, points)?,
                (kind, _) => return Err(RenderError::SeriesMismatch { kind }),
            }
            root.present().map_err(backend)?;
        }
        Ok(svg)
    }
}

impl ChartRenderer for SvgRenderer {
    fn render(&self, spec: &ChartSpec) -> Result<String, RenderError> {
        self.render_svg(spec).map(|svg| STANDARD.encode(svg))
    }
}

// ── Drawing ───────────────────────────────────────────────────────────

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

fn backend<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Backend(e.to_string())
}

fn rgb(c: Rgb) -> RGBColor {
    RGBColor(c.0, c.1, c.2)
}

/// Axis range plotters can lay out; an infinite extent never terminates.
fn axis(lo: f64, hi: f64) -> Result<std::ops::Range<f64>, RenderError> {
    let width = hi / 2.0 - lo / 2.0;
    if lo.is_finite() && hi.is_finite() && hi > lo && (width * 2.0).is_finite() {
        Ok(lo..hi)
    } else {
        Err(RenderError::Backend(format!("axis range [{lo}, {hi}] is not drawable")))
    }
}

/// Label style for category ticks. Only quarter turns are available, so
/// any requested rotation is drawn as a quarter turn.
fn tick_style(rotation: Option<f64>) -> TextStyle<'static> {
    let font = ("sans-serif", 12).into_font();
    match rotation {
        Some(deg) if deg.abs() > f64::EPSILON => font.transform(FontTransform::Rotate90).into(),
        _ => font.into(),
    }
}

fn draw_histogram(root: &Area<'_>, spec: &ChartSpec, bins: &[HistogramBin]) -> Result<(), RenderError> {
    let (Some(first), Some(last)) = (bins.first(), bins.last()) else {
        return Err(RenderError::SeriesMismatch { kind: spec.kind });
    };
    let top = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1) as f64 * 1.1;
    let x_range = axis(first.lower, last.upper)?;

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 20))
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(x_range, 0f64..top)
        .map_err(backend)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .draw()
        .map_err(backend)?;

    let fill = rgb(spec.fill);
    chart
        .draw_series(bins.iter().map(|b| {
            Rectangle::new([(b.lower, 0.0), (b.upper, b.count as f64)], fill.filled())
        }))
        .map_err(backend)?;
    chart
        .draw_series(bins.iter().map(|b| {
            Rectangle::new(
                [(b.lower, 0.0), (b.upper, b.count as f64)],
                rgb(EDGE_BLACK).stroke_width(1),
            )
        }))
        .map_err(backend)?;
    Ok(())
}

fn category_label(labels: &[&str], v: &SegmentValue<u32>) -> String {
    match v {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => labels
            .get(*i as usize)
            .map(|s| (*s).to_string())
            .unwrap_or_default(),
        SegmentValue::Last => String::new(),
    }
}

fn draw_bars(root: &Area<'_>, spec: &ChartSpec, bars: &[Bar]) -> Result<(), RenderError> {
    let n = bars.len() as u32;
    let labels: Vec<&str> = bars.iter().map(|b| b.label.as_str()).collect();
    let top = bars.iter().map(|b| b.value).fold(0.0_f64, f64::max).max(1.0) * 1.1;
    let y_range = axis(0.0, top)?;

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 20))
        .margin(12)
        .x_label_area_size(90)
        .y_label_area_size(55)
        .build_cartesian_2d((0u32..n).into_segmented(), y_range)
        .map_err(backend)?;

    let formatter = |v: &SegmentValue<u32>| category_label(&labels, v);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&formatter)
        .x_label_style(tick_style(spec.label_rotation))
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .draw()
        .map_err(backend)?;

    chart
        .draw_series(bars.iter().enumerate().map(|(i, bar)| {
            let i = i as u32;
            let mut rect = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), bar.value)],
                rgb(bar.color).filled(),
            );
            rect.set_margin(0, 0, 4, 4);
            rect
        }))
        .map_err(backend)?;
    Ok(())
}

fn draw_barh(root: &Area<'_>, spec: &ChartSpec, bars: &[Bar]) -> Result<(), RenderError> {
    let n = bars.len() as u32;
    // First bar at the top: segment index counts up from the bottom.
    let labels: Vec<&str> = bars.iter().rev().map(|b| b.label.as_str()).collect();
    let values: Vec<f64> = bars.iter().map(|b| b.value).collect();
    let (lo, hi) = bar_value_range(&values)
        .ok_or_else(|| RenderError::Backend("bar values are not finite".into()))?;
    let x_range = axis(lo, hi)?;

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 20))
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(110)
        .build_cartesian_2d(x_range, (0u32..n).into_segmented())
        .map_err(backend)?;

    let formatter = |v: &SegmentValue<u32>| category_label(&labels, v);
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(bars.len())
        .y_label_formatter(&formatter)
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .draw()
        .map_err(backend)?;

    let slot = |i: usize| n - 1 - i as u32;
    chart
        .draw_series(bars.iter().enumerate().map(|(i, bar)| {
            let s = slot(i);
            let mut rect = Rectangle::new(
                [(0.0, SegmentValue::Exact(s)), (bar.value, SegmentValue::Exact(s + 1))],
                rgb(bar.color).filled(),
            );
            rect.set_margin(3, 3, 0, 0);
            rect
        }))
        .map_err(backend)?;

    chart
        .draw_series(bars.iter().enumerate().filter_map(|(i, bar)| {
            bar.annotation.as_ref().map(|text| {
                Text::new(
                    format!(" {text}"),
                    (bar.value, SegmentValue::CenterOf(slot(i))),
                    ("sans-serif", 12).into_font(),
                )
            })
        }))
        .map_err(backend)?;
    Ok(())
}

fn draw_scatter(root: &Area<'_>, spec: &ChartSpec, points: &[(f64, f64)]) -> Result<(), RenderError> {
    let bounds = |f: fn(&(f64, f64)) -> f64| {
        points
            .iter()
            .map(f)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
    };
    let not_drawable = || RenderError::Backend("scatter bounds are not finite".into());
    let (x_lo, x_hi) = bounds(|p| p.0);
    let (y_lo, y_hi) = bounds(|p| p.1);
    let (x_lo, x_hi) = padded_range(x_lo, x_hi).ok_or_else(not_drawable)?;
    let (y_lo, y_hi) = padded_range(y_lo, y_hi).ok_or_else(not_drawable)?;
    let (x_range, y_range) = (axis(x_lo, x_hi)?, axis(y_lo, y_hi)?);

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 20))
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(x_range, y_range)
        .map_err(backend)?;

    chart
        .configure_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .draw()
        .map_err(backend)?;

    let point_style = rgb(spec.fill).mix(0.5).filled();
    chart
        .draw_series(points.iter().map(|&p| Circle::new(p, 3, point_style)))
        .map_err(backend)?;

    let drawable_line = spec
        .trend_line
        .filter(|l| l.endpoints().iter().all(|(x, y)| x.is_finite() && y.is_finite()));
    if let Some(line) = &drawable_line {
        chart
            .draw_series(LineSeries::new(line.endpoints(), rgb(TREND_RED).stroke_width(2)))
            .map_err(backend)?;
    }

    if let Some(text) = &spec.annotation {
        chart
            .draw_series(std::iter::once(Text::new(
                text.clone(),
                (x_lo + (x_hi / 2.0 - x_lo / 2.0) * 0.04, y_hi - (y_hi / 2.0 - y_lo / 2.0) * 0.04),
                ("sans-serif", 14).into_font(),
            )))
            .map_err(backend)?;
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{group_means_barh, histogram, scatter, top_values_bar};

    fn svg(spec: &ChartSpec) -> String {
        SvgRenderer::default().render_svg(spec).unwrap()
    }

    #[test]
    fn histogram_renders_title() {
        let spec = histogram("score", &[1.0, 2.0, 3.0, 4.0, 5.0], 10).unwrap();
        let doc = svg(&spec);
        assert!(doc.starts_with("<svg"));
        assert!(doc.contains("Histogram of score"));
    }

    #[test]
    fn bar_chart_renders_categories() {
        let spec = top_values_bar("city", &[("Oslo".into(), 3), ("Rome".into(), 1)], 45.0).unwrap();
        let doc = svg(&spec);
        assert!(doc.contains("Oslo"));
        assert!(doc.contains("Top values of city"));
    }

    #[test]
    fn any_rotation_draws_as_quarter_turn() {
        let tilted = top_values_bar("city", &[("Oslo".into(), 3), ("Rome".into(), 1)], 45.0).unwrap();
        let upright = ChartSpec {
            label_rotation: Some(90.0),
            ..tilted.clone()
        };
        let flat = ChartSpec {
            label_rotation: None,
            ..tilted.clone()
        };
        assert_eq!(svg(&tilted), svg(&upright));
        assert_ne!(svg(&tilted), svg(&flat));
    }

    #[test]
    fn barh_renders_value_labels() {
        let spec = group_means_barh("team", "score", &[("b".into(), 30.0), ("a".into(), 15.0)]).unwrap();
        let doc = svg(&spec);
        assert!(doc.contains("30.00"));
        assert!(doc.contains("15.00"));
    }

    #[test]
    fn scatter_renders_annotation() {
        let (spec, _) = scatter("x", "y", vec![(1.0, 1.0), (2.0, 2.0), (3.0, 3.5)], 0.99).unwrap();
        assert!(svg(&spec).contains("Correlation: 0.990"));
    }

    #[test]
    fn encoded_output_is_base64_of_svg() {
        let spec = histogram("x", &[1.0, 2.0], 10).unwrap();
        let encoded = SvgRenderer::default().render(&spec).unwrap();
        let decoded = STANDARD.decode(encoded).unwrap();
        assert!(String::from_utf8(decoded).unwrap().starts_with("<svg"));
    }

    #[test]
    fn mismatched_series_is_an_error() {
        let mut spec = histogram("x", &[1.0, 2.0], 10).unwrap();
        spec.series = Series::Points(vec![(1.0, 1.0)]);
        assert_eq!(
            SvgRenderer::default().render(&spec),
            Err(RenderError::SeriesMismatch {
                kind: ChartKind::Histogram
            })
        );
    }

    #[test]
    fn scatter_too_wide_to_pad_is_rejected() {
        let (mut spec, _) = scatter("x", "y", vec![(1.0, 1.0), (2.0, 2.0)], 1.0).unwrap();
        spec.series = Series::Points(vec![(-1e308, 1.0), (1e308, 2.0)]);
        spec.trend_line = None;
        assert!(matches!(
            SvgRenderer::default().render(&spec),
            Err(RenderError::Backend(_))
        ));
    }

    #[test]
    fn barh_with_infinite_value_is_rejected() {
        let mut spec = group_means_barh("g", "v", &[("a".into(), 2.0), ("b".into(), 1.0)]).unwrap();
        if let Series::Bars(bars) = &mut spec.series {
            bars[0].value = f64::INFINITY;
        }
        assert!(matches!(
            SvgRenderer::default().render(&spec),
            Err(RenderError::Backend(_))
        ));
    }

    #[test]
    fn barh_near_float_limit_is_rejected() {
        let mut spec = group_means_barh("g", "v", &[("a".into(), 2.0), ("b".into(), 1.0)]).unwrap();
        if let Series::Bars(bars) = &mut spec.series {
            bars[0].value = 1.7e308;
        }
        assert!(SvgRenderer::default().render(&spec).is_err());
    }

    #[test]
    fn overflowing_trend_line_is_skipped() {
        let (mut spec, _) = scatter("x", "y", vec![(1.0, 1.0), (2.0, 2.0)], 1.0).unwrap();
        if let Some(line) = spec.trend_line.as_mut() {
            line.slope = f64::MAX;
            line.x_end = 2.0;
        }
        assert!(svg(&spec).contains("Correlation: 1.000"));
    }

    struct Failing;

    impl ChartRenderer for Failing {
        fn render(&self, _: &ChartSpec) -> Result<String, RenderError> {
            Err(RenderError::Backend("boom".into()))
        }
    }

    #[test]
    fn chart_or_null_isolates_failures() {
        let ok = histogram("x", &[1.0, 2.0], 10);
        assert!(chart_or_null(&SvgRenderer::default(), ok.clone(), "x").is_some());
        assert!(chart_or_null(&Failing, ok, "x").is_none());
        assert!(chart_or_null(&SvgRenderer::default(), histogram("x", &[], 10), "x").is_none());
    }
}
