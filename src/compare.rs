//! Column-pair comparison: dispatcher and the four strategies.
//!
//! [`compare`] classifies both columns and picks a strategy from the
//! ordered pair of classifications:
//!
//! | group column | value column | strategy |
//! |---|---|---|
//! | categorical | numeric | [`aggregate`] |
//! | numeric | numeric | [`correlate`] |
//! | categorical | categorical | [`crosstab`] |
//! | numeric | categorical | invalid (structured rejection) |
//!
//! Strategies return their data together with an optional chart spec;
//! the dispatcher renders the spec and turns any chart failure into a
//! `null` chart. Only unknown column names fail the request.
//!
//! # Example
//!
//! ```
//! use u_compare::compare::{compare, ComparisonData};
//! use u_compare::config::CompareConfig;
//! use u_compare::csv_parser::CsvParser;
//! use u_compare::render::SvgRenderer;
//!
//! let df = CsvParser::new().parse_str("group,value\na,10\na,20\nb,30\n").unwrap();
//! let result = compare(&df, "group", "value", &CompareConfig::default(), &SvgRenderer::default()).unwrap();
//!
//! match &result.data {
//!     ComparisonData::GroupComparison(Some(groups)) => {
//!         assert_eq!(groups.keys().collect::<Vec<_>>(), ["b", "a"]);
//!         assert_eq!(groups["a"].mean, Some(15.0));
//!     }
//!     other => panic!("unexpected result: {other:?}"),
//! }
//! assert!(result.chart.is_some());
//! ```

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chart::{self, ChartError, ChartSpec};
use crate::classify::{classify, Classification};
use crate::config::{CompareConfig, HighCardinalityPolicy};
use crate::dataframe::{Column, DataFrame};
use crate::error::CompareError;
use crate::render::{chart_or_null, ChartRenderer};
use crate::stats;

/// Message carried by an invalid comparison.
pub const INVALID_COMBINATION: &str = "Please select appropriate columns for comparison";

// ── Request / Result ──────────────────────────────────────────────────

/// Two column names to compare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub group_col: String,
    pub value_col: String,
}

impl ComparisonRequest {
    pub fn new(group_col: impl Into<String>, value_col: impl Into<String>) -> Self {
        Self {
            group_col: group_col.into(),
            value_col: value_col.into(),
        }
    }

    /// Runs the comparison against `df`.
    pub fn run<R: ChartRenderer + ?Sized>(
        &self,
        df: &DataFrame,
        config: &CompareConfig,
        renderer: &R,
    ) -> Result<ComparisonResult, CompareError> {
        compare(df, &self.group_col, &self.value_col, config, renderer)
    }
}

/// Summary of one group's values. All floats are rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Sample standard deviation; `None` for fewer than two values.
    pub std: Option<f64>,
    /// Present values in the group.
    pub count: usize,
}

/// Correlation result payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationData {
    /// Pearson r rounded to 3 decimals, 0.0 when undefined.
    pub correlation: f64,
    pub group_column: String,
    pub value_column: String,
}

/// Payload of an invalid comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidData {
    pub error: String,
}

/// Strategy-specific payload; `type` selects the shape of `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ComparisonData {
    /// Per-group statistics sorted by mean descending. `None` above the
    /// group cutoff.
    GroupComparison(Option<IndexMap<String, GroupStats>>),
    Correlation(CorrelationData),
    /// Row value → column value → count.
    CrossTabulation(IndexMap<String, IndexMap<String, usize>>),
    Invalid(InvalidData),
}

/// Outcome of comparing two columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub group_column: String,
    pub value_column: String,
    /// Encoded chart, `None` when no chart applies or drawing failed.
    pub chart: Option<String>,
    #[serde(flatten)]
    pub data: ComparisonData,
}

impl ComparisonResult {
    /// Strategy that produced this result.
    pub fn strategy(&self) -> Strategy {
        match self.data {
            ComparisonData::GroupComparison(_) => Strategy::GroupAggregation,
            ComparisonData::Correlation(_) => Strategy::Correlation,
            ComparisonData::CrossTabulation(_) => Strategy::CrossTabulation,
            ComparisonData::Invalid(_) => Strategy::Invalid,
        }
    }
}

// ── Dispatcher ────────────────────────────────────────────────────────

/// Comparison strategy for a pair of classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    GroupAggregation,
    Correlation,
    CrossTabulation,
    Invalid,
}

/// Picks the strategy for `(group, value)` classifications.
pub fn select_strategy(group: Classification, value: Classification) -> Strategy {
    use Classification::{Categorical, Numeric};
    match (group, value) {
        (Categorical, Numeric) => Strategy::GroupAggregation,
        (Numeric, Numeric) => Strategy::Correlation,
        (Categorical, Categorical) => Strategy::CrossTabulation,
        (Numeric, Categorical) => Strategy::Invalid,
    }
}

/// Compares `group_col` against `value_col`.
///
/// # Errors
///
/// [`CompareError::ColumnNotFound`] when either name is not a column of
/// `df`; the group column is checked first.
pub fn compare<R: ChartRenderer + ?Sized>(
    df: &DataFrame,
    group_col: &str,
    value_col: &str,
    config: &CompareConfig,
    renderer: &R,
) -> Result<ComparisonResult, CompareError> {
    let group = df.require_column(group_col)?;
    let value = df.require_column(value_col)?;
    debug!(
        rows = df.row_count(),
        columns = df.column_count(),
        group_col,
        value_col,
        "comparison request"
    );

    let strategy = select_strategy(classify(group), classify(value));
    info!(?strategy, group_col, value_col, "dispatching comparison");

    let context = format!("{group_col} x {value_col}");
    let (data, chart) = match strategy {
        Strategy::GroupAggregation => {
            let out = aggregate(group, value, group_col, value_col, config);
            (ComparisonData::GroupComparison(out.groups), out.chart)
        }
        Strategy::Correlation => {
            let out = correlate(group, value, group_col, value_col, config);
            let data = CorrelationData {
                correlation: out.correlation,
                group_column: group_col.to_string(),
                value_column: value_col.to_string(),
            };
            (ComparisonData::Correlation(data), Some(out.chart))
        }
        Strategy::CrossTabulation => (ComparisonData::CrossTabulation(crosstab(group, value)), None),
        Strategy::Invalid => (
            ComparisonData::Invalid(InvalidData {
                error: INVALID_COMBINATION.to_string(),
            }),
            None,
        ),
    };

    Ok(ComparisonResult {
        group_column: group_col.to_string(),
        value_column: value_col.to_string(),
        chart: chart.and_then(|spec| chart_or_null(renderer, spec, &context)),
        data,
    })
}

// ── Group Aggregation ─────────────────────────────────────────────────

/// Result of [`aggregate`] before rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupAggregation {
    /// Groups sorted by mean descending; `None` when skipped.
    pub groups: Option<IndexMap<String, GroupStats>>,
    /// Distinct groups in the group column.
    pub distinct_groups: usize,
    /// `None` when the cardinality policy suppresses the chart.
    pub chart: Option<Result<ChartSpec, ChartError>>,
}

/// Values of one group in first-seen order.
struct RawGroup {
    label: String,
    values: Vec<f64>,
    /// Rows carrying this label, including rows whose value is missing.
    rows: usize,
}

impl RawGroup {
    fn mean(&self) -> Option<f64> {
        stats::mean(&self.values)
    }

    fn summarize(&self) -> GroupStats {
        let round = |v: Option<f64>| v.and_then(stats::finite).map(|v| stats::round_to(v, 2));
        GroupStats {
            mean: round(self.mean()),
            median: round(stats::median(&self.values)),
            min: round(stats::min(&self.values)),
            max: round(stats::max(&self.values)),
            std: round(stats::std_dev(&self.values)),
            count: self.values.len(),
        }
    }
}

fn collect_groups(group: &Column, value: &Column) -> Vec<RawGroup> {
    let mut groups: IndexMap<String, RawGroup> = IndexMap::new();
    for i in group.validity().valid_indices() {
        let Some(label) = group.label_at(i) else {
            continue;
        };
        let entry = groups
            .entry(label.into_owned())
            .or_insert_with_key(|label| RawGroup {
                label: label.clone(),
                values: Vec::new(),
                rows: 0,
            });
        entry.rows += 1;
        if let Some(v) = value.number_at(i) {
            entry.values.push(v);
        }
    }
    groups.into_values().collect()
}

/// Descending by mean, groups without a mean last, stable otherwise.
fn by_mean_desc(a: &Option<f64>, b: &Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Groups `value` by the labels of `group` and summarizes each group.
///
/// Above [`CompareConfig::max_groups`] distinct groups neither table nor
/// chart is produced (or, under [`HighCardinalityPolicy::TopByMean`], only
/// the highest-mean groups are tabulated). Above
/// [`CompareConfig::chart_group_threshold`] the chart is narrowed to the
/// most frequent groups while the table keeps every group.
pub fn aggregate(
    group: &Column,
    value: &Column,
    group_col: &str,
    value_col: &str,
    config: &CompareConfig,
) -> GroupAggregation {
    let mut raw = collect_groups(group, value);
    let distinct_groups = raw.len();

    if distinct_groups > config.max_groups {
        warn!(
            group_col,
            distinct_groups,
            max_groups = config.max_groups,
            policy = ?config.high_cardinality,
            "high cardinality group column"
        );
        let groups = match config.high_cardinality {
            HighCardinalityPolicy::Skip => None,
            HighCardinalityPolicy::TopByMean => {
                raw.retain(|g| g.mean().is_some());
                raw.sort_by(|a, b| by_mean_desc(&a.mean(), &b.mean()));
                raw.truncate(config.top_by_mean);
                Some(tabulate(&raw))
            }
        };
        return GroupAggregation {
            groups,
            distinct_groups,
            chart: None,
        };
    }

    let chart = Some(group_chart(&raw, group_col, value_col, config));
    raw.sort_by(|a, b| by_mean_desc(&a.mean(), &b.mean()));
    GroupAggregation {
        groups: Some(tabulate(&raw)),
        distinct_groups,
        chart,
    }
}

fn tabulate(sorted: &[RawGroup]) -> IndexMap<String, GroupStats> {
    sorted
        .iter()
        .map(|g| (g.label.clone(), g.summarize()))
        .collect()
}

/// Bar chart of group means. Narrowed to the most frequent groups when
/// there are many; means are recomputed on that subset, highest first.
fn group_chart(
    raw: &[RawGroup],
    group_col: &str,
    value_col: &str,
    config: &CompareConfig,
) -> Result<ChartSpec, ChartError> {
    let mut charted: Vec<&RawGroup> = raw.iter().collect();
    if raw.len() > config.chart_group_threshold {
        charted.sort_by(|a, b| b.rows.cmp(&a.rows));
        charted.truncate(config.chart_group_limit);
        debug!(
            group_col,
            shown = charted.len(),
            total = raw.len(),
            "chart narrowed to most frequent groups"
        );
    }
    let mut means: Vec<(String, f64)> = charted
        .iter()
        .filter_map(|g| g.mean().map(|m| (g.label.clone(), m)))
        .collect();
    means.sort_by(|a, b| b.1.total_cmp(&a.1));
    chart::group_means_barh(group_col, value_col, &means)
}

// ── Correlation ───────────────────────────────────────────────────────

/// Result of [`correlate`] before rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    /// Pearson r over all complete pairs, rounded to 3 decimals.
    pub correlation: f64,
    /// Pairs the coefficient was computed from.
    pub pairs: usize,
    pub chart: Result<ChartSpec, ChartError>,
}

fn complete_pair(a: &Column, b: &Column, i: usize) -> Option<(f64, f64)> {
    Some((a.number_at(i)?, b.number_at(i)?))
}

/// Pearson correlation of two numeric columns and a sampled scatter plot.
///
/// An undefined coefficient (constant column, fewer than two pairs)
/// reports 0.0. The scatter plot draws at most
/// [`CompareConfig::scatter_sample_size`] rows chosen uniformly without
/// replacement; the coefficient always uses every row.
pub fn correlate(
    x: &Column,
    y: &Column,
    x_col: &str,
    y_col: &str,
    config: &CompareConfig,
) -> Correlation {
    let rows = x.len().min(y.len());
    let (xs, ys): (Vec<f64>, Vec<f64>) = (0..rows).filter_map(|i| complete_pair(x, y, i)).unzip();
    let r = stats::pearson(&xs, &ys).unwrap_or_else(|| {
        debug!(x_col, y_col, pairs = xs.len(), "correlation undefined, reporting 0");
        0.0
    });

    let points: Vec<(f64, f64)> = chart::sample_indices(rows, config.scatter_sample_size, config.sample_seed)
        .into_iter()
        .filter_map(|i| complete_pair(x, y, i))
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .collect();
    let chart = chart::scatter(x_col, y_col, points, r).map(|(spec, trend_error)| {
        if let Some(e) = trend_error {
            warn!(x_col, y_col, error = %e, "trend line omitted");
        }
        spec
    });

    Correlation {
        correlation: stats::round_to(r, 3),
        pairs: xs.len(),
        chart,
    }
}

// ── Cross Tabulation ──────────────────────────────────────────────────

/// Contingency table of two columns.
///
/// Rows where either value is missing are left out. Row and column keys
/// are sorted ascending and every combination is present, zero-filled.
/// Cardinality is not capped, so the output grows with the product of
/// both distinct counts.
///
/// ```
/// use u_compare::compare::crosstab;
/// use u_compare::dataframe::{Cell, Column};
///
/// let a = Column::from_cells(&["x", "y", "x"].map(Cell::from));
/// let b = Column::from_cells(&["p", "q", "p"].map(Cell::from));
/// let table = crosstab(&a, &b);
/// assert_eq!(table["x"]["p"], 2);
/// assert_eq!(table["x"]["q"], 0);
/// ```
pub fn crosstab(a: &Column, b: &Column) -> IndexMap<String, IndexMap<String, usize>> {
    let rows = a.len().min(b.len());
    let mut counts: IndexMap<(String, String), usize> = IndexMap::new();
    for i in 0..rows {
        if let (Some(ra), Some(rb)) = (a.label_at(i), b.label_at(i)) {
            *counts.entry((ra.into_owned(), rb.into_owned())).or_insert(0) += 1;
        }
    }

    let mut row_keys: Vec<&str> = counts.keys().map(|(r, _)| r.as_str()).collect();
    let mut col_keys: Vec<&str> = counts.keys().map(|(_, c)| c.as_str()).collect();
    for keys in [&mut row_keys, &mut col_keys] {
        keys.sort_unstable();
        keys.dedup();
    }

    row_keys
        .iter()
        .map(|&r| {
            let row = col_keys
                .iter()
                .map(|&c| {
                    let n = counts.get(&(r.to_string(), c.to_string())).copied().unwrap_or(0);
                    (c.to_string(), n)
                })
                .collect();
            (r.to_string(), row)
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────
