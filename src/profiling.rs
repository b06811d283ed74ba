//! Column-level profiling and the whole-table analysis report.
//!
//! Profiling tolerates dirty data: missing values are expected input, and
//! a column whose statistics or chart cannot be computed reports `null`
//! for that piece only.
//!
//! # Example
//!
//! ```
//! use u_compare::csv_parser::CsvParser;
//! use u_compare::profiling::{profile_column, ProfileDetail};
//!
//! let df = CsvParser::new().parse_str("score\n1\n2\n3\n4\n5\n").unwrap();
//! let profile = profile_column("score", df.column_by_name("score").unwrap(), 5);
//!
//! assert_eq!(profile.missing_percent, 0.0);
//! match profile.detail {
//!     ProfileDetail::Numeric { stats } => {
//!         assert_eq!(stats.min, Some(1.0));
//!         assert_eq!(stats.mean, Some(3.0));
//!     }
//!     _ => unreachable!(),
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chart;
use crate::classify::{classify, Classification};
use crate::config::CompareConfig;
use crate::dataframe::{Column, DataFrame};
use crate::error::CompareError;
use crate::render::{chart_or_null, ChartRenderer};
use crate::stats;

// ── Column Profile ────────────────────────────────────────────────────

/// Summary statistics of a numeric column. Non-finite results are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Rounded to 2 decimals.
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

/// Classification-specific part of a [`ColumnProfile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProfileDetail {
    Numeric {
        stats: NumericStats,
    },
    Categorical {
        /// Most frequent values in descending count order.
        top_values: IndexMap<String, usize>,
    },
}

/// Profile of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    /// Share of missing cells, 0 to 100, rounded to 2 decimals.
    pub missing_percent: f64,
    #[serde(flatten)]
    pub detail: ProfileDetail,
}

impl ColumnProfile {
    /// Classification the profile was built for.
    pub fn classification(&self) -> Classification {
        match self.detail {
            ProfileDetail::Numeric { .. } => Classification::Numeric,
            ProfileDetail::Categorical { .. } => Classification::Categorical,
        }
    }
}

// ── Profiling functions ───────────────────────────────────────────────

/// Profiles a single column, keeping `top_n` values for categorical ones.
pub fn profile_column(name: &str, col: &Column, top_n: usize) -> ColumnProfile {
    let detail = match classify(col) {
        Classification::Numeric => ProfileDetail::Numeric {
            stats: numeric_stats(col),
        },
        Classification::Categorical => ProfileDetail::Categorical {
            top_values: value_counts(col).into_iter().take(top_n).collect(),
        },
    };
    ColumnProfile {
        name: name.to_string(),
        missing_percent: missing_percent(col),
        detail,
    }
}

/// Percentage of missing cells, rounded to 2 decimals. Zero rows report 0.
pub fn missing_percent(col: &Column) -> f64 {
    if col.is_empty() {
        return 0.0;
    }
    stats::round_to(col.null_count() as f64 / col.len() as f64 * 100.0, 2)
}

fn numeric_stats(col: &Column) -> NumericStats {
    let values = col.valid_numeric_values().unwrap_or_default();
    NumericStats {
        min: stats::min(&values).and_then(stats::finite),
        max: stats::max(&values).and_then(stats::finite),
        mean: stats::mean(&values)
            .map(|m| stats::round_to(m, 2))
            .and_then(stats::finite),
        median: stats::median(&values).and_then(stats::finite),
    }
}

/// Counts present values by label, most frequent first.
///
/// Ties keep the order in which values first appear in the column.
///
/// ```
/// use u_compare::dataframe::{Cell, Column};
/// use u_compare::profiling::value_counts;
///
/// let col = Column::from_cells(&[Cell::from("b"), Cell::from("a"), Cell::from("a"), Cell::from("b"), Cell::from("c")]);
/// let counts = value_counts(&col);
/// assert_eq!(counts[0], ("b".to_string(), 2));
/// assert_eq!(counts[1], ("a".to_string(), 2));
/// assert_eq!(counts[2], ("c".to_string(), 1));
/// ```
pub fn value_counts(col: &Column) -> Vec<(String, usize)> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for i in col.validity().valid_indices() {
        if let Some(label) = col.label_at(i) {
            *counts.entry(label.into_owned()).or_insert(0) += 1;
        }
    }
    let mut ordered: Vec<(String, usize)> = counts.into_iter().collect();
    // Stable sort keeps first-seen order among equal counts.
    ordered.sort_by(|a, b| b.1.cmp(&a.1));
    ordered
}

/// Builds the per-column chart spec: a histogram for numeric columns, a
/// bar chart of the most frequent values otherwise.
pub fn column_chart(
    name: &str,
    col: &Column,
    config: &CompareConfig,
) -> Result<chart::ChartSpec, chart::ChartError> {
    match classify(col) {
        Classification::Numeric => {
            let values = col.valid_numeric_values().unwrap_or_default();
            chart::histogram(name, &values, config.histogram_bins)
        }
        Classification::Categorical => {
            let top: Vec<(String, usize)> = value_counts(col)
                .into_iter()
                .take(config.chart_top_values)
                .collect();
            chart::top_values_bar(name, &top, config.label_rotation_degrees)
        }
    }
}

// ── Analysis Report ───────────────────────────────────────────────────

/// Table dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub rows: usize,
    pub columns: usize,
}

/// Result of analyzing every column of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub file_info: FileInfo,
    /// Human-readable overview, see [`summary_text`].
    pub summary: String,
    pub analysis: Vec<ColumnProfile>,
    /// Encoded chart per column, `None` where charting failed.
    pub charts: IndexMap<String, Option<String>>,
    pub columns: Vec<String>,
}

/// Profiles every column and renders one chart per column.
///
/// Fails only for a table with no columns or no rows.
///
/// ```
/// use u_compare::config::CompareConfig;
/// use u_compare::csv_parser::CsvParser;
/// use u_compare::profiling::analyze;
/// use u_compare::render::SvgRenderer;
///
/// let df = CsvParser::new().parse_str("city,temp\nOslo,3\nRome,18\nOslo,5\n").unwrap();
/// let report = analyze(&df, &CompareConfig::default(), &SvgRenderer::default()).unwrap();
/// assert_eq!(report.file_info.rows, 3);
/// assert!(report.summary.starts_with("File has 3 rows and 2 columns."));
/// ```
pub fn analyze<R: ChartRenderer + ?Sized>(
    df: &DataFrame,
    config: &CompareConfig,
    renderer: &R,
) -> Result<AnalysisReport, CompareError> {
    if df.is_empty() || df.row_count() == 0 {
        return Err(CompareError::EmptyInput);
    }
    info!(rows = df.row_count(), columns = df.column_count(), "analyzing table");

    let mut analysis = Vec::with_capacity(df.column_count());
    let mut charts = IndexMap::with_capacity(df.column_count());
    for (name, col) in df.iter() {
        let profile = profile_column(name, col, config.profile_top_values);
        debug!(
            column = name,
            classification = %profile.classification(),
            missing_percent = profile.missing_percent,
            "profiled column"
        );
        charts.insert(
            name.to_string(),
            chart_or_null(renderer, column_chart(name, col, config), name),
        );
        analysis.push(profile);
    }

    Ok(AnalysisReport {
        file_info: FileInfo {
            rows: df.row_count(),
            columns: df.column_count(),
        },
        summary: summary_text(df),
        analysis,
        charts,
        columns: df.column_names().to_vec(),
    })
}

/// Three-line overview naming numeric and categorical columns.
///
/// ```
/// use u_compare::csv_parser::CsvParser;
/// use u_compare::profiling::summary_text;
///
/// let df = CsvParser::new().parse_str("a,b\n1,x\n2,y\n").unwrap();
/// assert_eq!(
///     summary_text(&df),
///     "File has 2 rows and 2 columns.\nNumeric columns: a.\nCategorical columns: b.\n"
/// );
/// ```
pub fn summary_text(df: &DataFrame) -> String {
    let (numeric, categorical): (Vec<(&str, &Column)>, Vec<(&str, &Column)>) =
        df.iter().partition(|(_, col)| classify(col).is_numeric());
    let numeric: Vec<&str> = numeric.into_iter().map(|(name, _)| name).collect();
    let categorical: Vec<&str> = categorical.into_iter().map(|(name, _)| name).collect();
    let list = |names: &[&str]| {
        if names.is_empty() {
            "None".to_string()
        } else {
            names.join(", ")
        }
    };
    format!(
        "File has {} rows and {} columns.\nNumeric columns: {}.\nCategorical columns: {}.\n",
        df.row_count(),
        df.column_count(),
        list(&numeric),
        list(&categorical),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────
