//! # u-compare
//!
//! Column-pair comparison and profiling engine with C FFI bindings.
//!
//! u-compare takes an in-memory table and answers two questions: what
//! does each column look like, and how do two chosen columns relate.
//!
//! - **Profiling**: per-column missing rate, numeric summary or most
//!   frequent values, and one chart per column
//! - **Comparison**: classifies both columns as numeric or categorical and
//!   dispatches to group aggregation, correlation or cross tabulation
//!
//! Charts are described as [`chart::ChartSpec`] values and drawn by a
//! [`render::ChartRenderer`]; a failing chart becomes `null` without
//! failing the request.
//!
//! ## Modules
//!
//! - [`dataframe`]: Column-major tabular data model (DataFrame, Column, Cell)
//! - [`csv_parser`]: CSV parsing with automatic type inference
//! - [`loader`]: `.csv` / `.xlsx` ingestion with encoding fallback
//! - [`classify`]: Numeric / categorical column classification
//! - [`stats`]: Mean, median, sample std, Pearson r, least squares, rounding
//! - [`config`]: Caps and thresholds (group cutoff, chart narrowing, scatter sampling)
//! - [`profiling`]: Column profiles and the whole-table analysis report
//! - [`compare`]: Dispatcher and the four comparison strategies
//! - [`chart`]: Chart specs, colour policy, histogram binning, sampling
//! - [`render`]: Renderer boundary and the SVG backend
//! - [`logging`]: tracing subscriber setup
//! - [`ffi`]: C FFI bindings (JSON results, auto-generated C header via cbindgen)
//! - [`error`]: Error types
//!
//! ## Quick Start
//!
//! ```
//! use u_compare::compare::{compare, ComparisonData};
//! use u_compare::config::CompareConfig;
//! use u_compare::csv_parser::CsvParser;
//! use u_compare::render::SvgRenderer;
//!
//! let csv = "height,weight,team\n170,65,red\n180,80,blue\n165,60,red\n175,72,blue\n";
//! let df = CsvParser::new().parse_str(csv).unwrap();
//! let renderer = SvgRenderer::default();
//! let config = CompareConfig::default();
//!
//! let result = compare(&df, "height", "weight", &config, &renderer).unwrap();
//! match result.data {
//!     ComparisonData::Correlation(c) => assert!(c.correlation > 0.9),
//!     other => panic!("unexpected: {other:?}"),
//! }
//!
//! // Numeric group column against a categorical value column is rejected.
//! let result = compare(&df, "height", "team", &config, &renderer).unwrap();
//! assert!(matches!(result.data, ComparisonData::Invalid(_)));
//! ```

pub mod chart;
pub mod classify;
pub mod compare;
pub mod config;
pub mod csv_parser;
pub mod dataframe;
pub mod error;
pub mod ffi;
pub mod loader;
pub mod logging;
pub mod profiling;
pub mod render;
pub mod stats;
