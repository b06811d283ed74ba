//! Caps and thresholds for profiling and comparison.
//!
//! [`CompareConfig::default`] reproduces the standard policy: a hard
//! cutoff at 50 groups, charts narrowed to the 15 most frequent groups,
//! scatter plots sampled down to 1000 points.
//!
//! ```
//! use u_compare::config::{CompareConfig, HighCardinalityPolicy};
//!
//! let config = CompareConfig::default()
//!     .with_scatter_sample_size(500)
//!     .with_sample_seed(7);
//! assert_eq!(config.max_groups, 50);
//! assert_eq!(config.scatter_sample_size, 500);
//! assert_eq!(config.high_cardinality, HighCardinalityPolicy::Skip);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CompareError;

/// What a group comparison does when the group column exceeds
/// [`CompareConfig::max_groups`] distinct values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighCardinalityPolicy {
    /// Produce neither table nor chart.
    Skip,
    /// Keep the [`CompareConfig::top_by_mean`] groups with the highest mean
    /// in the table; the chart is still suppressed.
    TopByMean,
}

/// Configuration shared by profiling and comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Hard cutoff on distinct groups for group comparison. Default: 50.
    pub max_groups: usize,
    /// Behaviour above `max_groups`. Default: [`HighCardinalityPolicy::Skip`].
    pub high_cardinality: HighCardinalityPolicy,
    /// Groups kept under [`HighCardinalityPolicy::TopByMean`]. Default: 20.
    pub top_by_mean: usize,
    /// Distinct-group count above which the chart is narrowed. Default: 15.
    pub chart_group_threshold: usize,
    /// Most-frequent groups kept in a narrowed chart. Default: 15.
    pub chart_group_limit: usize,
    /// Maximum points drawn in a scatter plot. Default: 1000.
    pub scatter_sample_size: usize,
    /// Seed for scatter sampling; `None` draws from the thread RNG.
    pub sample_seed: Option<u64>,
    /// Equal-width bins in a profile histogram. Default: 10.
    pub histogram_bins: usize,
    /// Entries in a categorical profile's `top_values`. Default: 5.
    pub profile_top_values: usize,
    /// Bars in a categorical profile chart. Default: 10.
    pub chart_top_values: usize,
    /// Rotation of category labels on bar charts, in degrees. Default: 45.
    pub label_rotation_degrees: f64,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            max_groups: 50,
            high_cardinality: HighCardinalityPolicy::Skip,
            top_by_mean: 20,
            chart_group_threshold: 15,
            chart_group_limit: 15,
            scatter_sample_size: 1000,
            sample_seed: None,
            histogram_bins: 10,
            profile_top_values: 5,
            chart_top_values: 10,
            label_rotation_degrees: 45.0,
        }
    }
}

impl CompareConfig {
    /// Loads a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CompareError> {
        let config: Self = serde_json::from_str(json).map_err(|e| CompareError::Decode {
            message: format!("invalid config: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would make a strategy meaningless.
    pub fn validate(&self) -> Result<(), CompareError> {
        let zero = [
            ("max_groups", self.max_groups),
            ("top_by_mean", self.top_by_mean),
            ("chart_group_limit", self.chart_group_limit),
            ("scatter_sample_size", self.scatter_sample_size),
            ("histogram_bins", self.histogram_bins),
        ]
        .into_iter()
        .find(|&(_, v)| v == 0);
        match zero {
            Some((field, _)) => Err(CompareError::Decode {
                message: format!("invalid config: {field} must be positive"),
            }),
            None => Ok(()),
        }
    }

    /// Sets the hard group cutoff.
    pub fn with_max_groups(mut self, n: usize) -> Self {
        self.max_groups = n;
        self
    }

    /// Sets the behaviour above the group cutoff.
    pub fn with_high_cardinality(mut self, policy: HighCardinalityPolicy) -> Self {
        self.high_cardinality = policy;
        self
    }

    /// Sets the scatter sample size.
    pub fn with_scatter_sample_size(mut self, n: usize) -> Self {
        self.scatter_sample_size = n;
        self
    }

    /// Fixes the scatter sampling seed.
    pub fn with_sample_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }

    /// Sets the number of histogram bins.
    pub fn with_histogram_bins(mut self, n: usize) -> Self {
        self.histogram_bins = n;
        self
    }
}
