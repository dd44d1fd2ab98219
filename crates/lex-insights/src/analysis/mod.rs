//! Dataset-level analyses built on top of the column profiler.
//!
//! This module provides:
//! - Value distributions (histograms, top values, time ranges)
//! - IQR outlier detection
//! - Pairwise-complete Pearson correlation
//! - Data quality patterns
//! - Group-by aggregation
//! - [`Analyzer`], which runs everything for the overview screen

mod correlation;
mod distribution;
mod group;
mod outliers;
mod patterns;

pub use correlation::compute_correlations;
pub use distribution::{compute_distribution, compute_distributions};
pub use group::{Aggregation, COUNT_COLUMN, GroupByQuery, group_by_aggregate};
pub use outliers::{compute_outliers, detect_outliers};
pub use patterns::{count_duplicate_rows, detect_patterns};

use crate::config::AnalysisConfig;
use crate::error::{Result, ResultExt};
use crate::loader::dataset_info;
use crate::profiler::DataProfiler;
use crate::sanitize::sanitize;
use crate::types::{AnalysisReport, Record};
use crate::utils::records;
use polars::prelude::*;
use std::time::Instant;
use tracing::info;

/// First `n` rows of a dataset as records.
pub fn sample_records(df: &DataFrame, n: usize) -> Result<Vec<Record>> {
    let head = df.head(Some(n));
    records(&head).context("extracting sample rows")
}

/// Runs the full analysis suite over a dataset.
///
/// # Example
///
/// ```rust,ignore
/// use lex_insights::{AnalysisConfig, Analyzer};
///
/// let analyzer = Analyzer::new(AnalysisConfig::default());
/// let report = analyzer.analyze(&df)?;
/// println!("{} numeric columns", report.distributions.len());
/// ```
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Overview, statistics, correlations, sample, patterns and per-column
    /// distributions, sanitized and ready to serialize.
    pub fn analyze(&self, df: &DataFrame) -> Result<AnalysisReport> {
        let start = Instant::now();

        let info = dataset_info(df);
        let column_stats = DataProfiler::compute_stats(df, &self.config)?;
        let correlations = compute_correlations(df)?;
        let sample = sample_records(df, self.config.sample_rows)?;
        let patterns = detect_patterns(df, &self.config)?;
        let distributions = compute_distributions(df, self.config.histogram_bins, &self.config)?;

        info!(
            "Analyzed {} rows x {} columns in {:.2?}",
            info.rows,
            info.columns,
            start.elapsed()
        );

        Ok(sanitize(AnalysisReport {
            info,
            column_stats,
            correlations,
            sample,
            patterns,
            distributions,
        }))
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}
