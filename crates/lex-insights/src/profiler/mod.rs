//! Column classification and descriptive statistics.
//!
//! This module provides:
//! - Classification of columns into semantic types from their storage type
//! - Always-present counts (missing, distinct) for every column
//! - Type-specific statistics (numeric summary, top values, time range,
//!   true/false counts)

mod classifier;
mod statistics;

pub use classifier::{classify, classify_columns, columns_of_type};

use crate::config::AnalysisConfig;
use crate::error::{InsightError, Result, ResultExt};
use crate::types::{ColumnProfile, ColumnType, TypeStats};
use crate::utils::{distinct_count, missing_count, percentage};
use indexmap::IndexMap;
use polars::prelude::*;
use tracing::debug;

/// Computes per-column descriptive statistics.
pub struct DataProfiler;

impl DataProfiler {
    /// Profile every column of a dataset.
    ///
    /// Returns one [`ColumnProfile`] per column, keyed by column name in
    /// dataset order. A dataset without columns yields an empty map.
    pub fn compute_stats(
        df: &DataFrame,
        config: &AnalysisConfig,
    ) -> Result<IndexMap<String, ColumnProfile>> {
        let mut profiles = IndexMap::with_capacity(df.width());

        for col in df.get_columns() {
            let profile = Self::profile_column(col, df.height(), config)
                .context(format!("computing statistics for column '{}'", col.name()))?;
            profiles.insert(profile.name.clone(), profile);
        }

        debug!(
            "Computed statistics for {} columns over {} rows",
            profiles.len(),
            df.height()
        );
        Ok(profiles)
    }

    /// Profile a single column by name.
    pub fn profile(df: &DataFrame, column: &str, config: &AnalysisConfig) -> Result<ColumnProfile> {
        let col = df
            .column(column)
            .map_err(|_| InsightError::ColumnNotFound(column.to_string()))?;
        Self::profile_column(col, df.height(), config)
    }

    fn profile_column(col: &Column, rows: usize, config: &AnalysisConfig) -> Result<ColumnProfile> {
        let series = col.as_materialized_series();
        let column_type = classify(col);

        let null_count = missing_count(series);
        let unique_count = distinct_count(series)?;

        let stats = match column_type {
            ColumnType::Numeric => Some(TypeStats::Numeric(statistics::numeric_stats(series)?)),
            ColumnType::Categorical => Some(statistics::categorical_stats(
                series,
                config.top_values_limit,
            )?),
            ColumnType::Datetime => Some(statistics::datetime_stats(series)?),
            ColumnType::Boolean => Some(statistics::boolean_stats(series)?),
            ColumnType::Unknown => None,
        };

        Ok(ColumnProfile {
            name: col.name().to_string(),
            dtype: format!("{:?}", series.dtype()),
            column_type,
            null_count,
            null_percentage: percentage(null_count, rows),
            unique_count,
            unique_percentage: percentage(unique_count, rows),
            stats,
        })
    }
}
