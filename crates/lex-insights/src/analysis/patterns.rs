//! Data quality patterns: missing data, outliers, duplicates and constant
//! columns.

use super::outliers::compute_outliers;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::types::{DataQuality, MissingInfo, PatternReport};
use crate::utils::{distinct_count, missing_count, percentage};
use indexmap::IndexMap;
use polars::prelude::*;
use tracing::debug;

/// Scan a dataset for common data quality issues.
pub fn detect_patterns(df: &DataFrame, config: &AnalysisConfig) -> Result<PatternReport> {
    let rows = df.height();

    let mut missing_data = IndexMap::new();
    let mut columns_with_single_value = Vec::new();

    for col in df.get_columns() {
        let series = col.as_materialized_series();

        let missing = missing_count(series);
        if missing > 0 {
            missing_data.insert(
                col.name().to_string(),
                MissingInfo {
                    count: missing,
                    percentage: percentage(missing, rows),
                },
            );
        }

        if distinct_count(series)? == 1 {
            columns_with_single_value.push(col.name().to_string());
        }
    }

    let duplicate_rows = count_duplicate_rows(df)?;
    let outliers = compute_outliers(df, config)?;

    debug!(
        "Patterns: {} columns with missing data, {} with outliers, {} duplicate rows",
        missing_data.len(),
        outliers.len(),
        duplicate_rows
    );

    Ok(PatternReport {
        missing_data,
        outliers,
        data_quality: DataQuality {
            duplicate_rows,
            columns_with_single_value,
        },
    })
}

/// Rows that repeat an earlier row exactly.
pub fn count_duplicate_rows(df: &DataFrame) -> PolarsResult<usize> {
    if df.width() == 0 || df.height() == 0 {
        return Ok(0);
    }

    let unique = df.unique::<&str, &str>(None, UniqueKeepStrategy::First, None)?;
    Ok(df.height() - unique.height())
}
