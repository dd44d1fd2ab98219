//! IQR-based outlier detection.
//!
//! Fences are `[Q1 - k * IQR, Q3 + k * IQR]`; values strictly outside are
//! outliers. Quartiles use the same interpolation as the column statistics.

use crate::config::AnalysisConfig;
use crate::error::{Result, ResultExt};
use crate::profiler::columns_of_type;
use crate::types::{ColumnType, OutlierReport};
use crate::utils::{finite_values, percentage, percentile, sorted_values};
use indexmap::IndexMap;
use polars::prelude::*;
use tracing::debug;

/// Outlier reports for every numeric column that has at least one outlier.
pub fn compute_outliers(
    df: &DataFrame,
    config: &AnalysisConfig,
) -> Result<IndexMap<String, OutlierReport>> {
    let mut reports = IndexMap::new();

    for name in columns_of_type(df, ColumnType::Numeric) {
        let series = df.column(&name)?.as_materialized_series();
        let report = detect_outliers(series, config.iqr_multiplier, config.outlier_sample_limit)
            .context(format!("detecting outliers in column '{}'", name))?;

        if let Some(report) = report {
            debug!(
                "Column '{}': {} outliers outside [{}, {}]",
                name, report.count, report.lower_bound, report.upper_bound
            );
            reports.insert(name, report);
        }
    }

    Ok(reports)
}

/// Detect outliers in a single numeric series.
///
/// Returns `None` when the series has no finite values or no outliers.
pub fn detect_outliers(
    series: &Series,
    multiplier: f64,
    sample_limit: usize,
) -> PolarsResult<Option<OutlierReport>> {
    let values = finite_values(series)?;
    if values.is_empty() {
        return Ok(None);
    }

    let sorted = sorted_values(values.clone());
    let (Some(q1), Some(q3)) = (percentile(&sorted, 0.25), percentile(&sorted, 0.75)) else {
        return Ok(None);
    };
    let iqr = q3 - q1;
    let lower_bound = q1 - multiplier * iqr;
    let upper_bound = q3 + multiplier * iqr;

    let outliers: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| *v < lower_bound || *v > upper_bound)
        .collect();

    if outliers.is_empty() {
        return Ok(None);
    }

    Ok(Some(OutlierReport {
        count: outliers.len(),
        percentage: percentage(outliers.len(), values.len()),
        lower_bound,
        upper_bound,
        q1,
        q3,
        values: outliers.into_iter().take(sample_limit).collect(),
    }))
}
