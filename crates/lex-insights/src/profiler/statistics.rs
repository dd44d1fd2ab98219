//! Type-specific statistics for column profiling.

use crate::types::{NumericStats, TypeStats};
use crate::utils::{mean, numeric_values, percentile, sample_std, sorted_values, temporal_bounds, value_counts};
use polars::prelude::*;

/// Summary statistics over the non-missing values of a numeric series.
pub(crate) fn numeric_stats(series: &Series) -> PolarsResult<NumericStats> {
    let sorted = sorted_values(numeric_values(series)?);
    if sorted.is_empty() {
        return Ok(NumericStats::default());
    }

    Ok(NumericStats {
        mean: mean(&sorted),
        std: sample_std(&sorted),
        min: sorted.first().copied(),
        p25: percentile(&sorted, 0.25),
        median: percentile(&sorted, 0.5),
        p75: percentile(&sorted, 0.75),
        max: sorted.last().copied(),
    })
}

/// Most frequent values of a categorical series.
pub(crate) fn categorical_stats(series: &Series, limit: usize) -> PolarsResult<TypeStats> {
    let mut top_values = value_counts(series)?;
    top_values.truncate(limit);
    Ok(TypeStats::Categorical { top_values })
}

/// Earliest and latest timestamps.
pub(crate) fn datetime_stats(series: &Series) -> PolarsResult<TypeStats> {
    let (min, max) = temporal_bounds(series)?;
    Ok(TypeStats::Datetime { min, max })
}

/// True/false counts, nulls excluded.
pub(crate) fn boolean_stats(series: &Series) -> PolarsResult<TypeStats> {
    let ca = series.bool()?;
    let true_count = ca.into_iter().filter(|v| *v == Some(true)).count();
    let false_count = ca.into_iter().filter(|v| *v == Some(false)).count();
    Ok(TypeStats::Boolean {
        true_count,
        false_count,
    })
}
