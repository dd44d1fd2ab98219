//! Shared helpers for the analytics engines.
//!
//! Data type predicates, null/NaN aware value extraction and the order
//! statistics used by both the stats engine and the outlier detector.

use crate::types::{CellValue, Record, ValueCount};
use indexmap::IndexMap;
use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer, float or fixed-point decimal).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::Int128
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
            | DataType::Decimal(_, _)
    )
}

/// Check if a DataType is a float type (the only types that can hold NaN).
#[inline]
pub fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

/// Check if a DataType is boolean.
#[inline]
pub fn is_boolean_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Boolean)
}

/// Check if a DataType holds text (plain, dictionary encoded or enum).
#[inline]
pub fn is_text_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::String | DataType::Categorical(_, _) | DataType::Enum(_, _)
    )
}

// =============================================================================
// Value Extraction
// =============================================================================

/// Number of missing cells: nulls plus NaN in float columns.
pub fn missing_count(series: &Series) -> usize {
    let nan_count = if is_float_dtype(series.dtype()) {
        series
            .cast(&DataType::Float64)
            .ok()
            .and_then(|s| {
                s.f64()
                    .map(|ca| ca.into_iter().filter(|v| v.is_some_and(f64::is_nan)).count())
                    .ok()
            })
            .unwrap_or(0)
    } else {
        0
    };

    series.null_count() + nan_count
}

/// Distinct non-missing values (NaN counts as missing).
pub fn distinct_count(series: &Series) -> PolarsResult<usize> {
    if is_float_dtype(series.dtype()) || matches!(series.dtype(), DataType::Decimal(_, _)) {
        let values = numeric_values(series)?;
        return Series::new(series.name().clone(), values).n_unique();
    }
    series.drop_nulls().n_unique()
}

/// Non-missing values of a numeric series as `f64`, in row order.
///
/// Nulls and NaN are dropped; infinities are kept.
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<f64>> {
    let float_series = series.cast(&DataType::Float64)?;
    let values = float_series
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect();
    Ok(values)
}

/// Finite values of a numeric series as `f64`, in row order.
pub fn finite_values(series: &Series) -> PolarsResult<Vec<f64>> {
    let float_series = series.cast(&DataType::Float64)?;
    let values = float_series
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect();
    Ok(values)
}

/// Per-row `f64` view of a numeric series; `None` for null, NaN or infinite.
pub fn optional_finite_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let float_series = series.cast(&DataType::Float64)?;
    let values = float_series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect();
    Ok(values)
}

/// Every cell of a series as a transport-safe [`CellValue`].
///
/// Decimal cells are read as `f64`.
pub fn cell_values(series: &Series) -> PolarsResult<Vec<CellValue>> {
    let as_float;
    let series = if matches!(series.dtype(), DataType::Decimal(_, _)) {
        as_float = series.cast(&DataType::Float64)?;
        &as_float
    } else {
        series
    };

    let mut cells = Vec::with_capacity(series.len());
    for i in 0..series.len() {
        cells.push(CellValue::from(series.get(i)?));
    }
    Ok(cells)
}

/// Every row of a dataset as a [`Record`], in row order.
pub fn records(df: &DataFrame) -> PolarsResult<Vec<Record>> {
    let columns: Vec<(String, Vec<CellValue>)> = df
        .get_columns()
        .iter()
        .map(|col| Ok((col.name().to_string(), cell_values(col.as_materialized_series())?)))
        .collect::<PolarsResult<_>>()?;

    let rows = (0..df.height())
        .map(|i| {
            columns
                .iter()
                .map(|(name, cells)| (name.clone(), cells[i].clone()))
                .collect()
        })
        .collect();
    Ok(rows)
}

/// Count non-null values by their string form.
///
/// Sorted by descending count; ties keep first-encountered order.
pub fn value_counts(series: &Series) -> PolarsResult<Vec<ValueCount>> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for cell in cell_values(series)? {
        if let Some(key) = cell.as_key_string() {
            *counts.entry(key).or_insert(0) += 1;
        }
    }

    let mut values: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount { value, count })
        .collect();
    // sort_by is stable
    values.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(values)
}

/// Earliest and latest value of a temporal series, as display strings.
pub fn temporal_bounds(series: &Series) -> PolarsResult<(Option<String>, Option<String>)> {
    let non_null = series.drop_nulls();
    if non_null.is_empty() {
        return Ok((None, None));
    }

    let sorted = non_null.sort(SortOptions::default())?;
    let min = CellValue::from(sorted.get(0)?).as_key_string();
    let max = CellValue::from(sorted.get(sorted.len() - 1)?).as_key_string();
    Ok((min, max))
}

// =============================================================================
// Order Statistics
// =============================================================================

/// Sort values ascending with a total order (NaN last).
pub fn sorted_values(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

/// Percentile of pre-sorted values by linear interpolation between the two
/// nearest order statistics (`h = (n - 1) * q`).
///
/// # Example
///
/// ```rust,ignore
/// use lex_insights::utils::percentile;
///
/// assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 0.5), Some(2.5));
/// ```
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let h = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }

    Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

/// Arithmetic mean, `None` for no values.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator), `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// `part / total * 100`, or 0 when `total` is 0.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

// =============================================================================
// Tests
// =============================================================================
