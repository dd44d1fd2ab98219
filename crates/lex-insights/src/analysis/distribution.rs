//! Value distributions per column.

use crate::config::AnalysisConfig;
use crate::error::{InsightError, Result, ResultExt};
use crate::profiler::classify;
use crate::types::{ColumnType, DistributionResult, HistogramBin};
use crate::utils::{finite_values, mean, percentile, sorted_values, temporal_bounds, value_counts};
use indexmap::IndexMap;
use polars::prelude::*;
use tracing::debug;

/// Distribution of one column.
///
/// `bins` only affects numeric columns and must be at least 1.
pub fn compute_distribution(
    df: &DataFrame,
    column: &str,
    bins: usize,
    config: &AnalysisConfig,
) -> Result<DistributionResult> {
    if bins == 0 {
        return Err(InsightError::InvalidArgument(
            "histogram bins must be at least 1".to_string(),
        ));
    }

    let col = df
        .column(column)
        .map_err(|_| InsightError::ColumnNotFound(column.to_string()))?;

    column_distribution(col, bins, config)
        .context(format!("computing distribution for column '{}'", column))
}

/// Distribution of every column, in column order.
pub fn compute_distributions(
    df: &DataFrame,
    bins: usize,
    config: &AnalysisConfig,
) -> Result<IndexMap<String, DistributionResult>> {
    let mut distributions = IndexMap::with_capacity(df.width());
    for col in df.get_columns() {
        let name = col.name().to_string();
        let distribution = compute_distribution(df, &name, bins, config)?;
        distributions.insert(name, distribution);
    }
    Ok(distributions)
}

fn column_distribution(
    col: &Column,
    bins: usize,
    config: &AnalysisConfig,
) -> Result<DistributionResult> {
    let series = col.as_materialized_series();
    let column_type = classify(col);

    let result = match column_type {
        ColumnType::Numeric => numeric_distribution(series, bins)?,
        ColumnType::Categorical => {
            let mut values = value_counts(series)?;
            if values.is_empty() {
                return Ok(empty());
            }
            values.truncate(config.categorical_distribution_limit);
            DistributionResult::Categorical { values }
        }
        ColumnType::Boolean => {
            let values = value_counts(series)?;
            if values.is_empty() {
                return Ok(empty());
            }
            DistributionResult::Boolean { values }
        }
        ColumnType::Datetime => {
            let count = series.len() - series.null_count();
            if count == 0 {
                return Ok(empty());
            }
            let (min, max) = temporal_bounds(series)?;
            DistributionResult::Datetime { min, max, count }
        }
        ColumnType::Unknown => DistributionResult::Unsupported {
            message: format!(
                "Distribution is not available for column type {}",
                series.dtype()
            ),
        },
    };

    Ok(result)
}

fn empty() -> DistributionResult {
    DistributionResult::Empty {
        message: "No non-null values".to_string(),
    }
}

fn numeric_distribution(series: &Series, bins: usize) -> PolarsResult<DistributionResult> {
    let values = finite_values(series)?;
    if values.is_empty() {
        return Ok(empty());
    }

    let sorted = sorted_values(values);
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];

    let histogram = if min == max {
        debug!(
            "Column '{}' holds a single distinct value, skipping histogram",
            series.name()
        );
        Vec::new()
    } else {
        build_histogram(&sorted, min, max, bins)
    };

    Ok(DistributionResult::Numeric {
        histogram,
        min: Some(min),
        max: Some(max),
        mean: mean(&sorted),
        median: percentile(&sorted, 0.5),
    })
}

/// Equal-width histogram over `[min, max]`.
///
/// Bins are half-open `[lo, hi)` except the last, which is closed so the
/// maximum is counted. Requires `min < max` and `bins >= 1`.
pub(crate) fn build_histogram(values: &[f64], min: f64, max: f64, bins: usize) -> Vec<HistogramBin> {
    let span = max - min;
    let edges: Vec<f64> = (0..=bins)
        .map(|i| {
            if i == bins {
                max
            } else {
                min + span * (i as f64) / (bins as f64)
            }
        })
        .collect();

    let mut counts = vec![0usize; bins];
    for &v in values {
        if v < min || v > max {
            continue;
        }
        let mut idx = (((v - min) / span) * bins as f64) as usize;
        idx = idx.min(bins - 1);
        // Float rounding can put a value on the wrong side of an edge.
        while idx > 0 && v < edges[idx] {
            idx -= 1;
        }
        while idx < bins - 1 && v >= edges[idx + 1] {
            idx += 1;
        }
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let lower = edges[i];
            let upper = edges[i + 1];
            HistogramBin {
                range: format!("{:.2} - {:.2}", lower, upper),
                count,
                lower,
                upper,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    // ==================== numeric ====================

    #[test]
    fn test_histogram_counts_every_value() {
        let df = df! {
            "x" => &[Some(1.0f64), Some(2.0), Some(2.5), None, Some(4.0), Some(10.0)],
        }
        .unwrap();

        let DistributionResult::Numeric { histogram, min, max, .. } =
            compute_distribution(&df, "x", 4, &config()).unwrap()
        else {
            panic!("expected numeric distribution");
        };

        assert_eq!(histogram.len(), 4);
        assert_eq!(histogram.iter().map(|b| b.count).sum::<usize>(), 5);
        assert_eq!(min, Some(1.0));
        assert_eq!(max, Some(10.0));
        // Max lands in the closed last bin
        assert_eq!(histogram[3].count, 1);
        assert_eq!(histogram[0].range, "1.00 - 3.25");
    }

    #[test]
    fn test_histogram_edges_are_contiguous() {
        let values = [0.0, 0.1, 0.2, 0.3, 0.7, 1.0];
        let histogram = build_histogram(&values, 0.0, 1.0, 10);

        assert_eq!(histogram.len(), 10);
        for pair in histogram.windows(2) {
            assert_eq!(pair[0].upper, pair[1].lower);
        }
        assert_eq!(histogram.iter().map(|b| b.count).sum::<usize>(), values.len());
        assert_eq!(histogram[9].count, 1);
    }

    #[test]
    fn test_constant_column_has_no_bins() {
        let df = df! { "x" => &[3i64, 3, 3] }.unwrap();

        let DistributionResult::Numeric { histogram, mean, median, .. } =
            compute_distribution(&df, "x", 10, &config()).unwrap()
        else {
            panic!("expected numeric distribution");
        };

        assert!(histogram.is_empty());
        assert_eq!(mean, Some(3.0));
        assert_eq!(median, Some(3.0));
    }

    #[test]
    fn test_all_null_numeric_is_empty() {
        let df = df! { "x" => &[None::<f64>, None] }.unwrap();
        let result = compute_distribution(&df, "x", 10, &config()).unwrap();
        assert!(matches!(result, DistributionResult::Empty { .. }));
    }

    // ==================== other types ====================

    #[test]
    fn test_categorical_distribution_is_capped() {
        let labels: Vec<String> = (0..60).map(|i| format!("v{}", i)).collect();
        let df = df! { "label" => labels }.unwrap();

        let DistributionResult::Categorical { values } =
            compute_distribution(&df, "label", 10, &config()).unwrap()
        else {
            panic!("expected categorical distribution");
        };
        assert_eq!(values.len(), 50);
    }

    #[test]
    fn test_boolean_distribution() {
        let df = df! { "flag" => &[true, false, true] }.unwrap();

        let DistributionResult::Boolean { values } =
            compute_distribution(&df, "flag", 10, &config()).unwrap()
        else {
            panic!("expected boolean distribution");
        };
        assert_eq!(values[0].value, "true");
        assert_eq!(values[0].count, 2);
        assert_eq!(values[1].count, 1);
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let df = DataFrame::new(vec![Series::new_null("n".into(), 2).into()]).unwrap();
        let result = compute_distribution(&df, "n", 10, &config()).unwrap();
        assert!(matches!(result, DistributionResult::Unsupported { .. }));
    }

    // ==================== errors ====================

    #[test]
    fn test_missing_column_is_validation_error() {
        let df = df! { "x" => &[1i32] }.unwrap();
        let err = compute_distribution(&df, "nope", 10, &config()).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert!(err.is_validation());
    }

    #[test]
    fn test_zero_bins_rejected() {
        let df = df! { "x" => &[1i32] }.unwrap();
        let err = compute_distribution(&df, "x", 0, &config()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_compute_distributions_covers_all_columns() {
        let df = df! {
            "x" => &[1.0f64, 2.0],
            "label" => &["a", "b"],
        }
        .unwrap();

        let all = compute_distributions(&df, 5, &config()).unwrap();
        assert_eq!(all.len(), 2);
        assert!(matches!(all["label"], DistributionResult::Categorical { .. }));
    }
}
