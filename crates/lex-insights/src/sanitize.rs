//! Result sanitization.
//!
//! JSON has no representation for NaN or infinity. Every result passes
//! through [`sanitize`] before it leaves the crate: optional statistics become
//! `None`, cells become [`CellValue::Null`], and fields that are plain numbers
//! by contract fall back to `0.0`.
//!
//! Sanitizing is idempotent: `sanitize(sanitize(x)) == sanitize(x)`.

use crate::error::Result;
use crate::types::{
    AnalysisReport, CellValue, ColumnProfile, CorrelationMatrix, CorrelationResult, DatasetInfo,
    DistributionResult, FieldDifference, HistogramBin, MatchedRow, MissingInfo, NumericStats,
    OutlierReport, PatternReport, ReconciliationResult, TypeStats,
};
use indexmap::IndexMap;
use serde::Serialize;
use std::hash::Hash;

/// A structure that can be scrubbed of non-finite floats.
pub trait Sanitize: Sized {
    fn sanitize(self) -> Self;
}

/// Sanitize any result structure.
pub fn sanitize<T: Sanitize>(value: T) -> T {
    value.sanitize()
}

/// Sanitize a result and convert it to a JSON value.
pub fn to_json_value<T: Sanitize + Serialize>(value: T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value.sanitize())?)
}

#[inline]
fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[inline]
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

// =============================================================================
// Containers
// =============================================================================

impl<T: Sanitize> Sanitize for Vec<T> {
    fn sanitize(self) -> Self {
        self.into_iter().map(Sanitize::sanitize).collect()
    }
}

impl<T: Sanitize> Sanitize for Option<T> {
    fn sanitize(self) -> Self {
        self.map(Sanitize::sanitize)
    }
}

impl<K: Hash + Eq, V: Sanitize> Sanitize for IndexMap<K, V> {
    fn sanitize(self) -> Self {
        self.into_iter().map(|(k, v)| (k, v.sanitize())).collect()
    }
}

impl Sanitize for serde_json::Value {
    fn sanitize(self) -> Self {
        use serde_json::Value;

        match self {
            Value::Number(n) if n.as_f64().is_some_and(|f| !f.is_finite()) => Value::Null,
            Value::Array(items) => Value::Array(items.into_iter().map(Sanitize::sanitize).collect()),
            Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, v.sanitize())).collect())
            }
            other => other,
        }
    }
}

// =============================================================================
// Cells
// =============================================================================

impl Sanitize for CellValue {
    fn sanitize(self) -> Self {
        match self {
            CellValue::Float(f) if !f.is_finite() => CellValue::Null,
            other => other,
        }
    }
}

// =============================================================================
// Result structures
// =============================================================================

impl Sanitize for NumericStats {
    fn sanitize(self) -> Self {
        NumericStats {
            mean: finite(self.mean),
            std: finite(self.std),
            min: finite(self.min),
            p25: finite(self.p25),
            median: finite(self.median),
            p75: finite(self.p75),
            max: finite(self.max),
        }
    }
}

impl Sanitize for TypeStats {
    fn sanitize(self) -> Self {
        match self {
            TypeStats::Numeric(stats) => TypeStats::Numeric(stats.sanitize()),
            other => other,
        }
    }
}

impl Sanitize for ColumnProfile {
    fn sanitize(self) -> Self {
        ColumnProfile {
            null_percentage: finite_or_zero(self.null_percentage),
            unique_percentage: finite_or_zero(self.unique_percentage),
            stats: self.stats.sanitize(),
            ..self
        }
    }
}

impl Sanitize for HistogramBin {
    fn sanitize(self) -> Self {
        HistogramBin {
            lower: finite_or_zero(self.lower),
            upper: finite_or_zero(self.upper),
            ..self
        }
    }
}

impl Sanitize for DistributionResult {
    fn sanitize(self) -> Self {
        match self {
            DistributionResult::Numeric {
                histogram,
                min,
                max,
                mean,
                median,
            } => DistributionResult::Numeric {
                histogram: histogram.sanitize(),
                min: finite(min),
                max: finite(max),
                mean: finite(mean),
                median: finite(median),
            },
            other => other,
        }
    }
}

impl Sanitize for OutlierReport {
    fn sanitize(self) -> Self {
        OutlierReport {
            percentage: finite_or_zero(self.percentage),
            lower_bound: finite_or_zero(self.lower_bound),
            upper_bound: finite_or_zero(self.upper_bound),
            q1: finite_or_zero(self.q1),
            q3: finite_or_zero(self.q3),
            values: self.values.into_iter().filter(|v| v.is_finite()).collect(),
            ..self
        }
    }
}

impl Sanitize for CorrelationMatrix {
    fn sanitize(self) -> Self {
        // Undefined coefficients are reported as 0.0 throughout the matrix.
        let values = self
            .values
            .into_iter()
            .map(|row| row.into_iter().map(finite_or_zero).collect())
            .collect();
        CorrelationMatrix {
            columns: self.columns,
            values,
        }
    }
}

impl Sanitize for CorrelationResult {
    fn sanitize(self) -> Self {
        match self {
            CorrelationResult::Matrix(matrix) => CorrelationResult::Matrix(matrix.sanitize()),
            other => other,
        }
    }
}

impl Sanitize for MatchedRow {
    fn sanitize(self) -> Self {
        MatchedRow {
            key: self.key.sanitize(),
            first: self.first.sanitize(),
            second: self.second.sanitize(),
        }
    }
}

impl Sanitize for FieldDifference {
    fn sanitize(self) -> Self {
        FieldDifference {
            key: self.key.sanitize(),
            value_in_first: self.value_in_first.sanitize(),
            value_in_second: self.value_in_second.sanitize(),
            ..self
        }
    }
}

impl Sanitize for ReconciliationResult {
    fn sanitize(self) -> Self {
        ReconciliationResult {
            matching: self.matching.sanitize(),
            only_in_first: self.only_in_first.sanitize(),
            only_in_second: self.only_in_second.sanitize(),
            differences: self.differences.sanitize(),
            ..self
        }
    }
}

impl Sanitize for DatasetInfo {
    fn sanitize(self) -> Self {
        DatasetInfo {
            memory_usage_mb: finite_or_zero(self.memory_usage_mb),
            ..self
        }
    }
}

impl Sanitize for MissingInfo {
    fn sanitize(self) -> Self {
        MissingInfo {
            percentage: finite_or_zero(self.percentage),
            ..self
        }
    }
}

impl Sanitize for PatternReport {
    fn sanitize(self) -> Self {
        PatternReport {
            missing_data: self.missing_data.sanitize(),
            outliers: self.outliers.sanitize(),
            data_quality: self.data_quality,
        }
    }
}

impl Sanitize for AnalysisReport {
    fn sanitize(self) -> Self {
        AnalysisReport {
            info: self.info.sanitize(),
            column_stats: self.column_stats.sanitize(),
            correlations: self.correlations.sanitize(),
            sample: self.sample.sanitize(),
            patterns: self.patterns.sanitize(),
            distributions: self.distributions.sanitize(),
        }
    }
}
