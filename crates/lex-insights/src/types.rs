//! Value objects produced by the engines.
//!
//! Everything here is request-scoped: computed fresh from a dataset, handed to
//! the caller, never cached by the engine.

use indexmap::IndexMap;
use polars::prelude::{AnyValue, DataType};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Column classification
// ============================================================================

/// Semantic type of a column, established once from its storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Categorical,
    Datetime,
    Boolean,
    Unknown,
}

impl ColumnType {
    /// Map a declared storage type onto a semantic type.
    ///
    /// Precedence: boolean, numeric, datetime, textual. Values are never
    /// inspected, so a string column holding "42" stays categorical.
    pub fn from_dtype(dtype: &DataType) -> Self {
        use crate::utils::{is_boolean_dtype, is_datetime_dtype, is_numeric_dtype, is_text_dtype};

        if is_boolean_dtype(dtype) {
            ColumnType::Boolean
        } else if is_numeric_dtype(dtype) {
            ColumnType::Numeric
        } else if is_datetime_dtype(dtype) {
            ColumnType::Datetime
        } else if is_text_dtype(dtype) {
            ColumnType::Categorical
        } else {
            ColumnType::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Categorical => "categorical",
            ColumnType::Datetime => "datetime",
            ColumnType::Boolean => "boolean",
            ColumnType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Cells and records
// ============================================================================

/// A transport-safe cell value.
///
/// Polars hands out cells as `AnyValue`, a borrowed, library-specific box.
/// Results never carry `AnyValue`; they carry this enum instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// String form used for categorical keys, composite keys and
    /// reconciliation comparisons.
    ///
    /// `None` for nulls and for non-finite floats, which sanitize to null and
    /// so must compare equal to it.
    pub fn as_key_string(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Float(f) if !f.is_finite() => None,
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Int(i) => Some(i.to_string()),
            CellValue::UInt(u) => Some(u.to_string()),
            CellValue::Float(f) => Some(f.to_string()),
            CellValue::Text(s) => Some(s.clone()),
        }
    }

    /// Numeric view of the cell, if it holds a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::UInt(u) => Some(*u as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<AnyValue<'_>> for CellValue {
    fn from(value: AnyValue<'_>) -> Self {
        match value {
            AnyValue::Null => CellValue::Null,
            AnyValue::Boolean(b) => CellValue::Bool(b),

            AnyValue::Int8(i) => CellValue::Int(i as i64),
            AnyValue::Int16(i) => CellValue::Int(i as i64),
            AnyValue::Int32(i) => CellValue::Int(i as i64),
            AnyValue::Int64(i) => CellValue::Int(i),
            AnyValue::Int128(i) => i64::try_from(i)
                .map(CellValue::Int)
                .unwrap_or(CellValue::Float(i as f64)),

            AnyValue::UInt8(u) => CellValue::UInt(u as u64),
            AnyValue::UInt16(u) => CellValue::UInt(u as u64),
            AnyValue::UInt32(u) => CellValue::UInt(u as u64),
            AnyValue::UInt64(u) => CellValue::UInt(u),

            AnyValue::Float32(f) => CellValue::Float(f as f64),
            AnyValue::Float64(f) => CellValue::Float(f),

            AnyValue::String(s) => CellValue::Text(s.to_string()),
            AnyValue::StringOwned(s) => CellValue::Text(s.to_string()),

            // Categorical and enum cells resolve to their label; dates,
            // datetimes, durations and nested values use the polars display
            // form, which is ISO-like for temporal types.
            other => match other.get_str() {
                Some(label) => CellValue::Text(label.to_string()),
                None => CellValue::Text(format!("{}", other)),
            },
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_key_string() {
            Some(s) => f.write_str(&s),
            None => f.write_str("null"),
        }
    }
}

/// One dataset row keyed by column name, in column order.
pub type Record = IndexMap<String, CellValue>;

/// A value and how often it occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

// ============================================================================
// Statistics
// ============================================================================

/// Per-column descriptive statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    /// Declared storage type as reported by polars (e.g. "Int64").
    pub dtype: String,
    pub column_type: ColumnType,
    pub null_count: usize,
    pub null_percentage: f64,
    pub unique_count: usize,
    pub unique_percentage: f64,
    /// Type-specific block; absent for `ColumnType::Unknown`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<TypeStats>,
}

/// Statistics that only make sense for one column type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeStats {
    Numeric(NumericStats),
    Categorical { top_values: Vec<ValueCount> },
    Datetime { min: Option<String>, max: Option<String> },
    Boolean { true_count: usize, false_count: usize },
}

/// Numeric summary. Every field is `None` when undefined (no values, or a
/// single value for `std`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1 denominator).
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub p25: Option<f64>,
    #[serde(rename = "50%")]
    pub median: Option<f64>,
    #[serde(rename = "75%")]
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

// ============================================================================
// Distributions
// ============================================================================

/// One equal-width histogram bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Human readable label, e.g. "1.00 - 2.50".
    pub range: String,
    pub count: usize,
    pub lower: f64,
    pub upper: f64,
}

/// Distribution of a single column, tagged by column type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DistributionResult {
    Numeric {
        /// Empty when every value is identical.
        histogram: Vec<HistogramBin>,
        min: Option<f64>,
        max: Option<f64>,
        mean: Option<f64>,
        median: Option<f64>,
    },
    Categorical {
        values: Vec<ValueCount>,
    },
    Boolean {
        values: Vec<ValueCount>,
    },
    Datetime {
        min: Option<String>,
        max: Option<String>,
        count: usize,
    },
    /// The column has no usable values.
    Empty {
        message: String,
    },
    /// The column type has no distribution view.
    Unsupported {
        message: String,
    },
}

// ============================================================================
// Outliers
// ============================================================================

/// IQR outlier summary for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub count: usize,
    /// Share of non-null values that are outliers, 0-100.
    pub percentage: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub q1: f64,
    pub q3: f64,
    /// Outlier values in row order, capped by `outlier_sample_limit`.
    pub values: Vec<f64>,
}

// ============================================================================
// Correlation
// ============================================================================

/// Square Pearson correlation matrix over numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major coefficients, `values[i][j]` pairs `columns[i]` with `columns[j]`.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Coefficient for a pair of columns, if both are part of the matrix.
    pub fn coefficient(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }

    /// Nested `column -> column -> coefficient` view.
    pub fn to_nested_map(&self) -> IndexMap<String, IndexMap<String, f64>> {
        self.columns
            .iter()
            .zip(self.values.iter())
            .map(|(name, row)| {
                let inner = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().copied())
                    .collect();
                (name.clone(), inner)
            })
            .collect()
    }
}

/// Either a matrix or the reason none could be computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrelationResult {
    Matrix(CorrelationMatrix),
    Insufficient { message: String },
}

impl CorrelationResult {
    pub fn matrix(&self) -> Option<&CorrelationMatrix> {
        match self {
            CorrelationResult::Matrix(m) => Some(m),
            CorrelationResult::Insufficient { .. } => None,
        }
    }
}

// ============================================================================
// Reconciliation
// ============================================================================

/// How much of a reconciliation is materialized for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileMode {
    /// Each partition and the difference list are capped for display.
    #[default]
    Preview,
    /// Nothing is capped; intended for export.
    Full,
}

/// Row present in both datasets under the same composite key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRow {
    pub key: Record,
    pub first: Record,
    pub second: Record,
}

/// A comparison column whose values disagree for a matched key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDifference {
    pub key: Record,
    pub column: String,
    pub value_in_first: CellValue,
    pub value_in_second: CellValue,
}

/// Untruncated counts of a reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub first_dataset: String,
    pub second_dataset: String,
    pub first_rows: usize,
    pub second_rows: usize,
    /// Distinct composite keys across both datasets.
    pub total_keys: usize,
    pub matching: usize,
    pub only_in_first: usize,
    pub only_in_second: usize,
    /// Matched keys with at least one differing field.
    pub rows_with_differences: usize,
    pub differences: usize,
    /// Rows whose key already occurred earlier in the same dataset.
    pub duplicate_keys_in_first: usize,
    pub duplicate_keys_in_second: usize,
}

/// Outcome of a key-based comparison of two datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub mode: ReconcileMode,
    pub key_columns: Vec<String>,
    pub comparison_columns: Vec<String>,
    pub summary: ReconciliationSummary,
    pub matching: Vec<MatchedRow>,
    pub only_in_first: Vec<Record>,
    pub only_in_second: Vec<Record>,
    pub differences: Vec<FieldDifference>,
    /// True when preview caps removed entries.
    pub truncated: bool,
}

/// Columns of two datasets and their intersection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonColumns {
    pub first_columns: Vec<String>,
    pub second_columns: Vec<String>,
    pub common_columns: Vec<String>,
}

// ============================================================================
// Dataset overview and full analysis
// ============================================================================

/// Shape and schema of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub rows: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
    pub dtypes: IndexMap<String, String>,
    pub column_types: IndexMap<String, ColumnType>,
    pub memory_usage_mb: f64,
}

/// Missing-value summary for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingInfo {
    pub count: usize,
    pub percentage: f64,
}

/// Whole-table quality signals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQuality {
    pub duplicate_rows: usize,
    pub columns_with_single_value: Vec<String>,
}

/// Missing data, outliers and quality signals in one report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    pub missing_data: IndexMap<String, MissingInfo>,
    pub outliers: IndexMap<String, OutlierReport>,
    pub data_quality: DataQuality,
}

/// Everything the analysis view shows for one dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub info: DatasetInfo,
    pub column_stats: IndexMap<String, ColumnProfile>,
    pub correlations: CorrelationResult,
    pub sample: Vec<Record>,
    pub patterns: PatternReport,
    pub distributions: IndexMap<String, DistributionResult>,
}
