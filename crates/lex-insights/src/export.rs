//! Export and row filtering.
//!
//! Filters never mutate the input; they return a new frame with the rows that
//! satisfy every condition.

use crate::error::{InsightError, Result, ResultExt};
use crate::sanitize::sanitize;
use crate::types::CellValue;
use crate::utils::{cell_values, is_numeric_dtype, records};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Output format for [`export_dataset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(InsightError::UnsupportedFormat(format!(
                "export format '{}'",
                other
            ))),
        }
    }
}

/// Serialize a dataset. JSON output is an array of sanitized row objects.
pub fn export_dataset(df: &DataFrame, format: ExportFormat) -> Result<Vec<u8>> {
    let bytes = match format {
        ExportFormat::Csv => {
            let mut buf = Vec::new();
            let mut df = df.clone();
            CsvWriter::new(&mut buf)
                .include_header(true)
                .finish(&mut df)
                .context("writing CSV export")?;
            buf
        }
        ExportFormat::Json => {
            let rows = sanitize(records(df).context("collecting rows for JSON export")?);
            serde_json::to_vec_pretty(&rows)?
        }
    };

    debug!(
        "Exported {} rows as {} ({} bytes)",
        df.height(),
        format.extension(),
        bytes.len()
    );
    Ok(bytes)
}

/// Comparison applied by a [`FilterCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    GtEq,
    #[serde(rename = "<=")]
    LtEq,
    #[serde(rename = "contains")]
    Contains,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::NotEq => "!=",
            FilterOperator::Gt => ">",
            FilterOperator::Lt => "<",
            FilterOperator::GtEq => ">=",
            FilterOperator::LtEq => "<=",
            FilterOperator::Contains => "contains",
        }
    }

    fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            FilterOperator::Eq => ordering == Equal,
            FilterOperator::NotEq => ordering != Equal,
            FilterOperator::Gt => ordering == Greater,
            FilterOperator::Lt => ordering == Less,
            FilterOperator::GtEq => ordering != Less,
            FilterOperator::LtEq => ordering != Greater,
            FilterOperator::Contains => false,
        }
    }
}

impl FromStr for FilterOperator {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "=" | "==" => Ok(FilterOperator::Eq),
            "!=" => Ok(FilterOperator::NotEq),
            ">" => Ok(FilterOperator::Gt),
            "<" => Ok(FilterOperator::Lt),
            ">=" => Ok(FilterOperator::GtEq),
            "<=" => Ok(FilterOperator::LtEq),
            "contains" => Ok(FilterOperator::Contains),
            other => Err(InsightError::InvalidArgument(format!(
                "unknown filter operator '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single row predicate: `column operator value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub column: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl FilterCondition {
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }
}

/// Rows satisfying every condition, as a new frame.
///
/// Numeric columns compare numerically; other columns compare their string
/// forms. Null cells only satisfy `!=`.
pub fn filter_dataset(df: &DataFrame, conditions: &[FilterCondition]) -> Result<DataFrame> {
    if conditions.is_empty() {
        return Ok(df.clone());
    }

    let mut mask = vec![true; df.height()];
    for condition in conditions {
        let col = df
            .column(&condition.column)
            .map_err(|_| InsightError::ColumnNotFound(condition.column.clone()))?;
        let series = col.as_materialized_series();
        let numeric = is_numeric_dtype(series.dtype());

        let target = if numeric && condition.operator != FilterOperator::Contains {
            let parsed = condition.value.trim().parse::<f64>().map_err(|_| {
                InsightError::InvalidArgument(format!(
                    "'{}' is not a number (column '{}' is numeric)",
                    condition.value, condition.column
                ))
            })?;
            Some(parsed)
        } else {
            None
        };

        for (keep, cell) in mask.iter_mut().zip(cell_values(series)?) {
            if *keep {
                *keep = cell_matches(&cell, condition, target);
            }
        }
    }

    let mask = BooleanChunked::from_slice("mask".into(), &mask);
    let filtered = df.filter(&mask).context("applying row filter")?;
    debug!(
        "Filter kept {} of {} rows",
        filtered.height(),
        df.height()
    );
    Ok(filtered)
}

fn cell_matches(cell: &CellValue, condition: &FilterCondition, numeric_target: Option<f64>) -> bool {
    let Some(text) = cell.as_key_string() else {
        return condition.operator == FilterOperator::NotEq;
    };

    if condition.operator == FilterOperator::Contains {
        return text.contains(condition.value.as_str());
    }

    match (numeric_target, cell.as_f64()) {
        (Some(target), Some(value)) => value
            .partial_cmp(&target)
            .is_some_and(|ordering| condition.operator.holds(ordering)),
        _ => condition.operator.holds(text.as_str().cmp(condition.value.as_str())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df! {
            "id" => &[1i64, 2, 3, 4],
            "amount" => &[Some(10.0f64), Some(25.5), None, Some(40.0)],
            "city" => &["Paris", "Berlin", "Parma", "Oslo"],
        }
        .unwrap()
    }

    #[test]
    fn test_numeric_filters() {
        let df = frame();
        let out = filter_dataset(&df, &[FilterCondition::new("amount", FilterOperator::GtEq, "25.5")]).unwrap();
        assert_eq!(out.height(), 2);

        let out = filter_dataset(&df, &[FilterCondition::new("amount", FilterOperator::NotEq, "10")]).unwrap();
        // The null row satisfies !=
        assert_eq!(out.height(), 3);
    }

    #[test]
    fn test_text_filters_combine() {
        let df = frame();
        let out = filter_dataset(
            &df,
            &[
                FilterCondition::new("city", FilterOperator::Contains, "Par"),
                FilterCondition::new("id", FilterOperator::Lt, "3"),
            ],
        )
        .unwrap();

        assert_eq!(out.height(), 1);
        assert_eq!(df.height(), 4);
    }

    #[test]
    fn test_unknown_column_and_bad_number() {
        let df = frame();
        let err = filter_dataset(&df, &[FilterCondition::new("nope", FilterOperator::Eq, "x")]).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");

        let err = filter_dataset(&df, &[FilterCondition::new("amount", FilterOperator::Gt, "lots")]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!("<=".parse::<FilterOperator>().unwrap(), FilterOperator::LtEq);
        assert_eq!("contains".parse::<FilterOperator>().unwrap(), FilterOperator::Contains);
        assert!("~".parse::<FilterOperator>().is_err());

        let json = serde_json::to_string(&FilterOperator::GtEq).unwrap();
        assert_eq!(json, r#"">=""#);
    }

    #[test]
    fn test_export_csv() {
        let df = df! { "id" => &[1i64, 2], "name" => &["a", "b"] }.unwrap();
        let bytes = export_dataset(&df, ExportFormat::Csv).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "id,name\n1,a\n2,b\n");
    }

    #[test]
    fn test_export_json_sanitizes_nan() {
        let df = df! { "x" => &[1.5f64, f64::NAN] }.unwrap();
        let bytes = export_dataset(&df, ExportFormat::Json).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json[0]["x"], 1.5);
        assert!(json[1]["x"].is_null());
    }
}
