//! Key-based reconciliation of two datasets.
//!
//! Rows are matched on a composite key built from one or more key columns.
//! Every distinct key lands in exactly one partition:
//!
//! - `matching`: present in both datasets
//! - `only_in_first` / `only_in_second`: present on one side only
//!
//! Matched rows are then compared column by column. Preview mode caps the
//! row-level output for display; the summary always reflects the full result.

mod key;

pub use key::CompositeKey;

use crate::config::AnalysisConfig;
use crate::error::{InsightError, Result, ResultExt};
use crate::types::{
    CommonColumns, FieldDifference, MatchedRow, ReconcileMode, ReconciliationResult,
    ReconciliationSummary, Record,
};
use crate::utils::records;
use key::KeyIndex;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// A dataset together with the name used in messages and summaries
/// (typically the sheet name).
#[derive(Debug, Clone, Copy)]
pub struct NamedDataset<'a> {
    pub name: &'a str,
    pub frame: &'a DataFrame,
}

impl<'a> NamedDataset<'a> {
    pub fn new(name: &'a str, frame: &'a DataFrame) -> Self {
        Self { name, frame }
    }

    fn has_column(&self, column: &str) -> bool {
        self.frame.get_column_index(column).is_some()
    }

    fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

/// What to reconcile and how much of it to return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileRequest {
    /// Ordered key columns; must exist in both datasets.
    pub key_columns: Vec<String>,
    /// Columns to compare on matched rows. `None` compares every non-key
    /// column the datasets have in common.
    #[serde(default)]
    pub comparison_columns: Option<Vec<String>>,
    #[serde(default)]
    pub mode: ReconcileMode,
}

impl ReconcileRequest {
    pub fn new<I, S>(key_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key_columns: key_columns.into_iter().map(Into::into).collect(),
            comparison_columns: None,
            mode: ReconcileMode::Preview,
        }
    }

    pub fn compare<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.comparison_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn mode(mut self, mode: ReconcileMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Columns of both datasets and the columns they share (first-dataset order).
pub fn common_columns(first: &DataFrame, second: &DataFrame) -> CommonColumns {
    let first_columns: Vec<String> = first
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let second_columns: Vec<String> = second
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let second_set: HashSet<&String> = second_columns.iter().collect();
    let common = first_columns
        .iter()
        .filter(|c| second_set.contains(c))
        .cloned()
        .collect();

    CommonColumns {
        first_columns,
        second_columns,
        common_columns: common,
    }
}

/// Reconciliation engine.
///
/// # Example
///
/// ```rust,ignore
/// use lex_insights::reconcile::{NamedDataset, ReconcileRequest, Reconciler};
///
/// let reconciler = Reconciler::default();
/// let request = ReconcileRequest::new(["order_id"]).compare(["amount", "status"]);
/// let result = reconciler.reconcile(
///     NamedDataset::new("ledger", &ledger),
///     NamedDataset::new("bank", &bank),
///     &request,
/// )?;
/// println!("{} rows differ", result.summary.rows_with_differences);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: AnalysisConfig,
}

impl Reconciler {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Reconcile two datasets by composite key.
    pub fn reconcile(
        &self,
        first: NamedDataset<'_>,
        second: NamedDataset<'_>,
        request: &ReconcileRequest,
    ) -> Result<ReconciliationResult> {
        let key_columns = validate_key_columns(&first, &second, &request.key_columns)?;
        let comparison_columns = resolve_comparison_columns(
            &first,
            &second,
            &key_columns,
            request.comparison_columns.as_deref(),
        )?;

        let first_rows = records(first.frame)
            .context(format!("reading rows of dataset '{}'", first.name))?;
        let second_rows = records(second.frame)
            .context(format!("reading rows of dataset '{}'", second.name))?;

        let first_index = KeyIndex::build(&first_rows, &key_columns);
        let second_index = KeyIndex::build(&second_rows, &key_columns);

        let mut matching = Vec::new();
        let mut only_in_first = Vec::new();
        let mut differences = Vec::new();
        let mut rows_with_differences = 0;

        for (key, first_row) in first_index.iter() {
            let first_record = &first_rows[first_row];
            match second_index.row_of(key) {
                Some(second_row) => {
                    let second_record = &second_rows[second_row];
                    let key_record = key_record(first_record, &key_columns);

                    let before = differences.len();
                    for column in &comparison_columns {
                        let left = first_record.get(column).cloned().unwrap_or_default();
                        let right = second_record.get(column).cloned().unwrap_or_default();
                        if left.as_key_string() != right.as_key_string() {
                            differences.push(FieldDifference {
                                key: key_record.clone(),
                                column: column.clone(),
                                value_in_first: left,
                                value_in_second: right,
                            });
                        }
                    }
                    if differences.len() > before {
                        rows_with_differences += 1;
                    }

                    matching.push(MatchedRow {
                        key: key_record,
                        first: first_record.clone(),
                        second: second_record.clone(),
                    });
                }
                None => only_in_first.push(first_record.clone()),
            }
        }

        let only_in_second: Vec<Record> = second_index
            .iter()
            .filter(|(key, _)| first_index.row_of(key).is_none())
            .map(|(_, row)| second_rows[row].clone())
            .collect();

        let summary = ReconciliationSummary {
            first_dataset: first.name.to_string(),
            second_dataset: second.name.to_string(),
            first_rows: first_rows.len(),
            second_rows: second_rows.len(),
            total_keys: matching.len() + only_in_first.len() + only_in_second.len(),
            matching: matching.len(),
            only_in_first: only_in_first.len(),
            only_in_second: only_in_second.len(),
            rows_with_differences,
            differences: differences.len(),
            duplicate_keys_in_first: first_index.duplicates(),
            duplicate_keys_in_second: second_index.duplicates(),
        };

        info!(
            "Reconciled '{}' ({} rows) with '{}' ({} rows): {} matching, {} only in first, {} only in second, {} differences",
            summary.first_dataset,
            summary.first_rows,
            summary.second_dataset,
            summary.second_rows,
            summary.matching,
            summary.only_in_first,
            summary.only_in_second,
            summary.differences
        );

        let mut result = ReconciliationResult {
            mode: request.mode,
            key_columns,
            comparison_columns,
            summary,
            matching,
            only_in_first,
            only_in_second,
            differences,
            truncated: false,
        };

        if request.mode == ReconcileMode::Preview {
            result.truncated = truncate_for_preview(&mut result, self.config.preview_limit);
        }

        Ok(result)
    }
}

fn validate_key_columns(
    first: &NamedDataset<'_>,
    second: &NamedDataset<'_>,
    key_columns: &[String],
) -> Result<Vec<String>> {
    if key_columns.is_empty() {
        return Err(InsightError::InvalidArgument(
            "at least one key column is required".to_string(),
        ));
    }

    for dataset in [first, second] {
        for column in key_columns {
            if !dataset.has_column(column) {
                return Err(InsightError::KeyColumnMissing {
                    column: column.clone(),
                    dataset: dataset.name.to_string(),
                });
            }
        }
    }

    let mut seen = HashSet::new();
    Ok(key_columns
        .iter()
        .filter(|c| seen.insert(c.as_str()))
        .cloned()
        .collect())
}

fn resolve_comparison_columns(
    first: &NamedDataset<'_>,
    second: &NamedDataset<'_>,
    key_columns: &[String],
    requested: Option<&[String]>,
) -> Result<Vec<String>> {
    let keys: HashSet<&str> = key_columns.iter().map(String::as_str).collect();

    let Some(requested) = requested else {
        let columns: Vec<String> = first
            .column_names()
            .into_iter()
            .filter(|c| !keys.contains(c.as_str()) && second.has_column(c))
            .collect();
        debug!("Comparing common columns: {:?}", columns);
        return Ok(columns);
    };

    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(requested.len());
    for column in requested {
        if keys.contains(column.as_str()) || !seen.insert(column.as_str()) {
            continue;
        }
        for dataset in [first, second] {
            if !dataset.has_column(column) {
                return Err(InsightError::ComparisonColumnMissing {
                    column: column.clone(),
                    dataset: dataset.name.to_string(),
                });
            }
        }
        columns.push(column.clone());
    }
    Ok(columns)
}

fn key_record(row: &Record, key_columns: &[String]) -> Record {
    key_columns
        .iter()
        .map(|col| (col.clone(), row.get(col).cloned().unwrap_or_default()))
        .collect()
}

/// Cap every row-level list at `limit`; returns whether anything was cut.
fn truncate_for_preview(result: &mut ReconciliationResult, limit: usize) -> bool {
    let truncated = result.matching.len() > limit
        || result.only_in_first.len() > limit
        || result.only_in_second.len() > limit
        || result.differences.len() > limit;

    result.matching.truncate(limit);
    result.only_in_first.truncate(limit);
    result.only_in_second.truncate(limit);
    result.differences.truncate(limit);

    if truncated {
        debug!("Preview truncated to {} entries per partition", limit);
    }
    truncated
}
