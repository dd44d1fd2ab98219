//! Group-by aggregation for custom analyses.
//!
//! Rows are grouped on one column and a single aggregate is computed per
//! group. Groups come back sorted by the group value; rows whose group value
//! is null are left out.

use crate::error::{InsightError, Result, ResultExt};
use crate::sanitize::sanitize;
use crate::types::Record;
use crate::utils::{is_numeric_dtype, records};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Name of the output column produced by [`Aggregation::Count`].
pub const COUNT_COLUMN: &str = "count";

/// Aggregate computed per group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Mean,
    Sum,
    /// Group sizes; needs no aggregation column.
    Count,
    Max,
    Min,
}

impl Aggregation {
    fn needs_numeric(self) -> bool {
        matches!(self, Aggregation::Mean | Aggregation::Sum)
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregation::Mean => "mean",
            Aggregation::Sum => "sum",
            Aggregation::Count => "count",
            Aggregation::Max => "max",
            Aggregation::Min => "min",
        };
        f.write_str(name)
    }
}

impl FromStr for Aggregation {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mean" | "avg" => Ok(Aggregation::Mean),
            "sum" => Ok(Aggregation::Sum),
            "count" => Ok(Aggregation::Count),
            "max" => Ok(Aggregation::Max),
            "min" => Ok(Aggregation::Min),
            other => Err(InsightError::InvalidArgument(format!(
                "unknown aggregation '{}' (expected mean, sum, count, max or min)",
                other
            ))),
        }
    }
}

/// A group-by request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupByQuery {
    pub group_column: String,
    /// Column to aggregate. Ignored for [`Aggregation::Count`].
    #[serde(default)]
    pub agg_column: Option<String>,
    #[serde(default)]
    pub agg: Aggregation,
}

impl GroupByQuery {
    pub fn new(group_column: impl Into<String>) -> Self {
        Self {
            group_column: group_column.into(),
            agg_column: None,
            agg: Aggregation::default(),
        }
    }

    pub fn column(mut self, agg_column: impl Into<String>) -> Self {
        self.agg_column = Some(agg_column.into());
        self
    }

    pub fn agg(mut self, agg: Aggregation) -> Self {
        self.agg = agg;
        self
    }
}

fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| InsightError::ColumnNotFound(name.to_string()))
}

/// One record per group: the group value plus the aggregate.
///
/// The aggregate column keeps the name of the aggregated column, except for
/// counts, which land in a `"count"` column.
pub fn group_by_aggregate(df: &DataFrame, query: &GroupByQuery) -> Result<Vec<Record>> {
    let group = query.group_column.as_str();
    require_column(df, group)?;

    let aggregate = match (query.agg, query.agg_column.as_deref()) {
        (Aggregation::Count, _) => len().cast(DataType::Int64).alias(COUNT_COLUMN),
        (agg, None) => {
            return Err(InsightError::InvalidArgument(format!(
                "aggregation '{}' needs an aggregation column",
                agg
            )));
        }
        (agg, Some(target)) => {
            if target == group {
                return Err(InsightError::InvalidArgument(format!(
                    "cannot aggregate the group column '{}' onto itself",
                    group
                )));
            }
            let dtype = require_column(df, target)?.dtype();
            if agg.needs_numeric() && !is_numeric_dtype(dtype) {
                return Err(InsightError::InvalidArgument(format!(
                    "aggregation '{}' needs a numeric column, '{}' is {}",
                    agg, target, dtype
                )));
            }
            match agg {
                Aggregation::Mean => col(target).mean(),
                Aggregation::Sum => col(target).sum(),
                Aggregation::Max => col(target).max(),
                Aggregation::Min => col(target).min(),
                Aggregation::Count => col(target).count(),
            }
        }
    };

    let grouped = df
        .clone()
        .lazy()
        .filter(col(group).is_not_null())
        .group_by_stable([col(group)])
        .agg([aggregate])
        .sort([group], SortMultipleOptions::default())
        .collect()
        .context(format!("grouping by '{}'", group))?;

    debug!(
        "Grouped {} rows by '{}' into {} groups ({})",
        df.height(),
        group,
        grouped.height(),
        query.agg
    );

    let rows = records(&grouped).context("extracting grouped rows")?;
    Ok(sanitize(rows))
}
