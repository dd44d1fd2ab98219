//! Pearson correlation matrix over numeric columns.

use crate::error::Result;
use crate::profiler::columns_of_type;
use crate::types::{ColumnType, CorrelationMatrix, CorrelationResult};
use crate::utils::optional_finite_values;
use polars::prelude::*;
use tracing::debug;

/// Pairwise Pearson correlations between all numeric columns.
///
/// Each pair uses only the rows where both values are present and finite.
/// Pairs without a defined coefficient (fewer than two complete rows, or a
/// constant side) are reported as `0.0`. The diagonal is always `1.0`.
pub fn compute_correlations(df: &DataFrame) -> Result<CorrelationResult> {
    let numeric_cols = columns_of_type(df, ColumnType::Numeric);

    if numeric_cols.len() < 2 {
        return Ok(CorrelationResult::Insufficient {
            message: "Need at least 2 numeric columns for correlation".to_string(),
        });
    }

    let columns: Vec<Vec<Option<f64>>> = numeric_cols
        .iter()
        .map(|name| -> Result<Vec<Option<f64>>> {
            Ok(optional_finite_values(df.column(name)?.as_materialized_series())?)
        })
        .collect::<Result<_>>()?;

    let n = columns.len();
    let mut values = vec![vec![0.0; n]; n];
    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let r = pearson_pairwise(&columns[i], &columns[j]).unwrap_or(0.0);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    debug!("Computed {}x{} correlation matrix", n, n);

    Ok(CorrelationResult::Matrix(CorrelationMatrix {
        columns: numeric_cols,
        values,
    }))
}

/// Pearson correlation over pairwise-complete observations using Welford's
/// single-pass update.
fn pearson_pairwise(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let mut n = 0.0;
    let mut mean_x = 0.0;
    let mut mean_y = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    let mut cov_xy = 0.0;

    for (x, y) in xs.iter().zip(ys.iter()) {
        if let (Some(x), Some(y)) = (x, y) {
            n += 1.0;
            let dx = x - mean_x;
            let dy = y - mean_y;
            mean_x += dx / n;
            mean_y += dy / n;
            var_x += dx * (x - mean_x);
            var_y += dy * (y - mean_y);
            cov_xy += dx * (y - mean_y);
        }
    }

    if n < 2.0 || var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }

    let r = cov_xy / (var_x.sqrt() * var_y.sqrt());
    if r.is_finite() {
        Some(r.clamp(-1.0, 1.0))
    } else {
        None
    }
}
