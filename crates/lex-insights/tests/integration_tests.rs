//! Integration tests for the analytics and reconciliation engines.
//!
//! These tests load the CSV fixtures through the public loader and check
//! end-to-end behavior of each engine.

use lex_insights::{
    Aggregation, AnalysisConfig, Analyzer, CellValue, ColumnType, CorrelationResult,
    DataProfiler, DistributionResult, ExportFormat, FilterCondition, FilterOperator,
    GroupByQuery, NamedDataset, ReconcileMode, ReconcileRequest, Reconciler, Sanitize, TypeStats,
    compute_correlations, compute_distribution, compute_outliers, export_dataset, filter_dataset,
    group_by_aggregate, load_file, to_json_value,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_fixture(filename: &str) -> DataFrame {
    load_file(&fixtures_path().join(filename))
        .expect("Failed to load fixture")
        .active()
        .expect("Fixture has no active sheet")
        .clone()
}

fn reconcile_fixtures(request: &ReconcileRequest) -> lex_insights::ReconciliationResult {
    let ledger = load_fixture("ledger.csv");
    let bank = load_fixture("bank.csv");
    Reconciler::default()
        .reconcile(
            NamedDataset::new("ledger", &ledger),
            NamedDataset::new("bank", &bank),
            request,
        )
        .expect("Reconciliation failed")
}

fn key_of(record: &lex_insights::Record) -> String {
    record["invoice_id"].to_string()
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_fixture_names_sheet_after_file() {
    let workbook = load_file(&fixtures_path().join("sales.csv")).unwrap();
    assert_eq!(workbook.active_name(), "sales");
    assert_eq!(workbook.active().unwrap().shape(), (8, 6));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = load_file(&fixtures_path().join("does_not_exist.csv")).unwrap_err();
    assert_eq!(err.error_code(), "IO_ERROR");
}

#[test]
fn test_load_workbook_keeps_every_sheet() {
    let mut workbook = load_file(&fixtures_path().join("reconcile.xlsx")).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["Ledger", "Bank"]);
    assert_eq!(workbook.active_name(), "Ledger");

    let ledger = workbook.active().unwrap();
    assert_eq!(ledger.shape(), (4, 4));
    assert_eq!(ledger.column("amount").unwrap().dtype(), &DataType::Float64);
    assert_eq!(ledger.column("invoice_id").unwrap().dtype(), &DataType::String);

    workbook.switch_sheet("Bank").unwrap();
    assert_eq!(workbook.active_name(), "Bank");
    assert_eq!(workbook.active().unwrap().height(), 4);

    let err = workbook.switch_sheet("Payroll").unwrap_err();
    assert_eq!(err.error_code(), "SHEET_NOT_FOUND");
}

#[test]
fn test_reconcile_sheets_of_one_workbook() {
    let workbook = load_file(&fixtures_path().join("reconcile.xlsx")).unwrap();
    let result = Reconciler::default()
        .reconcile(
            NamedDataset::new("Ledger", workbook.sheet("Ledger").unwrap()),
            NamedDataset::new("Bank", workbook.sheet("Bank").unwrap()),
            &ReconcileRequest::new(["invoice_id"]),
        )
        .unwrap();

    let from_csv = reconcile_fixtures(&ReconcileRequest::new(["invoice_id"]));
    assert_eq!(result.summary.first_dataset, "Ledger");
    assert_eq!(result.summary.second_dataset, "Bank");
    assert_eq!(result.summary.total_keys, from_csv.summary.total_keys);
    assert_eq!(result.summary.matching, from_csv.summary.matching);
    assert_eq!(result.summary.differences, from_csv.summary.differences);
    assert_eq!(key_of(&result.only_in_first[0]), "A4");
    assert_eq!(result.differences[0].value_in_second, CellValue::Float(240.0));
}

// ============================================================================
// Statistics
// ============================================================================

#[test]
fn test_stats_with_missing_values() {
    let df = load_fixture("profile_nulls.csv");
    let stats = DataProfiler::compute_stats(&df, &AnalysisConfig::default()).unwrap();

    let val = &stats["val"];
    assert_eq!(val.null_count, 1);
    assert!((val.null_percentage - 100.0 / 3.0).abs() < 1e-9);
    assert_eq!(val.unique_count, 2);

    let Some(TypeStats::Numeric(numeric)) = &val.stats else {
        panic!("expected numeric stats, got {:?}", val.stats);
    };
    assert_eq!(numeric.mean, Some(15.0));
    assert_eq!(numeric.min, Some(10.0));
    assert_eq!(numeric.max, Some(20.0));
    assert_eq!(numeric.median, Some(15.0));
}

#[test]
fn test_stats_cover_every_column_type() {
    let df = load_fixture("sales.csv");
    let stats = DataProfiler::compute_stats(&df, &AnalysisConfig::default()).unwrap();

    let names: Vec<&str> = stats.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec!["order_id", "region", "amount", "quantity", "shipped", "order_date"]
    );

    assert_eq!(stats["region"].column_type, ColumnType::Categorical);
    assert_eq!(stats["shipped"].column_type, ColumnType::Boolean);
    assert_eq!(stats["order_date"].column_type, ColumnType::Datetime);

    match &stats["shipped"].stats {
        Some(TypeStats::Boolean {
            true_count,
            false_count,
        }) => {
            assert_eq!(*true_count, 5);
            assert_eq!(*false_count, 3);
        }
        other => panic!("expected boolean stats, got {:?}", other),
    }

    match &stats["region"].stats {
        Some(TypeStats::Categorical { top_values }) => {
            assert_eq!(top_values[0].value, "North");
            assert_eq!(top_values[0].count, 3);
        }
        other => panic!("expected categorical stats, got {:?}", other),
    }

    match &stats["order_date"].stats {
        Some(TypeStats::Datetime { min, max }) => {
            assert_eq!(min.as_deref(), Some("2024-01-05"));
            assert_eq!(max.as_deref(), Some("2024-03-10"));
        }
        other => panic!("expected datetime stats, got {:?}", other),
    }
}

#[test]
fn test_percentages_stay_in_bounds() {
    let df = load_fixture("sales.csv");
    let stats = DataProfiler::compute_stats(&df, &AnalysisConfig::default()).unwrap();

    for profile in stats.values() {
        assert!((0.0..=100.0).contains(&profile.null_percentage));
        assert!((0.0..=100.0).contains(&profile.unique_percentage));
        assert!(profile.null_count <= df.height());
    }
}

// ============================================================================
// Distributions
// ============================================================================

#[test]
fn test_histogram_counts_every_value() {
    let df = load_fixture("sales.csv");
    let distribution = compute_distribution(&df, "amount", 4, &AnalysisConfig::default()).unwrap();

    let DistributionResult::Numeric { histogram, min, max, .. } = distribution else {
        panic!("expected numeric distribution");
    };
    assert_eq!(histogram.len(), 4);
    assert_eq!(histogram.iter().map(|b| b.count).sum::<usize>(), 7);
    assert_eq!(min, Some(55.75));
    assert_eq!(max, Some(410.0));
    assert_eq!(histogram[0].lower, 55.75);
    assert_eq!(histogram[3].upper, 410.0);
}

#[test]
fn test_categorical_distribution_counts() {
    let df = load_fixture("sales.csv");
    let distribution = compute_distribution(&df, "region", 20, &AnalysisConfig::default()).unwrap();

    let DistributionResult::Categorical { values } = distribution else {
        panic!("expected categorical distribution");
    };
    assert_eq!(values.iter().map(|v| v.count).sum::<usize>(), 8);
    assert_eq!(values[0].value, "North");
}

#[test]
fn test_distribution_unknown_column() {
    let df = load_fixture("sales.csv");
    let err = compute_distribution(&df, "missing", 10, &AnalysisConfig::default()).unwrap_err();
    assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
}

// ============================================================================
// Outliers and Correlations
// ============================================================================

#[test]
fn test_iqr_outliers() {
    let df = load_fixture("values_with_outlier.csv");
    let outliers = compute_outliers(&df, &AnalysisConfig::default()).unwrap();

    let report = &outliers["value"];
    assert_eq!(report.q1, 2.0);
    assert_eq!(report.q3, 4.0);
    assert_eq!(report.lower_bound, -1.0);
    assert_eq!(report.upper_bound, 7.0);
    assert_eq!(report.count, 1);
    assert_eq!(report.values, vec![100.0]);
    assert!((report.percentage - 20.0).abs() < 1e-9);

    // Evenly spaced ids have no outliers
    assert!(!outliers.contains_key("id"));
}

#[test]
fn test_correlation_matrix_is_symmetric() {
    let df = load_fixture("sales.csv");
    let CorrelationResult::Matrix(matrix) = compute_correlations(&df).unwrap() else {
        panic!("expected a correlation matrix");
    };

    assert_eq!(matrix.columns, vec!["order_id", "amount", "quantity"]);
    for i in 0..matrix.columns.len() {
        assert_eq!(matrix.values[i][i], 1.0);
        for j in 0..matrix.columns.len() {
            assert_eq!(matrix.values[i][j], matrix.values[j][i]);
            assert!((-1.0..=1.0).contains(&matrix.values[i][j]));
        }
    }

    // Amount grows with quantity in this fixture
    assert!(matrix.coefficient("amount", "quantity").unwrap() > 0.9);
}

#[test]
fn test_correlation_needs_two_numeric_columns() {
    let df = load_fixture("profile_nulls.csv").select(["val"]).unwrap();
    let result = compute_correlations(&df).unwrap();
    assert!(result.matrix().is_none());
}

// ============================================================================
// Full Analysis
// ============================================================================

#[test]
fn test_full_analysis_report() {
    let df = load_fixture("sales.csv");
    let config = AnalysisConfig::builder().sample_rows(3).build().unwrap();
    let report = Analyzer::new(config).analyze(&df).unwrap();

    assert_eq!(report.info.rows, 8);
    assert_eq!(report.info.columns, 6);
    assert_eq!(report.sample.len(), 3);
    assert_eq!(report.column_stats.len(), 6);
    assert_eq!(report.patterns.data_quality.duplicate_rows, 0);
    assert_eq!(report.patterns.missing_data["amount"].count, 1);
    assert!(report.correlations.matrix().is_some());
    assert!(report.distributions.contains_key("region"));
}

#[test]
fn test_analysis_report_serializes_cleanly() {
    let df = load_fixture("sales.csv");
    let report = Analyzer::default().analyze(&df).unwrap();

    let json = to_json_value(report.clone()).unwrap();
    let text = serde_json::to_string(&json).unwrap();
    assert!(!text.contains("NaN"));

    // Sanitizing twice changes nothing
    assert_eq!(
        serde_json::to_value(report.clone().sanitize()).unwrap(),
        serde_json::to_value(report.sanitize().sanitize()).unwrap()
    );
}

// ============================================================================
// Group-by
// ============================================================================

fn grouped(query: &GroupByQuery, value: &str) -> Vec<(String, CellValue)> {
    let df = load_fixture("sales.csv");
    group_by_aggregate(&df, query)
        .unwrap()
        .iter()
        .map(|row| (row["region"].to_string(), row[value].clone()))
        .collect()
}

#[test]
fn test_group_mean_skips_missing_amounts() {
    let rows = grouped(&GroupByQuery::new("region").column("amount"), "amount");
    assert_eq!(
        rows,
        vec![
            ("East".to_string(), CellValue::Float(143.0)),
            ("North".to_string(), CellValue::Float(120.5)),
            ("South".to_string(), CellValue::Float(87.5)),
            ("West".to_string(), CellValue::Float(410.0)),
        ]
    );
}

#[test]
fn test_group_count_and_sum() {
    let counts = grouped(&GroupByQuery::new("region").agg(Aggregation::Count), "count");
    let total: i64 = counts
        .iter()
        .map(|(_, v)| match v {
            CellValue::Int(n) => *n,
            other => panic!("expected an integer count, got {:?}", other),
        })
        .sum();
    assert_eq!(total, 8);
    assert_eq!(counts[1], ("North".to_string(), CellValue::Int(3)));

    let sums = grouped(
        &GroupByQuery::new("region")
            .column("quantity")
            .agg(Aggregation::Sum),
        "quantity",
    );
    assert_eq!(sums[0], ("East".to_string(), CellValue::Int(6)));
    assert_eq!(sums[3], ("West".to_string(), CellValue::Int(8)));
}

// ============================================================================
// Reconciliation
// ============================================================================

#[test]
fn test_reconcile_ledger_against_bank() {
    let result = reconcile_fixtures(&ReconcileRequest::new(["invoice_id"]));

    assert_eq!(result.comparison_columns, vec!["customer", "amount", "status"]);
    assert_eq!(result.summary.total_keys, 5);
    assert_eq!(result.summary.matching, 3);
    assert_eq!(result.summary.only_in_first, 1);
    assert_eq!(result.summary.only_in_second, 1);
    assert_eq!(result.summary.rows_with_differences, 2);
    assert_eq!(result.summary.differences, 2);

    assert_eq!(key_of(&result.only_in_first[0]), "A4");
    assert_eq!(key_of(&result.only_in_second[0]), "A5");

    let diffs: Vec<(String, String)> = result
        .differences
        .iter()
        .map(|d| (key_of(&d.key), d.column.clone()))
        .collect();
    assert_eq!(
        diffs,
        vec![
            ("A2".to_string(), "amount".to_string()),
            ("A3".to_string(), "status".to_string()),
        ]
    );

    let amount = &result.differences[0];
    assert_eq!(amount.value_in_first, CellValue::Float(250.0));
    assert_eq!(amount.value_in_second, CellValue::Float(240.0));
}

/// Distinct key tuples across `frames`, counted by polars rather than the
/// reconciler.
fn distinct_keys(frames: &[&DataFrame], keys: &[&str]) -> usize {
    let mut stacked = frames[0].select(keys.iter().copied()).unwrap();
    for frame in &frames[1..] {
        stacked
            .vstack_mut(&frame.select(keys.iter().copied()).unwrap())
            .unwrap();
    }
    stacked
        .unique::<&str, &str>(None, UniqueKeepStrategy::First, None)
        .unwrap()
        .height()
}

#[test]
fn test_reconcile_partitions_every_key() {
    let north = load_fixture("stock_north.csv");
    let south = load_fixture("stock_south.csv");
    let keys = ["warehouse", "sku"];

    let result = Reconciler::default()
        .reconcile(
            NamedDataset::new("north", &north),
            NamedDataset::new("south", &south),
            &ReconcileRequest::new(keys).mode(ReconcileMode::Full),
        )
        .unwrap();
    let summary = &result.summary;

    let distinct_north = distinct_keys(&[&north], &keys);
    let distinct_south = distinct_keys(&[&south], &keys);
    let distinct_all = distinct_keys(&[&north, &south], &keys);
    assert_eq!((distinct_north, distinct_south, distinct_all), (4, 4, 5));

    assert_eq!(summary.total_keys, distinct_all);
    assert_eq!(summary.matching + summary.only_in_first, distinct_north);
    assert_eq!(summary.matching + summary.only_in_second, distinct_south);
    assert_eq!(summary.duplicate_keys_in_first, north.height() - distinct_north);
    assert_eq!(summary.duplicate_keys_in_second, south.height() - distinct_south);

    assert_eq!(result.matching.len(), summary.matching);
    assert_eq!(result.only_in_first.len(), summary.only_in_first);
    assert_eq!(result.only_in_second.len(), summary.only_in_second);
    assert_eq!(result.only_in_first[0]["warehouse"].to_string(), "W2");
    assert_eq!(result.only_in_first[0]["sku"].to_string(), "S1");
    assert_eq!(result.only_in_second[0]["warehouse"].to_string(), "W3");
    assert!(!result.truncated);
}

#[test]
fn test_reconcile_mirror_with_duplicate_keys() {
    let north = load_fixture("stock_north.csv");
    let south = load_fixture("stock_south.csv");
    let request = ReconcileRequest::new(["warehouse", "sku"]).mode(ReconcileMode::Full);
    let reconciler = Reconciler::default();

    let forward = reconciler
        .reconcile(
            NamedDataset::new("north", &north),
            NamedDataset::new("south", &south),
            &request,
        )
        .unwrap();
    let backward = reconciler
        .reconcile(
            NamedDataset::new("south", &south),
            NamedDataset::new("north", &north),
            &request,
        )
        .unwrap();

    assert_eq!(forward.only_in_first, backward.only_in_second);
    assert_eq!(forward.only_in_second, backward.only_in_first);
    assert_eq!(
        forward.summary.duplicate_keys_in_first,
        backward.summary.duplicate_keys_in_second
    );
    assert_eq!(
        forward.summary.duplicate_keys_in_second,
        backward.summary.duplicate_keys_in_first
    );

    let mut forward_keys: Vec<String> = forward
        .matching
        .iter()
        .map(|m| format!("{}/{}", m.key["warehouse"], m.key["sku"]))
        .collect();
    let mut backward_keys: Vec<String> = backward
        .matching
        .iter()
        .map(|m| format!("{}/{}", m.key["warehouse"], m.key["sku"]))
        .collect();
    forward_keys.sort();
    backward_keys.sort();
    assert_eq!(forward_keys, backward_keys);

    // Only (W1, S2) differs once first occurrences are compared
    assert_eq!(forward.differences.len(), 1);
    assert_eq!(forward.differences[0].column, "qty");
    assert_eq!(forward.differences[0].value_in_first, CellValue::Int(5));
    assert_eq!(backward.differences[0].value_in_first, CellValue::Int(6));
    assert_eq!(
        forward.differences[0].value_in_first,
        backward.differences[0].value_in_second
    );
}

#[test]
fn test_reconcile_mirror_swaps_sides() {
    let ledger = load_fixture("ledger.csv");
    let bank = load_fixture("bank.csv");
    let request = ReconcileRequest::new(["invoice_id"]);
    let reconciler = Reconciler::default();

    let forward = reconciler
        .reconcile(
            NamedDataset::new("ledger", &ledger),
            NamedDataset::new("bank", &bank),
            &request,
        )
        .unwrap();
    let backward = reconciler
        .reconcile(
            NamedDataset::new("bank", &bank),
            NamedDataset::new("ledger", &ledger),
            &request,
        )
        .unwrap();

    assert_eq!(forward.summary.only_in_first, backward.summary.only_in_second);
    assert_eq!(forward.summary.only_in_second, backward.summary.only_in_first);
    assert_eq!(forward.summary.differences, backward.summary.differences);
    for (a, b) in forward.differences.iter().zip(&backward.differences) {
        assert_eq!(a.value_in_first, b.value_in_second);
        assert_eq!(a.value_in_second, b.value_in_first);
    }
}

#[test]
fn test_reconcile_explicit_comparison_columns() {
    let result = reconcile_fixtures(&ReconcileRequest::new(["invoice_id"]).compare(["status"]));
    assert_eq!(result.summary.differences, 1);
    assert_eq!(result.differences[0].column, "status");
}

#[test]
fn test_reconcile_missing_key_column() {
    let ledger = load_fixture("ledger.csv");
    let sales = load_fixture("sales.csv");
    let err = Reconciler::default()
        .reconcile(
            NamedDataset::new("ledger", &ledger),
            NamedDataset::new("sales", &sales),
            &ReconcileRequest::new(["invoice_id"]),
        )
        .unwrap_err();

    assert_eq!(err.error_code(), "KEY_COLUMN_MISSING");
    assert!(err.to_string().contains("sales"));
}

// ============================================================================
// Filtering and Export
// ============================================================================

#[test]
fn test_filter_then_export_csv() {
    let df = load_fixture("sales.csv");
    let filtered = filter_dataset(
        &df,
        &[
            FilterCondition::new("region", FilterOperator::Eq, "North"),
            FilterCondition::new("quantity", FilterOperator::GtEq, "3"),
        ],
    )
    .unwrap();
    assert_eq!(filtered.height(), 2);

    let csv = String::from_utf8(export_dataset(&filtered, ExportFormat::Csv).unwrap()).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("order_id,region,amount,quantity,shipped,order_date")
    );
    assert_eq!(lines.count(), 2);
}

#[test]
fn test_export_json_rows() {
    let df = load_fixture("profile_nulls.csv");
    let bytes = export_dataset(&df, ExportFormat::Json).unwrap();
    let rows: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(rows.as_array().map(Vec::len), Some(3));
    assert_eq!(rows[0]["val"], 10);
    assert!(rows[2]["val"].is_null());
}
