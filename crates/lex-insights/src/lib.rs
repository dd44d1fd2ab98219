//! Tabular Analytics & Reconciliation Library
//!
//! Descriptive analytics and key-based reconciliation for tabular data,
//! built with Rust and Polars.
//!
//! # Overview
//!
//! This library provides:
//!
//! - **Column Classification**: Semantic column types derived once from storage types
//! - **Statistics**: Missing/distinct counts plus numeric, categorical, datetime and boolean summaries
//! - **Distributions**: Equal-width histograms, top values and time ranges
//! - **Outliers**: IQR fences per numeric column
//! - **Correlation**: Pairwise-complete Pearson matrix
//! - **Group-by**: One mean/sum/count/max/min aggregate per group
//! - **Reconciliation**: Full outer join of two datasets on composite keys with field-level differences
//! - **Sanitization**: One pass that makes every result JSON-safe
//!
//! Around the engines sit thin collaborators: a loader for CSV, Parquet and
//! spreadsheet uploads, a bounded session store, and CSV/JSON export with row filters.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_insights::{AnalysisConfig, Analyzer, FormatHint, load_dataset};
//!
//! let workbook = load_dataset(&std::fs::read("sales.csv")?, FormatHint::Csv)?;
//! let df = workbook.active()?;
//!
//! let report = Analyzer::new(AnalysisConfig::default()).analyze(df)?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ```
//!
//! # Reconciliation
//!
//! ```rust,ignore
//! use lex_insights::{NamedDataset, ReconcileMode, ReconcileRequest, Reconciler};
//!
//! let request = ReconcileRequest::new(["invoice_id"])
//!     .compare(["amount", "status"])
//!     .mode(ReconcileMode::Full);
//!
//! let result = Reconciler::default().reconcile(
//!     NamedDataset::new("ledger", &ledger),
//!     NamedDataset::new("bank", &bank),
//!     &request,
//! )?;
//!
//! for diff in &result.differences {
//!     println!("{:?} {}: {} vs {}", diff.key, diff.column, diff.value_in_first, diff.value_in_second);
//! }
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use lex_insights::AnalysisConfig;
//!
//! let config = AnalysisConfig::builder()
//!     .histogram_bins(30)        // Finer histograms
//!     .iqr_multiplier(3.0)       // Only extreme outliers
//!     .preview_limit(50)         // Smaller reconciliation previews
//!     .build()?;
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod profiler;
pub mod reconcile;
pub mod sanitize;
pub mod session;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use analysis::{
    Aggregation, Analyzer, GroupByQuery, compute_correlations, compute_distribution,
    compute_distributions, compute_outliers, detect_patterns, group_by_aggregate, sample_records,
};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, ConfigValidationError, SessionConfig};
pub use error::{InsightError, Result as InsightResult, ResultExt};
pub use export::{ExportFormat, FilterCondition, FilterOperator, export_dataset, filter_dataset};
pub use loader::{FormatHint, Workbook, dataset_info, load_dataset, load_file};
pub use profiler::{DataProfiler, classify};
pub use reconcile::{CompositeKey, NamedDataset, ReconcileRequest, Reconciler, common_columns};
pub use sanitize::{Sanitize, sanitize, to_json_value};
pub use session::{SessionHandle, SessionId, SessionStore, SessionSummary};
pub use types::{
    AnalysisReport, CellValue, ColumnProfile, ColumnType, CommonColumns, CorrelationMatrix,
    CorrelationResult, DatasetInfo, DistributionResult, FieldDifference, HistogramBin, MatchedRow,
    NumericStats, OutlierReport, PatternReport, ReconcileMode, ReconciliationResult,
    ReconciliationSummary, Record, TypeStats, ValueCount,
};
