//! CLI entry point for the tabular analytics engine.

use anyhow::{Context, Result, anyhow};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use lex_insights::{
    Aggregation, AnalysisConfig, Analyzer, ColumnProfile, CorrelationResult, DataProfiler,
    DistributionResult, ExportFormat, FilterCondition, GroupByQuery, NamedDataset, ReconcileMode,
    ReconcileRequest, ReconciliationResult, Reconciler, Record, Sanitize, TypeStats, Workbook,
    compute_correlations, compute_distribution, compute_outliers, export_dataset, filter_dataset,
    group_by_aggregate, load_file, sanitize, to_json_value,
};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Tabular analytics and reconciliation",
    long_about = "Descriptive statistics, distributions, outliers, correlations and \
                  key-based reconciliation for CSV, Parquet and spreadsheet files.\n\n\
                  EXAMPLES:\n  \
                  # Full analysis as JSON\n  \
                  lex-insights --json analyze -i sales.csv\n\n  \
                  # Histogram of one column\n  \
                  lex-insights distribution -i sales.csv --column amount --bins 10\n\n  \
                  # Compare two extracts by order id\n  \
                  lex-insights reconcile --first ledger.csv --second bank.csv --key order_id\n\n  \
                  # Compare two sheets of one workbook\n  \
                  lex-insights reconcile --first books.xlsx --first-sheet Ledger --second-sheet Bank --key order_id"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show warnings and the result)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs; only the sanitized JSON result is written.
    #[arg(long, global = true)]
    json: bool,

    /// Path to a JSON analysis configuration
    ///
    /// Missing fields fall back to their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct InputArgs {
    /// Path to the CSV, Parquet or spreadsheet file
    #[arg(short, long)]
    input: PathBuf,

    /// Sheet to read (spreadsheets only; defaults to the first sheet)
    #[arg(short, long)]
    sheet: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every analysis and print the combined report
    Analyze(InputArgs),

    /// Per-column statistics
    Stats(InputArgs),

    /// Value distribution of one column
    Distribution {
        #[command(flatten)]
        input: InputArgs,

        /// Column to describe
        #[arg(short, long)]
        column: String,

        /// Number of histogram bins (numeric columns only)
        #[arg(short, long)]
        bins: Option<usize>,
    },

    /// IQR outliers per numeric column
    Outliers(InputArgs),

    /// Pearson correlation matrix of numeric columns
    Correlations(InputArgs),

    /// List the sheets of a file with their shapes
    Sheets {
        /// Path to the CSV, Parquet or spreadsheet file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Aggregate one column per group of another
    GroupBy {
        #[command(flatten)]
        input: InputArgs,

        /// Column to group on
        #[arg(short, long = "group")]
        group: String,

        /// Column to aggregate (not needed for count)
        #[arg(short = 'c', long = "column")]
        column: Option<String>,

        /// Aggregate to compute
        #[arg(short, long, value_enum, default_value = "mean")]
        agg: CliAggregation,
    },

    /// Compare two datasets by key columns
    Reconcile {
        /// First dataset
        #[arg(long)]
        first: PathBuf,

        /// Second dataset (defaults to the first file, for cross-sheet comparisons)
        #[arg(long)]
        second: Option<PathBuf>,

        /// Sheet of the first dataset
        #[arg(long)]
        first_sheet: Option<String>,

        /// Sheet of the second dataset
        #[arg(long)]
        second_sheet: Option<String>,

        /// Key column (repeat for composite keys)
        #[arg(short, long = "key", required = true)]
        keys: Vec<String>,

        /// Column to compare (repeat; defaults to all common non-key columns)
        #[arg(short, long = "compare")]
        compare: Vec<String>,

        /// Return every row instead of a capped preview
        #[arg(long)]
        full: bool,
    },

    /// Write a (filtered) copy of a dataset as CSV or JSON
    Export {
        #[command(flatten)]
        input: InputArgs,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: CliExportFormat,

        /// Row filter as COLUMN OPERATOR VALUE (repeat to combine)
        ///
        /// Operators: = != > < >= <= contains
        #[arg(long = "where", num_args = 3, value_names = ["COLUMN", "OPERATOR", "VALUE"])]
        filters: Vec<String>,
    },
}

/// CLI-compatible export format enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliExportFormat {
    Csv,
    Json,
}

impl From<CliExportFormat> for ExportFormat {
    fn from(cli: CliExportFormat) -> Self {
        match cli {
            CliExportFormat::Csv => ExportFormat::Csv,
            CliExportFormat::Json => ExportFormat::Json,
        }
    }
}

/// CLI-compatible aggregation enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliAggregation {
    Mean,
    Sum,
    Count,
    Max,
    Min,
}

impl From<CliAggregation> for Aggregation {
    fn from(cli: CliAggregation) -> Self {
        match cli {
            CliAggregation::Mean => Aggregation::Mean,
            CliAggregation::Sum => Aggregation::Sum,
            CliAggregation::Count => Aggregation::Count,
            CliAggregation::Max => Aggregation::Max,
            CliAggregation::Min => Aggregation::Min,
        }
    }
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read config file {}", path.display()))?;
    let config: AnalysisConfig = serde_json::from_str(&content)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    config.validate()?;
    debug!("Loaded configuration: {:?}", config);
    Ok(config)
}

fn load_workbook(path: &Path) -> Result<Workbook> {
    if !path.exists() {
        return Err(anyhow!("Input file not found: {}", path.display()));
    }

    info!("Loading dataset from: {}", path.display());
    Ok(load_file(path)?)
}

/// The requested sheet (or the active one) plus the name it is reported under.
fn select_sheet(mut workbook: Workbook, sheet: Option<&str>) -> Result<(String, DataFrame)> {
    if let Some(name) = sheet {
        workbook.switch_sheet(name)?;
    }
    let name = workbook.active_name().to_string();
    let df = workbook.active()?.clone();
    info!("Using sheet '{}': {:?}", name, df.shape());
    Ok((name, df))
}

fn load_frame(input: &InputArgs) -> Result<DataFrame> {
    let workbook = load_workbook(&input.input)?;
    let (_, df) = select_sheet(workbook, input.sheet.as_deref())?;
    Ok(df)
}

fn print_json<T: Sanitize + Serialize>(value: T) -> Result<()> {
    let json = to_json_value(value)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.quiet, cli.json);

    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Command::Analyze(input) => {
            let df = load_frame(input)?;
            let report = Analyzer::new(config).analyze(&df)?;
            if cli.json {
                return print_json(report);
            }
            let report = sanitize(report);
            print_overview(&input.input, &df);
            print_column_table(report.column_stats.values());
            print_correlations(&report.correlations);
            println!(
                "\nDuplicate rows: {}  |  Constant columns: {}",
                report.patterns.data_quality.duplicate_rows,
                report.patterns.data_quality.columns_with_single_value.join(", ")
            );
        }

        Command::Stats(input) => {
            let df = load_frame(input)?;
            let stats = DataProfiler::compute_stats(&df, &config)?;
            if cli.json {
                return print_json(stats);
            }
            let stats = sanitize(stats);
            print_column_table(stats.values());
        }

        Command::Distribution {
            input,
            column,
            bins,
        } => {
            let df = load_frame(input)?;
            let bins = bins.unwrap_or(config.histogram_bins);
            let distribution = compute_distribution(&df, column, bins, &config)?;
            if cli.json {
                return print_json(distribution);
            }
            print_distribution(column, &sanitize(distribution));
        }

        Command::Outliers(input) => {
            let df = load_frame(input)?;
            let outliers = compute_outliers(&df, &config)?;
            if cli.json {
                return print_json(outliers);
            }
            let outliers = sanitize(outliers);
            if outliers.is_empty() {
                println!("No outliers found.");
            }
            for (name, report) in &outliers {
                println!(
                    "{:<20} {:>6} outliers ({:.1}%) outside [{:.2}, {:.2}]",
                    truncate_str(name, 19),
                    report.count,
                    report.percentage,
                    report.lower_bound,
                    report.upper_bound
                );
            }
        }

        Command::Correlations(input) => {
            let df = load_frame(input)?;
            let correlations = compute_correlations(&df)?;
            if cli.json {
                return print_json(correlations);
            }
            print_correlations(&sanitize(correlations));
        }

        Command::Sheets { input } => {
            let workbook = load_workbook(input)?;
            let sheets = workbook
                .sheet_names()
                .into_iter()
                .map(|name| {
                    let df = workbook.sheet(&name)?;
                    Ok(SheetSummary {
                        rows: df.height(),
                        columns: df.width(),
                        active: name == workbook.active_name(),
                        name,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&sheets)?);
                return Ok(());
            }
            for sheet in &sheets {
                println!(
                    "{} {:<30} {:>8} rows x {} columns",
                    if sheet.active { "*" } else { " " },
                    truncate_str(&sheet.name, 29),
                    sheet.rows,
                    sheet.columns
                );
            }
        }

        Command::GroupBy {
            input,
            group,
            column,
            agg,
        } => {
            let df = load_frame(input)?;
            let mut query = GroupByQuery::new(group.clone()).agg((*agg).into());
            if let Some(column) = column {
                query = query.column(column.clone());
            }
            let rows = group_by_aggregate(&df, &query)?;
            if cli.json {
                return print_json(rows);
            }
            print_records(&rows);
        }

        Command::Reconcile {
            first,
            second,
            first_sheet,
            second_sheet,
            keys,
            compare,
            full,
        } => {
            let first_book = load_workbook(first)?;
            let second_book = match second {
                Some(path) if path != first => load_workbook(path)?,
                _ => first_book.clone(),
            };
            let (first_name, first_df) = select_sheet(first_book, first_sheet.as_deref())?;
            let (second_name, second_df) = select_sheet(second_book, second_sheet.as_deref())?;
            if second.is_none() && first_name == second_name {
                return Err(anyhow!(
                    "Nothing to compare: pass --second or pick two sheets with --first-sheet/--second-sheet"
                ));
            }

            let mut request = ReconcileRequest::new(keys.iter().cloned()).mode(if *full {
                ReconcileMode::Full
            } else {
                ReconcileMode::Preview
            });
            if !compare.is_empty() {
                request = request.compare(compare.iter().cloned());
            }

            let result = Reconciler::new(config).reconcile(
                NamedDataset::new(&first_name, &first_df),
                NamedDataset::new(&second_name, &second_df),
                &request,
            )?;
            if cli.json {
                return print_json(result);
            }
            print_reconciliation(&sanitize(result));
        }

        Command::Export {
            input,
            output,
            format,
            filters,
        } => {
            let df = load_frame(input)?;
            let conditions = parse_filters(filters)?;
            let filtered = filter_dataset(&df, &conditions)?;
            let bytes = export_dataset(&filtered, (*format).into())?;
            std::fs::write(output, bytes)
                .with_context(|| format!("Could not write {}", output.display()))?;
            info!(
                "Exported {} of {} rows to {}",
                filtered.height(),
                df.height(),
                output.display()
            );
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct SheetSummary {
    name: String,
    rows: usize,
    columns: usize,
    active: bool,
}

fn parse_filters(raw: &[String]) -> Result<Vec<FilterCondition>> {
    raw.chunks(3)
        .map(|chunk| match chunk {
            [column, operator, value] => Ok(FilterCondition::new(
                column.clone(),
                operator.parse()?,
                value.clone(),
            )),
            _ => Err(anyhow!("--where expects COLUMN OPERATOR VALUE")),
        })
        .collect()
}

// ============================================================================
// Human-readable output
// ============================================================================
//
// These functions use `println!` intentionally: they are the primary output
// of the command, independent of the log level.

fn print_overview(path: &Path, df: &DataFrame) {
    println!("\n{}", "=".repeat(80));
    println!("DATASET OVERVIEW");
    println!("{}", "=".repeat(80));
    println!("  File: {}", path.display());
    println!("  Rows: {}", df.height());
    println!("  Columns: {}", df.width());
    println!();
}

fn print_column_table<'a>(profiles: impl Iterator<Item = &'a ColumnProfile>) {
    println!(
        "{:<20} {:<12} {:<10} {:<10} {:<24}",
        "Column", "Type", "Missing %", "Unique", "Summary"
    );
    println!("{}", "-".repeat(80));

    for profile in profiles {
        let summary = match &profile.stats {
            Some(TypeStats::Numeric(stats)) => format!(
                "mean {} / median {}",
                format_opt(stats.mean),
                format_opt(stats.median)
            ),
            Some(TypeStats::Categorical { top_values }) => top_values
                .first()
                .map(|v| format!("top '{}' ({})", v.value, v.count))
                .unwrap_or_default(),
            Some(TypeStats::Datetime { min, max }) => format!(
                "{} .. {}",
                min.as_deref().unwrap_or("-"),
                max.as_deref().unwrap_or("-")
            ),
            Some(TypeStats::Boolean {
                true_count,
                false_count,
            }) => format!("true {} / false {}", true_count, false_count),
            None => String::new(),
        };

        println!(
            "{:<20} {:<12} {:<10.1} {:<10} {:<24}",
            truncate_str(&profile.name, 19),
            profile.column_type,
            profile.null_percentage,
            profile.unique_count,
            summary
        );
    }
}

fn print_distribution(column: &str, distribution: &DistributionResult) {
    println!("Distribution of '{}'", column);
    match distribution {
        DistributionResult::Numeric { histogram, .. } if histogram.is_empty() => {
            println!("  (single distinct value)");
        }
        DistributionResult::Numeric { histogram, .. } => {
            let max = histogram.iter().map(|b| b.count).max().unwrap_or(1).max(1);
            for bin in histogram {
                let bar = "#".repeat(bin.count * 40 / max);
                println!("  {:<24} {:>8} {}", bin.range, bin.count, bar);
            }
        }
        DistributionResult::Categorical { values } | DistributionResult::Boolean { values } => {
            for v in values {
                println!("  {:<24} {:>8}", truncate_str(&v.value, 23), v.count);
            }
        }
        DistributionResult::Datetime { min, max, count } => {
            println!(
                "  {} values from {} to {}",
                count,
                min.as_deref().unwrap_or("-"),
                max.as_deref().unwrap_or("-")
            );
        }
        DistributionResult::Empty { message } | DistributionResult::Unsupported { message } => {
            println!("  {}", message);
        }
    }
}

fn print_correlations(correlations: &CorrelationResult) {
    match correlations {
        CorrelationResult::Insufficient { message } => println!("\n{}", message),
        CorrelationResult::Matrix(matrix) => {
            println!("\nCORRELATIONS");
            print!("{:<14}", "");
            for name in &matrix.columns {
                print!(" {:>10}", truncate_str(name, 10));
            }
            println!();
            for (name, row) in matrix.columns.iter().zip(&matrix.values) {
                print!("{:<14}", truncate_str(name, 13));
                for value in row {
                    print!(" {:>10.3}", value);
                }
                println!();
            }
        }
    }
}

fn print_reconciliation(result: &ReconciliationResult) {
    let summary = &result.summary;
    println!("\n{}", "=".repeat(80));
    println!(
        "RECONCILIATION: {} vs {} on [{}]",
        summary.first_dataset,
        summary.second_dataset,
        result.key_columns.join(", ")
    );
    println!("{}", "=".repeat(80));
    println!("  Distinct keys:       {}", summary.total_keys);
    println!("  Matching:            {}", summary.matching);
    println!("  Only in {:<12} {}", format!("{}:", summary.first_dataset), summary.only_in_first);
    println!("  Only in {:<12} {}", format!("{}:", summary.second_dataset), summary.only_in_second);
    println!("  Rows with diffs:     {}", summary.rows_with_differences);
    println!("  Field differences:   {}", summary.differences);
    if summary.duplicate_keys_in_first + summary.duplicate_keys_in_second > 0 {
        println!(
            "  Duplicate keys:      {} / {}",
            summary.duplicate_keys_in_first, summary.duplicate_keys_in_second
        );
    }

    if !result.differences.is_empty() {
        println!("\n{:<24} {:<16} {:<18} {:<18}", "Key", "Column", "First", "Second");
        println!("{}", "-".repeat(80));
        for diff in &result.differences {
            let key = diff
                .key
                .values()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "{:<24} {:<16} {:<18} {:<18}",
                truncate_str(&key, 23),
                truncate_str(&diff.column, 15),
                truncate_str(&diff.value_in_first.to_string(), 17),
                truncate_str(&diff.value_in_second.to_string(), 17)
            );
        }
    }

    if result.truncated {
        println!("\n(preview truncated; use --full for every row)");
    }
}

fn print_records(rows: &[Record]) {
    let Some(first) = rows.first() else {
        println!("No groups.");
        return;
    };
    for name in first.keys() {
        print!("{:<20}", truncate_str(name, 19));
    }
    println!();
    println!("{}", "-".repeat(20 * first.len()));
    for row in rows {
        for value in row.values() {
            print!("{:<20}", truncate_str(&value.to_string(), 19));
        }
        println!();
    }
}

fn format_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

/// Truncate a string to `max` characters, marking the cut with an ellipsis.
fn truncate_str(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
