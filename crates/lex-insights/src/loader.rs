//! Dataset ingestion.
//!
//! Turns uploaded bytes into a [`Workbook`]: an ordered set of named sheets
//! with one active sheet. CSV and Parquet are read with polars and hold a
//! single sheet; spreadsheets (xlsx, xls, xlsb, ods) are read with calamine,
//! one sheet per worksheet. PDF uploads are rejected with
//! [`InsightError::UnsupportedFormat`].

use crate::error::{InsightError, Result, ResultExt};
use crate::profiler::classify_columns;
use crate::types::DatasetInfo;
use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use polars::prelude::*;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

/// Sheet name used when the source has no name of its own.
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Input format of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatHint {
    Csv,
    Parquet,
    Excel,
    Pdf,
}

impl FormatHint {
    /// Infer the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" | "txt" | "tsv" => Ok(FormatHint::Csv),
            "parquet" | "pq" => Ok(FormatHint::Parquet),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Ok(FormatHint::Excel),
            "pdf" => Ok(FormatHint::Pdf),
            "" => Err(InsightError::UnsupportedFormat(format!(
                "file '{}' has no extension",
                path.display()
            ))),
            other => Err(InsightError::UnsupportedFormat(format!(".{}", other))),
        }
    }
}

/// Named sheets loaded from one upload, plus the sheet currently in view.
#[derive(Debug, Clone)]
pub struct Workbook {
    sheets: IndexMap<String, DataFrame>,
    active: String,
}

impl Workbook {
    /// A workbook holding a single sheet, which becomes active.
    pub fn single(name: impl Into<String>, df: DataFrame) -> Self {
        let name = name.into();
        let mut sheets = IndexMap::new();
        sheets.insert(name.clone(), df);
        Self {
            sheets,
            active: name,
        }
    }

    /// Name of the active sheet.
    pub fn active_name(&self) -> &str {
        &self.active
    }

    /// The active sheet.
    pub fn active(&self) -> Result<&DataFrame> {
        self.sheet(&self.active)
    }

    pub fn sheet(&self, name: &str) -> Result<&DataFrame> {
        self.sheets
            .get(name)
            .ok_or_else(|| InsightError::SheetNotFound(name.to_string()))
    }

    /// Sheet names in load order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.keys().cloned().collect()
    }

    /// Make `name` the active sheet.
    pub fn switch_sheet(&mut self, name: &str) -> Result<()> {
        if !self.sheets.contains_key(name) {
            return Err(InsightError::SheetNotFound(name.to_string()));
        }
        debug!("Switching active sheet to '{}'", name);
        self.active = name.to_string();
        Ok(())
    }

    /// Add or replace a sheet. The active sheet is unchanged.
    pub fn insert_sheet(&mut self, name: impl Into<String>, df: DataFrame) {
        self.sheets.insert(name.into(), df);
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

/// Load raw bytes into a single-sheet workbook named [`DEFAULT_SHEET_NAME`].
pub fn load_dataset(bytes: &[u8], hint: FormatHint) -> Result<Workbook> {
    load_named(bytes, hint, DEFAULT_SHEET_NAME)
}

/// Load raw bytes into a workbook.
///
/// CSV and Parquet produce one sheet called `sheet_name`; spreadsheets keep
/// their own sheet names and the first worksheet becomes active.
pub fn load_named(bytes: &[u8], hint: FormatHint, sheet_name: &str) -> Result<Workbook> {
    let workbook = match hint {
        FormatHint::Csv => Workbook::single(sheet_name, read_csv(bytes).context("reading CSV data")?),
        FormatHint::Parquet => Workbook::single(
            sheet_name,
            read_parquet(bytes).context("reading Parquet data")?,
        ),
        FormatHint::Excel => read_spreadsheet(bytes)?,
        FormatHint::Pdf => {
            return Err(InsightError::UnsupportedFormat(
                "PDF table extraction".to_string(),
            ));
        }
    };

    for name in workbook.sheet_names() {
        let df = workbook.sheet(&name)?;
        info!(
            "Loaded sheet '{}': {} rows x {} columns",
            name,
            df.height(),
            df.width()
        );
    }
    Ok(workbook)
}

/// Load a file from disk. The sheet is named after the file stem.
pub fn load_file(path: &Path) -> Result<Workbook> {
    let hint = FormatHint::from_path(path)?;
    let bytes = std::fs::read(path)
        .map_err(InsightError::from)
        .context(format!("reading '{}'", path.display()))?;

    let sheet_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SHEET_NAME);

    load_named(&bytes, hint, sheet_name)
}

fn read_csv(bytes: &[u8]) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .map_parse_options(|opts| opts.with_try_parse_dates(true))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()
}

fn read_parquet(bytes: &[u8]) -> PolarsResult<DataFrame> {
    ParquetReader::new(Cursor::new(bytes.to_vec())).finish()
}

fn spreadsheet_error(operation: &str, err: impl std::fmt::Display) -> InsightError {
    InsightError::MalformedDataset {
        operation: operation.to_string(),
        reason: err.to_string(),
    }
}

fn read_spreadsheet(bytes: &[u8]) -> Result<Workbook> {
    let mut sheets = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| spreadsheet_error("opening spreadsheet", e))?;

    let mut workbook: Option<Workbook> = None;
    for name in sheets.sheet_names() {
        let range = sheets
            .worksheet_range(&name)
            .map_err(|e| spreadsheet_error(&format!("reading sheet '{}'", name), e))?;
        let df = range_to_frame(&range).context(format!("converting sheet '{}'", name))?;

        match workbook.as_mut() {
            Some(book) => book.insert_sheet(name, df),
            None => workbook = Some(Workbook::single(name, df)),
        }
    }

    workbook.ok_or_else(|| InsightError::MalformedDataset {
        operation: "opening spreadsheet".to_string(),
        reason: "the workbook has no sheets".to_string(),
    })
}

/// Storage type inferred for one spreadsheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Empty,
    Bool,
    Int,
    Float,
    DateTime,
    Text,
}

impl CellKind {
    fn of(cell: &Data) -> Self {
        match cell {
            Data::Empty | Data::Error(_) => CellKind::Empty,
            Data::Bool(_) => CellKind::Bool,
            Data::Int(_) => CellKind::Int,
            Data::Float(_) => CellKind::Float,
            Data::DateTime(_) => CellKind::DateTime,
            Data::DateTimeIso(s) if parse_iso_datetime(s).is_some() => CellKind::DateTime,
            _ => CellKind::Text,
        }
    }

    fn merge(self, other: CellKind) -> CellKind {
        use CellKind::*;
        match (self, other) {
            (Empty, kind) | (kind, Empty) => kind,
            (a, b) if a == b => a,
            (Int, Float) | (Float, Int) => Float,
            _ => Text,
        }
    }
}

static EMPTY_CELL: Data = Data::Empty;

/// Days between the spreadsheet epoch (1899-12-30) and 1970-01-01.
const SPREADSHEET_UNIX_EPOCH_DAYS: f64 = 25_569.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;
/// Largest integer an `f64` holds exactly.
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn cell_millis(cell: &Data) -> Option<i64> {
    match cell {
        Data::DateTime(dt) => {
            Some(((dt.as_f64() - SPREADSHEET_UNIX_EPOCH_DAYS) * MILLIS_PER_DAY).round() as i64)
        }
        Data::DateTimeIso(s) => parse_iso_datetime(s).map(|dt| dt.and_utc().timestamp_millis()),
        _ => None,
    }
}

fn cell_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) => Some(*f),
        _ => None,
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Header names from the first row: blanks become `column_<n>` and repeats
/// get a numeric suffix.
fn header_names(header: &[Data], width: usize) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    (0..width)
        .map(|idx| {
            let base = header
                .get(idx)
                .and_then(cell_text)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("column_{}", idx + 1));

            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{}_{}", base, count)
            }
        })
        .collect()
}

fn spreadsheet_column(name: &str, cells: &[&Data]) -> PolarsResult<Series> {
    let kind = cells
        .iter()
        .fold(CellKind::Empty, |acc, cell| acc.merge(CellKind::of(cell)));
    let name = PlSmallStr::from(name);

    let series = match kind {
        CellKind::Empty => Series::full_null(name, cells.len(), &DataType::String),
        CellKind::Bool => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            Series::new(name, values)
        }
        CellKind::Int | CellKind::Float => {
            let values: Vec<Option<f64>> = cells.iter().map(|cell| cell_f64(cell)).collect();
            let integral = values
                .iter()
                .flatten()
                .all(|v| v.fract() == 0.0 && v.abs() <= MAX_EXACT_FLOAT_INT);
            if integral {
                let ints: Vec<Option<i64>> =
                    values.iter().map(|v| v.map(|f| f as i64)).collect();
                Series::new(name, ints)
            } else {
                Series::new(name, values)
            }
        }
        CellKind::DateTime => {
            let millis: Vec<Option<i64>> = cells.iter().map(|cell| cell_millis(cell)).collect();
            Series::new(name, millis).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        }
        CellKind::Text => {
            let values: Vec<Option<String>> = cells.iter().map(|cell| cell_text(cell)).collect();
            Series::new(name, values)
        }
    };
    Ok(series)
}

/// Convert a worksheet range (header row first) into a frame.
fn range_to_frame(range: &Range<Data>) -> PolarsResult<DataFrame> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };

    let width = range.width();
    let names = header_names(header, width);
    let body: Vec<&[Data]> = rows.collect();
    if body.is_empty() {
        warn!("Sheet has a header row but no data rows");
    }

    let columns = names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells: Vec<&Data> = body
                .iter()
                .map(|row| row.get(idx).unwrap_or(&EMPTY_CELL))
                .collect();
            spreadsheet_column(name, &cells).map(Column::from)
        })
        .collect::<PolarsResult<Vec<Column>>>()?;

    DataFrame::new(columns)
}

/// Shape, schema and memory footprint of a dataset.
pub fn dataset_info(df: &DataFrame) -> DatasetInfo {
    let dtypes = df
        .get_columns()
        .iter()
        .map(|col| (col.name().to_string(), format!("{:?}", col.dtype())))
        .collect();

    DatasetInfo {
        rows: df.height(),
        columns: df.width(),
        column_names: df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect(),
        dtypes,
        column_types: classify_columns(df),
        memory_usage_mb: df.estimated_size() as f64 / (1024.0 * 1024.0),
    }
}
