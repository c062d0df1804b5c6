//! CSV ingest of date-indexed price tables.
//!
//! The first column is the date index; every other column is one asset and its
//! header becomes the ticker. Rows are sorted by date, checked for duplicate
//! dates, and restricted to the requested `DateRange`.
//!
//! Parsing is strict: a bad date or a non-numeric cell fails the whole load
//! with a `DataSource` error naming the file, the line and the offending value.
//! Only explicitly empty cells (or `NaN`/`NA`/`null`) load as missing.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use nalgebra::DMatrix;
use tracing::{debug, warn};

use crate::domain::{Dataset, DateRange};
use crate::error::PrepError;

/// Loads a [`Dataset`] slice from a CSV file or from an in-memory dataset.
#[derive(Debug, Clone)]
pub struct TimeSeriesLoader {
    source: Option<PathBuf>,
    preloaded: Option<Dataset>,
    range: DateRange,
}

impl TimeSeriesLoader {
    /// At least one of `source` and `preloaded` must be given.
    ///
    /// When both are supplied the pre-loaded dataset wins and no file is read.
    pub fn new(range: DateRange, source: Option<PathBuf>, preloaded: Option<Dataset>) -> Result<Self, PrepError> {
        if source.is_none() && preloaded.is_none() {
            return Err(PrepError::Configuration(
                "Either a data source path or a pre-loaded dataset must be provided.".to_string(),
            ));
        }
        Ok(Self {
            source,
            preloaded,
            range,
        })
    }

    pub fn from_path(range: DateRange, path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(path.into()),
            preloaded: None,
            range,
        }
    }

    pub fn from_dataset(range: DateRange, dataset: Dataset) -> Self {
        Self {
            source: None,
            preloaded: Some(dataset),
            range,
        }
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    /// Identifier used in error messages and logs.
    pub fn source_id(&self) -> String {
        match (&self.preloaded, &self.source) {
            (Some(_), _) => "<in-memory dataset>".to_string(),
            (None, Some(path)) => path.display().to_string(),
            (None, None) => "<none>".to_string(),
        }
    }

    /// Load, sort, and restrict to the configured date range.
    pub fn load(&self) -> Result<Dataset, PrepError> {
        let source_id = self.source_id();
        let raw = match (&self.preloaded, &self.source) {
            (Some(ds), _) => ds.clone(),
            (None, Some(path)) => read_price_csv(path)?,
            (None, None) => {
                return Err(PrepError::Configuration(
                    "Either a data source path or a pre-loaded dataset must be provided.".to_string(),
                ))
            }
        };

        let sorted = normalize_order(raw, &source_id)?;
        let sliced = sorted.restricted_to(&self.range);
        if sliced.is_empty() {
            return Err(PrepError::data_source(
                source_id,
                format!("No rows fall inside date range {}.", self.range),
            ));
        }

        debug!(
            source = %source_id,
            rows = sliced.n_rows(),
            assets = sliced.n_assets(),
            range = %self.range,
            "loaded dataset slice"
        );
        Ok(sliced)
    }
}

/// Sort rows by date and reject duplicate dates.
fn normalize_order(dataset: Dataset, source_id: &str) -> Result<Dataset, PrepError> {
    let dataset = if dataset.is_sorted_by_date() {
        dataset
    } else {
        warn!(source = %source_id, "input rows are not in ascending date order; sorting");
        dataset.sorted_by_date()
    };

    if let Some(w) = dataset.dates().windows(2).find(|w| w[0] == w[1]) {
        return Err(PrepError::data_source(
            source_id,
            format!("Duplicate date {} in index.", w[0]),
        ));
    }
    Ok(dataset)
}

/// Read a full price table from CSV without any date filtering.
pub fn read_price_csv(path: &Path) -> Result<Dataset, PrepError> {
    let source_id = path.display().to_string();
    let file = File::open(path).map_err(|e| PrepError::data_source(&source_id, e))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(false)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| PrepError::data_source(&source_id, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let tickers = parse_tickers(&headers).map_err(|e| PrepError::data_source(&source_id, e))?;

    let mut dates = Vec::new();
    let mut cells: Vec<f64> = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line; lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| PrepError::data_source(&source_id, format!("CSV parse error: {e}")))?;
        let (date, row) = parse_record(&record, tickers.len())
            .map_err(|e| PrepError::data_source(&source_id, format!("line {line}: {e}")))?;
        dates.push(date);
        cells.extend(row);
    }

    let values = DMatrix::from_row_slice(dates.len(), tickers.len(), &cells);
    Dataset::new(dates, tickers, values)
}

fn parse_tickers(headers: &StringRecord) -> Result<Vec<String>, String> {
    if headers.len() < 2 {
        return Err("Expected a date column followed by at least one asset column.".to_string());
    }
    let tickers: Vec<String> = headers.iter().skip(1).map(normalize_header_name).collect();
    if let Some(pos) = tickers.iter().position(|t| t.is_empty()) {
        return Err(format!("Empty header for asset column {}.", pos + 2));
    }
    Ok(tickers)
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn parse_record(record: &StringRecord, n_assets: usize) -> Result<(NaiveDate, Vec<f64>), String> {
    let raw_date = record.get(0).ok_or_else(|| "Missing date value.".to_string())?;
    let date = parse_date(raw_date.trim_start_matches('\u{feff}'))?;

    let mut row = Vec::with_capacity(n_assets);
    for col in 1..=n_assets {
        let raw = record.get(col).unwrap_or("");
        row.push(parse_cell(raw)?);
    }
    Ok((date, row))
}

fn parse_cell(raw: &str) -> Result<f64, String> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("na") || s.eq_ignore_ascii_case("null") {
        return Ok(f64::NAN);
    }
    s.parse::<f64>()
        .map_err(|_| format!("Non-numeric cell '{s}'."))
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const DATE_FMTS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];
    const DATETIME_FMTS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, YYYY/MM/DD, DD/MM/YYYY, DD-MM-YYYY."
    ))
}
