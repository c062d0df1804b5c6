//! Shared domain types.
//!
//! Tables are stored as `nalgebra` matrices with one row per date and one
//! column per asset, alongside the date index and the ticker headers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::ValueEnum;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::PrepError;

/// Trading periods per year used to annualize volatility.
pub const TRADING_PERIODS_PER_YEAR: f64 = 252.0;

/// Closed date interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PrepError> {
        if start > end {
            return Err(PrepError::Configuration(format!(
                "Date range start {start} is after end {end}."
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// How table cells are turned into log-returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReturnMode {
    /// `ln(1 + x)` per cell: cells are simple returns.
    #[default]
    OnePlus,
    /// `ln(p_t / p_{t-1})`: cells are price levels; first row has no return.
    PriceRatio,
}

/// A date-indexed table of prices (or simple returns), one column per asset.
///
/// Missing cells are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    values: DMatrix<f64>,
}

impl Dataset {
    /// Build a dataset, checking that the index and headers match the matrix shape.
    pub fn new(dates: Vec<NaiveDate>, tickers: Vec<String>, values: DMatrix<f64>) -> Result<Self, PrepError> {
        if values.nrows() != dates.len() {
            return Err(PrepError::dimension("dataset rows", dates.len(), values.nrows()));
        }
        if values.ncols() != tickers.len() {
            return Err(PrepError::dimension("dataset columns", tickers.len(), values.ncols()));
        }
        Ok(Self { dates, tickers, values })
    }

    /// Shapes already agree (e.g. built from a [`ReturnSeries`]).
    pub(crate) fn from_aligned(dates: Vec<NaiveDate>, tickers: Vec<String>, values: DMatrix<f64>) -> Self {
        debug_assert_eq!(values.shape(), (dates.len(), tickers.len()));
        Self { dates, tickers, values }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn n_assets(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Keep only rows whose date lies in `range`, preserving order.
    pub fn restricted_to(&self, range: &DateRange) -> Dataset {
        let keep: Vec<usize> = (0..self.n_rows())
            .filter(|&r| range.contains(self.dates[r]))
            .collect();
        self.select_rows(&keep)
    }

    /// Rows reordered by ascending date. Row order among equal dates is kept.
    pub fn sorted_by_date(&self) -> Dataset {
        let mut order: Vec<usize> = (0..self.n_rows()).collect();
        order.sort_by_key(|&r| self.dates[r]);
        self.select_rows(&order)
    }

    pub fn is_sorted_by_date(&self) -> bool {
        self.dates.windows(2).all(|w| w[0] <= w[1])
    }

    pub(crate) fn select_rows(&self, rows: &[usize]) -> Dataset {
        let n_assets = self.n_assets();
        let values = DMatrix::from_fn(rows.len(), n_assets, |r, c| self.values[(rows[r], c)]);
        Dataset {
            dates: rows.iter().map(|&r| self.dates[r]).collect(),
            tickers: self.tickers.clone(),
            values,
        }
    }
}

/// Log-returns aligned by date. Never contains `NaN` or infinities.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    values: DMatrix<f64>,
}

impl ReturnSeries {
    pub fn new(dates: Vec<NaiveDate>, tickers: Vec<String>, values: DMatrix<f64>) -> Result<Self, PrepError> {
        if values.nrows() != dates.len() {
            return Err(PrepError::dimension("return rows", dates.len(), values.nrows()));
        }
        if values.ncols() != tickers.len() {
            return Err(PrepError::dimension("return columns", tickers.len(), values.ncols()));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(PrepError::InvalidInput(
                "Return series must not contain missing or non-finite values.".to_string(),
            ));
        }
        Ok(Self { dates, tickers, values })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn n_obs(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_assets(&self) -> usize {
        self.values.ncols()
    }
}

/// Summary statistics of a return series.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentBundle {
    pub tickers: Vec<String>,
    pub observations: usize,
    pub mean: DVector<f64>,
    pub covariance: DMatrix<f64>,
    pub stddev: DVector<f64>,
    pub correlation: DMatrix<f64>,
    pub volatility: DVector<f64>,
}

/// A fixed-length selection vector (one bit per asset).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitVector(Vec<bool>);

impl BitVector {
    pub fn from_bits(bits: Vec<bool>) -> Self {
        Self(bits)
    }

    pub fn zeros(len: usize) -> Self {
        Self(vec![false; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<bool> {
        self.0.get(idx).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }

    pub fn count_ones(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }
}

impl FromStr for BitVector {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(PrepError::InvalidInput(format!(
                    "Invalid bit '{other}' in bitstring '{s}' (expected only 0/1)."
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(BitVector)
    }
}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            f.write_str(if *b { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Generated samples with one calendar date per row.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarSeries {
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    pub values: DMatrix<f64>,
}

/// Resolved settings for a `pprep stats` run.
#[derive(Debug, Clone)]
pub struct StatsConfig {
    pub input: PathBuf,
    pub range: DateRange,
    pub return_mode: ReturnMode,
    pub export_bundle: Option<PathBuf>,
    pub show_prices: bool,
}

/// Resolved settings for a `pprep synth` run.
#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub mean: DVector<f64>,
    pub covariance: DMatrix<f64>,
    pub n: usize,
    pub seed: u64,
    pub binary: bool,
    pub rescale: bool,
    pub anchor: NaiveDate,
    pub tickers: Vec<String>,
    pub output: Option<PathBuf>,
}

/// Where the decoder takes its expected returns and covariance from.
#[derive(Debug, Clone)]
pub enum DecodeInputs {
    Bundle(PathBuf),
    Inline {
        mean: DVector<f64>,
        covariance: DMatrix<f64>,
    },
}

/// Resolved settings for a `pprep decode` run.
#[derive(Debug, Clone)]
pub struct DecodeConfig {
    pub bits: BitVector,
    pub inputs: DecodeInputs,
}

/// On-disk representation of a moment bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleFile {
    pub tool: String,
    pub generated_for: DateRange,
    pub return_mode: ReturnMode,
    pub tickers: Vec<String>,
    pub observations: usize,
    pub mean: Vec<f64>,
    pub covariance: Vec<Vec<f64>>,
    pub stddev: Vec<f64>,
    pub correlation: Vec<Vec<f64>>,
    pub volatility: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        let err = DateRange::new(d(2024, 2, 1), d(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, PrepError::Configuration(_)));
    }

    #[test]
    fn date_range_is_inclusive() {
        let range = DateRange::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        assert!(range.contains(d(2024, 1, 1)));
        assert!(range.contains(d(2024, 1, 31)));
        assert!(!range.contains(d(2024, 2, 1)));
    }

    #[test]
    fn bitvector_parses_and_displays() {
        let bits: BitVector = "0110".parse().unwrap();
        assert_eq!(bits.len(), 4);
        assert_eq!(bits.count_ones(), 2);
        assert_eq!(bits.to_string(), "0110");
        assert!(matches!("01x".parse::<BitVector>(), Err(PrepError::InvalidInput(_))));
    }

    #[test]
    fn dataset_sort_reorders_rows_with_dates() {
        let ds = Dataset::new(
            vec![d(2024, 1, 3), d(2024, 1, 1), d(2024, 1, 2)],
            vec!["A".to_string()],
            DMatrix::from_column_slice(3, 1, &[3.0, 1.0, 2.0]),
        )
        .unwrap();
        assert!(!ds.is_sorted_by_date());
        let sorted = ds.sorted_by_date();
        assert_eq!(sorted.dates(), vec![d(2024, 1, 1), d(2024, 1, 2), d(2024, 1, 3)]);
        assert_eq!(sorted.values().column(0).iter().copied().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn dataset_rejects_mismatched_shapes() {
        let err = Dataset::new(
            vec![d(2024, 1, 1), d(2024, 1, 2)],
            vec!["A".to_string()],
            DMatrix::zeros(3, 1),
        )
        .unwrap_err();
        assert!(matches!(err, PrepError::DimensionMismatch { .. }));
        let err = Dataset::new(vec![d(2024, 1, 1)], vec!["A".to_string()], DMatrix::zeros(1, 2)).unwrap_err();
        assert!(matches!(err, PrepError::DimensionMismatch { .. }));

        let ds = Dataset::new(vec![d(2024, 1, 1)], vec!["A".to_string()], DMatrix::zeros(1, 1)).unwrap();
        let range = DateRange::new(d(2024, 1, 1), d(2024, 1, 1)).unwrap();
        assert_eq!(ds.restricted_to(&range), ds);
    }

    #[test]
    fn return_series_rejects_nan() {
        let err = ReturnSeries::new(
            vec![d(2024, 1, 1)],
            vec!["A".to_string()],
            DMatrix::from_element(1, 1, f64::NAN),
        )
        .unwrap_err();
        assert!(matches!(err, PrepError::InvalidInput(_)));
    }
}
