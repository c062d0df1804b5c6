//! Calendar dating for generated samples.
//!
//! Row `i` of a sample is stamped `anchor + i months`. Month arithmetic clamps
//! to the last valid day (Jan 31 + 1 month = Feb 28/29) and rolls the year.
//! Dates are always computed from the anchor, never from the previous row, so
//! one short month does not pull every later date to the 28th.

use chrono::{Months, NaiveDate};
use nalgebra::DMatrix;

use crate::domain::CalendarSeries;
use crate::error::PrepError;

/// Asset headers used for three-column synthetic series.
pub const DEFAULT_TICKERS: [&str; 3] = ["^GSPC", "^ACWX", "^GLAB.L"];

pub fn default_tickers() -> Vec<String> {
    DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect()
}

/// First date of generated monthly series unless overridden.
pub fn default_anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 30).unwrap_or_default()
}

/// `date` advanced by `months` calendar months, clamped to month end.
pub fn month_increment(date: NaiveDate, months: u32) -> Result<NaiveDate, PrepError> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| PrepError::InvalidInput(format!("{date} + {months} months is out of range.")))
}

/// `n` monthly dates starting at `anchor`.
pub fn monthly_dates(anchor: NaiveDate, n: usize) -> Result<Vec<NaiveDate>, PrepError> {
    (0..n)
        .map(|i| {
            let months = u32::try_from(i)
                .map_err(|_| PrepError::InvalidInput(format!("Too many monthly rows: {n}.")))?;
            month_increment(anchor, months)
        })
        .collect()
}

/// Attach monthly dates and ticker headers to a sample matrix.
pub fn sample_as_calendar_series(
    samples: &DMatrix<f64>,
    anchor: NaiveDate,
    tickers: &[String],
) -> Result<CalendarSeries, PrepError> {
    if tickers.len() != samples.ncols() {
        return Err(PrepError::dimension("calendar series tickers", samples.ncols(), tickers.len()));
    }
    Ok(CalendarSeries {
        dates: monthly_dates(anchor, samples.nrows())?,
        tickers: tickers.to_vec(),
        values: samples.clone(),
    })
}
