//! Log-return transformation.
//!
//! Two conventions are supported (see `ReturnMode`):
//!
//! - `OnePlus`: `r = ln(1 + x)` per cell, via `ln_1p` for precision near 0
//! - `PriceRatio`: `r_t = ln(p_t / p_{t-1})`, dropping the first row
//!
//! Each column is transformed independently while keeping row alignment.
//! Undefined results (`NaN`, infinities from `ln(0)`) are not errors: any row
//! holding one for some asset is dropped in a final pass.

use nalgebra::DMatrix;
use tracing::debug;

use crate::domain::{Dataset, ReturnMode, ReturnSeries};
use crate::error::PrepError;

/// `ln(1 + x)` for each value, keeping only finite results.
pub fn log_returns(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .map(|x| x.ln_1p())
        .filter(|r| r.is_finite())
        .collect()
}

/// `ln(p_t / p_{t-1})` for consecutive values, keeping only finite results.
pub fn price_log_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| (w[1] / w[0]).ln())
        .filter(|r| r.is_finite())
        .collect()
}

/// Transform a dataset into an aligned, gap-free return series.
pub fn to_return_series(dataset: &Dataset, mode: ReturnMode) -> Result<ReturnSeries, PrepError> {
    let (aligned, dates) = match mode {
        ReturnMode::OnePlus => (dataset.values().map(|x| x.ln_1p()), dataset.dates().to_vec()),
        ReturnMode::PriceRatio => {
            let n = dataset.n_rows().saturating_sub(1);
            let m = DMatrix::from_fn(n, dataset.n_assets(), |r, c| {
                (dataset.values()[(r + 1, c)] / dataset.values()[(r, c)]).ln()
            });
            (m, dataset.dates().iter().skip(1).copied().collect())
        }
    };

    let keep: Vec<usize> = (0..aligned.nrows())
        .filter(|&r| aligned.row(r).iter().all(|v| v.is_finite()))
        .collect();

    debug!(
        mode = ?mode,
        rows_in = dataset.n_rows(),
        rows_out = keep.len(),
        "computed log-returns"
    );

    if keep.is_empty() {
        return Err(PrepError::data_source(
            "<return series>",
            "No rows with a defined log-return for every asset.",
        ));
    }

    let values = DMatrix::from_fn(keep.len(), aligned.ncols(), |r, c| aligned[(keep[r], c)]);
    let dates = keep.iter().map(|&r| dates[r]).collect();
    ReturnSeries::new(dates, dataset.tickers().to_vec(), values)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    use super::*;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n).map(|i| start + chrono::Days::new(i as u64)).collect()
    }

    #[test]
    fn one_plus_matches_ln_1p() {
        let xs = [0.0, 0.01, -0.5, 1e-12, 2.0];
        let rs = log_returns(&xs);
        assert_eq!(rs.len(), xs.len());
        for (x, r) in xs.iter().zip(&rs) {
            assert_eq!(*r, x.ln_1p());
        }
        assert_relative_eq!(rs[4], 3.0_f64.ln(), max_relative = 1e-14);
    }

    #[test]
    fn one_plus_drops_undefined_values() {
        let rs = log_returns(&[f64::NAN, 0.1, -1.0, -2.0, 0.2]);
        assert_eq!(rs, vec![0.1_f64.ln_1p(), 0.2_f64.ln_1p()]);
    }

    #[test]
    fn price_ratio_round_trips_to_relative_prices() {
        let prices = [100.0, 101.0, 99.5, 103.2, 104.0];
        let rs = price_log_returns(&prices);
        assert!(rs.len() <= prices.len() - 1);

        let mut acc = 0.0_f64;
        for (i, r) in rs.iter().enumerate() {
            acc += r;
            assert_relative_eq!(acc.exp(), prices[i + 1] / prices[0], max_relative = 1e-12);
        }
    }

    #[test]
    fn series_drops_rows_with_any_undefined_asset() {
        let values = DMatrix::from_row_slice(4, 2, &[
            f64::NAN, 0.1, //
            0.02, 0.03, //
            0.01, -1.5, //
            -0.01, 0.0, //
        ]);
        let ds = Dataset::new(dates(4), vec!["A".into(), "B".into()], values).unwrap();
        let series = to_return_series(&ds, ReturnMode::OnePlus).unwrap();

        assert_eq!(series.n_obs(), 2);
        assert_eq!(series.dates(), &[ds.dates()[1], ds.dates()[3]]);
        assert_eq!(series.values()[(0, 1)], 0.03_f64.ln_1p());
        assert_eq!(series.values()[(1, 0)], (-0.01_f64).ln_1p());
    }

    #[test]
    fn price_ratio_series_drops_first_row() {
        let values = DMatrix::from_row_slice(3, 1, &[10.0, 11.0, 12.1]);
        let ds = Dataset::new(dates(3), vec!["A".into()], values).unwrap();
        let series = to_return_series(&ds, ReturnMode::PriceRatio).unwrap();

        assert_eq!(series.n_obs(), 2);
        assert_eq!(series.dates()[0], ds.dates()[1]);
        assert_relative_eq!(series.values()[(0, 0)], 1.1_f64.ln(), max_relative = 1e-12);
        assert_relative_eq!(series.values()[(1, 0)], 1.1_f64.ln(), max_relative = 1e-12);
    }

    #[test]
    fn all_undefined_is_an_error() {
        let values = DMatrix::from_row_slice(2, 1, &[-1.0, f64::NAN]);
        let ds = Dataset::new(dates(2), vec!["A".into()], values).unwrap();
        assert!(matches!(
            to_return_series(&ds, ReturnMode::OnePlus),
            Err(PrepError::DataSource { .. })
        ));
    }
}
