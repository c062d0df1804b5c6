//! Terminal formatting for datasets, moment bundles, samples and decodes.
//!
//! Everything returns a `String`; callers decide where it goes.

use nalgebra::{DMatrix, DVector};

use crate::domain::{BitVector, Dataset, DateRange, MomentBundle, ReturnMode};

/// Column width for ticker-labelled tables.
const COL_W: usize = 12;

/// Dataset shape and date coverage, printed before the statistics.
pub fn format_run_summary(dataset: &Dataset, range: &DateRange, mode: ReturnMode, return_rows: usize) -> String {
    let mut out = String::new();
    out.push_str("=== pprep - moment preparation ===\n");
    out.push_str(&format!("Range: {range}\n"));
    if let (Some(first), Some(last)) = (dataset.dates().first(), dataset.dates().last()) {
        out.push_str(&format!(
            "Rows: n={} | dates=[{first}, {last}] | assets={}\n",
            dataset.n_rows(),
            dataset.n_assets()
        ));
    }
    let mode = match mode {
        ReturnMode::OnePlus => "ln(1 + x)",
        ReturnMode::PriceRatio => "ln(p_t / p_t-1)",
    };
    out.push_str(&format!("Returns: {mode} | observations={return_rows}\n"));
    out
}

/// Mean/stddev/volatility per asset, then the covariance and correlation matrices.
pub fn format_bundle(bundle: &MomentBundle) -> String {
    let mut out = String::new();

    out.push_str("\nPer-asset moments:\n");
    out.push_str(&format!(
        "{:<COL_W$} {:>14} {:>14} {:>14}\n",
        "ticker", "mean", "stddev", "vol(ann.)"
    ));
    for (i, t) in bundle.tickers.iter().enumerate() {
        out.push_str(&format!(
            "{:<COL_W$} {:>14.6e} {:>14.6e} {:>14.6}\n",
            t, bundle.mean[i], bundle.stddev[i], bundle.volatility[i]
        ));
    }

    out.push_str("\nCovariance:\n");
    out.push_str(&format_labelled_matrix(&bundle.tickers, &bundle.covariance, true));
    out.push_str("\nCorrelation:\n");
    out.push_str(&format_labelled_matrix(&bundle.tickers, &bundle.correlation, false));
    out
}

/// Last `tail` rows of a reconstructed price index.
pub fn format_price_tail(prices: &Dataset, tail: usize) -> String {
    let mut out = String::new();
    out.push_str("\nReconstructed price index (start = 1.0):\n");
    out.push_str(&format!("{:<COL_W$}", "date"));
    for t in prices.tickers() {
        out.push_str(&format!(" {t:>COL_W$}"));
    }
    out.push('\n');

    let start = prices.n_rows().saturating_sub(tail);
    for r in start..prices.n_rows() {
        out.push_str(&format!("{:<COL_W$}", prices.dates()[r].to_string()));
        for v in prices.values().row(r).iter() {
            out.push_str(&format!(" {v:>COL_W$.6}"));
        }
        out.push('\n');
    }
    out
}

/// Sample rows, optionally with their calendar dates.
pub fn format_samples(tickers: &[String], dates: Option<&[chrono::NaiveDate]>, samples: &DMatrix<f64>) -> String {
    let mut out = String::new();
    if dates.is_some() {
        out.push_str(&format!("{:<COL_W$}", "date"));
    } else {
        out.push_str(&format!("{:<COL_W$}", "row"));
    }
    for t in tickers {
        out.push_str(&format!(" {t:>COL_W$}"));
    }
    out.push('\n');

    for r in 0..samples.nrows() {
        let label = match dates {
            Some(d) => d[r].to_string(),
            None => r.to_string(),
        };
        out.push_str(&format!("{label:<COL_W$}"));
        for v in samples.row(r).iter() {
            out.push_str(&format!(" {v:>COL_W$.6}"));
        }
        out.push('\n');
    }
    out
}

pub fn format_bit_rows(rows: &[BitVector]) -> String {
    rows.iter().map(|b| format!("{b}\n")).collect()
}

/// Decoded per-asset values for one bitstring.
pub fn format_decoded(tickers: &[String], bits: &BitVector, values: &DVector<f64>) -> String {
    let mut out = String::new();
    out.push_str(&format!("Bits: {bits} (selected={})\n", bits.count_ones()));
    out.push_str(&format!("{:<COL_W$} {:>4} {:>16}\n", "ticker", "bit", "value"));
    for (i, t) in tickers.iter().enumerate() {
        let bit = if bits.get(i).unwrap_or(false) { 1 } else { 0 };
        out.push_str(&format!("{t:<COL_W$} {bit:>4} {:>16.8}\n", values[i]));
    }
    out
}

fn format_labelled_matrix(tickers: &[String], m: &DMatrix<f64>, scientific: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<COL_W$}", ""));
    for t in tickers {
        out.push_str(&format!(" {t:>COL_W$}"));
    }
    out.push('\n');
    for (i, t) in tickers.iter().enumerate() {
        out.push_str(&format!("{t:<COL_W$}"));
        for j in 0..tickers.len() {
            if scientific {
                out.push_str(&format!(" {:>COL_W$.4e}", m[(i, j)]));
            } else {
                out.push_str(&format!(" {:>COL_W$.4}", m[(i, j)]));
            }
        }
        out.push('\n');
    }
    out
}
