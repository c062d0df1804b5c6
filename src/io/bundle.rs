//! Read/write moment bundle JSON files.
//!
//! A bundle file holds the full statistics of one `pprep stats` run together
//! with the date range and return convention it was computed under, so a
//! later `pprep decode` can reuse expected returns and covariance. The schema
//! is `domain::BundleFile`.

use std::fs::File;
use std::path::Path;

use nalgebra::{DMatrix, DVector};

use crate::domain::{BundleFile, DateRange, MomentBundle, ReturnMode};
use crate::error::PrepError;

impl BundleFile {
    pub fn from_bundle(bundle: &MomentBundle, range: DateRange, return_mode: ReturnMode) -> Self {
        Self {
            tool: "pprep".to_string(),
            generated_for: range,
            return_mode,
            tickers: bundle.tickers.clone(),
            observations: bundle.observations,
            mean: bundle.mean.iter().copied().collect(),
            covariance: matrix_rows(&bundle.covariance),
            stddev: bundle.stddev.iter().copied().collect(),
            correlation: matrix_rows(&bundle.correlation),
            volatility: bundle.volatility.iter().copied().collect(),
        }
    }

    /// Rebuild the in-memory bundle, checking every shape against the ticker list.
    pub fn to_bundle(&self) -> Result<MomentBundle, PrepError> {
        let n = self.tickers.len();
        for (what, len) in [
            ("bundle mean", self.mean.len()),
            ("bundle stddev", self.stddev.len()),
            ("bundle volatility", self.volatility.len()),
        ] {
            if len != n {
                return Err(PrepError::dimension(what, n, len));
            }
        }
        Ok(MomentBundle {
            tickers: self.tickers.clone(),
            observations: self.observations,
            mean: DVector::from_vec(self.mean.clone()),
            covariance: matrix_from_rows("bundle covariance", &self.covariance, n)?,
            stddev: DVector::from_vec(self.stddev.clone()),
            correlation: matrix_from_rows("bundle correlation", &self.correlation, n)?,
            volatility: DVector::from_vec(self.volatility.clone()),
        })
    }
}

/// Write a bundle JSON file.
pub fn write_bundle_json(path: &Path, file: &BundleFile) -> Result<(), PrepError> {
    let path_id = path.display().to_string();
    let out = File::create(path).map_err(|e| PrepError::io(&path_id, e))?;
    serde_json::to_writer_pretty(out, file).map_err(|e| PrepError::io(&path_id, e))?;
    Ok(())
}

/// Read a bundle JSON file.
pub fn read_bundle_json(path: &Path) -> Result<BundleFile, PrepError> {
    let path_id = path.display().to_string();
    let file = File::open(path).map_err(|e| PrepError::io(&path_id, e))?;
    serde_json::from_reader(file).map_err(|e| PrepError::data_source(&path_id, format!("Invalid bundle JSON: {e}")))
}

fn matrix_rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter().map(|row| row.iter().copied().collect()).collect()
}

fn matrix_from_rows(what: &str, rows: &[Vec<f64>], n: usize) -> Result<DMatrix<f64>, PrepError> {
    if rows.len() != n {
        return Err(PrepError::dimension(format!("{what} rows"), n, rows.len()));
    }
    if let Some(bad) = rows.iter().find(|r| r.len() != n) {
        return Err(PrepError::dimension(format!("{what} columns"), n, bad.len()));
    }
    Ok(DMatrix::from_fn(n, n, |r, c| rows[r][c]))
}
