//! Bitstring decoding.
//!
//! A candidate portfolio is a `BitVector` with one bit per asset. Decoding
//! adds, for each asset `i`, the covariance with every selected asset `j`:
//!
//! `value[i] = expected_returns[i] + Σ_j bits[j] · covariance[i][j]`

use nalgebra::{DMatrix, DVector};

use crate::domain::BitVector;
use crate::error::PrepError;

/// Decode one bit vector into per-asset values.
pub fn decode(
    bits: &BitVector,
    expected_returns: &DVector<f64>,
    covariance: &DMatrix<f64>,
) -> Result<DVector<f64>, PrepError> {
    check_dimensions(bits.len(), expected_returns, covariance)?;

    let mut out = expected_returns.clone();
    for (j, selected) in bits.iter().enumerate() {
        if selected {
            out += covariance.column(j);
        }
    }
    Ok(out)
}

/// Decode a batch of bit vectors (e.g. every row of a binary sample).
pub fn decode_many(
    candidates: &[BitVector],
    expected_returns: &DVector<f64>,
    covariance: &DMatrix<f64>,
) -> Result<Vec<DVector<f64>>, PrepError> {
    candidates
        .iter()
        .map(|bits| decode(bits, expected_returns, covariance))
        .collect()
}

fn check_dimensions(n_bits: usize, expected_returns: &DVector<f64>, covariance: &DMatrix<f64>) -> Result<(), PrepError> {
    let n = expected_returns.len();
    if n_bits != n {
        return Err(PrepError::dimension("bit vector length", n, n_bits));
    }
    if covariance.nrows() != n {
        return Err(PrepError::dimension("covariance rows", n, covariance.nrows()));
    }
    if covariance.ncols() != n {
        return Err(PrepError::dimension("covariance columns", n, covariance.ncols()));
    }
    Ok(())
}
