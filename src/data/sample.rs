//! Synthetic multivariate-normal data.
//!
//! Draws are `x = μ + L z` with `z ~ N(0, I)` and `L` the lower Cholesky
//! factor of the covariance. The RNG is always supplied by the caller (or
//! built locally from a seed), so two calls never share random state.
//!
//! Reproducibility holds for one build of this crate and its `rand` version;
//! streams are not expected to match other implementations.

use nalgebra::{DMatrix, DVector};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use tracing::{debug, warn};

use crate::domain::BitVector;
use crate::error::PrepError;

/// Relative tolerance for the covariance symmetry check.
const SYMMETRY_TOL: f64 = 1e-10;

/// Number of diagonal-jitter retries before giving up on a decomposition.
const JITTER_ATTEMPTS: usize = 8;

/// Draw `n` rows from `N(mean, covariance)` using the supplied RNG.
pub fn sample<R: Rng + ?Sized>(
    n: usize,
    mean: &DVector<f64>,
    covariance: &DMatrix<f64>,
    rng: &mut R,
) -> Result<DMatrix<f64>, PrepError> {
    let l = cholesky_factor(mean, covariance)?;
    let dim = mean.len();

    let mut out = DMatrix::zeros(n, dim);
    let mut z = DVector::zeros(dim);
    for r in 0..n {
        for v in z.iter_mut() {
            *v = rng.sample(StandardNormal);
        }
        let x = mean + &l * &z;
        out.row_mut(r).copy_from(&x.transpose());
    }

    debug!(rows = n, dim, "drew multivariate normal sample");
    Ok(out)
}

/// [`sample`] with a fresh `StdRng` seeded from `seed`.
pub fn sample_seeded(
    n: usize,
    mean: &DVector<f64>,
    covariance: &DMatrix<f64>,
    seed: u64,
) -> Result<DMatrix<f64>, PrepError> {
    let mut rng = StdRng::seed_from_u64(seed);
    sample(n, mean, covariance, &mut rng)
}

/// Same draw as [`sample`], thresholded at zero: `1` if positive, else `0`.
pub fn sample_binary<R: Rng + ?Sized>(
    n: usize,
    mean: &DVector<f64>,
    covariance: &DMatrix<f64>,
    rng: &mut R,
) -> Result<Vec<BitVector>, PrepError> {
    sample(n, mean, covariance, rng).map(|m| threshold(&m))
}

pub fn sample_binary_seeded(
    n: usize,
    mean: &DVector<f64>,
    covariance: &DMatrix<f64>,
    seed: u64,
) -> Result<Vec<BitVector>, PrepError> {
    let mut rng = StdRng::seed_from_u64(seed);
    sample_binary(n, mean, covariance, &mut rng)
}

/// One bit vector per row: bit set where the value is strictly positive.
pub fn threshold(samples: &DMatrix<f64>) -> Vec<BitVector> {
    samples
        .row_iter()
        .map(|row| BitVector::from_bits(row.iter().map(|v| *v > 0.0).collect()))
        .collect()
}

/// Re-standardize each column to the marginal moments of `(mean, covariance)`.
///
/// Column `i` is z-scored with its own population standard deviation, then
/// scaled by `sqrt(covariance[i][i])` and shifted by `mean[i]`.
pub fn rescale_to_moments(
    samples: &DMatrix<f64>,
    mean: &DVector<f64>,
    covariance: &DMatrix<f64>,
) -> Result<DMatrix<f64>, PrepError> {
    let dim = samples.ncols();
    if mean.len() != dim {
        return Err(PrepError::dimension("mean length", dim, mean.len()));
    }
    if covariance.nrows() != dim || covariance.ncols() != dim {
        return Err(PrepError::dimension("covariance size", dim, covariance.nrows().max(covariance.ncols())));
    }
    if samples.nrows() == 0 {
        return Ok(samples.clone());
    }

    let t = samples.nrows() as f64;
    let mut out = samples.clone();
    for (c, mut col) in out.column_iter_mut().enumerate() {
        let avg = col.sum() / t;
        let var = col.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / t;
        let sd = var.sqrt();
        if !(sd.is_finite() && sd > 0.0) {
            return Err(PrepError::Numerical(format!("Column {c} has zero spread; cannot rescale.")));
        }
        let target_var = covariance[(c, c)];
        if target_var < 0.0 {
            return Err(PrepError::Numerical(format!("Negative target variance {target_var} for column {c}.")));
        }
        let target_sd = target_var.sqrt();
        for v in col.iter_mut() {
            *v = (*v - avg) / sd * target_sd + mean[c];
        }
    }
    Ok(out)
}

/// Lower-triangular factor `L` with `L Lᵀ ≈ covariance`.
///
/// A negative eigenvalue beyond rounding is rejected as not positive-semidefinite.
/// Singular PSD matrices get a small, bounded diagonal jitter.
pub fn cholesky_factor(mean: &DVector<f64>, covariance: &DMatrix<f64>) -> Result<DMatrix<f64>, PrepError> {
    let dim = mean.len();
    if covariance.nrows() != dim {
        return Err(PrepError::dimension("covariance rows", dim, covariance.nrows()));
    }
    if covariance.ncols() != dim {
        return Err(PrepError::dimension("covariance columns", dim, covariance.ncols()));
    }
    if mean.iter().chain(covariance.iter()).any(|v| !v.is_finite()) {
        return Err(PrepError::InvalidInput("Mean and covariance must be finite.".to_string()));
    }

    let scale = covariance.diagonal().iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let scale = if scale > 0.0 { scale } else { 1.0 };
    for i in 0..dim {
        for j in (i + 1)..dim {
            if (covariance[(i, j)] - covariance[(j, i)]).abs() > SYMMETRY_TOL * scale {
                return Err(PrepError::InvalidInput(format!(
                    "Covariance is not symmetric at ({i}, {j})."
                )));
            }
        }
    }

    if let Some(chol) = covariance.clone().cholesky() {
        return Ok(chol.l());
    }

    let min_eigen = covariance
        .clone()
        .symmetric_eigen()
        .eigenvalues
        .iter()
        .fold(f64::INFINITY, |acc, v| acc.min(*v));
    if min_eigen < -SYMMETRY_TOL * scale {
        return Err(PrepError::InvalidInput(format!(
            "Covariance matrix is not positive-semidefinite (smallest eigenvalue {min_eigen:e})."
        )));
    }

    let mut jitter = 1e-12 * scale;
    for _ in 0..JITTER_ATTEMPTS {
        let mut shifted = covariance.clone();
        for i in 0..dim {
            shifted[(i, i)] += jitter;
        }
        if let Some(chol) = shifted.cholesky() {
            warn!(jitter, "covariance is singular; sampling with diagonal jitter");
            return Ok(chol.l());
        }
        jitter *= 10.0;
    }

    Err(PrepError::InvalidInput(
        "Covariance matrix is not positive-semidefinite (Cholesky decomposition failed).".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empirical_moments(m: &DMatrix<f64>) -> (DVector<f64>, DMatrix<f64>) {
        let t = m.nrows() as f64;
        let mean = DVector::from_fn(m.ncols(), |c, _| m.column(c).sum() / t);
        let mut centered = m.clone();
        for (c, mut col) in centered.column_iter_mut().enumerate() {
            col.add_scalar_mut(-mean[c]);
        }
        let cov = centered.transpose() * &centered / (t - 1.0);
        (mean, cov)
    }

    #[test]
    fn standard_normal_moments_are_recovered() {
        let mean = DVector::zeros(2);
        let cov = DMatrix::identity(2, 2);
        let draws = sample_seeded(10_000, &mean, &cov, 42).unwrap();
        assert_eq!(draws.shape(), (10_000, 2));

        let (m, c) = empirical_moments(&draws);
        for i in 0..2 {
            assert!(m[i].abs() < 0.05, "mean[{i}] = {}", m[i]);
            for j in 0..2 {
                let target = if i == j { 1.0 } else { 0.0 };
                assert!((c[(i, j)] - target).abs() < 0.05, "cov[{i}][{j}] = {}", c[(i, j)]);
            }
        }
    }

    #[test]
    fn correlated_draws_follow_target_covariance() {
        let mean = DVector::from_vec(vec![1.0, -2.0]);
        let cov = DMatrix::from_row_slice(2, 2, &[2.0, 0.8, 0.8, 1.0]);
        let draws = sample_seeded(20_000, &mean, &cov, 7).unwrap();
        let (m, c) = empirical_moments(&draws);
        assert!((m[0] - 1.0).abs() < 0.05);
        assert!((m[1] + 2.0).abs() < 0.05);
        assert!((c[(0, 1)] - 0.8).abs() < 0.1, "cov01 = {}", c[(0, 1)]);
    }

    #[test]
    fn same_seed_same_output() {
        let mean = DVector::from_vec(vec![0.1, 0.2, 0.3]);
        let cov = DMatrix::from_row_slice(3, 3, &[1.0, 0.2, 0.1, 0.2, 1.0, 0.3, 0.1, 0.3, 1.0]);
        let a = sample_seeded(50, &mean, &cov, 42).unwrap();
        let b = sample_seeded(50, &mean, &cov, 42).unwrap();
        assert_eq!(a, b);

        let c = sample_seeded(50, &mean, &cov, 43).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn independent_rngs_do_not_interfere() {
        let mean = DVector::zeros(2);
        let cov = DMatrix::identity(2, 2);
        let mut rng_a = StdRng::seed_from_u64(1);
        let mut rng_b = StdRng::seed_from_u64(1);

        let first_a = sample(5, &mean, &cov, &mut rng_a).unwrap();
        let _ = sample_seeded(100, &mean, &cov, 99).unwrap();
        let first_b = sample(5, &mean, &cov, &mut rng_b).unwrap();
        assert_eq!(first_a, first_b);
    }

    #[test]
    fn binary_sample_thresholds_the_continuous_draw() {
        let mean = DVector::from_vec(vec![0.0, 0.5]);
        let cov = DMatrix::from_row_slice(2, 2, &[1.0, 0.3, 0.3, 1.0]);
        let continuous = sample_seeded(30, &mean, &cov, 42).unwrap();
        let bits = sample_binary_seeded(30, &mean, &cov, 42).unwrap();

        assert_eq!(bits.len(), 30);
        for (r, row) in bits.iter().enumerate() {
            for c in 0..2 {
                assert_eq!(row.get(c), Some(continuous[(r, c)] > 0.0));
            }
        }
    }

    #[test]
    fn singular_psd_covariance_is_accepted() {
        let mean = DVector::zeros(2);
        let cov = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let draws = sample_seeded(100, &mean, &cov, 3).unwrap();
        for r in 0..100 {
            assert!((draws[(r, 0)] - draws[(r, 1)]).abs() < 1e-3);
        }
    }

    #[test]
    fn indefinite_covariance_is_invalid_input() {
        let mean = DVector::zeros(2);
        let cov = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(matches!(
            sample_seeded(10, &mean, &cov, 42),
            Err(PrepError::InvalidInput(_))
        ));
    }

    #[test]
    fn slightly_indefinite_covariance_is_not_jittered_away() {
        let mean = DVector::zeros(2);
        let cov = DMatrix::from_row_slice(2, 2, &[1.0, 1.000004, 1.000004, 1.0]);
        assert!(matches!(
            sample_seeded(10, &mean, &cov, 42),
            Err(PrepError::InvalidInput(_))
        ));
    }

    #[test]
    fn asymmetric_covariance_is_invalid_input() {
        let mean = DVector::zeros(2);
        let cov = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.0, 1.0]);
        assert!(matches!(
            sample_seeded(10, &mean, &cov, 42),
            Err(PrepError::InvalidInput(_))
        ));
    }

    #[test]
    fn mismatched_mean_and_covariance() {
        let mean = DVector::zeros(3);
        let cov = DMatrix::identity(2, 2);
        assert!(matches!(
            sample_seeded(10, &mean, &cov, 42),
            Err(PrepError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn rescale_matches_target_marginals() {
        let raw = DMatrix::from_row_slice(4, 2, &[1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0]);
        let mean = DVector::from_vec(vec![0.5, -1.0]);
        let cov = DMatrix::from_row_slice(2, 2, &[4.0, 0.0, 0.0, 0.25]);
        let out = rescale_to_moments(&raw, &mean, &cov).unwrap();

        for c in 0..2 {
            let col = out.column(c);
            let avg = col.sum() / 4.0;
            let sd = (col.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / 4.0).sqrt();
            assert!((avg - mean[c]).abs() < 1e-12);
            assert!((sd - cov[(c, c)].sqrt()).abs() < 1e-12);
        }
    }

    #[test]
    fn rescale_rejects_constant_column() {
        let raw = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let err = rescale_to_moments(&raw, &DVector::zeros(1), &DMatrix::identity(1, 1)).unwrap_err();
        assert!(matches!(err, PrepError::Numerical(_)));
    }
}
