//! Moment estimation over a return series.
//!
//! `MomentEstimator` owns an immutable `ReturnSeries` and derives every
//! statistic from it on first use. Each quantity is cached in a `OnceLock`, so
//! call order never matters and a shared `&MomentEstimator` can be read from
//! several threads. Derived quantities pull their own dependencies
//! (`stddev` computes `covariance` if needed).

use std::sync::OnceLock;

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::domain::{Dataset, MomentBundle, ReturnSeries, TRADING_PERIODS_PER_YEAR};
use crate::error::PrepError;

#[derive(Debug)]
pub struct MomentEstimator {
    series: ReturnSeries,
    mean: OnceLock<DVector<f64>>,
    centered: OnceLock<DMatrix<f64>>,
    covariance: OnceLock<DMatrix<f64>>,
    stddev: OnceLock<Result<DVector<f64>, PrepError>>,
    correlation: OnceLock<Result<DMatrix<f64>, PrepError>>,
    volatility: OnceLock<Result<DVector<f64>, PrepError>>,
    prices: OnceLock<Dataset>,
}

impl MomentEstimator {
    /// Requires at least two observations.
    pub fn new(series: ReturnSeries) -> Result<Self, PrepError> {
        if series.n_obs() < 2 {
            return Err(PrepError::Numerical(format!(
                "Moment estimation needs at least 2 observations, got {}.",
                series.n_obs()
            )));
        }
        debug!(obs = series.n_obs(), assets = series.n_assets(), "moment estimator ready");
        Ok(Self {
            series,
            mean: OnceLock::new(),
            centered: OnceLock::new(),
            covariance: OnceLock::new(),
            stddev: OnceLock::new(),
            correlation: OnceLock::new(),
            volatility: OnceLock::new(),
            prices: OnceLock::new(),
        })
    }

    pub fn series(&self) -> &ReturnSeries {
        &self.series
    }

    /// Per-column arithmetic mean.
    pub fn mean(&self) -> &DVector<f64> {
        self.mean.get_or_init(|| {
            let values = self.series.values();
            let t = values.nrows() as f64;
            DVector::from_fn(values.ncols(), |c, _| values.column(c).sum() / t)
        })
    }

    /// Sample covariance (divides by `T - 1`). Exactly symmetric.
    pub fn covariance(&self) -> &DMatrix<f64> {
        self.covariance.get_or_init(|| {
            let centered = self.centered();
            let n = centered.ncols();
            let denom = (centered.nrows() - 1) as f64;
            let mut cov = DMatrix::zeros(n, n);
            for i in 0..n {
                for j in i..n {
                    let v = centered.column(i).dot(&centered.column(j)) / denom;
                    cov[(i, j)] = v;
                    cov[(j, i)] = v;
                }
            }
            cov
        })
    }

    /// Square root of the covariance diagonal.
    pub fn stddev(&self) -> Result<&DVector<f64>, PrepError> {
        self.stddev
            .get_or_init(|| {
                let cov = self.covariance();
                let diag = cov.diagonal();
                if let Some((i, v)) = diag.iter().enumerate().find(|(_, v)| **v < 0.0 || v.is_nan()) {
                    return Err(PrepError::Numerical(format!(
                        "Negative variance {v} for asset '{}'.",
                        self.series.tickers()[i]
                    )));
                }
                Ok(diag.map(f64::sqrt))
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Pearson correlation computed directly from the return series.
    ///
    /// Diagonal is exactly `1.0`; off-diagonal entries are clamped to `[-1, 1]`.
    pub fn correlation(&self) -> Result<&DMatrix<f64>, PrepError> {
        self.correlation
            .get_or_init(|| {
                let centered = self.centered();
                let n = centered.ncols();
                let ss: Vec<f64> = (0..n).map(|c| centered.column(c).norm_squared()).collect();
                if let Some(i) = ss.iter().position(|v| *v <= 0.0) {
                    return Err(PrepError::Numerical(format!(
                        "Correlation undefined: asset '{}' has zero variance.",
                        self.series.tickers()[i]
                    )));
                }

                let mut corr = DMatrix::identity(n, n);
                for i in 0..n {
                    for j in (i + 1)..n {
                        let sxy = centered.column(i).dot(&centered.column(j));
                        let r = (sxy / (ss[i] * ss[j]).sqrt()).clamp(-1.0, 1.0);
                        corr[(i, j)] = r;
                        corr[(j, i)] = r;
                    }
                }
                Ok(corr)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Annualized volatility: `stddev * sqrt(252)`.
    pub fn volatility(&self) -> Result<&DVector<f64>, PrepError> {
        self.volatility
            .get_or_init(|| {
                let factor = TRADING_PERIODS_PER_YEAR.sqrt();
                self.stddev().map(|s| s.map(|v| v * factor))
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// `exp(cumsum(returns))` per column: a price index implicitly starting at 1.0.
    pub fn reconstructed_prices(&self) -> &Dataset {
        self.prices.get_or_init(|| {
            let values = self.series.values();
            let mut out = values.clone();
            for c in 0..out.ncols() {
                let mut acc = 0.0_f64;
                for r in 0..out.nrows() {
                    acc += values[(r, c)];
                    out[(r, c)] = acc.exp();
                }
            }
            Dataset::from_aligned(self.series.dates().to_vec(), self.series.tickers().to_vec(), out)
        })
    }

    /// Collect every statistic into an immutable bundle.
    pub fn bundle(&self) -> Result<MomentBundle, PrepError> {
        Ok(MomentBundle {
            tickers: self.series.tickers().to_vec(),
            observations: self.series.n_obs(),
            mean: self.mean().clone(),
            covariance: self.covariance().clone(),
            stddev: self.stddev()?.clone(),
            correlation: self.correlation()?.clone(),
            volatility: self.volatility()?.clone(),
        })
    }

    fn centered(&self) -> &DMatrix<f64> {
        self.centered.get_or_init(|| {
            let mean = self.mean();
            let mut centered = self.series.values().clone();
            for (c, mut col) in centered.column_iter_mut().enumerate() {
                // Constant columns center to exact zeros, whatever the rounding of the mean.
                let first = col[0];
                if col.iter().all(|v| *v == first) {
                    col.fill(0.0);
                } else {
                    col.add_scalar_mut(-mean[c]);
                }
            }
            centered
        })
    }
}
