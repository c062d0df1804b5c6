//! Shared run logic behind the `pprep` subcommands.
//!
//! Each function takes a resolved config and returns plain outputs; printing
//! and exit codes stay in `app`.

use nalgebra::DMatrix;
use tracing::info;

use crate::data;
use crate::domain::{
    BitVector, BundleFile, CalendarSeries, Dataset, DecodeConfig, DecodeInputs, MomentBundle, StatsConfig,
    SynthConfig,
};
use crate::error::PrepError;
use crate::io::{TimeSeriesLoader, read_bundle_json, write_bundle_json, write_calendar_series};
use crate::math::{MomentEstimator, decode, to_return_series};

/// Outputs of a `pprep stats` run.
#[derive(Debug)]
pub struct StatsOutput {
    pub dataset: Dataset,
    pub estimator: MomentEstimator,
    pub bundle: MomentBundle,
}

/// Loader -> log-returns -> moment bundle, plus the optional JSON export.
pub fn run_stats(config: &StatsConfig) -> Result<StatsOutput, PrepError> {
    let loader = TimeSeriesLoader::from_path(config.range, &config.input);
    let dataset = loader.load()?;

    let returns = to_return_series(&dataset, config.return_mode)?;
    let estimator = MomentEstimator::new(returns)?;
    let bundle = estimator.bundle()?;
    info!(
        assets = bundle.tickers.len(),
        observations = bundle.observations,
        "moment bundle computed"
    );

    if let Some(path) = &config.export_bundle {
        let file = BundleFile::from_bundle(&bundle, config.range, config.return_mode);
        write_bundle_json(path, &file)?;
        info!(path = %path.display(), "bundle exported");
    }

    Ok(StatsOutput {
        dataset,
        estimator,
        bundle,
    })
}

/// Outputs of a `pprep synth` run.
#[derive(Debug, Clone)]
pub struct SynthOutput {
    /// Values as written: continuous draws, or 0/1 when binary.
    pub series: CalendarSeries,
    pub bits: Option<Vec<BitVector>>,
}

pub fn run_synth(config: &SynthConfig) -> Result<SynthOutput, PrepError> {
    let mut samples = data::sample_seeded(config.n, &config.mean, &config.covariance, config.seed)?;
    if config.rescale {
        samples = data::rescale_to_moments(&samples, &config.mean, &config.covariance)?;
    }

    let bits = config.binary.then(|| data::threshold(&samples));
    if let Some(bits) = &bits {
        samples = DMatrix::from_fn(samples.nrows(), samples.ncols(), |r, c| {
            if bits[r].get(c).unwrap_or(false) { 1.0 } else { 0.0 }
        });
    }

    let series = data::sample_as_calendar_series(&samples, config.anchor, &config.tickers)?;
    if let Some(path) = &config.output {
        write_calendar_series(path, &series)?;
    }

    Ok(SynthOutput { series, bits })
}

/// Outputs of a `pprep decode` run.
#[derive(Debug, Clone)]
pub struct DecodeOutput {
    pub tickers: Vec<String>,
    pub values: nalgebra::DVector<f64>,
}

pub fn run_decode(config: &DecodeConfig) -> Result<DecodeOutput, PrepError> {
    let (tickers, mean, covariance) = match &config.inputs {
        DecodeInputs::Bundle(path) => {
            let bundle = read_bundle_json(path)?.to_bundle()?;
            (bundle.tickers, bundle.mean, bundle.covariance)
        }
        DecodeInputs::Inline { mean, covariance } => {
            let tickers = (0..mean.len()).map(|i| format!("asset{i}")).collect();
            (tickers, mean.clone(), covariance.clone())
        }
    };

    let values = decode(&config.bits, &mean, &covariance)?;
    Ok(DecodeOutput { tickers, values })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::NaiveDate;
    use nalgebra::DVector;

    use super::*;
    use crate::domain::{DateRange, ReturnMode};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn stats_then_decode_through_a_bundle_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("prices.csv");
        let mut f = std::fs::File::create(&input).unwrap();
        write!(
            f,
            "Date,AAA,BBB\n\
             2024-01-05,100,50\n\
             2024-01-01,101,51\n\
             2024-01-02,99,50.5\n\
             2024-01-03,102,52\n\
             2024-01-04,103,51.5\n"
        )
        .unwrap();
        drop(f);

        let bundle_path = dir.path().join("bundle.json");
        let stats = run_stats(&StatsConfig {
            input: input.clone(),
            range: DateRange::new(d(2024, 1, 1), d(2024, 1, 4)).unwrap(),
            return_mode: ReturnMode::PriceRatio,
            export_bundle: Some(bundle_path.clone()),
            show_prices: false,
        })
        .unwrap();

        assert_eq!(stats.dataset.n_rows(), 4);
        assert_eq!(stats.bundle.observations, 3);
        assert!((stats.estimator.reconstructed_prices().values()[(2, 0)] - 103.0 / 101.0).abs() < 1e-12);

        let out = run_decode(&DecodeConfig {
            bits: "10".parse().unwrap(),
            inputs: DecodeInputs::Bundle(bundle_path),
        })
        .unwrap();
        assert_eq!(out.tickers, vec!["AAA", "BBB"]);
        let expected0 = stats.bundle.mean[0] + stats.bundle.covariance[(0, 0)];
        assert!((out.values[0] - expected0).abs() < 1e-15);
    }

    #[test]
    fn synth_binary_writes_zero_one_table() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("synthetic.csv");
        let out = run_synth(&SynthConfig {
            mean: DVector::from_vec(vec![0.0, 0.0, 0.0]),
            covariance: DMatrix::identity(3, 3),
            n: 5,
            seed: 42,
            binary: true,
            rescale: false,
            anchor: d(2024, 4, 30),
            tickers: data::default_tickers(),
            output: Some(output.clone()),
        })
        .unwrap();

        assert_eq!(out.bits.as_ref().map(Vec::len), Some(5));
        assert!(out.series.values.iter().all(|v| *v == 0.0 || *v == 1.0));

        let text = std::fs::read_to_string(&output).unwrap();
        assert_eq!(text.lines().count(), 6);
        assert!(text.lines().nth(1).unwrap().starts_with("2024-04-30,"));
        assert!(text.lines().nth(5).unwrap().starts_with("2024-08-30,"));
    }

    #[test]
    fn inline_decode_checks_dimensions() {
        let err = run_decode(&DecodeConfig {
            bits: "101".parse().unwrap(),
            inputs: DecodeInputs::Inline {
                mean: DVector::zeros(2),
                covariance: DMatrix::identity(2, 2),
            },
        })
        .unwrap_err();
        assert!(matches!(err, PrepError::DimensionMismatch { .. }));
    }
}
