//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module:
//! - initialises logging (`RUST_LOG`, optionally from `.env`)
//! - parses CLI arguments into resolved configs
//! - runs the pipeline and prints reports

use clap::Parser;
use nalgebra::{DMatrix, DVector};
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, DecodeArgs, StatsArgs, SynthArgs};
use crate::data::{default_anchor, default_tickers};
use crate::domain::{BitVector, DateRange, DecodeConfig, DecodeInputs, StatsConfig, SynthConfig};
use crate::error::PrepError;

pub mod pipeline;

/// Number of reconstructed price rows shown with `stats --prices`.
const PRICE_TAIL_ROWS: usize = 10;

/// Entry point for the `pprep` binary.
pub fn run() -> Result<(), PrepError> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Stats(args) => handle_stats(&args),
        Command::Synth(args) => handle_synth(&args),
        Command::Decode(args) => handle_decode(&args),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // Ignored when a subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_stats(args: &StatsArgs) -> Result<(), PrepError> {
    let config = stats_config_from_args(args)?;
    let run = pipeline::run_stats(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(
            &run.dataset,
            &config.range,
            config.return_mode,
            run.bundle.observations
        )
    );
    println!("{}", crate::report::format_bundle(&run.bundle));
    if config.show_prices {
        println!(
            "{}",
            crate::report::format_price_tail(run.estimator.reconstructed_prices(), PRICE_TAIL_ROWS)
        );
    }
    Ok(())
}

fn handle_synth(args: &SynthArgs) -> Result<(), PrepError> {
    let config = synth_config_from_args(args)?;
    let out = pipeline::run_synth(&config)?;

    match &out.bits {
        Some(bits) => print!("{}", crate::report::format_bit_rows(bits)),
        None => print!(
            "{}",
            crate::report::format_samples(&out.series.tickers, Some(out.series.dates.as_slice()), &out.series.values)
        ),
    }
    if let Some(path) = &config.output {
        println!("Wrote {} rows to {}", out.series.dates.len(), path.display());
    }
    Ok(())
}

fn handle_decode(args: &DecodeArgs) -> Result<(), PrepError> {
    let config = decode_config_from_args(args)?;
    let out = pipeline::run_decode(&config)?;
    print!("{}", crate::report::format_decoded(&out.tickers, &config.bits, &out.values));
    Ok(())
}

pub fn stats_config_from_args(args: &StatsArgs) -> Result<StatsConfig, PrepError> {
    Ok(StatsConfig {
        input: args.input.clone(),
        range: DateRange::new(args.start, args.end)?,
        return_mode: args.mode,
        export_bundle: args.export.clone(),
        show_prices: args.prices,
    })
}

pub fn synth_config_from_args(args: &SynthArgs) -> Result<SynthConfig, PrepError> {
    let mean = DVector::from_vec(args.mean.clone());
    let covariance = parse_matrix(&args.cov)?;
    let tickers = match &args.tickers {
        Some(t) => t.iter().map(|s| s.trim().to_string()).collect(),
        None if mean.len() == crate::data::DEFAULT_TICKERS.len() => default_tickers(),
        None => (0..mean.len()).map(|i| format!("asset{i}")).collect(),
    };
    Ok(SynthConfig {
        mean,
        covariance,
        n: args.count,
        seed: args.seed,
        binary: args.binary,
        rescale: args.rescale,
        anchor: args.anchor.unwrap_or_else(default_anchor),
        tickers,
        output: args.output.clone(),
    })
}

pub fn decode_config_from_args(args: &DecodeArgs) -> Result<DecodeConfig, PrepError> {
    let bits: BitVector = args.bits.parse()?;
    let inputs = match (&args.bundle, &args.mean, &args.cov) {
        (Some(path), _, _) => DecodeInputs::Bundle(path.clone()),
        (None, Some(mean), Some(cov)) => DecodeInputs::Inline {
            mean: DVector::from_vec(mean.clone()),
            covariance: parse_matrix(cov)?,
        },
        _ => {
            return Err(PrepError::Configuration(
                "Provide either --bundle or both --mean and --cov.".to_string(),
            ));
        }
    };
    Ok(DecodeConfig { bits, inputs })
}

/// Parse `"a,b;c,d"` into a row-major matrix.
pub fn parse_matrix(s: &str) -> Result<DMatrix<f64>, PrepError> {
    let rows: Vec<Vec<f64>> = s
        .split(';')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| {
            r.split(',')
                .map(|v| {
                    v.trim()
                        .parse::<f64>()
                        .map_err(|_| PrepError::InvalidInput(format!("Invalid matrix entry '{}'.", v.trim())))
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<_, _>>()?;

    let n_rows = rows.len();
    let n_cols = rows.first().map(Vec::len).unwrap_or(0);
    if let Some(bad) = rows.iter().find(|r| r.len() != n_cols) {
        return Err(PrepError::dimension("matrix row length", n_cols, bad.len()));
    }
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Ok(DMatrix::from_row_slice(n_rows, n_cols, &flat))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_matrix_reads_rows() {
        let m = parse_matrix("1, 0.5; 0.5, 2").unwrap();
        assert_eq!(m.shape(), (2, 2));
        assert_eq!(m[(0, 1)], 0.5);
        assert_eq!(m[(1, 1)], 2.0);
    }

    #[test]
    fn parse_matrix_rejects_ragged_rows() {
        assert!(matches!(
            parse_matrix("1,0;0"),
            Err(PrepError::DimensionMismatch { .. })
        ));
        assert!(matches!(parse_matrix("1,x"), Err(PrepError::InvalidInput(_))));
    }

    #[test]
    fn cli_resolves_synth_defaults() {
        let cli = crate::cli::Cli::try_parse_from(["pprep", "synth", "--mean", "0,0,0", "--cov", "1,0,0;0,1,0;0,0,1"])
            .unwrap();
        let Command::Synth(args) = cli.command else {
            panic!("expected synth");
        };
        let config = synth_config_from_args(&args).unwrap();
        assert_eq!(config.n, 12);
        assert_eq!(config.seed, 42);
        assert_eq!(config.anchor, default_anchor());
        assert_eq!(config.tickers, default_tickers());
    }

    #[test]
    fn cli_rejects_inverted_range() {
        let cli = crate::cli::Cli::try_parse_from([
            "pprep", "stats", "--input", "x.csv", "--start", "2024-02-01", "--end", "2024-01-01",
        ])
        .unwrap();
        let Command::Stats(args) = cli.command else {
            panic!("expected stats");
        };
        assert!(matches!(stats_config_from_args(&args), Err(PrepError::Configuration(_))));
    }

    #[test]
    fn decode_needs_some_inputs() {
        let cli = crate::cli::Cli::try_parse_from(["pprep", "decode", "--bits", "01"]).unwrap();
        let Command::Decode(args) = cli.command else {
            panic!("expected decode");
        };
        assert!(matches!(decode_config_from_args(&args), Err(PrepError::Configuration(_))));
    }
}
