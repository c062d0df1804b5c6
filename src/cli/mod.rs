//! Command-line parsing for `pprep`.
//!
//! This module only describes arguments; `app` turns them into the resolved
//! config structs in `domain` and dispatches.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::ReturnMode;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "pprep", version, about = "Portfolio input preparation: log-returns, moments, synthetic data")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a price table, compute log-returns and print the moment bundle.
    Stats(StatsArgs),
    /// Draw a seeded multivariate-normal sample, optionally dated and written to CSV.
    Synth(SynthArgs),
    /// Decode a bitstring into per-asset values.
    Decode(DecodeArgs),
}

#[derive(Debug, Args, Clone)]
pub struct StatsArgs {
    /// CSV with a date column followed by one column per ticker.
    #[arg(short = 'i', long, value_name = "CSV")]
    pub input: PathBuf,

    /// First date to include (inclusive).
    #[arg(long, value_parser = parse_date_arg)]
    pub start: NaiveDate,

    /// Last date to include (inclusive).
    #[arg(long, value_parser = parse_date_arg)]
    pub end: NaiveDate,

    /// How cells are converted to log-returns.
    #[arg(long, value_enum, default_value_t = ReturnMode::OnePlus)]
    pub mode: ReturnMode,

    /// Write the moment bundle to a JSON file.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,

    /// Also print the tail of the reconstructed price index.
    #[arg(long)]
    pub prices: bool,
}

#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Mean vector, comma separated (e.g. `0,0,0`).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub mean: Vec<f64>,

    /// Covariance rows separated by `;`, entries by `,` (e.g. `1,0;0,1`).
    #[arg(long, allow_hyphen_values = true)]
    pub cov: String,

    /// Number of rows to draw.
    #[arg(short = 'n', long, default_value_t = 12)]
    pub count: usize,

    /// Seed for the local random generator.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Threshold draws at zero and emit 0/1 rows.
    #[arg(long)]
    pub binary: bool,

    /// Re-standardize each column to the requested mean and variance.
    #[arg(long)]
    pub rescale: bool,

    /// Date assigned to the first row; later rows advance one month each.
    #[arg(long, value_parser = parse_date_arg)]
    pub anchor: Option<NaiveDate>,

    /// Column headers for the written series (defaults to ^GSPC,^ACWX,^GLAB.L).
    #[arg(long, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,

    /// Write the dated series to this CSV (replaced if it exists).
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DecodeArgs {
    /// Bitstring, one bit per asset (e.g. `0110`).
    #[arg(long)]
    pub bits: String,

    /// Bundle JSON produced by `pprep stats --export`.
    #[arg(long, value_name = "JSON", conflicts_with_all = ["mean", "cov"])]
    pub bundle: Option<PathBuf>,

    /// Expected returns, comma separated (used with `--cov`).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, requires = "cov")]
    pub mean: Option<Vec<f64>>,

    /// Covariance rows separated by `;`, entries by `,`.
    #[arg(long, allow_hyphen_values = true, requires = "mean")]
    pub cov: Option<String>,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    crate::io::ingest::parse_date(s)
}
