//! `portfolio-prep` library crate.
//!
//! Prepares statistical inputs for portfolio optimization:
//!
//! - load a date-bounded price table (`io::ingest`)
//! - convert it to log-returns (`math::returns`)
//! - estimate the moment bundle (`math::moments`)
//! - generate seeded synthetic data (`data`)
//! - decode optimizer bitstrings (`math::decode`)
//!
//! The binary (`pprep`) is a thin wrapper around this library.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod report;
