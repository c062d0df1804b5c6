//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - tabular inputs and outputs (`Dataset`, `ReturnSeries`, `CalendarSeries`)
//! - derived statistics (`MomentBundle`) and its file form (`BundleFile`)
//! - optimizer encodings (`BitVector`)
//! - resolved run settings (`StatsConfig`, `SynthConfig`, `DecodeConfig`)

pub mod types;

pub use types::*;
