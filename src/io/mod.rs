//! Input/output helpers.
//!
//! - CSV price-table ingest (`ingest`)
//! - calendar series CSV export (`export`)
//! - moment bundle JSON read/write (`bundle`)

pub mod bundle;
pub mod export;
pub mod ingest;

pub use bundle::*;
pub use export::*;
pub use ingest::*;
