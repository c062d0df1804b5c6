//! Synthetic data: seeded multivariate-normal draws and monthly calendar dating.

pub mod calendar;
pub mod sample;

pub use calendar::*;
pub use sample::*;
