//! Per-country, area-weighted time series from gridded geophysical data
//!
//! The algorithmic core lives in [`regiomean_core`]; this crate wires it into a single
//! run ([`pipeline`]) and writes the resulting table ([`output`]).

pub mod output;
pub mod pipeline;

pub use regiomean_core::config::AggregationConfig;
pub use regiomean_core::errors::{RegiomeanError, RegiomeanResult};
