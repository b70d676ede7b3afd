//! Region masking and area-weighted spatial reduction for regular lat/lon grids
//!
//! The pieces, in data-flow order:
//!
//! - [`grid`]: normalisation of coordinate axes and variable arrays
//! - [`region`]: the ordered catalog of region polygons
//! - [`mask`]: assignment of grid points to regions
//! - [`weights`]: cos(latitude) area weights
//! - [`aggregate`]: weighted means per (region, time, variable)
//! - [`tidy`]: flattening into one row per (region, time)

pub mod aggregate;
pub mod config;
pub mod diagnostics;
pub mod grid;
pub mod mask;
pub mod region;
pub mod tidy;
pub mod weights;

pub mod errors;
