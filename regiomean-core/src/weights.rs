//! Latitude-dependent area weights
//!
//! On a regular equirectangular grid the area of a cell is proportional to the
//! cosine of its latitude:
//!
//! $$ w(\phi) = \cos\left(\frac{\pi \phi}{180}\right) $$
//!
//! The weight depends on latitude only and is shared by every longitude in a row.
//! True ellipsoidal cell areas are not modelled.
//!
//! # Examples
//!
//! ```rust
//! use ndarray::array;
//! use regiomean_core::weights::AreaWeights;
//!
//! let weights = AreaWeights::cos_latitude(&array![-60.0, 0.0, 60.0]);
//! assert!((weights.at(0) - 0.5).abs() < 1e-12);
//! assert_eq!(weights.at(1), 1.0);
//! ```

use crate::grid::FloatValue;
use log::info;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// One non-negative weight per latitude row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaWeights {
    weights: Array1<FloatValue>,
}

impl AreaWeights {
    /// Approximate grid-cell area weights as cos(latitude)
    ///
    /// A pole row gets a tiny positive weight (about 6e-17), not zero, so cells there
    /// still count towards a region's mean. Weights are clamped at zero from below.
    pub fn cos_latitude(latitude: &Array1<FloatValue>) -> Self {
        info!("Computing area weights (cos(lat))...");
        let weights = latitude.mapv(|lat| lat.to_radians().cos().max(0.0));
        Self { weights }
    }

    /// Weight of latitude row `lat_index`
    ///
    /// # Panics
    ///
    /// Panics if `lat_index` is out of bounds
    pub fn at(&self, lat_index: usize) -> FloatValue {
        self.weights[lat_index]
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn as_array(&self) -> &Array1<FloatValue> {
        &self.weights
    }
}
