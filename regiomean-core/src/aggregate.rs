//! Area-weighted reduction of gridded variables to regional time series
//!
//! For a region $R$, variable $v$ and time step $t$:
//!
//! $$ \bar{x}_{R,v,t} = \frac{\sum_{c \in R,\ x_c \text{ present}} w_c \, x_c}{\sum_{c \in R,\ x_c \text{ present}} w_c} $$
//!
//! The denominator is rebuilt for every (variable, time) slice: a cell that is missing
//! in one slice is excluded from that slice only. If no member cell has a usable value
//! the result is missing, never zero.

use crate::diagnostics::{CoverageWarning, Diagnostics};
use crate::errors::{RegiomeanError, RegiomeanResult};
use crate::grid::{is_missing, FloatValue, GriddedDataset};
use crate::mask::{CellIndex, RegionMask};
use crate::region::{Region, RegionCatalog, RegionId};
use crate::weights::AreaWeights;
use chrono::NaiveDateTime;
use log::info;
use ndarray::{s, Array2, Array3, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Identity of a region that made it into the cube
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSummary {
    /// Id in the catalog the cube was built from
    pub id: RegionId,
    pub code: String,
    pub name: String,
    /// Number of grid points assigned to the region
    pub n_cells: usize,
}

/// Weighted means indexed by (region, time, variable)
///
/// Missing entries are stored as NaN and surfaced as `None` by [`value`](Self::value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedCube {
    regions: Vec<RegionSummary>,
    time: Vec<NaiveDateTime>,
    variables: Vec<String>,
    values: Array3<FloatValue>,
}

impl AggregatedCube {
    pub fn regions(&self) -> &[RegionSummary] {
        &self.regions
    }

    pub fn time(&self) -> &[NaiveDateTime] {
        &self.time
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// (region, time, variable) shape
    pub fn shape(&self) -> (usize, usize, usize) {
        self.values.dim()
    }

    /// Aggregated value, or `None` if missing or out of bounds
    pub fn value(
        &self,
        region_index: usize,
        time_index: usize,
        variable_index: usize,
    ) -> Option<FloatValue> {
        self.values
            .get((region_index, time_index, variable_index))
            .copied()
            .filter(|v| !is_missing(*v))
    }

    /// Time series of one variable for one region, looked up by code and name
    pub fn series(&self, code: &str, variable: &str) -> Option<Vec<Option<FloatValue>>> {
        let r = self.regions.iter().position(|r| r.code == code)?;
        let v = self.variables.iter().position(|name| name == variable)?;
        Some(
            (0..self.time.len())
                .map(|t| self.value(r, t, v))
                .collect(),
        )
    }
}

/// Reduces every variable of a dataset over each region's member cells
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    parallel: bool,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduce regions concurrently. The result is identical to a sequential run.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Build the aggregated cube
    ///
    /// Regions without member cells are left out and recorded as
    /// [`CoverageWarning::NoGridCells`].
    ///
    /// # Errors
    ///
    /// * [`RegiomeanError::InvalidCoordinates`] if the mask or the weights were built
    ///   for a different grid than `dataset`
    /// * [`RegiomeanError::NoCoverage`] if no region in the catalog has a member cell
    pub fn aggregate(
        &self,
        dataset: &GriddedDataset,
        catalog: &RegionCatalog,
        mask: &RegionMask,
        weights: &AreaWeights,
        diagnostics: &mut Diagnostics,
    ) -> RegiomeanResult<AggregatedCube> {
        let [_, n_lat, n_lon] = dataset.shape();
        if mask.shape() != (n_lat, n_lon) {
            return Err(RegiomeanError::InvalidCoordinates {
                axis: "mask".to_string(),
                reason: format!(
                    "mask has shape {:?}, dataset grid is {:?}",
                    mask.shape(),
                    (n_lat, n_lon)
                ),
            });
        }
        if weights.len() != n_lat {
            return Err(RegiomeanError::InvalidCoordinates {
                axis: "latitude".to_string(),
                reason: format!(
                    "{} area weights for {} latitude rows",
                    weights.len(),
                    n_lat
                ),
            });
        }

        info!("Aggregating {} regions...", catalog.len());

        let mut covered: Vec<&Region> = Vec::new();
        for region in catalog.iter() {
            if mask.members(region.id()).is_empty() {
                diagnostics.record(CoverageWarning::NoGridCells {
                    code: region.code().to_string(),
                    name: region.name().to_string(),
                });
            } else {
                covered.push(region);
            }
        }

        if covered.is_empty() {
            return Err(RegiomeanError::NoCoverage {
                n_regions: catalog.len(),
            });
        }

        let reduced: Vec<Array2<FloatValue>> = if self.parallel {
            covered
                .par_iter()
                .map(|region| reduce_region(dataset, mask.members(region.id()), weights))
                .collect()
        } else {
            covered
                .iter()
                .map(|region| reduce_region(dataset, mask.members(region.id()), weights))
                .collect()
        };

        let [n_time, _, _] = dataset.shape();
        let n_variables = dataset.variables().len();
        let mut values = Array3::from_elem((covered.len(), n_time, n_variables), FloatValue::NAN);
        for (r, region_values) in reduced.iter().enumerate() {
            values.slice_mut(s![r, .., ..]).assign(region_values);
        }

        let regions = covered
            .iter()
            .map(|region| RegionSummary {
                id: region.id(),
                code: region.code().to_string(),
                name: region.name().to_string(),
                n_cells: mask.cell_count(region.id()),
            })
            .collect();

        let cube = AggregatedCube {
            regions,
            time: dataset.time().to_vec(),
            variables: dataset.variable_names(),
            values,
        };
        info!("Final aggregated dataset dimensions: {:?}", cube.shape());

        Ok(cube)
    }
}

/// Weighted mean over `members` for every (time, variable) slice
fn reduce_region(
    dataset: &GriddedDataset,
    members: &[CellIndex],
    weights: &AreaWeights,
) -> Array2<FloatValue> {
    let [n_time, _, _] = dataset.shape();
    let mut out = Array2::from_elem((n_time, dataset.variables().len()), FloatValue::NAN);

    for (v, variable) in dataset.variables().iter().enumerate() {
        for (t, field) in variable.values.axis_iter(Axis(0)).enumerate() {
            let (numerator, denominator) = members.iter().fold((0.0, 0.0), |(num, den), &(i, j)| {
                let x = field[[i, j]];
                if is_missing(x) {
                    (num, den)
                } else {
                    let w = weights.at(i);
                    (num + w * x, den + w)
                }
            });
            if denominator > 0.0 {
                out[[t, v]] = numerator / denominator;
            }
        }
    }
    out
}
