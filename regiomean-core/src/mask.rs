//! Assignment of grid points to regions
//!
//! Each grid point (the point itself, not a cell polygon) is tested against the
//! region polygons with an even-odd ray-crossing test. A point is assigned wholly
//! to one region or to none; there is no fractional overlap.
//!
//! Edges are treated as half-open, so a point lying exactly on an edge shared by
//! two abutting polygons is claimed by exactly one of them: the polygon on its
//! east side (or north side, for a horizontal edge).

use crate::errors::{RegiomeanError, RegiomeanResult};
use crate::grid::FloatValue;
use crate::region::{Region, RegionCatalog, RegionId};
use geo::{LineString, MultiPolygon, Polygon};
use log::{debug, info, warn};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// (lat-index, lon-index) of a grid point
pub type CellIndex = (usize, usize);

/// How to resolve a grid point that falls inside more than one region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverlapPolicy {
    /// The region with the lowest catalog id wins
    #[default]
    FirstWins,
    /// Any doubly-claimed point is an error
    Reject,
}

/// Per-cell region assignment for a lat/lon grid
///
/// Alongside the dense (lat, lon) assignment the mask keeps a sparse list of member
/// cells for every region, so reductions never need a full-grid copy per region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMask {
    assignment: Array2<Option<RegionId>>,
    members: Vec<Vec<CellIndex>>,
}

impl RegionMask {
    /// Region assigned to a grid point, if any
    pub fn region_at(&self, lat_index: usize, lon_index: usize) -> Option<RegionId> {
        self.assignment
            .get((lat_index, lon_index))
            .copied()
            .flatten()
    }

    /// Dense (lat, lon) view of the assignment
    pub fn assignment(&self) -> &Array2<Option<RegionId>> {
        &self.assignment
    }

    /// Member cells of a region, in row-major grid order
    pub fn members(&self, id: RegionId) -> &[CellIndex] {
        self.members.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cell_count(&self, id: RegionId) -> usize {
        self.members(id).len()
    }

    /// Number of regions the mask was built for (including empty ones)
    pub fn n_regions(&self) -> usize {
        self.members.len()
    }

    /// Ids of regions with at least one member cell
    pub fn covered_regions(&self) -> impl Iterator<Item = RegionId> + '_ {
        (0..self.members.len()).filter(|&id| !self.members[id].is_empty())
    }

    /// Ids of regions without any member cell
    pub fn empty_regions(&self) -> impl Iterator<Item = RegionId> + '_ {
        (0..self.members.len()).filter(|&id| self.members[id].is_empty())
    }

    /// True if no grid point is assigned to any region
    pub fn is_empty(&self) -> bool {
        self.members.iter().all(Vec::is_empty)
    }

    /// (lat, lon) shape of the mask
    pub fn shape(&self) -> (usize, usize) {
        self.assignment.dim()
    }
}

/// Builds a [`RegionMask`] from grid axes and a [`RegionCatalog`]
#[derive(Debug, Clone, Default)]
pub struct RegionMaskBuilder {
    overlap_policy: OverlapPolicy,
    parallel: bool,
}

impl RegionMaskBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overlap_policy(mut self, overlap_policy: OverlapPolicy) -> Self {
        self.overlap_policy = overlap_policy;
        self
    }

    /// Test regions concurrently. The result is identical to a sequential build.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Assign every grid point to at most one region
    ///
    /// `latitude` and `longitude` must be strictly ascending (as produced by
    /// [`GriddedDataset`](crate::grid::GriddedDataset)).
    ///
    /// # Errors
    ///
    /// [`RegiomeanError::OverlappingRegions`] if the overlap policy is
    /// [`OverlapPolicy::Reject`] and a grid point lies inside two regions.
    pub fn build(
        &self,
        latitude: &Array1<FloatValue>,
        longitude: &Array1<FloatValue>,
        catalog: &RegionCatalog,
    ) -> RegiomeanResult<RegionMask> {
        info!("Creating region mask for the grid...");

        let lat = latitude.to_vec();
        let lon = longitude.to_vec();
        let regions: Vec<&Region> = catalog.iter().collect();

        let candidates: Vec<Vec<CellIndex>> = if self.parallel {
            regions
                .par_iter()
                .map(|region| contained_cells(region, &lat, &lon))
                .collect()
        } else {
            regions
                .iter()
                .map(|region| contained_cells(region, &lat, &lon))
                .collect()
        };

        let mut assignment: Array2<Option<RegionId>> =
            Array2::from_elem((lat.len(), lon.len()), None);
        let mut members = vec![Vec::new(); regions.len()];
        let mut n_overlapping = 0usize;

        // Lowest id first, so earlier regions keep contested points
        for (id, cells) in candidates.into_iter().enumerate() {
            for (i, j) in cells {
                let current = assignment[[i, j]];
                match current {
                    None => {
                        assignment[[i, j]] = Some(id);
                        members[id].push((i, j));
                    }
                    Some(owner) => match self.overlap_policy {
                        OverlapPolicy::FirstWins => n_overlapping += 1,
                        OverlapPolicy::Reject => {
                            return Err(RegiomeanError::OverlappingRegions {
                                lat: lat[i],
                                lon: lon[j],
                                first: regions[owner].code().to_string(),
                                second: regions[id].code().to_string(),
                            })
                        }
                    },
                }
            }
            debug!(
                "Region {} ({}) has {} grid cells",
                id,
                regions[id].code(),
                members[id].len()
            );
        }

        if n_overlapping > 0 {
            warn!(
                "{} grid points fall inside more than one region; the first region in catalog order was kept",
                n_overlapping
            );
        }

        let mask = RegionMask {
            assignment,
            members,
        };
        info!("Mask all unassigned?: {}", mask.is_empty());
        info!("Mask shape: {:?}", mask.shape());
        info!("Number of regions: {}", mask.n_regions());

        Ok(mask)
    }
}

/// Grid points inside a region, found by a bounding-box prefilter followed by the exact test
fn contained_cells(region: &Region, lat: &[FloatValue], lon: &[FloatValue]) -> Vec<CellIndex> {
    let bounds = region.bounds();
    let lat_range = index_range(lat, bounds.min().y, bounds.max().y);
    let lon_range = index_range(lon, bounds.min().x, bounds.max().x);

    let mut cells = Vec::new();
    for i in lat_range {
        for j in lon_range.clone() {
            if contains_point(region.geometry(), lon[j], lat[i]) {
                cells.push((i, j));
            }
        }
    }
    cells
}

/// Indices of an ascending axis whose values lie in `[min, max]`
fn index_range(axis: &[FloatValue], min: FloatValue, max: FloatValue) -> std::ops::Range<usize> {
    let start = axis.partition_point(|&v| v < min);
    let end = axis.partition_point(|&v| v <= max);
    start..end.max(start)
}

/// Even-odd containment test of the point `(x, y)` against a multi-polygon
pub fn contains_point(geometry: &MultiPolygon<f64>, x: FloatValue, y: FloatValue) -> bool {
    geometry.0.iter().any(|polygon| polygon_contains(polygon, x, y))
}

fn polygon_contains(polygon: &Polygon<f64>, x: FloatValue, y: FloatValue) -> bool {
    // Holes flip parity just like the exterior does
    let crossings: usize = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring_crossings(ring, x, y))
        .sum();
    crossings % 2 == 1
}

/// Number of ring edges crossed by a ray cast from `(x, y)` towards +x
fn ring_crossings(ring: &LineString<f64>, x: FloatValue, y: FloatValue) -> usize {
    ring.lines()
        .filter(|line| {
            let (a, b) = (line.start, line.end);
            if (a.y > y) == (b.y > y) {
                return false;
            }
            let x_cross = a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y);
            x < x_cross
        })
        .count()
}
