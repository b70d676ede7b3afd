//! Ordered catalog of named regions (typically countries)
//!
//! Region ids are positions in the catalog (`0..N-1`). Catalog order matters: when
//! polygons overlap, the region with the lowest id claims the shared grid points.

use crate::errors::{RegiomeanError, RegiomeanResult};
use geo::{BoundingRect, Coord, LineString, MultiPolygon, Rect};
use std::collections::HashSet;

/// Index of a region within its catalog
pub type RegionId = usize;

/// A region as supplied by a boundary loader, before validation
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDefinition {
    /// Unique short code (e.g. ISO 3166-1 alpha-3)
    pub code: String,
    /// Display name
    pub name: String,
    /// Boundary in the grid's lon/lat coordinate space
    pub geometry: MultiPolygon<f64>,
}

impl RegionDefinition {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        geometry: impl Into<MultiPolygon<f64>>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            geometry: geometry.into(),
        }
    }
}

/// A validated, immutable region
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    id: RegionId,
    code: String,
    name: String,
    geometry: MultiPolygon<f64>,
    bounds: Rect<f64>,
}

impl Region {
    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// Bounding box of the whole geometry, used to prefilter containment tests
    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }
}

/// Ordered collection of regions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegionCatalog {
    regions: Vec<Region>,
}

impl RegionCatalog {
    /// Validate and number a list of region definitions
    ///
    /// # Errors
    ///
    /// * [`RegiomeanError::DuplicateRegionCode`] if two definitions share a code
    /// * [`RegiomeanError::InvalidGeometry`] if a geometry is empty, has a degenerate
    ///   ring or contains non-finite coordinates
    pub fn new(definitions: Vec<RegionDefinition>) -> RegiomeanResult<Self> {
        let mut seen = HashSet::new();
        let mut regions = Vec::with_capacity(definitions.len());

        for (id, definition) in definitions.into_iter().enumerate() {
            if !seen.insert(definition.code.clone()) {
                return Err(RegiomeanError::DuplicateRegionCode(definition.code));
            }
            let bounds = validate_geometry(&definition.code, &definition.geometry)?;
            regions.push(Region {
                id,
                code: definition.code,
                name: definition.name,
                geometry: definition.geometry,
                bounds,
            });
        }

        Ok(Self { regions })
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id)
    }

    pub fn by_code(&self, code: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.code == code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.regions.iter().map(|r| r.code.as_str()).collect()
    }

    /// Keep only the regions whose code is in `codes`
    ///
    /// Catalog order is preserved and ids are renumbered from zero. Returns the
    /// subset together with the requested codes that were not found, sorted.
    pub fn select<S: AsRef<str>>(&self, codes: &[S]) -> (RegionCatalog, Vec<String>) {
        let wanted: HashSet<&str> = codes.iter().map(|c| c.as_ref()).collect();

        let regions: Vec<Region> = self
            .regions
            .iter()
            .filter(|r| wanted.contains(r.code.as_str()))
            .enumerate()
            .map(|(id, r)| Region { id, ..r.clone() })
            .collect();

        let found: HashSet<&str> = regions.iter().map(|r| r.code.as_str()).collect();
        let mut missing: Vec<String> = wanted
            .difference(&found)
            .map(|c| c.to_string())
            .collect();
        missing.sort();

        (RegionCatalog { regions }, missing)
    }
}

fn validate_geometry(code: &str, geometry: &MultiPolygon<f64>) -> RegiomeanResult<Rect<f64>> {
    let invalid = |reason: String| RegiomeanError::InvalidGeometry {
        code: code.to_string(),
        reason,
    };

    if geometry.0.is_empty() {
        return Err(invalid("geometry has no polygons".to_string()));
    }

    for (index, polygon) in geometry.0.iter().enumerate() {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            validate_ring(ring).map_err(|reason| invalid(format!("polygon {index}: {reason}")))?;
        }
    }

    geometry
        .bounding_rect()
        .ok_or_else(|| invalid("geometry has no bounding box".to_string()))
}

fn validate_ring(ring: &LineString<f64>) -> Result<(), String> {
    if ring.0.len() < 4 {
        return Err(format!(
            "ring has {} coordinates, at least 4 are required",
            ring.0.len()
        ));
    }
    if !ring.is_closed() {
        return Err("ring is not closed".to_string());
    }
    if let Some(c) = ring.0.iter().find(|c: &&Coord<f64>| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(format!("non-finite vertex ({}, {})", c.x, c.y));
    }
    Ok(())
}
