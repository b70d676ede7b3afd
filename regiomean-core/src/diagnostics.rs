//! Non-fatal conditions recorded during a run
//!
//! Fatal problems are returned as [`RegiomeanError`](crate::errors::RegiomeanError).
//! Everything collected here leaves the run going: the affected region is left out
//! of the output and the condition is logged and kept for the caller to inspect.

use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A region that was requested or catalogued but produced no output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoverageWarning {
    /// An allow-listed code has no region in the catalog
    NotInCatalog { code: String },
    /// A region exists but no grid point falls inside its polygon
    NoGridCells { code: String, name: String },
}

impl CoverageWarning {
    pub fn code(&self) -> &str {
        match self {
            CoverageWarning::NotInCatalog { code } => code,
            CoverageWarning::NoGridCells { code, .. } => code,
        }
    }
}

impl fmt::Display for CoverageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageWarning::NotInCatalog { code } => {
                write!(f, "Region {} not found in the region catalog", code)
            }
            CoverageWarning::NoGridCells { code, name } => {
                write!(f, "Region {} ({}) has no grid cells, skipping", code, name)
            }
        }
    }
}

/// Ordered collection of warnings raised during a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    warnings: Vec<CoverageWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (and log) a warning
    pub fn record(&mut self, warning: CoverageWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[CoverageWarning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Codes of all regions that were left out, in the order they were recorded
    pub fn omitted_codes(&self) -> Vec<&str> {
        self.warnings.iter().map(CoverageWarning::code).collect()
    }
}
