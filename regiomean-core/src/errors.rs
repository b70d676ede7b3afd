use thiserror::Error;

/// Error type for invalid inputs and failed aggregation runs.
#[derive(Error, Debug)]
pub enum RegiomeanError {
    #[error("Invalid {axis} coordinates: {reason}")]
    InvalidCoordinates { axis: String, reason: String },
    #[error("Could not parse time value {value:?} at index {index}")]
    TimeParse { index: usize, value: String },
    #[error("Variable {variable} has shape {actual:?}, expected {expected:?} (time, lat, lon)")]
    ShapeMismatch {
        variable: String,
        expected: [usize; 3],
        actual: Vec<usize>,
    },
    #[error("Invalid geometry for region {code}: {reason}")]
    InvalidGeometry { code: String, reason: String },
    #[error("Region code {0} appears more than once in the catalog")]
    DuplicateRegionCode(String),
    #[error("Grid point (lat={lat}, lon={lon}) is claimed by both {first} and {second}")]
    OverlappingRegions {
        lat: f64,
        lon: f64,
        first: String,
        second: String,
    },
    #[error("No regions had any grid cells with data ({n_regions} regions checked). Check region definitions and domain.")]
    NoCoverage { n_regions: usize },
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Convenience type for `Result<T, RegiomeanError>`.
pub type RegiomeanResult<T> = Result<T, RegiomeanError>;
