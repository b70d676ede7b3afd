//! Regular latitude/longitude grids carrying one or more gridded variables
//!
//! A [`GriddedDataset`] is always normalised on construction:
//!
//! - longitude strictly ascending within `[-180, 180)` (0..360 inputs are wrapped)
//! - latitude strictly ascending (south to north)
//! - time parsed into timestamps and non-decreasing
//!
//! Every reordering of an axis is applied to every variable array at the same time,
//! so values never drift away from their coordinates.
//!
//! # Examples
//!
//! ```rust
//! use ndarray::Array3;
//! use regiomean_core::grid::{GriddedDataset, RawDataset, TimeValues, Variable};
//!
//! let raw = RawDataset {
//!     latitude: vec![10.0, -10.0],
//!     longitude: vec![350.0, 10.0],
//!     time: TimeValues::Strings(vec!["2020-01-01".to_string()]),
//!     variables: vec![Variable::new("t2m", Array3::zeros((1, 2, 2)))],
//! };
//!
//! let ds = GriddedDataset::from_raw(raw).unwrap();
//! assert_eq!(ds.longitude().to_vec(), vec![-10.0, 10.0]);
//! assert_eq!(ds.latitude().to_vec(), vec![-10.0, 10.0]);
//! ```

use crate::errors::{RegiomeanError, RegiomeanResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::info;
use ndarray::{Array1, Array3, Axis};
use serde::{Deserialize, Serialize};

/// Floating point type used for coordinates, weights and data values
pub type FloatValue = f64;

/// Returns true if a data value should be treated as missing
///
/// NaN is the explicit missing marker; infinities are never usable either.
pub fn is_missing(value: FloatValue) -> bool {
    !value.is_finite()
}

/// Time axis as supplied by a loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimeValues {
    /// Already-parsed timestamps (naive UTC)
    Timestamps(Vec<NaiveDateTime>),
    /// Textual timestamps that still need parsing
    Strings(Vec<String>),
}

impl TimeValues {
    pub fn len(&self) -> usize {
        match self {
            TimeValues::Timestamps(values) => values.len(),
            TimeValues::Strings(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert into timestamps, failing on the first entry that cannot be parsed
    pub fn into_timestamps(self) -> RegiomeanResult<Vec<NaiveDateTime>> {
        match self {
            TimeValues::Timestamps(values) => Ok(values),
            TimeValues::Strings(values) => values
                .iter()
                .enumerate()
                .map(|(index, value)| {
                    parse_timestamp(value).ok_or_else(|| RegiomeanError::TimeParse {
                        index,
                        value: value.clone(),
                    })
                })
                .collect(),
        }
    }
}

/// Parse a single timestamp
///
/// Accepts RFC 3339 (offsets are converted to UTC), `YYYY-MM-DDTHH:MM:SS[.f]`,
/// `YYYY-MM-DD HH:MM:SS[.f]` and bare `YYYY-MM-DD` dates (midnight).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// A named gridded field indexed by (time, lat, lon)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub values: Array3<FloatValue>,
}

impl Variable {
    pub fn new(name: impl Into<String>, values: Array3<FloatValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Un-normalised dataset as handed over by a file loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDataset {
    pub latitude: Vec<FloatValue>,
    pub longitude: Vec<FloatValue>,
    pub time: TimeValues,
    /// Variables in their declared order
    pub variables: Vec<Variable>,
}

/// Normalised regular lat/lon dataset
///
/// Immutable once built. See the [module documentation](self) for the invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GriddedDataset {
    latitude: Array1<FloatValue>,
    longitude: Array1<FloatValue>,
    time: Vec<NaiveDateTime>,
    variables: Vec<Variable>,
}

impl GriddedDataset {
    /// Normalise a raw dataset
    ///
    /// # Errors
    ///
    /// * [`RegiomeanError::TimeParse`] if a time entry is unparseable
    /// * [`RegiomeanError::ShapeMismatch`] if a variable does not match the axes
    /// * [`RegiomeanError::InvalidCoordinates`] if an axis is empty, non-finite,
    ///   out of range or not strictly monotonic after normalisation
    pub fn from_raw(raw: RawDataset) -> RegiomeanResult<Self> {
        let RawDataset {
            latitude,
            longitude,
            time,
            mut variables,
        } = raw;

        let mut time = time.into_timestamps()?;
        let expected = [time.len(), latitude.len(), longitude.len()];
        for variable in &variables {
            if variable.values.shape() != expected {
                return Err(RegiomeanError::ShapeMismatch {
                    variable: variable.name.clone(),
                    expected,
                    actual: variable.values.shape().to_vec(),
                });
            }
        }

        check_finite("latitude", &latitude)?;
        check_finite("longitude", &longitude)?;

        info!(
            "Loading dataset: time={}, latitude={}, longitude={}, variables={:?}",
            expected[0],
            expected[1],
            expected[2],
            variables.iter().map(|v| v.name.as_str()).collect::<Vec<_>>()
        );

        // Wrap 0..360 longitudes onto -180..180
        let mut longitude = Array1::from(longitude);
        if longitude.iter().any(|&lon| lon >= 180.0) {
            longitude.mapv_inplace(wrap_longitude);
            let order = argsort(&longitude.to_vec());
            longitude = longitude.select(Axis(0), &order);
            for variable in variables.iter_mut() {
                variable.values = variable.values.select(Axis(2), &order);
            }
        }
        if let (Some(min), Some(max)) = (longitude.first(), longitude.last()) {
            info!("Wrapped lon min/max: {} {}", min, max);
        }

        // Sort latitude from south to north
        let mut latitude = Array1::from(latitude);
        let descending = matches!(
            (latitude.first(), latitude.last()),
            (Some(first), Some(last)) if first > last
        );
        if descending {
            info!("Sorting latitude (descending -> ascending)");
            latitude.invert_axis(Axis(0));
            for variable in variables.iter_mut() {
                variable.values.invert_axis(Axis(1));
            }
        }

        if !time.windows(2).all(|w| w[0] <= w[1]) {
            info!("Sorting time axis");
            let mut order: Vec<usize> = (0..time.len()).collect();
            order.sort_by_key(|&i| time[i]);
            time = order.iter().map(|&i| time[i]).collect();
            for variable in variables.iter_mut() {
                variable.values = variable.values.select(Axis(0), &order);
            }
        }

        check_strictly_ascending("latitude", &latitude)?;
        check_strictly_ascending("longitude", &longitude)?;
        check_range("latitude", &latitude, -90.0, 90.0, true)?;
        check_range("longitude", &longitude, -180.0, 180.0, false)?;

        Ok(Self {
            latitude,
            longitude,
            time,
            variables,
        })
    }

    pub fn latitude(&self) -> &Array1<FloatValue> {
        &self.latitude
    }

    pub fn longitude(&self) -> &Array1<FloatValue> {
        &self.longitude
    }

    pub fn time(&self) -> &[NaiveDateTime] {
        &self.time
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Variable names in their declared order
    pub fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name.clone()).collect()
    }

    /// (time, lat, lon) shape shared by every variable
    pub fn shape(&self) -> [usize; 3] {
        [self.time.len(), self.latitude.len(), self.longitude.len()]
    }
}

/// Map a longitude onto `[-180, 180)`
pub fn wrap_longitude(lon: FloatValue) -> FloatValue {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

fn argsort(values: &[FloatValue]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    order
}

fn invalid(axis: &str, reason: String) -> RegiomeanError {
    RegiomeanError::InvalidCoordinates {
        axis: axis.to_string(),
        reason,
    }
}

fn check_finite(axis: &str, values: &[FloatValue]) -> RegiomeanResult<()> {
    if values.is_empty() {
        return Err(invalid(axis, "axis is empty".to_string()));
    }
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(invalid(
            axis,
            format!("non-finite value {} at index {}", values[index], index),
        )),
        None => Ok(()),
    }
}

fn check_strictly_ascending(axis: &str, values: &Array1<FloatValue>) -> RegiomeanResult<()> {
    for (index, pair) in values.windows(2).into_iter().enumerate() {
        if pair[0] >= pair[1] {
            return Err(invalid(
                axis,
                format!(
                    "not strictly ascending at index {}: {} >= {}",
                    index + 1,
                    pair[0],
                    pair[1]
                ),
            ));
        }
    }
    Ok(())
}

fn check_range(
    axis: &str,
    values: &Array1<FloatValue>,
    min: FloatValue,
    max: FloatValue,
    max_inclusive: bool,
) -> RegiomeanResult<()> {
    let outside = values
        .iter()
        .find(|&&v| v < min || v > max || (!max_inclusive && v == max));
    match outside {
        Some(v) => Err(invalid(
            axis,
            format!(
                "value {} outside [{}, {}{}",
                v,
                min,
                max,
                if max_inclusive { "]" } else { ")" }
            ),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn raw(latitude: Vec<f64>, longitude: Vec<f64>, values: Array3<f64>) -> RawDataset {
        let n_time = values.shape()[0];
        RawDataset {
            latitude,
            longitude,
            time: TimeValues::Strings(
                (0..n_time)
                    .map(|i| format!("2020-{:02}-01", i + 1))
                    .collect(),
            ),
            variables: vec![Variable::new("t2m", values)],
        }
    }

    #[test]
    fn wrap_longitude_values() {
        assert_eq!(wrap_longitude(350.0), -10.0);
        assert_eq!(wrap_longitude(10.0), 10.0);
        assert_eq!(wrap_longitude(180.0), -180.0);
        assert_eq!(wrap_longitude(0.0), 0.0);
        assert_eq!(wrap_longitude(359.75), -0.25);
    }

    #[test]
    fn longitude_0_360_is_wrapped_and_data_follows() {
        // lon values 350 and 10, data tagged by longitude
        let values = array![[[350.0, 10.0]]];
        let ds = GriddedDataset::from_raw(raw(vec![0.0], vec![350.0, 10.0], values)).unwrap();

        assert_eq!(ds.longitude().to_vec(), vec![-10.0, 10.0]);
        let v = &ds.variables()[0].values;
        assert_eq!(v[[0, 0, 0]], 350.0);
        assert_eq!(v[[0, 0, 1]], 10.0);
    }

    #[test]
    fn full_0_360_axis_is_reordered() {
        let lon = vec![0.0, 90.0, 180.0, 270.0];
        let values = array![[[0.0, 90.0, 180.0, 270.0]]];
        let ds = GriddedDataset::from_raw(raw(vec![0.0], lon, values)).unwrap();

        assert_eq!(ds.longitude().to_vec(), vec![-180.0, -90.0, 0.0, 90.0]);
        assert_eq!(
            ds.variables()[0].values.iter().copied().collect::<Vec<_>>(),
            vec![180.0, 270.0, 0.0, 90.0]
        );
    }

    #[test]
    fn descending_latitude_is_reversed_with_data() {
        let values = array![[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]];
        let ds =
            GriddedDataset::from_raw(raw(vec![45.0, 0.0, -45.0], vec![-10.0, 10.0], values))
                .unwrap();

        assert_eq!(ds.latitude().to_vec(), vec![-45.0, 0.0, 45.0]);
        let v = &ds.variables()[0].values;
        assert_eq!(v[[0, 0, 0]], 5.0);
        assert_eq!(v[[0, 0, 1]], 6.0);
        assert_eq!(v[[0, 2, 0]], 1.0);
    }

    #[test]
    fn unsorted_time_is_sorted_with_data() {
        let mut input = raw(vec![0.0], vec![0.0], array![[[2.0]], [[1.0]]]);
        input.time = TimeValues::Strings(vec!["2021-01-01".into(), "2020-01-01".into()]);
        let ds = GriddedDataset::from_raw(input).unwrap();

        assert_eq!(ds.time()[0], parse_timestamp("2020-01-01").unwrap());
        assert_eq!(ds.variables()[0].values[[0, 0, 0]], 1.0);
        assert_eq!(ds.variables()[0].values[[1, 0, 0]], 2.0);
    }

    #[test]
    fn parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2003, 2, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2003-02-01T12:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2003-02-01 12:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2003-02-01T12:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2003-02-01T14:00:00+02:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2003-02-01"),
            NaiveDate::from_ymd_opt(2003, 2, 1).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("February 2003"), None);
    }

    #[test]
    fn unparseable_time_fails() {
        let mut input = raw(vec![0.0], vec![0.0], array![[[1.0]], [[2.0]]]);
        input.time = TimeValues::Strings(vec!["2020-01-01".into(), "not a date".into()]);
        let err = GriddedDataset::from_raw(input).unwrap_err();

        match err {
            RegiomeanError::TimeParse { index, value } => {
                assert_eq!(index, 1);
                assert_eq!(value, "not a date");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn shape_mismatch_fails() {
        let input = raw(vec![0.0, 1.0], vec![0.0], array![[[1.0]]]);
        assert!(matches!(
            GriddedDataset::from_raw(input),
            Err(RegiomeanError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn non_monotonic_latitude_fails() {
        let values = Array3::zeros((1, 3, 1));
        let input = raw(vec![-10.0, 20.0, 10.0], vec![0.0], values);
        assert!(matches!(
            GriddedDataset::from_raw(input),
            Err(RegiomeanError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn duplicate_longitude_after_wrap_fails() {
        // 0 and 360 collapse onto the same point
        let values = Array3::zeros((1, 1, 2));
        let input = raw(vec![0.0], vec![0.0, 360.0], values);
        assert!(matches!(
            GriddedDataset::from_raw(input),
            Err(RegiomeanError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn out_of_range_coordinates_fail() {
        let input = raw(vec![0.0], vec![-200.0, 0.0], Array3::zeros((1, 1, 2)));
        assert!(GriddedDataset::from_raw(input).is_err());

        let input = raw(vec![0.0, 95.0], vec![0.0], Array3::zeros((1, 2, 1)));
        assert!(GriddedDataset::from_raw(input).is_err());

        let input = raw(vec![f64::NAN], vec![0.0], Array3::zeros((1, 1, 1)));
        assert!(GriddedDataset::from_raw(input).is_err());
    }

    #[test]
    fn normalised_axes_are_strictly_ascending() {
        let lon: Vec<f64> = (0..8).map(|i| i as f64 * 45.0).collect();
        let lat = vec![60.0, 30.0, 0.0, -30.0, -60.0];
        let ds =
            GriddedDataset::from_raw(raw(lat, lon, Array3::zeros((2, 5, 8)))).unwrap();

        assert!(ds.latitude().windows(2).into_iter().all(|w| w[0] < w[1]));
        assert!(ds.longitude().windows(2).into_iter().all(|w| w[0] < w[1]));
        assert!(ds
            .longitude()
            .iter()
            .all(|&lon| (-180.0..180.0).contains(&lon)));
        assert_eq!(ds.shape(), [2, 5, 8]);
    }

    #[test]
    fn missing_marker() {
        assert!(is_missing(f64::NAN));
        assert!(is_missing(f64::INFINITY));
        assert!(!is_missing(0.0));
    }
}
