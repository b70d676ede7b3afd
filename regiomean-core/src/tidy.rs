//! Flattening of an [`AggregatedCube`] into one row per (region, time)
//!
//! Columns are the identifiers `country_code`, `country_name`, `time`, `year`, `month`
//! followed by one column per variable in declared order. Rows are ordered by region
//! (catalog order) and then by time.

use crate::aggregate::AggregatedCube;
use crate::grid::FloatValue;
use chrono::{Datelike, NaiveDateTime};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Identifier columns, in output order
pub const ID_COLUMNS: [&str; 5] = ["country_code", "country_name", "time", "year", "month"];

/// A single observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidyRow {
    pub code: String,
    pub name: String,
    pub time: NaiveDateTime,
    pub year: i32,
    pub month: u32,
    /// One entry per variable, `None` where the aggregate is missing
    pub values: Vec<Option<FloatValue>>,
}

/// Value of one cell of a [`Record`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Time(NaiveDateTime),
    Integer(i64),
    Float(Option<FloatValue>),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Time(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(Some(v)) => write!(f, "{}", v),
            CellValue::Float(None) => Ok(()),
        }
    }
}

/// A row as an ordered mapping from column name to value
pub type Record = Vec<(String, CellValue)>;

/// Row-oriented result table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidyTable {
    variables: Vec<String>,
    rows: Vec<TidyRow>,
}

impl TidyTable {
    /// Column names: identifiers first, then variables
    pub fn columns(&self) -> Vec<String> {
        ID_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.variables.iter().cloned())
            .collect()
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn rows(&self) -> &[TidyRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct region codes present, in row order
    pub fn region_codes(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|r| r.code.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Rows as column-name to value mappings
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.rows.iter().map(move |row| {
            let mut record: Record = vec![
                ("country_code".to_string(), CellValue::Text(row.code.clone())),
                ("country_name".to_string(), CellValue::Text(row.name.clone())),
                ("time".to_string(), CellValue::Time(row.time)),
                ("year".to_string(), CellValue::Integer(row.year as i64)),
                ("month".to_string(), CellValue::Integer(row.month as i64)),
            ];
            record.extend(
                self.variables
                    .iter()
                    .zip(&row.values)
                    .map(|(name, value)| (name.clone(), CellValue::Float(*value))),
            );
            record
        })
    }
}

/// Builds a [`TidyTable`] restricted to an allow-list of region codes
#[derive(Debug, Clone)]
pub struct TidyAssembler {
    allowed: HashSet<String>,
}

impl TidyAssembler {
    pub fn new<S: AsRef<str>>(region_codes: &[S]) -> Self {
        Self {
            allowed: region_codes.iter().map(|c| c.as_ref().to_string()).collect(),
        }
    }

    pub fn assemble(&self, cube: &AggregatedCube) -> TidyTable {
        info!("Converting aggregated dataset to table...");
        let (_, n_time, n_variables) = cube.shape();

        let mut rows = Vec::with_capacity(cube.regions().len() * n_time);
        for (r, region) in cube.regions().iter().enumerate() {
            if !self.allowed.contains(&region.code) {
                debug!("Dropping region {} (not in allow-list)", region.code);
                continue;
            }
            for (t, time) in cube.time().iter().enumerate() {
                rows.push(TidyRow {
                    code: region.code.clone(),
                    name: region.name.clone(),
                    time: *time,
                    year: time.year(),
                    month: time.month(),
                    values: (0..n_variables).map(|v| cube.value(r, t, v)).collect(),
                });
            }
        }

        let table = TidyTable {
            variables: cube.variables().to_vec(),
            rows,
        };
        info!(
            "Final table shape: ({}, {})",
            table.len(),
            ID_COLUMNS.len() + n_variables
        );
        info!("Variables in table: {:?}", table.variables());
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::diagnostics::Diagnostics;
    use crate::grid::{GriddedDataset, RawDataset, TimeValues, Variable};
    use crate::mask::RegionMaskBuilder;
    use crate::region::{RegionCatalog, RegionDefinition};
    use crate::weights::AreaWeights;
    use geo::{polygon, Polygon};
    use ndarray::Array3;

    fn rect(x0: f64, x1: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: -90.0),
            (x: x1, y: -90.0),
            (x: x1, y: 90.0),
            (x: x0, y: 90.0),
            (x: x0, y: -90.0),
        ]
    }

    fn cube(times: &[&str]) -> AggregatedCube {
        let n = times.len();
        let ds = GriddedDataset::from_raw(RawDataset {
            latitude: vec![-45.0, -15.0, 15.0, 45.0],
            longitude: vec![-90.0, -30.0, 30.0, 90.0],
            time: TimeValues::Strings(times.iter().map(|t| t.to_string()).collect()),
            variables: vec![
                Variable::new("t2m", Array3::from_elem((n, 4, 4), 1.0)),
                Variable::new("tp", Array3::from_elem((n, 4, 4), f64::NAN)),
            ],
        })
        .unwrap();
        let catalog = RegionCatalog::new(vec![
            RegionDefinition::new("AAA", "West", rect(-180.0, 0.0)),
            RegionDefinition::new("BBB", "East", rect(0.0, 180.0)),
        ])
        .unwrap();
        let mask = RegionMaskBuilder::new()
            .build(ds.latitude(), ds.longitude(), &catalog)
            .unwrap();
        let weights = AreaWeights::cos_latitude(ds.latitude());
        Aggregator::new()
            .aggregate(&ds, &catalog, &mask, &weights, &mut Diagnostics::new())
            .unwrap()
    }

    #[test]
    fn columns_are_ids_then_variables() {
        let table = TidyAssembler::new(&["AAA", "BBB"]).assemble(&cube(&["2003-01-01"]));
        assert_eq!(
            table.columns(),
            vec!["country_code", "country_name", "time", "year", "month", "t2m", "tp"]
        );
    }

    #[test]
    fn one_row_per_region_and_time() {
        let table = TidyAssembler::new(&["AAA", "BBB"])
            .assemble(&cube(&["2003-01-01", "2003-02-01", "2003-03-01"]));

        assert_eq!(table.len(), 2 * 3);
        assert_eq!(table.region_codes(), vec!["AAA", "BBB"]);
        let first = &table.rows()[0];
        assert_eq!(first.code, "AAA");
        assert_eq!(first.name, "West");
        assert_eq!(first.values, vec![Some(1.0), None]);
        assert_eq!(table.rows()[3].code, "BBB");
    }

    #[test]
    fn year_and_month_are_derived() {
        let table = TidyAssembler::new(&["AAA"])
            .assemble(&cube(&["1999-12-31T18:00:00", "2024-02-29 00:00:00"]));

        assert_eq!((table.rows()[0].year, table.rows()[0].month), (1999, 12));
        assert_eq!((table.rows()[1].year, table.rows()[1].month), (2024, 2));
    }

    #[test]
    fn allow_list_filters_rows() {
        let table = TidyAssembler::new(&["BBB", "ZZZ"]).assemble(&cube(&["2003-01-01"]));
        assert_eq!(table.region_codes(), vec!["BBB"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn records_map_columns_to_values() {
        let table = TidyAssembler::new(&["AAA"]).assemble(&cube(&["2003-05-01"]));
        let record = table.records().next().unwrap();

        let names: Vec<&str> = record.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, table.columns());
        assert_eq!(record[0].1, CellValue::Text("AAA".to_string()));
        assert_eq!(record[3].1, CellValue::Integer(2003));
        assert_eq!(record[4].1, CellValue::Integer(5));
        assert_eq!(record[5].1, CellValue::Float(Some(1.0)));
        assert_eq!(record[6].1.to_string(), "");
        assert_eq!(record[2].1.to_string(), "2003-05-01 00:00:00");
    }
}
