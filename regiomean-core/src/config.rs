//! Run configuration
//!
//! The allow-list of region codes is an explicit value passed into a run. It can be
//! built in code or read from TOML:
//!
//! ```toml
//! region_codes = ["AUT", "BEL", "CHE"]
//! overlap_policy = "FirstWins"
//! parallel = true
//! ```

use crate::errors::{RegiomeanError, RegiomeanResult};
use crate::mask::OverlapPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// ISO 3166-1 alpha-3 codes of the European countries covered by the reanalysis exports
const EUROPEAN_COUNTRY_CODES: [&str; 37] = [
    "AUT", "BIH", "BEL", "BGR", "CHE", "CZE", "DEU", "DNK", "EST", "ESP", "FIN", "FRA", "GBR",
    "GEO", "GRC", "HRV", "HUN", "IRL", "ISL", "ITA", "LTU", "LUX", "LVA", "MDA", "MNE", "MKD",
    "NLD", "NOR", "POL", "PRT", "ROU", "SRB", "SWE", "SVN", "SVK", "TUR", "UKR",
];

fn default_parallel() -> bool {
    true
}

/// Settings for one aggregation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Region codes to retain in the output, in order
    pub region_codes: Vec<String>,
    /// Resolution of grid points claimed by more than one region
    #[serde(default)]
    pub overlap_policy: OverlapPolicy,
    /// Fan masking and reduction out over regions
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl AggregationConfig {
    pub fn new<S: Into<String>>(region_codes: impl IntoIterator<Item = S>) -> Self {
        Self {
            region_codes: region_codes.into_iter().map(Into::into).collect(),
            overlap_policy: OverlapPolicy::default(),
            parallel: default_parallel(),
        }
    }

    /// The 37 European countries (AUT ... UKR)
    pub fn european_countries() -> Self {
        Self::new(EUROPEAN_COUNTRY_CODES)
    }

    pub fn with_overlap_policy(mut self, overlap_policy: OverlapPolicy) -> Self {
        self.overlap_policy = overlap_policy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> RegiomeanResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| RegiomeanError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> RegiomeanResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RegiomeanError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> RegiomeanResult<String> {
        toml::to_string(self).map_err(|e| RegiomeanError::Config(e.to_string()))
    }

    /// Reject an empty allow-list or blank codes
    pub fn validate(&self) -> RegiomeanResult<()> {
        if self.region_codes.is_empty() {
            return Err(RegiomeanError::Config(
                "region_codes must contain at least one code".to_string(),
            ));
        }
        if let Some(index) = self.region_codes.iter().position(|c| c.trim().is_empty()) {
            return Err(RegiomeanError::Config(format!(
                "region_codes[{}] is blank",
                index
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn european_preset() {
        let config = AggregationConfig::european_countries();
        assert_eq!(config.region_codes.len(), 37);
        assert_eq!(config.region_codes.first().map(String::as_str), Some("AUT"));
        assert_eq!(config.region_codes.last().map(String::as_str), Some("UKR"));
        assert_eq!(config.overlap_policy, OverlapPolicy::FirstWins);
        assert!(config.parallel);
    }

    #[test]
    fn from_toml_with_defaults() {
        let config = AggregationConfig::from_toml_str(r#"region_codes = ["AUT", "BEL"]"#).unwrap();
        assert_eq!(config, AggregationConfig::new(["AUT", "BEL"]));
    }

    #[test]
    fn from_toml_full() {
        let config = AggregationConfig::from_toml_str(
            r#"
            region_codes = ["DEU"]
            overlap_policy = "Reject"
            parallel = false
            "#,
        )
        .unwrap();
        assert_eq!(config.overlap_policy, OverlapPolicy::Reject);
        assert!(!config.parallel);
    }

    #[test]
    fn toml_roundtrip() {
        let config = AggregationConfig::european_countries().with_parallel(false);
        let serialised = config.to_toml_string().unwrap();
        assert_eq!(AggregationConfig::from_toml_str(&serialised).unwrap(), config);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(matches!(
            AggregationConfig::from_toml_str("region_codes = []"),
            Err(RegiomeanError::Config(_))
        ));
        assert!(matches!(
            AggregationConfig::from_toml_str(r#"region_codes = ["AUT", " "]"#),
            Err(RegiomeanError::Config(_))
        ));
        assert!(matches!(
            AggregationConfig::from_toml_str("parallel = true"),
            Err(RegiomeanError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        assert!(matches!(
            AggregationConfig::from_file("/nonexistent/regiomean.toml"),
            Err(RegiomeanError::Config(_))
        ));
    }
}
