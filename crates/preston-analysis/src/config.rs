//! Configuration for the analysis pipeline.
//!
//! Everything that used to be a fixed path, year or inline patch lives here
//! and is passed into [`Pipeline`](crate::Pipeline) explicitly. Use
//! [`AnalysisConfig::builder()`] for a fluent, validated setup, or
//! deserialize it from JSON.

use crate::types::IndicatorField;
use crate::utils::is_iso3_code;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Snapshot year of the indicator data.
pub const DEFAULT_YEAR: i32 = 2022;

/// Territories whose native boundary identifier is broken, with their real code.
pub const DEFAULT_IDENTIFIER_OVERRIDES: [(&str, &str); 2] = [("France", "FRA"), ("Norway", "NOR")];

/// Territories dropped from the geometry set before the join.
pub const DEFAULT_EXCLUDED_TERRITORIES: [&str; 1] = ["Antarctica"];

/// Countries labelled on the scatter artifact.
pub const DEFAULT_HIGHLIGHTED_CODES: [&str; 9] = [
    "USA", "CHN", "IND", "JPN", "DEU", "BRA", "NGA", "ZWE", "QAT",
];

const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1960..=2100;

/// Configuration for the analysis pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use preston_analysis::config::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .year(2021)
///     .identifier_override("Kosovo", "XKX")
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Fields that must be non-null for a row to be eligible.
    /// Default: gdp_pcap_ppp and life_expectancy
    pub indicator_fields: BTreeSet<IndicatorField>,

    /// Snapshot year; indicator rows from other years are ignored.
    /// Default: 2022
    pub year: i32,

    /// Exact territory name -> ISO3 code, applied before the join.
    /// Default: France -> FRA, Norway -> NOR
    pub identifier_overrides: BTreeMap<String, String>,

    /// Exact territory names removed from the geometry set.
    /// Default: Antarctica
    pub excluded_territories: BTreeSet<String>,

    /// ISO3 codes flagged in the scatter artifact.
    pub highlighted_codes: BTreeSet<String>,

    /// Directory receiving the artifacts.
    /// Default: "output"
    pub output_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            indicator_fields: IndicatorField::ALL.into_iter().collect(),
            year: DEFAULT_YEAR,
            identifier_overrides: DEFAULT_IDENTIFIER_OVERRIDES
                .iter()
                .map(|(name, code)| (name.to_string(), code.to_string()))
                .collect(),
            excluded_territories: DEFAULT_EXCLUDED_TERRITORIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            highlighted_codes: DEFAULT_HIGHLIGHTED_CODES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !YEAR_RANGE.contains(&self.year) {
            return Err(ConfigValidationError::InvalidYear(self.year));
        }

        // the regression always reads both variables
        for field in IndicatorField::ALL {
            if !self.indicator_fields.contains(&field) {
                return Err(ConfigValidationError::MissingIndicatorField(field));
            }
        }

        for (name, code) in &self.identifier_overrides {
            if name.trim().is_empty() {
                return Err(ConfigValidationError::EmptyTerritoryName);
            }
            if !is_iso3_code(code) {
                return Err(ConfigValidationError::InvalidIsoCode {
                    territory: name.clone(),
                    code: code.clone(),
                });
            }
        }

        if self.excluded_territories.iter().any(|n| n.trim().is_empty()) {
            return Err(ConfigValidationError::EmptyTerritoryName);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid year: {0} (must be between 1960 and 2100)")]
    InvalidYear(i32),

    #[error("Indicator field '{0}' is required by the regression")]
    MissingIndicatorField(IndicatorField),

    #[error("Invalid ISO3 code '{code}' for territory '{territory}'")]
    InvalidIsoCode { territory: String, code: String },

    #[error("Territory names must not be empty")]
    EmptyTerritoryName,
}

/// Builder for [`AnalysisConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct AnalysisConfigBuilder {
    year: Option<i32>,
    identifier_overrides: Option<BTreeMap<String, String>>,
    excluded_territories: Option<BTreeSet<String>>,
    highlighted_codes: Option<BTreeSet<String>>,
    output_dir: Option<PathBuf>,
}

impl AnalysisConfigBuilder {
    /// Set the snapshot year.
    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Add a name -> ISO3 override on top of the defaults.
    pub fn identifier_override(mut self, name: impl Into<String>, code: impl Into<String>) -> Self {
        self.identifier_overrides
            .get_or_insert_with(|| AnalysisConfig::default().identifier_overrides)
            .insert(name.into(), code.into());
        self
    }

    /// Replace the whole override table.
    pub fn identifier_overrides(mut self, overrides: BTreeMap<String, String>) -> Self {
        self.identifier_overrides = Some(overrides);
        self
    }

    /// Add a territory to exclude on top of the defaults.
    pub fn exclude_territory(mut self, name: impl Into<String>) -> Self {
        self.excluded_territories
            .get_or_insert_with(|| AnalysisConfig::default().excluded_territories)
            .insert(name.into());
        self
    }

    /// Replace the whole exclusion set.
    pub fn excluded_territories(mut self, names: BTreeSet<String>) -> Self {
        self.excluded_territories = Some(names);
        self
    }

    /// Replace the set of highlighted ISO3 codes.
    pub fn highlighted_codes(mut self, codes: BTreeSet<String>) -> Self {
        self.highlighted_codes = Some(codes);
        self
    }

    /// Set the output directory for artifacts.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `AnalysisConfig` or an error if validation fails.
    pub fn build(self) -> Result<AnalysisConfig, ConfigValidationError> {
        let defaults = AnalysisConfig::default();
        let config = AnalysisConfig {
            indicator_fields: defaults.indicator_fields,
            year: self.year.unwrap_or(defaults.year),
            identifier_overrides: self
                .identifier_overrides
                .unwrap_or(defaults.identifier_overrides),
            excluded_territories: self
                .excluded_territories
                .unwrap_or(defaults.excluded_territories),
            highlighted_codes: self.highlighted_codes.unwrap_or(defaults.highlighted_codes),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.year, 2022);
        assert_eq!(config.indicator_fields.len(), 2);
        assert_eq!(
            config.identifier_overrides.get("France").map(String::as_str),
            Some("FRA")
        );
        assert_eq!(
            config.identifier_overrides.get("Norway").map(String::as_str),
            Some("NOR")
        );
        assert!(config.excluded_territories.contains("Antarctica"));
        assert!(config.highlighted_codes.contains("QAT"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_extends_defaults() {
        let config = AnalysisConfig::builder()
            .year(2019)
            .identifier_override("Kosovo", "XKX")
            .exclude_territory("Fr. S. Antarctic Lands")
            .build()
            .unwrap();

        assert_eq!(config.year, 2019);
        assert_eq!(config.identifier_overrides.len(), 3);
        assert!(config.excluded_territories.contains("Antarctica"));
        assert!(config.excluded_territories.contains("Fr. S. Antarctic Lands"));
    }

    #[test]
    fn test_builder_replaces_tables() {
        let config = AnalysisConfig::builder()
            .identifier_overrides(BTreeMap::new())
            .excluded_territories(BTreeSet::new())
            .build()
            .unwrap();

        assert!(config.identifier_overrides.is_empty());
        assert!(config.excluded_territories.is_empty());
    }

    #[test]
    fn test_validation_invalid_year() {
        let result = AnalysisConfig::builder().year(1800).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidYear(1800)
        ));
    }

    #[test]
    fn test_validation_invalid_override_code() {
        let result = AnalysisConfig::builder()
            .identifier_override("France", "-99")
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidIsoCode { .. }
        ));
    }

    #[test]
    fn test_validation_missing_field() {
        let mut config = AnalysisConfig::default();
        config.indicator_fields.remove(&IndicatorField::LifeExpectancy);
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigValidationError::MissingIndicatorField(IndicatorField::LifeExpectancy)
        ));
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{
            "year": 2020,
            "identifier_overrides": {"France": "FRA", "Kosovo": "XKX"},
            "output_dir": "custom_output"
        }"#;

        let config: AnalysisConfig = serde_json::from_str(json).expect("partial config");

        assert_eq!(config.year, 2020);
        assert_eq!(config.identifier_overrides.len(), 2);
        assert!(!config.identifier_overrides.contains_key("Norway"));
        assert!(config.excluded_territories.contains("Antarctica"));
        assert_eq!(config.output_dir.to_str().unwrap(), "custom_output");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AnalysisConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: AnalysisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
