//! Record types flowing through the join-and-analyze pipeline.
//!
//! Every stage consumes and produces these immutable records. Missing
//! indicator values are always `None`, never a sentinel float.

use crate::utils::finite_or_none;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifier carried by boundary datasets for territories without an
/// assigned ISO3 code. Never matches any indicator row.
pub const UNASSIGNED_ISO_A3: &str = "-99";

/// Indicator columns that can take part in the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorField {
    /// GDP per capita, PPP (constant international $)
    GdpPcapPpp,
    /// Life expectancy at birth, total (years)
    LifeExpectancy,
}

impl IndicatorField {
    /// All fields, in column order.
    pub const ALL: [IndicatorField; 2] = [Self::GdpPcapPpp, Self::LifeExpectancy];

    /// Column name used in the indicator table and in every artifact.
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::GdpPcapPpp => "gdp_pcap_ppp",
            Self::LifeExpectancy => "life_expectancy",
        }
    }
}

impl fmt::Display for IndicatorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// One country row of the indicator table for the snapshot year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRecord {
    pub iso3_code: Option<String>,
    pub country_name: Option<String>,
    pub gdp_pcap_ppp: Option<f64>,
    pub life_expectancy: Option<f64>,
}

impl IndicatorRecord {
    pub fn new(
        iso3_code: impl Into<String>,
        gdp_pcap_ppp: Option<f64>,
        life_expectancy: Option<f64>,
    ) -> Self {
        Self {
            iso3_code: Some(iso3_code.into()),
            country_name: None,
            gdp_pcap_ppp,
            life_expectancy,
        }
    }

    pub fn with_country_name(mut self, name: impl Into<String>) -> Self {
        self.country_name = Some(name.into());
        self
    }
}

/// Boundary geometry of a territory.
///
/// The value is kept exactly as read (a GeoJSON geometry object) and is
/// never inspected. Cloning shares the underlying value.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry(Arc<serde_json::Value>);

impl Geometry {
    pub fn new(value: serde_json::Value) -> Self {
        Self(Arc::new(value))
    }

    /// Geometry with no shape, used where only identity matters.
    pub fn empty() -> Self {
        Self::new(serde_json::Value::Null)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// One mapped territory from the boundary dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryRecord {
    pub iso_a3: String,
    pub name: String,
    pub geometry: Geometry,
}

impl GeometryRecord {
    pub fn new(iso_a3: impl Into<String>, name: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            iso_a3: iso_a3.into(),
            name: name.into(),
            geometry,
        }
    }

    /// Whether the identifier is the unassigned sentinel.
    pub fn is_unassigned(&self) -> bool {
        self.iso_a3 == UNASSIGNED_ISO_A3
    }
}

/// A geometry row extended with the matched indicator fields.
///
/// Produced by the left join; unmatched rows have every indicator field `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRecord {
    pub iso_a3: String,
    pub name: String,
    pub geometry: Geometry,
    pub iso3_code: Option<String>,
    pub country_name: Option<String>,
    pub gdp_pcap_ppp: Option<f64>,
    pub life_expectancy: Option<f64>,
}

impl JoinedRecord {
    /// Combine a geometry row with its indicator match, if any.
    ///
    /// Non-finite indicator values are stored as `None`.
    pub fn from_parts(geometry: GeometryRecord, indicator: Option<&IndicatorRecord>) -> Self {
        let GeometryRecord {
            iso_a3,
            name,
            geometry,
        } = geometry;

        match indicator {
            Some(ind) => Self {
                iso_a3,
                name,
                geometry,
                iso3_code: ind.iso3_code.clone(),
                country_name: ind.country_name.clone(),
                gdp_pcap_ppp: finite_or_none(ind.gdp_pcap_ppp),
                life_expectancy: finite_or_none(ind.life_expectancy),
            },
            None => Self {
                iso_a3,
                name,
                geometry,
                iso3_code: None,
                country_name: None,
                gdp_pcap_ppp: None,
                life_expectancy: None,
            },
        }
    }

    /// Value of an indicator field for this row.
    pub fn value(&self, field: IndicatorField) -> Option<f64> {
        match field {
            IndicatorField::GdpPcapPpp => self.gdp_pcap_ppp,
            IndicatorField::LifeExpectancy => self.life_expectancy,
        }
    }

    /// Whether an indicator row was matched to this geometry.
    pub fn is_matched(&self) -> bool {
        self.iso3_code.is_some()
    }
}
