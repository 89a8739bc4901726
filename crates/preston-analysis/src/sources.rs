//! Loading of the two input tables into typed records.
//!
//! Both sources use their own column names. Aliases are normalised here so
//! the rest of the pipeline only sees `iso3_code`/`gdp_pcap_ppp`/
//! `life_expectancy` on the indicator side and `iso_a3`/`name` on the
//! geometry side. A required column that is still missing after
//! normalisation is a [`AnalysisError::Schema`] error.

use crate::error::{AnalysisError, Result, ResultExt};
use crate::types::{Geometry, GeometryRecord, IndicatorRecord, UNASSIGNED_ISO_A3};
use crate::utils::{finite_or_none, is_numeric_dtype, non_empty};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info, warn};

pub const INDICATOR_TABLE: &str = "indicator";
pub const GEOMETRY_TABLE: &str = "geometry";

/// Indicator columns that must be present after alias normalisation.
pub const REQUIRED_INDICATOR_COLUMNS: [&str; 3] = ["iso3_code", "gdp_pcap_ppp", "life_expectancy"];

/// (alias, canonical) pairs for the indicator table. World Bank exports use
/// `economy`/`Country` and the raw series codes.
const INDICATOR_ALIASES: [(&str, &str); 4] = [
    ("economy", "iso3_code"),
    ("Country", "country_name"),
    ("NY.GDP.PCAP.PP.KD", "gdp_pcap_ppp"),
    ("SP.DYN.LE00.IN", "life_expectancy"),
];

const YEAR_COLUMNS: [&str; 2] = ["year", "time"];

// Native admin-0 code takes precedence: its ISO_A3 is broken for some countries.
const GEOMETRY_ID_ALIASES: [&str; 3] = ["ADM0_A3", "iso_a3", "ISO_A3"];
const GEOMETRY_NAME_ALIASES: [&str; 2] = ["NAME", "name"];

/// Read an indicator CSV with a header row.
pub fn read_indicator_csv(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .context(format!("Opening {}", path.display()))?
        .finish()
        .context(format!("Reading {}", path.display()))
}

/// Read a GeoJSON FeatureCollection from disk.
pub fn read_geometry_file(path: &Path) -> Result<Value> {
    let content =
        std::fs::read_to_string(path).context(format!("Reading {}", path.display()))?;
    Ok(serde_json::from_str(&content)?)
}

/// Convert an indicator table into records for the snapshot `year`.
///
/// If the table has a `year` (or World Bank `time`, e.g. `YR2022`) column,
/// rows for other years are dropped. Non-numeric and non-finite indicator
/// values become `None`.
pub fn load_indicators(df: &DataFrame, year: i32) -> Result<Vec<IndicatorRecord>> {
    let df = normalize_indicator_columns(df.clone())?;

    for column in REQUIRED_INDICATOR_COLUMNS {
        if !has_column(&df, column) {
            return Err(AnalysisError::schema(INDICATOR_TABLE, column));
        }
    }

    let codes = string_values(&df, "iso3_code")?;
    let names = if has_column(&df, "country_name") {
        string_values(&df, "country_name")?
    } else {
        vec![None; df.height()]
    };
    let gdp = float_values(&df, "gdp_pcap_ppp")?;
    let life = float_values(&df, "life_expectancy")?;
    let years = year_values(&df)?;

    let mut skipped_years = 0usize;
    let records: Vec<IndicatorRecord> = (0..df.height())
        .filter(|&i| match &years {
            Some(years) if years[i] != Some(i64::from(year)) => {
                skipped_years += 1;
                false
            }
            _ => true,
        })
        .map(|i| IndicatorRecord {
            iso3_code: codes[i].clone(),
            country_name: names[i].clone(),
            gdp_pcap_ppp: gdp[i],
            life_expectancy: life[i],
        })
        .collect();

    if skipped_years > 0 && records.is_empty() {
        warn!(
            "All {} indicator rows fall outside {}; check the year column",
            skipped_years, year
        );
    } else if skipped_years > 0 {
        debug!("Skipped {} indicator rows outside {}", skipped_years, year);
    }
    info!("Loaded {} indicator records for {}", records.len(), year);

    Ok(records)
}

/// Convert a GeoJSON FeatureCollection into geometry records.
///
/// A null or empty identifier is stored as the unassigned sentinel.
pub fn load_geometries(collection: &Value) -> Result<Vec<GeometryRecord>> {
    let features = collection
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| AnalysisError::schema(GEOMETRY_TABLE, "features"))?;

    let records = features
        .iter()
        .map(load_feature)
        .collect::<Result<Vec<_>>>()?;

    let unassigned = records.iter().filter(|r| r.is_unassigned()).count();
    if unassigned > 0 {
        warn!("{} geometries carry the unassigned identifier", unassigned);
    }
    info!("Loaded {} geometry records", records.len());

    Ok(records)
}

fn load_feature(feature: &Value) -> Result<GeometryRecord> {
    let properties = feature
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| AnalysisError::schema(GEOMETRY_TABLE, "properties"))?;

    let iso_a3 = lookup(properties, &GEOMETRY_ID_ALIASES)
        .ok_or_else(|| AnalysisError::schema(GEOMETRY_TABLE, "iso_a3"))
        .map(|v| property_text(v).unwrap_or_else(|| UNASSIGNED_ISO_A3.to_string()))?;

    let name = lookup(properties, &GEOMETRY_NAME_ALIASES)
        .ok_or_else(|| AnalysisError::schema(GEOMETRY_TABLE, "name"))
        .map(|v| property_text(v).unwrap_or_default())?;

    let geometry = feature.get("geometry").cloned().unwrap_or(Value::Null);

    Ok(GeometryRecord::new(iso_a3, name, Geometry::new(geometry)))
}

/// First property present under any of the aliases.
fn lookup<'a>(properties: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| properties.get(*alias))
}

fn property_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(Some(s.as_str())),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

fn normalize_indicator_columns(mut df: DataFrame) -> Result<DataFrame> {
    for (alias, canonical) in INDICATOR_ALIASES {
        if has_column(&df, alias) && !has_column(&df, canonical) {
            debug!("Renaming indicator column '{}' -> '{}'", alias, canonical);
            df.rename(alias, canonical.into())?;
        }
    }
    Ok(df)
}

fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    let values = column.as_materialized_series().str()?;
    Ok(values.into_iter().map(non_empty).collect())
}

fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df.column(name)?.as_materialized_series();
    if !is_numeric_dtype(series.dtype()) {
        debug!("Parsing '{}' from {} values", name, series.dtype());
    }
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats.f64()?.into_iter().map(finite_or_none).collect())
}

fn year_values(df: &DataFrame) -> Result<Option<Vec<Option<i64>>>> {
    let Some(name) = YEAR_COLUMNS.into_iter().find(|c| has_column(df, c)) else {
        return Ok(None);
    };

    let series = df.column(name)?.as_materialized_series();

    // Float years appear when the exporting tool filled gaps with NaN.
    let years = if is_numeric_dtype(series.dtype()) {
        series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| finite_or_none(v).filter(|y| y.fract() == 0.0).map(|y| y as i64))
            .collect()
    } else {
        string_values(df, name)?
            .into_iter()
            .map(|v| v.and_then(|s| s.trim_start_matches("YR").parse::<i64>().ok()))
            .collect()
    };

    Ok(Some(years))
}
