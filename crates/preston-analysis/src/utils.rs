//! Shared helpers for loading and validating country data.

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

// Three upper-case ASCII letters, e.g. "FRA"
static ISO3_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("Invalid regex: ISO3 code"));

/// Check whether a string is a well-formed ISO 3166-1 alpha-3 code.
///
/// Only the shape is checked; "ZZZ" passes even though it is unassigned.
pub fn is_iso3_code(code: &str) -> bool {
    ISO3_PATTERN.is_match(code)
}

/// Map NaN and infinities to `None`.
#[inline]
pub fn finite_or_none(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Trim a string value and drop it when nothing is left.
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}
