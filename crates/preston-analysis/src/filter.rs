//! Completeness filtering of joined rows.

use crate::types::{IndicatorField, JoinedRecord};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Joined rows with every required field present, in input order.
///
/// This is the only set the regression is computed on, and [`n`](Self::n)
/// is the count reported everywhere an N appears.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EligibleSubset {
    rows: Vec<JoinedRecord>,
}

impl EligibleSubset {
    /// Number of eligible rows.
    pub fn n(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[JoinedRecord] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, JoinedRecord> {
        self.rows.iter()
    }

    /// `(x, y)` pairs for two fields; rows missing either are skipped.
    pub fn pairs(&self, x: IndicatorField, y: IndicatorField) -> Vec<(f64, f64)> {
        self.rows
            .iter()
            .filter_map(|row| Some((row.value(x)?, row.value(y)?)))
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .collect()
    }
}

impl<'a> IntoIterator for &'a EligibleSubset {
    type Item = &'a JoinedRecord;
    type IntoIter = std::slice::Iter<'a, JoinedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Keeps rows whose required indicator fields are all present and finite.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletenessFilter;

impl CompletenessFilter {
    pub fn filter(
        &self,
        rows: &[JoinedRecord],
        required_fields: &BTreeSet<IndicatorField>,
    ) -> EligibleSubset {
        let rows: Vec<JoinedRecord> = rows
            .iter()
            .filter(|row| required_fields.iter().all(|&f| is_usable(row.value(f))))
            .cloned()
            .collect();

        debug!("{} rows complete in {:?}", rows.len(), required_fields);

        EligibleSubset { rows }
    }

    /// Count of unusable (null or non-finite) values per field across the
    /// joined rows.
    pub fn missing_counts(
        &self,
        rows: &[JoinedRecord],
        fields: &BTreeSet<IndicatorField>,
    ) -> BTreeMap<IndicatorField, usize> {
        fields
            .iter()
            .map(|&field| {
                let missing = rows.iter().filter(|r| !is_usable(r.value(field))).count();
                (field, missing)
            })
            .collect()
    }
}

fn is_usable(value: Option<f64>) -> bool {
    value.is_some_and(f64::is_finite)
}
