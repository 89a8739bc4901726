//! Left outer join of geometries to indicators.

use crate::types::{GeometryRecord, IndicatorRecord, JoinedRecord, UNASSIGNED_ISO_A3};
use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{info, warn};

/// Match counts for one join.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    pub rows: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Indicator codes that appeared more than once (later rows ignored).
    pub duplicate_codes: Vec<String>,
}

/// Joins geometry rows (driving side) to indicator rows by ISO3 code.
///
/// When several indicator rows share a code, the first one in input order
/// wins. Indicator rows without a code, and the unassigned sentinel, never
/// match.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetJoiner;

impl DatasetJoiner {
    pub fn join(
        &self,
        geometries: Vec<GeometryRecord>,
        indicators: &[IndicatorRecord],
    ) -> (Vec<JoinedRecord>, JoinStats) {
        let (index, duplicate_codes) = Self::index_indicators(indicators);

        if !duplicate_codes.is_empty() {
            warn!(
                "{} indicator codes appear more than once, keeping first occurrence: {:?}",
                duplicate_codes.len(),
                duplicate_codes
            );
        }

        let mut stats = JoinStats {
            rows: geometries.len(),
            duplicate_codes,
            ..JoinStats::default()
        };

        let joined: Vec<JoinedRecord> = geometries
            .into_iter()
            .map(|geo| {
                let matched = if geo.iso_a3 == UNASSIGNED_ISO_A3 {
                    None
                } else {
                    index.get(geo.iso_a3.as_str()).map(|&i| &indicators[i])
                };
                if matched.is_some() {
                    stats.matched += 1;
                } else {
                    stats.unmatched += 1;
                }
                JoinedRecord::from_parts(geo, matched)
            })
            .collect();

        info!(
            "Joined {} geometries: {} matched, {} without indicator data",
            stats.rows, stats.matched, stats.unmatched
        );

        (joined, stats)
    }

    /// Map each code to the position of its first indicator row.
    fn index_indicators(indicators: &[IndicatorRecord]) -> (HashMap<&str, usize>, Vec<String>) {
        let mut index = HashMap::with_capacity(indicators.len());
        let mut duplicates = Vec::new();

        for (i, record) in indicators.iter().enumerate() {
            let Some(code) = record.iso3_code.as_deref() else {
                continue;
            };
            match index.entry(code) {
                Entry::Vacant(slot) => {
                    slot.insert(i);
                }
                Entry::Occupied(_) => {
                    if !duplicates.iter().any(|d| d == code) {
                        duplicates.push(code.to_string());
                    }
                }
            }
        }

        (index, duplicates)
    }
}
