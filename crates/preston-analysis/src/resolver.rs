//! Identifier reconciliation for boundary geometries.
//!
//! Some boundary datasets carry the unassigned sentinel instead of a real
//! ISO3 code for a handful of territories. The resolver patches those from a
//! declarative name -> code table and drops the excluded territories, so the
//! joiner only ever sees one identifier scheme.

use crate::config::AnalysisConfig;
use crate::types::GeometryRecord;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Counts describing what the resolver changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Geometry rows received.
    pub input_rows: usize,
    /// Rows whose identifier was replaced by an override.
    pub overridden: usize,
    /// Rows removed by name.
    pub excluded: usize,
    /// Surviving rows still carrying the unassigned sentinel.
    pub unassigned: usize,
}

/// Applies identifier overrides and territory exclusions.
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    overrides: BTreeMap<String, String>,
    excluded: BTreeSet<String>,
}

impl IdentityResolver {
    pub fn new(overrides: BTreeMap<String, String>, excluded: BTreeSet<String>) -> Self {
        Self { overrides, excluded }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.identifier_overrides.clone(),
            config.excluded_territories.clone(),
        )
    }

    /// Resolve identifiers and drop excluded territories.
    ///
    /// Order of surviving rows is preserved. Territories with no override
    /// keep their native identifier, sentinel included.
    pub fn resolve(&self, geometries: Vec<GeometryRecord>) -> (Vec<GeometryRecord>, Resolution) {
        let mut resolution = Resolution {
            input_rows: geometries.len(),
            ..Resolution::default()
        };

        let mut resolved = Vec::with_capacity(geometries.len());
        for mut geo in geometries {
            if self.excluded.contains(&geo.name) {
                debug!("Excluding territory '{}'", geo.name);
                resolution.excluded += 1;
                continue;
            }

            if let Some(code) = self.overrides.get(&geo.name)
                && geo.iso_a3 != *code
            {
                debug!("Overriding '{}' identifier {} -> {}", geo.name, geo.iso_a3, code);
                geo.iso_a3 = code.clone();
                resolution.overridden += 1;
            }

            if geo.is_unassigned() {
                resolution.unassigned += 1;
            }
            resolved.push(geo);
        }

        info!(
            "Resolved {} geometries: {} overridden, {} excluded, {} still unassigned",
            resolution.input_rows, resolution.overridden, resolution.excluded, resolution.unassigned
        );

        (resolved, resolution)
    }
}
