//! Values returned by a pipeline run.

use crate::error::{AnalysisError, InsufficientData, Result};
use crate::filter::EligibleSubset;
use crate::joiner::JoinStats;
use crate::regression::RegressionResult;
use crate::resolver::Resolution;
use crate::types::{IndicatorField, JoinedRecord};
use serde::Serialize;
use std::collections::BTreeMap;

/// Machine-readable summary of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub year: i32,
    /// Size of the eligible subset.
    pub n: usize,
    pub resolution: Resolution,
    pub join: JoinStats,
    /// Null count per indicator across joined rows.
    pub missing: BTreeMap<IndicatorField, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regression: Option<RegressionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regression_error: Option<InsufficientData>,
}

/// Everything a run produces.
///
/// The joined rows and eligible subset are always present. The regression
/// and report are missing when the eligible subset cannot support a fit;
/// [`regression`](Self::regression) then returns the
/// [`AnalysisError::DataInsufficient`] error.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub joined: Vec<JoinedRecord>,
    pub eligible: EligibleSubset,
    pub regression: std::result::Result<RegressionResult, InsufficientData>,
    pub report: Option<String>,
    pub summary: AnalysisSummary,
}

impl AnalysisOutput {
    /// Number of rows the statistics were computed on.
    pub fn n(&self) -> usize {
        self.eligible.n()
    }

    /// The regression result, or the reason it could not be computed.
    pub fn regression(&self) -> Result<&RegressionResult> {
        self.regression
            .as_ref()
            .map_err(|e| AnalysisError::DataInsufficient(e.clone()))
    }

    /// The composed report, or the reason the regression failed.
    pub fn report(&self) -> Result<&str> {
        self.regression()?;
        Ok(self.report.as_deref().unwrap_or_default())
    }
}
