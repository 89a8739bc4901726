//! Ordinary least squares over the eligible subset.
//!
//! Closed-form single-predictor estimators, all in `f64`. Points are sorted
//! before accumulation, so the same set of observations yields bit-identical
//! statistics whatever order the rows arrive in.

use crate::error::InsufficientData;
use crate::filter::EligibleSubset;
use crate::types::IndicatorField;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Linear regression statistics for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    /// Observations used.
    pub n: usize,
    pub slope: f64,
    pub intercept: f64,
    /// Pearson r, in [-1, 1].
    pub correlation: f64,
    /// r squared, in [0, 1].
    pub r_squared: f64,
    /// Standard error of the slope.
    pub standard_error: f64,
    /// Standard error of the intercept.
    pub intercept_standard_error: f64,
}

impl RegressionResult {
    /// Value of the fitted line at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fits `y = intercept + slope * x` by ordinary least squares.
#[derive(Debug, Clone, Copy)]
pub struct RegressionAnalyzer {
    x: IndicatorField,
    y: IndicatorField,
}

impl Default for RegressionAnalyzer {
    fn default() -> Self {
        Self {
            x: IndicatorField::GdpPcapPpp,
            y: IndicatorField::LifeExpectancy,
        }
    }
}

impl RegressionAnalyzer {
    pub fn new(x: IndicatorField, y: IndicatorField) -> Self {
        Self { x, y }
    }

    /// Regress the y field on the x field over the eligible rows.
    pub fn analyze(&self, subset: &EligibleSubset) -> Result<RegressionResult, InsufficientData> {
        let result = Self::fit(subset.pairs(self.x, self.y))?;
        info!(
            "Regression of {} on {} over {} rows: slope={:.6}, r={:.4}",
            self.y, self.x, result.n, result.slope, result.correlation
        );
        Ok(result)
    }

    /// Fit a line through raw `(x, y)` points.
    ///
    /// Points with a non-finite coordinate are dropped before fitting and do
    /// not count towards `n`.
    pub fn fit(mut points: Vec<(f64, f64)>) -> Result<RegressionResult, InsufficientData> {
        let before = points.len();
        points.retain(|(x, y)| x.is_finite() && y.is_finite());
        if points.len() < before {
            warn!("Dropped {} non-finite points", before - points.len());
        }

        let n = points.len();
        if n < 2 {
            return Err(InsufficientData::TooFewObservations { n });
        }

        points.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

        // sorted, so identical x values means first == last
        if points[0].0 == points[n - 1].0 {
            return Err(InsufficientData::ZeroVariance { n });
        }

        let nf = n as f64;
        let mean_x = points.iter().map(|p| p.0).sum::<f64>() / nf;
        let mean_y = points.iter().map(|p| p.1).sum::<f64>() / nf;

        let (sxx, syy, sxy) = points.iter().fold((0.0, 0.0, 0.0), |(sxx, syy, sxy), &(x, y)| {
            let dx = x - mean_x;
            let dy = y - mean_y;
            (sxx + dx * dx, syy + dy * dy, sxy + dx * dy)
        });

        if sxx.is_nan() || sxx <= 0.0 {
            return Err(InsufficientData::ZeroVariance { n });
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;

        let correlation = if syy == 0.0 {
            0.0
        } else {
            (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
        };
        let r_squared = correlation * correlation;

        // two points always sit on the line; no residual degrees of freedom
        let standard_error = if n == 2 {
            0.0
        } else {
            let ssr = (syy - slope * sxy).max(0.0);
            (ssr / (nf - 2.0) / sxx).sqrt()
        };
        let intercept_standard_error = standard_error * (sxx / nf + mean_x * mean_x).sqrt();

        debug!(
            "OLS sums: n={}, mean_x={}, mean_y={}, sxx={}, syy={}, sxy={}",
            n, mean_x, mean_y, sxx, syy, sxy
        );

        Ok(RegressionResult {
            n,
            slope,
            intercept,
            correlation,
            r_squared,
            standard_error,
            intercept_standard_error,
        })
    }
}
