use crate::regression::RegressionResult;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name the report is written under.
pub const REPORT_FILE_NAME: &str = "analysis_results.txt";

const GEOGRAPHIC_NARRATIVE: &str = "\
A clear North-South divide is visible, although with nuances. The highest-income regions \
(North America, Western Europe, Australia) consistently show life expectancies above 80 years. \
Sub-Saharan Africa, in contrast, shows the lowest levels of both variables, illustrating the \
strong visual correlation between economic development and population health.";

const LINEAR_NARRATIVE: &str = "\
However, the relationship is not perfectly linear; it shows diminishing returns (concavity), \
known as the \"Preston Curve\": income gains have a large impact on health in poor countries, \
but the marginal effect shrinks in rich countries. Even so, a linear approximation remains \
statistically meaningful and explains a large share of the variance.";

/// Renders regression statistics into the fixed-structure text report.
#[derive(Debug, Clone)]
pub struct ReportComposer {
    year: i32,
}

impl ReportComposer {
    pub fn new(year: i32) -> Self {
        Self { year }
    }

    /// Compose the report for `n` analyzed entities.
    ///
    /// r and R² are printed to 4 places, the per-$1,000 effect to 2.
    pub fn compose(&self, n: usize, result: &RegressionResult) -> String {
        if n != result.n {
            warn!(
                "Report count {} differs from the {} observations the regression used",
                n, result.n
            );
        }

        let per_thousand = result.slope * 1000.0;

        format!(
            "# Linear Association Analysis: GDP per Capita and Life Expectancy ({year})\n\
             \n\
             ## Data Summary\n\
             - Countries/regions analyzed: {n}\n\
             \n\
             ## Descriptive Statistics\n\
             - Correlation (r): {r:.4}\n\
             - Coefficient of Determination (R²): {r2:.4}\n\
             - Slope (m): {slope:.4} (each $1,000 increase in GDP per capita associates with \
             {per_thousand:.2} additional years of life expectancy on average)\n\
             - Intercept (b): {intercept:.4}\n\
             - Standard error of the slope: {se:.6}\n\
             \n\
             ## Geographic Distribution\n\
             {geographic}\n\
             \n\
             ## Linear Relationship\n\
             The scatter plot shows a strong positive association (R² = {r2:.2}). {linear}\n",
            year = self.year,
            n = n,
            r = result.correlation,
            r2 = result.r_squared,
            slope = result.slope,
            per_thousand = per_thousand,
            intercept = result.intercept,
            se = result.standard_error,
            geographic = GEOGRAPHIC_NARRATIVE,
            linear = LINEAR_NARRATIVE,
        )
    }

    /// Write a composed report into `dir`, creating it if needed.
    pub fn write_to_dir(&self, report: &str, dir: &Path) -> std::io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(REPORT_FILE_NAME);
        fs::write(&path, report)?;
        info!("Report saved: {}", path.display());
        Ok(path)
    }
}
