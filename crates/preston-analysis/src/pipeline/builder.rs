//! Pipeline entry point and builder.

use crate::config::{AnalysisConfig, ConfigValidationError};
use crate::error::Result;
use crate::filter::CompletenessFilter;
use crate::joiner::DatasetJoiner;
use crate::pipeline::output::{AnalysisOutput, AnalysisSummary};
use crate::pipeline::progress::{
    AnalysisStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
use crate::regression::RegressionAnalyzer;
use crate::reporting::ReportComposer;
use crate::resolver::IdentityResolver;
use crate::sources;
use crate::types::{GeometryRecord, IndicatorRecord};
use polars::prelude::DataFrame;
use std::sync::Arc;
use tracing::{error, info, warn};

/// The join-and-analyze pipeline.
///
/// Each run is a pure function of its two inputs and the configuration.
///
/// # Example
///
/// ```rust,ignore
/// use preston_analysis::{AnalysisConfig, Pipeline};
///
/// let output = Pipeline::builder()
///     .config(AnalysisConfig::builder().year(2022).build()?)
///     .build()?
///     .run_tables(&world_geojson, &indicator_df)?;
///
/// println!("N = {}", output.n());
/// println!("{}", output.report()?);
/// ```
pub struct Pipeline {
    config: AnalysisConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    resolver: IdentityResolver,
    joiner: DatasetJoiner,
    filter: CompletenessFilter,
    analyzer: RegressionAnalyzer,
    composer: ReportComposer,
}

static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Load both raw tables and run the analysis.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Schema`](crate::AnalysisError::Schema) if a
    /// required column is missing from either table. Insufficient data for
    /// the regression is not an error here; see [`AnalysisOutput::regression`].
    pub fn run_tables(
        &self,
        geometry: &serde_json::Value,
        indicators: &DataFrame,
    ) -> Result<AnalysisOutput> {
        self.report_progress(ProgressUpdate::new(
            AnalysisStage::Loading,
            0.0,
            "Loading input tables...",
        ));

        let loaded = sources::load_geometries(geometry).and_then(|geometries| {
            let records = sources::load_indicators(indicators, self.config.year)?;
            Ok((geometries, records))
        });

        match loaded {
            Ok((geometries, records)) => Ok(self.run(geometries, &records)),
            Err(e) => {
                error!("Loading failed: {}", e);
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Run the analysis over already-loaded records.
    pub fn run(
        &self,
        geometries: Vec<GeometryRecord>,
        indicators: &[IndicatorRecord],
    ) -> AnalysisOutput {
        info!(
            "Starting analysis: {} geometries, {} indicator rows",
            geometries.len(),
            indicators.len()
        );

        self.report_progress(ProgressUpdate::new(
            AnalysisStage::Resolving,
            0.0,
            "Resolving territory identifiers...",
        ));
        let (geometries, resolution) = self.resolver.resolve(geometries);

        self.report_progress(ProgressUpdate::new(
            AnalysisStage::Joining,
            0.0,
            "Joining geometries to indicators...",
        ));
        let (joined, join) = self.joiner.join(geometries, indicators);

        self.report_progress(ProgressUpdate::new(
            AnalysisStage::Filtering,
            0.0,
            "Selecting complete rows...",
        ));
        let eligible = self.filter.filter(&joined, &self.config.indicator_fields);
        let missing = self
            .filter
            .missing_counts(&joined, &self.config.indicator_fields);
        info!("Number of countries included in the analysis: {}", eligible.n());

        self.report_progress(ProgressUpdate::new(
            AnalysisStage::Regression,
            0.0,
            "Fitting regression...",
        ));
        let regression = self.analyzer.analyze(&eligible);

        let report = match &regression {
            Ok(result) => {
                self.report_progress(ProgressUpdate::new(
                    AnalysisStage::Reporting,
                    0.0,
                    "Composing report...",
                ));
                Some(self.composer.compose(eligible.n(), result))
            }
            Err(reason) => {
                warn!("Regression skipped: {}", reason);
                None
            }
        };

        let summary = AnalysisSummary {
            year: self.config.year,
            n: eligible.n(),
            resolution,
            join,
            missing,
            regression: regression.as_ref().ok().copied(),
            regression_error: regression.as_ref().err().cloned(),
        };

        self.report_progress(ProgressUpdate::complete(format!(
            "Analysis complete (N={})",
            eligible.n()
        )));

        AnalysisOutput {
            joined,
            eligible,
            regression,
            report,
            summary,
        }
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }
}

/// Builder for creating a [`Pipeline`] instance.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<AnalysisConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving stage updates.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            resolver: IdentityResolver::from_config(&config),
            joiner: DatasetJoiner,
            filter: CompletenessFilter,
            analyzer: RegressionAnalyzer::default(),
            composer: ReportComposer::new(config.year),
            progress_reporter: self.progress_reporter,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Geometry;
    use std::sync::Mutex;

    fn geo(iso: &str, name: &str) -> GeometryRecord {
        GeometryRecord::new(iso, name, Geometry::empty())
    }

    fn sample() -> (Vec<GeometryRecord>, Vec<IndicatorRecord>) {
        let geometries = vec![
            geo("-99", "France"),
            geo("DEU", "Germany"),
            geo("ATA", "Antarctica"),
            geo("-99", "Somaliland"),
            geo("ESP", "Spain"),
        ];
        let indicators = vec![
            IndicatorRecord::new("FRA", Some(1000.0), Some(50.0)),
            IndicatorRecord::new("DEU", Some(2000.0), Some(60.0)),
            IndicatorRecord::new("ESP", Some(3000.0), Some(70.0)),
            IndicatorRecord::new("ATA", Some(9000.0), Some(10.0)),
        ];
        (geometries, indicators)
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.config().year, 2022);
        assert!(pipeline.progress_reporter.is_none());
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let mut config = AnalysisConfig::default();
        config.year = 3000;
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_run_end_to_end() {
        let (geometries, indicators) = sample();
        let output = Pipeline::builder().build().unwrap().run(geometries, &indicators);

        assert_eq!(output.joined.len(), 4);
        assert!(output.joined.iter().all(|r| r.name != "Antarctica"));
        assert_eq!(output.n(), 3);

        let regression = output.regression().unwrap();
        assert_eq!(regression.n, 3);
        assert!((regression.slope - 0.01).abs() < 1e-9);
        assert!(output.report().unwrap().contains("analyzed: 3\n"));

        assert_eq!(output.summary.n, 3);
        assert_eq!(output.summary.resolution.excluded, 1);
        assert_eq!(output.summary.resolution.overridden, 1);
        assert_eq!(output.summary.join.unmatched, 1);
    }

    #[test]
    fn test_run_with_insufficient_data_keeps_datasets() {
        let geometries = vec![geo("FRA", "France"), geo("DEU", "Germany")];
        let indicators = vec![IndicatorRecord::new("FRA", Some(1000.0), Some(50.0))];

        let output = Pipeline::builder().build().unwrap().run(geometries, &indicators);

        assert_eq!(output.joined.len(), 2);
        assert_eq!(output.n(), 1);
        assert!(output.report.is_none());
        let err = output.regression().unwrap_err();
        assert!(err.is_data_insufficient());
        assert!(output.report().is_err());
        assert!(output.summary.regression_error.is_some());
    }

    #[test]
    fn test_run_treats_nan_indicator_as_missing() {
        let geometries = vec![geo("AAA", "Alpha"), geo("BBB", "Bravo"), geo("CCC", "Charlie")];
        let indicators = vec![
            IndicatorRecord::new("AAA", Some(1000.0), Some(50.0)),
            IndicatorRecord::new("BBB", Some(f64::NAN), Some(60.0)),
            IndicatorRecord::new("CCC", Some(3000.0), Some(70.0)),
        ];

        let output = Pipeline::builder().build().unwrap().run(geometries, &indicators);

        assert_eq!(output.joined.len(), 3);
        assert_eq!(output.n(), 2);
        assert_eq!(output.summary.missing[&crate::types::IndicatorField::GdpPcapPpp], 1);

        let regression = output.regression().unwrap();
        assert_eq!(regression.n, 2);
        assert!((regression.slope - 0.01).abs() < 1e-9);
        assert!((regression.intercept - 40.0).abs() < 1e-9);

        let report = output.report().unwrap();
        assert!(!report.contains("NaN"));
        assert!(report.contains("analyzed: 2\n"));
    }

    #[test]
    fn test_all_nan_indicators_are_insufficient() {
        let geometries = vec![geo("AAA", "Alpha"), geo("BBB", "Bravo")];
        let indicators = vec![
            IndicatorRecord::new("AAA", Some(f64::NAN), Some(50.0)),
            IndicatorRecord::new("BBB", Some(f64::INFINITY), Some(60.0)),
        ];

        let output = Pipeline::builder().build().unwrap().run(geometries, &indicators);

        assert_eq!(output.n(), 0);
        assert!(output.regression().unwrap_err().is_data_insufficient());
    }

    #[test]
    fn test_progress_stages_in_order() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = stages.clone();

        let pipeline = Pipeline::builder()
            .on_progress(move |update| sink.lock().unwrap().push(update.stage))
            .build()
            .unwrap();

        let (geometries, indicators) = sample();
        pipeline.run(geometries, &indicators);

        assert_eq!(
            *stages.lock().unwrap(),
            vec![
                AnalysisStage::Resolving,
                AnalysisStage::Joining,
                AnalysisStage::Filtering,
                AnalysisStage::Regression,
                AnalysisStage::Reporting,
                AnalysisStage::Complete,
            ]
        );
    }

    #[test]
    fn test_run_tables_schema_error_reports_failure() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = stages.clone();
        let pipeline = Pipeline::builder()
            .on_progress(move |update| sink.lock().unwrap().push(update.stage))
            .build()
            .unwrap();

        let geometry = serde_json::json!({"features": []});
        let indicators = polars::df!("iso3_code" => &["FRA"]).unwrap();

        let err = pipeline.run_tables(&geometry, &indicators).unwrap_err();

        assert!(err.is_schema());
        assert_eq!(
            stages.lock().unwrap().last().copied(),
            Some(AnalysisStage::Failed)
        );
    }
}
