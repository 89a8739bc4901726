//! Preston Curve Analysis Library
//!
//! Joins a country-level indicator snapshot (GDP per capita PPP and life
//! expectancy) to a table of country boundaries, selects the countries with
//! complete data, fits an ordinary least squares line of life expectancy on
//! GDP per capita and writes a plain-text report.
//!
//! # Overview
//!
//! - **Identity resolution**: name-keyed ISO3 overrides and exclusions
//!   applied to the geometry table before the join
//! - **Join**: left join on ISO3 code; every geometry row survives,
//!   unmatched rows carry null indicators
//! - **Completeness filter**: rows with every indicator present
//! - **Regression**: slope, intercept, Pearson r, R² and standard errors
//! - **Report**: fixed-layout English text document
//! - **Artifacts**: GeoJSON for the choropleth maps, CSV for the scatter
//!   plot, the report and a JSON summary
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use preston_analysis::{AnalysisConfig, ArtifactSink, FileArtifactWriter, Pipeline, sources};
//! use std::path::Path;
//!
//! let indicators = sources::read_indicator_csv(Path::new("wdi.csv"))?;
//! let world = sources::read_geometry_file(Path::new("world.geojson"))?;
//!
//! let config = AnalysisConfig::builder()
//!     .year(2022)
//!     .identifier_override("Kosovo", "XKX")
//!     .build()?;
//!
//! let output = Pipeline::builder()
//!     .config(config.clone())
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run_tables(&world, &indicators)?;
//!
//! FileArtifactWriter::from_config(&config).emit(&output)?;
//! println!("{}", output.report()?);
//! ```
//!
//! # Errors
//!
//! Loading fails with [`AnalysisError::Schema`] when a required column is
//! missing. A run whose eligible subset is too small (fewer than two rows,
//! or all GDP values equal) still returns the joined and filtered rows;
//! [`AnalysisOutput::regression`] and [`AnalysisOutput::report`] then return
//! [`AnalysisError::DataInsufficient`].

pub mod artifacts;
pub mod config;
pub mod error;
pub mod filter;
pub mod joiner;
pub mod pipeline;
pub mod regression;
pub mod reporting;
pub mod resolver;
pub mod sources;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use artifacts::{ArtifactSink, FileArtifactWriter};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, ConfigValidationError};
pub use error::{AnalysisError, InsufficientData, Result as AnalysisResult, ResultExt};
pub use filter::{CompletenessFilter, EligibleSubset};
pub use joiner::{DatasetJoiner, JoinStats};
pub use pipeline::{
    AnalysisOutput, AnalysisStage, AnalysisSummary, ClosureProgressReporter, Pipeline,
    PipelineBuilder, ProgressReporter, ProgressUpdate,
};
pub use regression::{RegressionAnalyzer, RegressionResult};
pub use reporting::ReportComposer;
pub use resolver::{IdentityResolver, Resolution};
pub use types::{
    Geometry, GeometryRecord, IndicatorField, IndicatorRecord, JoinedRecord, UNASSIGNED_ISO_A3,
};
