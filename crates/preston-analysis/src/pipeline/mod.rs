//! Analysis pipeline module.
//!
//! This module contains:
//! - [`Pipeline`] and its builder, wiring resolver, joiner, filter,
//!   regression and report composer together
//! - [`AnalysisOutput`], the public return surface of a run
//! - Progress reporting types

mod builder;
mod output;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder};
pub use output::{AnalysisOutput, AnalysisSummary};
pub use progress::{AnalysisStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate};
