//! Artifact emission.
//!
//! Rendering maps and plots is left to external tools. An [`ArtifactSink`]
//! receives the finished [`AnalysisOutput`] and persists whatever those
//! tools need: the joined rows with their geometry for the two choropleth
//! maps, the eligible rows with fitted values for the scatter plot, the text
//! report and a JSON summary.

mod writer;

use crate::error::Result;
use crate::pipeline::AnalysisOutput;
use std::path::PathBuf;

pub use writer::{
    CHOROPLETH_FILE_NAME, FileArtifactWriter, SCATTER_FILE_NAME, SUMMARY_FILE_NAME,
};

/// Consumer of a finished pipeline run.
pub trait ArtifactSink {
    /// Persist artifacts for `output`, returning the paths written.
    fn emit(&self, output: &AnalysisOutput) -> Result<Vec<PathBuf>>;
}
