//! Text report generation.
//!
//! [`ReportComposer`] substitutes the regression statistics into a fixed
//! template. The output contains no timestamps or locale-dependent
//! formatting, so identical inputs always produce byte-identical reports.
//!
//! # Example
//!
//! ```rust,ignore
//! use preston_analysis::reporting::ReportComposer;
//!
//! let composer = ReportComposer::new(2022);
//! let text = composer.compose(eligible.n(), &regression);
//! std::fs::write("output/analysis_results.txt", text)?;
//! ```

mod composer;

pub use composer::{REPORT_FILE_NAME, ReportComposer};
