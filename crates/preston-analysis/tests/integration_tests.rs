//! Integration tests for the Preston curve analysis.
//!
//! These tests run the full pipeline over the fixture indicator snapshot and
//! boundary collection in `tests/fixtures`.

use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use preston_analysis::{
    AnalysisConfig, AnalysisError, AnalysisOutput, AnalysisStage, ArtifactSink,
    FileArtifactWriter, IndicatorField, InsufficientData, Pipeline, RegressionAnalyzer, sources,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_indicators() -> DataFrame {
    sources::read_indicator_csv(&fixtures_path().join("indicators.csv"))
        .expect("Failed to read indicator fixture")
}

fn load_world() -> serde_json::Value {
    sources::read_geometry_file(&fixtures_path().join("world.geojson"))
        .expect("Failed to read geometry fixture")
}

fn run_with(config: AnalysisConfig) -> AnalysisOutput {
    Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run_tables(&load_world(), &load_indicators())
        .unwrap()
}

fn run_default() -> AnalysisOutput {
    run_with(AnalysisConfig::default())
}

fn joined_row<'a>(output: &'a AnalysisOutput, name: &str) -> &'a preston_analysis::JoinedRecord {
    output
        .joined
        .iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("{name} not in joined rows"))
}

/// Straightforward two-pass OLS used as the reference.
fn reference_fit(points: &[(f64, f64)]) -> (f64, f64, f64) {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxy: f64 = points.iter().map(|p| (p.0 - mean_x) * (p.1 - mean_y)).sum();
    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    let syy: f64 = points.iter().map(|p| (p.1 - mean_y).powi(2)).sum();
    let slope = sxy / sxx;
    (slope, mean_y - slope * mean_x, sxy / (sxx * syy).sqrt())
}

fn assert_close(actual: f64, expected: f64) {
    let tolerance = 1e-9 * expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual}"
    );
}

// ============================================================================
// Join Tests
// ============================================================================

#[test]
fn test_joined_cardinality_matches_resolved_geometries() {
    let output = run_default();

    // 10 boundaries, Antarctica excluded
    assert_eq!(output.summary.resolution.input_rows, 10);
    assert_eq!(output.summary.resolution.excluded, 1);
    assert_eq!(output.joined.len(), 9);
    assert_eq!(output.summary.join.rows, 9);
    assert_eq!(
        output.summary.join.matched + output.summary.join.unmatched,
        output.joined.len()
    );
}

#[test]
fn test_unmatched_rows_carry_null_indicators() {
    let output = run_default();

    for name in ["Somaliland", "W. Sahara"] {
        let row = joined_row(&output, name);
        assert!(!row.is_matched());
        assert_eq!(row.gdp_pcap_ppp, None);
        assert_eq!(row.life_expectancy, None);
    }
    assert_eq!(joined_row(&output, "Somaliland").iso_a3, "-99");
    assert_eq!(output.summary.join.unmatched, 2);
}

#[test]
fn test_identifier_overrides_applied() {
    let output = run_default();

    let france = joined_row(&output, "France");
    assert_eq!(france.iso_a3, "FRA");
    assert_eq!(france.gdp_pcap_ppp, Some(50_000.0));

    let norway = joined_row(&output, "Norway");
    assert_eq!(norway.iso_a3, "NOR");
    assert_eq!(norway.life_expectancy, Some(83.0));

    assert_eq!(output.summary.resolution.overridden, 2);
    assert_eq!(output.summary.resolution.unassigned, 1);
}

#[test]
fn test_without_overrides_france_is_unmatched() {
    let config = AnalysisConfig::builder()
        .identifier_overrides(BTreeMap::new())
        .build()
        .unwrap();
    let output = run_with(config);

    let france = joined_row(&output, "France");
    assert_eq!(france.iso_a3, "-99");
    assert_eq!(france.gdp_pcap_ppp, None);
    assert_eq!(output.n(), 4);
}

#[test]
fn test_excluded_territory_absent() {
    let output = run_default();
    assert!(output.joined.iter().all(|r| r.name != "Antarctica"));

    let config = AnalysisConfig::builder()
        .excluded_territories(BTreeSet::new())
        .build()
        .unwrap();
    let output = run_with(config);
    assert_eq!(output.joined.len(), 10);
    assert_eq!(joined_row(&output, "Antarctica").gdp_pcap_ppp, None);
}

#[test]
fn test_extra_exclusion_from_builder() {
    let config = AnalysisConfig::builder()
        .exclude_territory("Qatar")
        .build()
        .unwrap();
    let output = run_with(config);

    assert_eq!(output.joined.len(), 8);
    assert!(output.joined.iter().all(|r| r.iso_a3 != "QAT"));
    assert_eq!(output.n(), 5);
}

#[test]
fn test_other_years_ignored() {
    let output = run_default();
    assert_eq!(joined_row(&output, "Germany").gdp_pcap_ppp, Some(60_000.0));
}

#[test]
fn test_duplicate_indicator_code_first_wins() {
    let output = run_default();

    let brazil = joined_row(&output, "Brazil");
    assert_eq!(brazil.gdp_pcap_ppp, Some(17_000.0));
    assert_eq!(brazil.life_expectancy, Some(73.0));
    assert_eq!(output.summary.join.duplicate_codes, vec!["BRA".to_string()]);
}

// ============================================================================
// Filter and Regression Tests
// ============================================================================

#[test]
fn test_eligible_subset_has_complete_rows_only() {
    let output = run_default();

    assert_eq!(output.n(), 6);
    assert!(
        output
            .eligible
            .iter()
            .all(|r| r.gdp_pcap_ppp.is_some() && r.life_expectancy.is_some())
    );
    assert!(output.eligible.iter().all(|r| r.name != "Chad"));

    assert_eq!(output.summary.missing[&IndicatorField::GdpPcapPpp], 3);
    assert_eq!(output.summary.missing[&IndicatorField::LifeExpectancy], 2);
}

#[test]
fn test_regression_matches_reference_fit() {
    let output = run_default();
    let result = output.regression().unwrap();

    let points = output
        .eligible
        .pairs(IndicatorField::GdpPcapPpp, IndicatorField::LifeExpectancy);
    let (slope, intercept, r) = reference_fit(&points);

    assert_eq!(result.n, 6);
    assert_close(result.slope, slope);
    assert_close(result.intercept, intercept);
    assert_close(result.correlation, r);
    assert_close(result.r_squared, r * r);
    assert!(result.standard_error > 0.0);
}

#[test]
fn test_regression_independent_of_row_order() {
    let output = run_default();
    let mut points = output
        .eligible
        .pairs(IndicatorField::GdpPcapPpp, IndicatorField::LifeExpectancy);

    let forward = RegressionAnalyzer::fit(points.clone()).unwrap();
    points.reverse();
    let reversed = RegressionAnalyzer::fit(points).unwrap();

    assert_eq!(forward.slope.to_bits(), reversed.slope.to_bits());
    assert_eq!(forward.intercept.to_bits(), reversed.intercept.to_bits());
    assert_eq!(forward.correlation.to_bits(), reversed.correlation.to_bits());
}

#[test]
fn test_repeated_runs_are_identical() {
    let first = run_default();
    let second = run_default();

    assert_eq!(first.joined, second.joined);
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.report().unwrap(), second.report().unwrap());
}

// ============================================================================
// Report Tests
// ============================================================================

#[test]
fn test_report_count_matches_eligible_subset() {
    let output = run_default();
    let report = output.report().unwrap();

    assert!(report.contains(&format!("- Countries/regions analyzed: {}\n", output.n())));
    assert!(report.contains("(2022)"));
    assert!(report.contains(&format!(
        "- Correlation (r): {:.4}\n",
        output.regression().unwrap().correlation
    )));
}

// ============================================================================
// Insufficient Data Tests
// ============================================================================

#[test]
fn test_single_eligible_row_is_insufficient() {
    let indicators = df!(
        "iso3_code" => &["DEU", "JPN"],
        "gdp_pcap_ppp" => &[Some(60_000.0), None],
        "life_expectancy" => &[Some(81.0), Some(84.0)]
    )
    .unwrap();

    let output = Pipeline::builder()
        .build()
        .unwrap()
        .run_tables(&load_world(), &indicators)
        .unwrap();

    assert_eq!(output.joined.len(), 9);
    assert_eq!(output.n(), 1);
    match output.regression().unwrap_err() {
        AnalysisError::DataInsufficient(InsufficientData::TooFewObservations { n }) => {
            assert_eq!(n, 1)
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(output.report().is_err());
}

#[test]
fn test_identical_gdp_is_insufficient() {
    let indicators = df!(
        "iso3_code" => &["DEU", "JPN", "QAT"],
        "gdp_pcap_ppp" => &[40_000.0, 40_000.0, 40_000.0],
        "life_expectancy" => &[81.0, 84.0, 79.0]
    )
    .unwrap();

    let output = Pipeline::builder()
        .build()
        .unwrap()
        .run_tables(&load_world(), &indicators)
        .unwrap();

    assert_eq!(output.n(), 3);
    assert!(matches!(
        output.regression,
        Err(InsufficientData::ZeroVariance { n: 3 })
    ));
}

#[test]
fn test_missing_indicator_column_is_schema_error() {
    let indicators = df!(
        "iso3_code" => &["DEU"],
        "gdp_pcap_ppp" => &[60_000.0]
    )
    .unwrap();

    let err = Pipeline::builder()
        .build()
        .unwrap()
        .run_tables(&load_world(), &indicators)
        .unwrap_err();

    assert!(err.is_schema());
    assert_eq!(err.error_code(), "SCHEMA_ERROR");
}

// ============================================================================
// Progress and Artifact Tests
// ============================================================================

#[test]
fn test_progress_reaches_complete() {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let sink = updates.clone();

    Pipeline::builder()
        .on_progress(move |update| sink.lock().unwrap().push(update))
        .build()
        .unwrap()
        .run_tables(&load_world(), &load_indicators())
        .unwrap();

    let updates = updates.lock().unwrap();
    assert_eq!(updates.first().map(|u| u.stage), Some(AnalysisStage::Loading));
    assert_eq!(updates.last().map(|u| u.stage), Some(AnalysisStage::Complete));
    assert!(updates.windows(2).all(|w| w[0].progress <= w[1].progress));
}

#[test]
fn test_artifacts_written_to_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = AnalysisConfig::builder()
        .output_dir(dir.path())
        .build()
        .unwrap();
    let output = run_with(config.clone());

    let written = FileArtifactWriter::from_config(&config)
        .emit(&output)
        .unwrap();
    assert_eq!(written.len(), 4);

    let scatter = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(dir.path().join("scatter.csv")))
        .expect("Failed to create CSV reader")
        .finish()
        .expect("Failed to read scatter CSV");
    assert_eq!(scatter.height(), output.n());
    assert_eq!(
        scatter
            .column("highlighted")
            .unwrap()
            .as_materialized_series()
            .bool()
            .unwrap()
            .sum(),
        Some(4)
    );

    let choropleth: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("choropleth.geojson")).unwrap(),
    )
    .unwrap();
    assert_eq!(choropleth["features"].as_array().unwrap().len(), 9);

    let report = std::fs::read_to_string(dir.path().join("analysis_results.txt")).unwrap();
    assert_eq!(report, output.report().unwrap());
}
