//! CLI entry point for the Preston curve analysis.

use anyhow::{Result, anyhow};
use clap::Parser;
use preston_analysis::{
    AnalysisConfig, AnalysisOutput, ArtifactSink, FileArtifactWriter, Pipeline, sources,
};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Preston curve analysis: life expectancy against GDP per capita",
    long_about = "Joins a country indicator snapshot to country boundaries, fits an OLS line \
                  of life expectancy on GDP per capita and writes the artifacts.\n\n\
                  EXAMPLES:\n  \
                  # Default run\n  \
                  preston-analysis -i wdi_2022.csv -g world.geojson\n\n  \
                  # Extra identifier fix and a different output directory\n  \
                  preston-analysis -i wdi.csv -g world.geojson --override Kosovo=XKX -o results/\n\n  \
                  # Machine-readable summary\n  \
                  preston-analysis -i wdi.csv -g world.geojson --json | jq .regression"
)]
struct Args {
    /// Path to the indicator CSV
    #[arg(short, long)]
    indicators: PathBuf,

    /// Path to the country boundaries GeoJSON
    #[arg(short, long)]
    geometry: PathBuf,

    /// Output directory for artifacts
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Snapshot year of the indicator data
    #[arg(short, long)]
    year: Option<i32>,

    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Extra identifier override, as NAME=ISO3 (repeatable)
    #[arg(long = "override", value_name = "NAME=ISO3", value_parser = parse_override)]
    overrides: Vec<(String, String)>,

    /// Extra territory to exclude, by exact name (repeatable)
    #[arg(long, value_name = "NAME")]
    exclude: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output the JSON summary to stdout instead of a human-readable summary
    ///
    /// Disables all logs. Artifacts are still written.
    #[arg(long)]
    json: bool,
}

fn parse_override(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, code)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), code.trim().to_string()))
        }
        _ => Err(format!("expected NAME=ISO3, got '{}'", raw)),
    }
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled so that
/// stdout only carries the JSON summary.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    for path in [&args.indicators, &args.geometry] {
        if !path.exists() {
            return Err(anyhow!("Input file not found: {}", path.display()));
        }
    }

    let config = build_config(&args)?;

    info!("Loading indicators from: {}", args.indicators.display());
    let indicators = sources::read_indicator_csv(&args.indicators)?;
    info!("Indicator table loaded: {:?}", indicators.shape());

    info!("Loading geometries from: {}", args.geometry.display());
    let geometry = sources::read_geometry_file(&args.geometry)?;

    let pipeline = build_pipeline(&args, config.clone())?;
    let output = pipeline.run_tables(&geometry, &indicators).map_err(|e| {
        error!("Analysis failed: {}", e);
        anyhow!("Analysis failed: {}", e)
    })?;

    let written = FileArtifactWriter::from_config(&config).emit(&output)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output.summary)?);
    } else {
        print_human_readable_summary(&output, &written, &config.output_dir);
    }

    // Artifacts for the joined data are kept even when no line could be fitted.
    if let Err(e) = output.regression() {
        return Err(anyhow!("Regression not computed: {}", e));
    }

    Ok(())
}

/// Merge the optional config file with command-line flags.
fn build_config(args: &Args) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str::<AnalysisConfig>(&content)?
        }
        None => AnalysisConfig::default(),
    };

    if let Some(year) = args.year {
        config.year = year;
    }
    if let Some(ref output) = args.output {
        config.output_dir = output.clone();
    }
    config
        .identifier_overrides
        .extend(args.overrides.iter().cloned());
    config
        .excluded_territories
        .extend(args.exclude.iter().cloned());

    config.validate()?;
    Ok(config)
}

fn build_pipeline(args: &Args, config: AnalysisConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder().config(config);

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Print the end-of-run summary.
///
/// Uses `println!` on purpose: this is the primary output and must show
/// regardless of the log level.
fn print_human_readable_summary(output: &AnalysisOutput, written: &[PathBuf], output_dir: &Path) {
    let summary = &output.summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("ANALYSIS COMPLETE ({})", summary.year);
    println!("{}", "=".repeat(80));
    println!();

    println!("Data:");
    println!(
        "  Geometries: {} ({} excluded, {} overridden, {} unassigned)",
        summary.resolution.input_rows,
        summary.resolution.excluded,
        summary.resolution.overridden,
        summary.resolution.unassigned
    );
    println!(
        "  Joined rows: {} ({} matched, {} unmatched)",
        summary.join.rows, summary.join.matched, summary.join.unmatched
    );
    for (field, missing) in &summary.missing {
        println!("  Missing {}: {}", field, missing);
    }
    println!("  Countries analyzed: {}", summary.n);
    println!();

    match output.regression() {
        Ok(result) => {
            println!("Regression:");
            println!("  Slope: {:.6}", result.slope);
            println!("  Intercept: {:.4}", result.intercept);
            println!("  Correlation: {:.4}", result.correlation);
            println!("  R-squared: {:.4}", result.r_squared);
        }
        Err(e) => {
            warn!("No regression line: {}", e);
            println!("Regression: not computed ({})", e);
        }
    }
    println!();

    println!("Artifacts ({}):", output_dir.display());
    for path in written {
        println!("  - {}", path.display());
    }
    println!();
    println!("Use --json for machine-readable output");
}
