use crate::artifacts::ArtifactSink;
use crate::config::AnalysisConfig;
use crate::error::{Result, ResultExt};
use crate::pipeline::AnalysisOutput;
use crate::reporting::ReportComposer;
use polars::prelude::*;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::PathBuf;
use tracing::{debug, info};

pub const CHOROPLETH_FILE_NAME: &str = "choropleth.geojson";
pub const SCATTER_FILE_NAME: &str = "scatter.csv";
pub const SUMMARY_FILE_NAME: &str = "summary.json";

/// Writes artifacts as plain files into one directory.
#[derive(Debug, Clone)]
pub struct FileArtifactWriter {
    output_dir: PathBuf,
    highlighted_codes: BTreeSet<String>,
    year: i32,
}

impl FileArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>, highlighted_codes: BTreeSet<String>, year: i32) -> Self {
        Self {
            output_dir: output_dir.into(),
            highlighted_codes,
            year,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.output_dir.clone(),
            config.highlighted_codes.clone(),
            config.year,
        )
    }

    /// FeatureCollection of every joined row; missing values stay `null`.
    fn choropleth(&self, output: &AnalysisOutput) -> Value {
        let features: Vec<Value> = output
            .joined
            .iter()
            .map(|row| {
                json!({
                    "type": "Feature",
                    "properties": {
                        "iso_a3": row.iso_a3,
                        "name": row.name,
                        "gdp_pcap_ppp": row.gdp_pcap_ppp,
                        "life_expectancy": row.life_expectancy,
                    },
                    "geometry": row.geometry.as_value(),
                })
            })
            .collect();

        json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }

    /// Eligible rows with the fitted value and highlight flag.
    fn scatter_frame(&self, output: &AnalysisOutput) -> PolarsResult<DataFrame> {
        let rows = output.eligible.rows();

        let iso: Vec<&str> = rows.iter().map(|r| r.iso_a3.as_str()).collect();
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        let gdp: Vec<Option<f64>> = rows.iter().map(|r| r.gdp_pcap_ppp).collect();
        let life: Vec<Option<f64>> = rows.iter().map(|r| r.life_expectancy).collect();
        let fitted: Vec<Option<f64>> = rows
            .iter()
            .map(|r| match (&output.regression, r.gdp_pcap_ppp) {
                (Ok(result), Some(x)) => Some(result.predict(x)),
                _ => None,
            })
            .collect();
        let highlighted: Vec<bool> = rows
            .iter()
            .map(|r| self.highlighted_codes.contains(&r.iso_a3))
            .collect();

        DataFrame::new(vec![
            Column::new("iso_a3".into(), iso),
            Column::new("name".into(), names),
            Column::new("gdp_pcap_ppp".into(), gdp),
            Column::new("life_expectancy".into(), life),
            Column::new("fitted".into(), fitted),
            Column::new("highlighted".into(), highlighted),
        ])
    }

    fn write_json(&self, name: &str, value: &impl serde::Serialize) -> Result<PathBuf> {
        let path = self.output_dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(value)?)
            .context(format!("Writing {}", path.display()))?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }
}

impl ArtifactSink for FileArtifactWriter {
    fn emit(&self, output: &AnalysisOutput) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.output_dir)
            .context(format!("Creating {}", self.output_dir.display()))?;

        let mut written = Vec::new();

        written.push(self.write_json(CHOROPLETH_FILE_NAME, &self.choropleth(output))?);

        let scatter_path = self.output_dir.join(SCATTER_FILE_NAME);
        let mut scatter = self
            .scatter_frame(output)
            .context("Building scatter table")?;
        let mut file = File::create(&scatter_path)
            .context(format!("Creating {}", scatter_path.display()))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .finish(&mut scatter)
            .context("Writing scatter table")?;
        written.push(scatter_path);

        if let Some(report) = &output.report {
            let composer = ReportComposer::new(self.year);
            written.push(composer.write_to_dir(report, &self.output_dir)?);
        }

        written.push(self.write_json(SUMMARY_FILE_NAME, &output.summary)?);

        info!(
            "Wrote {} artifacts to {}",
            written.len(),
            self.output_dir.display()
        );
        Ok(written)
    }
}
