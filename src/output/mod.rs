//! Report output writing and downstream format helpers
//!
//! The core pipeline hands its [`ResultBundle`](crate::pipeline::ResultBundle)
//! to a writer backend; the default backend writes one JSON file per report
//! into the compiled-data folder. The permutation-key helpers are the only
//! obligations this crate has to the downstream cache/query service.

use crate::pipeline::ResultBundle;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ReportWriterError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl From<std::io::Error> for ReportWriterError {
    fn from(err: std::io::Error) -> Self {
        ReportWriterError::Io(err)
    }
}

impl From<serde_json::Error> for ReportWriterError {
    fn from(err: serde_json::Error) -> Self {
        ReportWriterError::Serialization(err)
    }
}

impl std::fmt::Display for ReportWriterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportWriterError::Io(e) => write!(f, "IO error: {}", e),
            ReportWriterError::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for ReportWriterError {}

/// Backend for persisting finalized reports.
#[async_trait]
pub trait ReportWriterBackend {
    async fn write_report(&mut self, name: &str, data: &Value) -> Result<(), ReportWriterError>;
}

/// Writes each report to `<folder>/<name>.json`.
pub struct JsonReportWriter {
    folder: PathBuf,
}

impl JsonReportWriter {
    pub fn new(folder: PathBuf) -> Self {
        Self { folder }
    }
}

#[async_trait]
impl ReportWriterBackend for JsonReportWriter {
    async fn write_report(&mut self, name: &str, data: &Value) -> Result<(), ReportWriterError> {
        tokio::fs::create_dir_all(&self.folder).await?;
        let path = self.folder.join(format!("{}.json", name));
        log::info!("Writing to {}", path.display());
        tokio::fs::write(&path, serde_json::to_vec(data)?).await?;
        Ok(())
    }
}

/// Split the bundle into the reports to write, lifting `eventTotals` up
/// into byNameOnly / byLocation / byUserAgentOnly so the viewer can fetch
/// only the slice it needs.
pub fn flatten_bundle(bundle: ResultBundle) -> BTreeMap<String, Value> {
    let mut reports = bundle.reports;

    if let Some(Value::Object(mut totals)) = reports.remove("eventTotals") {
        for key in ["byNameOnly", "byLocation", "byUserAgentOnly"] {
            if let Some(section) = totals.remove(key) {
                reports.insert(key.to_string(), section);
            }
        }
    }

    reports
}

/// Downstream export key for one count series: `"dim1||dim2||dim3"`.
pub fn permutation_key(dimensions: &[&str]) -> String {
    dimensions.join("||")
}

/// Sparse per-date counts keyed by DateIndex as a decimal string; zero
/// entries are omitted, matching the downstream export format.
pub fn date_counts(series: &[u64]) -> BTreeMap<String, u64> {
    series
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .map(|(date_index, count)| (date_index.to_string(), *count))
        .collect()
}
