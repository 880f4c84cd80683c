//! Export of collected signals.
//!
//! Writes `signals.csv` (one row per sample, one column per signal) and
//! `result_summary.json` (run metadata plus every sample) into the output
//! directory.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::logging::RunLogger;
use crate::orchestrator::{RunReport, SignalSample, StartStrategy};
use crate::rpc::SignalValue;

pub const SIGNALS_CSV: &str = "signals.csv";
pub const SUMMARY_JSON: &str = "result_summary.json";

/// Errors raised while writing result files.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ExportError {
    /// Create a write error for a path.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Files written by [`export_results`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFiles {
    pub csv: PathBuf,
    pub json: PathBuf,
}

/// Run metadata stored next to the samples.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub model_name: String,
    pub endpoint: String,
    pub strategy: StartStrategy,
    pub started_at: String,
    pub stopped_at: String,
    pub sample_count: usize,
    pub result: i32,
    pub additional_result: i32,
    pub add_to_protocol: bool,
}

impl RunMetadata {
    pub fn from_report(report: &RunReport) -> Self {
        Self {
            model_name: report.model_name.clone(),
            endpoint: report.endpoint.clone(),
            strategy: report.strategy,
            started_at: report.started_at.to_rfc3339(),
            stopped_at: report.stopped_at.to_rfc3339(),
            sample_count: report.samples.len(),
            result: report.result.code,
            additional_result: report.result.additional_code,
            add_to_protocol: report.result.add_to_protocol,
        }
    }
}

#[derive(Serialize)]
struct Summary<'a> {
    metadata: RunMetadata,
    signals: Vec<Map<String, Value>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    missing_reads: BTreeMap<&'a str, usize>,
}

/// Write the signal table and run summary.
///
/// Returns `None` without touching the filesystem when no samples were
/// collected.
pub fn export_results(
    report: &RunReport,
    output_dir: &Path,
    logger: &RunLogger,
) -> ExportResult<Option<ExportedFiles>> {
    if report.samples.is_empty() {
        logger.warn("No signal data collected; skipping export");
        return Ok(None);
    }

    fs::create_dir_all(output_dir).map_err(|e| ExportError::io(output_dir, e))?;
    let csv_path = output_dir.join(SIGNALS_CSV);
    let json_path = output_dir.join(SUMMARY_JSON);

    let columns = signal_columns(&report.samples);
    fs::write(&csv_path, render_csv(&columns, &report.samples))
        .map_err(|e| ExportError::io(&csv_path, e))?;

    let summary = Summary {
        metadata: RunMetadata::from_report(report),
        signals: report.samples.iter().map(sample_row).collect(),
        missing_reads: count_missing(&columns, &report.samples),
    };
    let json = serde_json::to_string_pretty(&summary).map_err(|source| ExportError::Json {
        path: json_path.clone(),
        source,
    })?;
    fs::write(&json_path, json).map_err(|e| ExportError::io(&json_path, e))?;

    logger.info(&format!(
        "Results exported to {} and {}",
        csv_path.display(),
        json_path.display()
    ));
    Ok(Some(ExportedFiles {
        csv: csv_path,
        json: json_path,
    }))
}

/// Signal names in first-seen order across all samples.
fn signal_columns(samples: &[SignalSample]) -> Vec<&str> {
    let mut columns: Vec<&str> = Vec::new();
    for sample in samples {
        for (name, _) in &sample.values {
            if !columns.contains(&name.as_str()) {
                columns.push(name);
            }
        }
    }
    columns
}

fn render_csv(columns: &[&str], samples: &[SignalSample]) -> String {
    let mut out = String::new();
    let header: Vec<String> = std::iter::once("timestamp")
        .chain(columns.iter().copied())
        .map(csv_field)
        .collect();
    out.push_str(&header.join(","));
    out.push('\n');

    for sample in samples {
        let mut row = vec![csv_field(&sample.timestamp.to_rfc3339())];
        for column in columns {
            let cell = sample.get(column).map(|v| v.to_string()).unwrap_or_default();
            row.push(csv_field(&cell));
        }
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Quote a field if it contains a delimiter, quote or line break.
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn sample_row(sample: &SignalSample) -> Map<String, Value> {
    let mut row = Map::new();
    row.insert("timestamp".to_string(), Value::String(sample.timestamp.to_rfc3339()));
    for (name, value) in &sample.values {
        row.insert(name.clone(), value.as_ref().map_or(Value::Null, signal_json));
    }
    row
}

fn signal_json(value: &SignalValue) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn count_missing<'a>(columns: &[&'a str], samples: &[SignalSample]) -> BTreeMap<&'a str, usize> {
    let mut missing = BTreeMap::new();
    for column in columns {
        let count = samples.iter().filter(|s| s.get(column).is_none()).count();
        if count > 0 {
            missing.insert(*column, count);
        }
    }
    missing
}
