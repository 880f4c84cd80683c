//! Frame-by-frame comparison against a reference trace.
//!
//! The reference is a JSON array of `{"Result": ..., "Score": ...}` objects.
//! Each live frame is matched with the reference entry at the same index:
//! texts are compared by character similarity and scores by absolute
//! difference. Frames past the end of the reference are reported as extra.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize, Serializer};
use similar::TextDiff;

use crate::export::{csv_field, ExportError, ExportResult, ExportedFiles};
use crate::logging::RunLogger;
use crate::orchestrator::SignalSample;

pub const COMPARISON_CSV: &str = "comparison.csv";
pub const COMPARISON_JSON: &str = "comparison.json";

/// Similarity above which a frame counts as matching.
pub const MATCH_THRESHOLD: f64 = 0.9;

/// One expected frame from the reference trace.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReferenceEntry {
    #[serde(rename = "Result", default)]
    pub result: String,
    #[serde(rename = "Score", default)]
    pub score: f64,
}

/// One observed frame: detected text and its score.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveFrame {
    pub detected: String,
    pub score: f64,
}

/// Verdict for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "DIFF")]
    Diff,
    #[serde(rename = "EXTRA")]
    Extra,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::Ok => write!(f, "OK"),
            MatchStatus::Diff => write!(f, "DIFF"),
            MatchStatus::Extra => write!(f, "EXTRA"),
        }
    }
}

/// Comparison result for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    #[serde(rename = "Frame")]
    pub frame: usize,
    #[serde(rename = "Expected")]
    pub expected: String,
    #[serde(rename = "Detected")]
    pub detected: String,
    #[serde(rename = "Match")]
    pub status: MatchStatus,
    #[serde(rename = "Similarity")]
    pub similarity: f64,
    /// `None` for extra frames.
    #[serde(rename = "ScoreDiff", serialize_with = "score_diff_or_dash")]
    pub score_diff: Option<f64>,
}

fn score_diff_or_dash<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(diff) => serializer.serialize_f64(*diff),
        None => serializer.serialize_str("-"),
    }
}

/// Load the reference trace.
///
/// A missing or malformed file is logged and yields an empty reference, so
/// every live frame is reported as extra.
pub fn load_reference(path: &Path, logger: &RunLogger) -> Vec<ReferenceEntry> {
    match read_reference(path) {
        Ok(entries) => {
            logger.info(&format!(
                "Loaded {} reference entries from {}",
                entries.len(),
                path.display()
            ));
            entries
        }
        Err(e) => {
            logger.warn(&format!("Could not load reference trace: {}", e));
            Vec::new()
        }
    }
}

fn read_reference(path: &Path) -> ExportResult<Vec<ReferenceEntry>> {
    let text = fs::read_to_string(path).map_err(|source| ExportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ExportError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Build live frames from collected samples.
///
/// Failed reads count as an empty detection and a zero score.
pub fn live_frames(
    samples: &[SignalSample],
    result_signal: &str,
    score_signal: &str,
) -> Vec<LiveFrame> {
    samples
        .iter()
        .map(|sample| LiveFrame {
            detected: sample
                .get(result_signal)
                .map(|v| v.to_string().trim().to_string())
                .unwrap_or_default(),
            score: sample
                .get(score_signal)
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0),
        })
        .collect()
}

/// Character-level similarity ratio in `[0, 1]`.
///
/// Two empty strings are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    TextDiff::from_chars(a, b).ratio() as f64
}

/// Compare live frames with the reference, index by index.
pub fn compare(live: &[LiveFrame], reference: &[ReferenceEntry]) -> Vec<ComparisonRow> {
    live.iter()
        .enumerate()
        .map(|(frame, observed)| match reference.get(frame) {
            Some(entry) => {
                let expected = entry.result.trim().to_string();
                let ratio = similarity(&expected, &observed.detected);
                ComparisonRow {
                    frame,
                    status: if ratio > MATCH_THRESHOLD {
                        MatchStatus::Ok
                    } else {
                        MatchStatus::Diff
                    },
                    expected,
                    detected: observed.detected.clone(),
                    similarity: round_to(ratio, 2),
                    score_diff: Some(round_to((observed.score - entry.score).abs(), 3)),
                }
            }
            None => ComparisonRow {
                frame,
                expected: "N/A".to_string(),
                detected: observed.detected.clone(),
                status: MatchStatus::Extra,
                similarity: 0.0,
                score_diff: None,
            },
        })
        .collect()
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Write `comparison.csv` and `comparison.json` into `output_dir`.
pub fn write_comparison(
    rows: &[ComparisonRow],
    output_dir: &Path,
    logger: &RunLogger,
) -> ExportResult<ExportedFiles> {
    fs::create_dir_all(output_dir).map_err(|e| ExportError::io(output_dir, e))?;
    let csv_path = output_dir.join(COMPARISON_CSV);
    let json_path = output_dir.join(COMPARISON_JSON);

    let mut csv = String::from("Frame,Expected,Detected,Match,Similarity,ScoreDiff\n");
    for row in rows {
        let score_diff = row
            .score_diff
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            row.frame,
            csv_field(&row.expected),
            csv_field(&row.detected),
            row.status,
            row.similarity,
            score_diff
        ));
    }
    fs::write(&csv_path, csv).map_err(|e| ExportError::io(&csv_path, e))?;

    let json = serde_json::to_string_pretty(rows).map_err(|source| ExportError::Json {
        path: json_path.clone(),
        source,
    })?;
    fs::write(&json_path, json).map_err(|e| ExportError::io(&json_path, e))?;

    let matched = rows.iter().filter(|r| r.status == MatchStatus::Ok).count();
    logger.info(&format!(
        "Comparison: {}/{} frames match; report written to {}",
        matched,
        rows.len(),
        csv_path.display()
    ));
    Ok(ExportedFiles {
        csv: csv_path,
        json: json_path,
    })
}
