//! Result persistence (made by FontLab https://www.fontlab.com/)
//!
//! Accumulates per-font results and writes the run's artifacts. Two
//! granularities, deliberately kept distinct: one artifact per font plus
//! a manifest (partial progress survives a crash), or one aggregate
//! artifact at the end (simpler, loses everything on a crash). Any
//! pre-existing artifact is copied to a backup sibling before overwrite,
//! so at most one generation can be lost, never both.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::catalog::FontDescriptor;
use crate::measure::CharacterMeasurement;
use crate::scale::ScaleOutcome;

/// Round to 2 decimal places (character widths).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to 3 decimal places (scale ratios).
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// One font's persisted result. Field names match the artifacts the
/// measurement scripts have always produced, so downstream consumers
/// keep parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontResult {
    pub name: String,
    #[serde(rename = "importUrl")]
    pub import_url: String,
    #[serde(rename = "cssFamily")]
    pub css_family: String,
    #[serde(
        rename = "displayName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characters: Option<IndexMap<String, f64>>,
    #[serde(
        rename = "characterCount",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub character_count: Option<usize>,
    #[serde(
        rename = "lastMeasuredAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_measured_at: Option<String>,
    #[serde(
        rename = "widthScale",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub width_scale: Option<f64>,
    #[serde(
        rename = "heightScale",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub height_scale: Option<f64>,
    /// Backward-compatible alias of `widthScale`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(
        rename = "measurementError",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub measurement_error: Option<String>,
}

impl FontResult {
    /// Character-metrics result. Widths are rounded on the way in so a
    /// re-run against an unchanged engine is byte-identical.
    pub fn from_characters(
        key: &str,
        font: &FontDescriptor,
        measurement: CharacterMeasurement,
    ) -> Self {
        let characters: IndexMap<String, f64> = measurement
            .characters
            .into_iter()
            .map(|(probe, width)| (probe, round2(width)))
            .collect();
        let count = characters.len();

        Self {
            name: key.to_string(),
            import_url: font.import_url.clone(),
            css_family: font.css_family.clone(),
            display_name: font.display_name.clone(),
            character_count: Some(count),
            characters: Some(characters),
            last_measured_at: Some(timestamp_now()),
            width_scale: None,
            height_scale: None,
            scale: None,
            measurement_error: measurement.error,
        }
    }

    /// Scale result; `fallback` carries the recorded indication when the
    /// identity scale was substituted.
    pub fn from_scale(
        key: &str,
        font: &FontDescriptor,
        outcome: ScaleOutcome,
        fallback: Option<String>,
    ) -> Self {
        let width = round3(outcome.width_scale);
        Self {
            name: key.to_string(),
            import_url: font.import_url.clone(),
            css_family: font.css_family.clone(),
            display_name: font.display_name.clone(),
            characters: None,
            character_count: None,
            last_measured_at: None,
            width_scale: Some(width),
            height_scale: Some(round3(outcome.height_scale)),
            scale: Some(width),
            measurement_error: fallback,
        }
    }
}

/// Per-run statistics; also the manifest artifact schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub timestamp: String,
    #[serde(rename = "totalFonts")]
    pub total_fonts: usize,
    #[serde(rename = "successCount")]
    pub success_count: usize,
    #[serde(rename = "failureCount")]
    pub failure_count: usize,
    pub files: Vec<String>,
    /// Artifacts that could not be written. Not part of the manifest;
    /// the CLI turns a non-zero count into a failing exit status.
    #[serde(skip)]
    pub write_failures: usize,
}

/// Where and how results are persisted.
#[derive(Debug, Clone)]
pub enum PersistMode {
    /// One artifact per font, written as each font completes, plus an
    /// `index.json` manifest at the end.
    PerFont { dir: PathBuf },
    /// One aggregate artifact for the whole run, written once at the end.
    Aggregate { path: PathBuf },
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: String,
        source: serde_json::Error,
    },
}

/// Accumulates results under a single-writer discipline. Sessions merge
/// one font at a time through the mutex; nothing else mutates results.
pub struct ResultStore {
    mode: PersistMode,
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    results: IndexMap<String, FontResult>,
    files: Vec<String>,
    success: usize,
    failure: usize,
    write_failures: usize,
}

impl ResultStore {
    pub fn new(mode: PersistMode) -> Self {
        Self {
            mode,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Merge one font's result. In per-font mode the artifact is written
    /// immediately; a write failure is logged and counted, never thrown.
    pub fn record(&self, key: &str, result: FontResult, failed: bool) {
        let mut state = self.state.lock().expect("result store mutex poisoned");
        if failed {
            state.failure += 1;
        } else {
            state.success += 1;
        }

        if let PersistMode::PerFont { dir } = &self.mode {
            let filename = safe_file_name(key);
            match write_pretty_json(&dir.join(&filename), &result) {
                Ok(()) => state.files.push(filename),
                Err(err) => {
                    log::error!("{key}: {err}");
                    state.write_failures += 1;
                }
            }
        }

        state.results.insert(key.to_string(), result);
    }

    /// Finish the run: write the manifest or the aggregate artifact and
    /// return the summary. Results are reordered to `key_order` first so
    /// parallel sessions cannot perturb the output.
    pub fn finish(&self, key_order: &[String]) -> RunSummary {
        let mut state = self.state.lock().expect("result store mutex poisoned");

        let mut ordered = IndexMap::with_capacity(state.results.len());
        for key in key_order {
            if let Some(result) = state.results.shift_remove(key) {
                ordered.insert(key.clone(), result);
            }
        }
        // Anything recorded outside the expected order still persists.
        for (key, result) in state.results.drain(..) {
            ordered.insert(key, result);
        }
        state.results = ordered;

        let mut summary = RunSummary {
            timestamp: timestamp_now(),
            total_fonts: state.results.len(),
            success_count: state.success,
            failure_count: state.failure,
            files: Vec::new(),
            write_failures: state.write_failures,
        };

        match &self.mode {
            PersistMode::PerFont { dir } => {
                let mut files = state.files.clone();
                files.sort();
                summary.files = files;
                if let Err(err) = write_pretty_json(&dir.join("index.json"), &summary) {
                    log::error!("manifest: {err}");
                    summary.write_failures += 1;
                }
            }
            PersistMode::Aggregate { path } => {
                if let Err(err) = write_pretty_json(path, &state.results) {
                    log::error!("aggregate artifact: {err}");
                    summary.write_failures += 1;
                } else if let Some(name) = path.file_name() {
                    summary.files = vec![name.to_string_lossy().to_string()];
                }
            }
        }

        summary
    }
}

/// Filesystem-safe artifact name for a font key: lowercase, runs of
/// non-alphanumerics collapsed to single dashes.
pub fn safe_file_name(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for ch in key.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            stem.push(ch);
        } else if !stem.is_empty() && !stem.ends_with('-') {
            stem.push('-');
        }
    }
    let stem = stem.trim_end_matches('-');
    if stem.is_empty() {
        "font.json".to_string()
    } else {
        format!("{stem}.json")
    }
}

/// Backup sibling for an output path: `x.json` becomes `x.backup.json`.
pub fn backup_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let backup_name = match name.strip_suffix(".json") {
        Some(stem) => format!("{stem}.backup.json"),
        None => format!("{name}.backup"),
    };
    path.with_file_name(backup_name)
}

fn write_pretty_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize {
        what: path.display().to_string(),
        source,
    })?;
    backup_then_write(path, json.as_bytes())
}

/// Copy any existing artifact aside, then write. The backup is best
/// effort: a failed copy is logged and the write proceeds.
fn backup_then_write(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if path.exists() {
        let backup = backup_path(path);
        if let Err(err) = std::fs::copy(path, &backup) {
            log::warn!("could not back up {}: {err}", path.display());
        }
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: path.display().to_string(),
                source,
            })?;
        }
    }

    std::fs::write(path, bytes).map_err(|source| StoreError::Write {
        path: path.display().to_string(),
        source,
    })
}

fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
