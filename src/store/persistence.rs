use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::info;

use super::run_state::RunState;
use crate::analysis::AnalysisError;
use crate::domain::AnalysisRecord;

const FILE_PREFIX: &str = "poetry_analysis_";
const FILE_SUFFIX: &str = ".json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportMetadata {
    #[serde(default)]
    pub output_dir: String,
    #[serde(default)]
    pub file_created: String,
    #[serde(default)]
    pub api_tokens_used: u64,
}

/// On-disk checkpoint of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportDocument {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub analysis_date: String,
    #[serde(default)]
    pub total_processed: usize,
    #[serde(default)]
    pub total_analyzed: usize,
    #[serde(default)]
    pub metadata: ExportMetadata,
    #[serde(default)]
    pub results: Vec<AnalysisRecord>,
}

pub struct ExportWriter;

impl ExportWriter {
    /// Writes the state to a new timestamped export in `dir` and returns its path.
    pub fn save(
        dir: impl AsRef<Path>,
        project: &str,
        state: &RunState,
    ) -> Result<PathBuf, AnalysisError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|err| AnalysisError::persistence(dir, err))?;

        let now = Local::now();
        let stamp = now.format("%Y%m%d_%H%M%S").to_string();
        let document = ExportDocument {
            project: project.to_string(),
            analysis_date: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            total_processed: state.processed(),
            total_analyzed: state.analyzed(),
            metadata: ExportMetadata {
                output_dir: dir.to_string_lossy().to_string(),
                file_created: stamp.clone(),
                api_tokens_used: state.tokens_used(),
            },
            results: state.results().to_vec(),
        };

        let path = dir.join(format!("{FILE_PREFIX}{stamp}{FILE_SUFFIX}"));
        Self::write_document(&path, &document)?;
        info!(path = %path.display(), records = document.results.len(), "export saved");
        Ok(path)
    }

    /// Serializes through a temporary sibling file so an interrupted write
    /// never leaves a truncated export behind.
    pub fn write_document(path: &Path, document: &ExportDocument) -> Result<(), AnalysisError> {
        let data = serde_json::to_string_pretty(document)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!(".{file_name}.tmp"));
        fs::write(&tmp, data).map_err(|err| AnalysisError::persistence(&tmp, err))?;
        fs::rename(&tmp, path).map_err(|err| AnalysisError::persistence(path, err))?;
        Ok(())
    }
}

pub struct ExportLoader;

impl ExportLoader {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<ExportDocument, AnalysisError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|err| AnalysisError::persistence(path, err))?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Path of the newest export in `dir`, judged by creation time, then
    /// modification time, then file name.
    pub fn latest_path(dir: impl AsRef<Path>) -> Result<Option<PathBuf>, AnalysisError> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(None);
        }
        let entries = fs::read_dir(dir).map_err(|err| AnalysisError::persistence(dir, err))?;

        let mut newest: Option<(SystemTime, String, PathBuf)> = None;
        for entry in entries {
            let entry = entry.map_err(|err| AnalysisError::persistence(dir, err))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_export_name(&name) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let stamp = metadata
                .created()
                .or_else(|_| metadata.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            let candidate = (stamp, name, entry.path());
            if newest
                .as_ref()
                .map_or(true, |current| (candidate.0, &candidate.1) > (current.0, &current.1))
            {
                newest = Some(candidate);
            }
        }
        Ok(newest.map(|(_, _, path)| path))
    }

    pub fn latest(dir: impl AsRef<Path>) -> Result<Option<(PathBuf, ExportDocument)>, AnalysisError> {
        let Some(path) = Self::latest_path(dir)? else {
            return Ok(None);
        };
        let document = Self::load_from_path(&path)?;
        info!(path = %path.display(), records = document.results.len(), "previous export loaded");
        Ok(Some((path, document)))
    }
}

fn is_export_name(name: &str) -> bool {
    name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX)
}
