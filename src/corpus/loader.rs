use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::domain::{AnalysisRequest, UNKNOWN_AUTHOR, UNTITLED};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_DATABASES: &[&str] = &["SongSongs", "TangPoems", "TangPoems2"];
/// Content must be strictly longer than this many characters once trimmed.
pub const MIN_CONTENT_CHARS: usize = 10;

const SAMPLE_FILES_PER_DATABASE: usize = 5;
const ESTIMATED_POEMS_PER_FILE: usize = 1_000;

#[derive(Debug, Clone)]
pub struct CorpusConfig {
    pub data_dir: PathBuf,
    pub databases: Vec<String>,
    pub min_content_chars: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            databases: DEFAULT_DATABASES.iter().map(|s| s.to_string()).collect(),
            min_content_chars: MIN_CONTENT_CHARS,
        }
    }
}

impl CorpusConfig {
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_databases(mut self, databases: impl IntoIterator<Item = String>) -> Self {
        self.databases = databases.into_iter().collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadMode {
    /// First few files of each database, at most `size` random poems per file.
    Sample { size: usize },
    /// Every `1/rate`-th poem of every file.
    Rate { rate: f64 },
    Full,
}

#[derive(Debug, Clone, Default)]
pub struct CorpusStats {
    pub files_per_database: Vec<(String, usize)>,
    pub total_files: usize,
    pub estimated_poems: usize,
}

pub struct CorpusLoader {
    config: CorpusConfig,
    rng: StdRng,
}

impl CorpusLoader {
    pub fn new(config: CorpusConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &CorpusConfig {
        &self.config
    }

    pub fn scan(&self) -> CorpusStats {
        let mut stats = CorpusStats::default();
        for database in &self.config.databases {
            let dir = self.config.data_dir.join(database);
            let count = if dir.is_dir() {
                json_files(&dir).len()
            } else {
                warn!(database = %database, dir = %dir.display(), "database directory missing");
                0
            };
            info!(
                database = %database,
                files = count,
                estimated_poems = count * ESTIMATED_POEMS_PER_FILE,
                "database scanned"
            );
            stats.files_per_database.push((database.clone(), count));
            stats.total_files += count;
        }
        stats.estimated_poems = stats.total_files * ESTIMATED_POEMS_PER_FILE;
        stats
    }

    pub fn load(&mut self, mode: LoadMode, limit: Option<usize>) -> Vec<AnalysisRequest> {
        let mut poems = Vec::new();
        let databases = self.config.databases.clone();

        'databases: for database in &databases {
            let dir = self.config.data_dir.join(database);
            if !dir.is_dir() {
                continue;
            }
            let mut files = json_files(&dir);
            info!(database = %database, files = files.len(), "loading database");
            if matches!(mode, LoadMode::Sample { .. }) {
                files.truncate(SAMPLE_FILES_PER_DATABASE);
            }

            for file in files {
                poems.extend(self.load_file(&file, mode));
                if let Some(limit) = limit {
                    if poems.len() >= limit {
                        poems.truncate(limit);
                        break 'databases;
                    }
                }
            }
        }

        info!(poems = poems.len(), "corpus loaded");
        poems
    }

    fn load_file(&mut self, path: &Path, mode: LoadMode) -> Vec<AnalysisRequest> {
        let items = match read_items(path) {
            Ok(items) => items,
            Err(err) => {
                warn!(file = %path.display(), error = %err, "corpus file skipped");
                return Vec::new();
            }
        };
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let selected: Vec<&Value> = match mode {
            LoadMode::Sample { size } if items.len() > size => {
                items.choose_multiple(&mut self.rng, size).collect()
            }
            LoadMode::Rate { rate } if rate > 0.0 && rate < 1.0 => {
                let step = ((1.0 / rate) as usize).max(1);
                items.iter().step_by(step).collect()
            }
            _ => items.iter().collect(),
        };

        selected
            .into_iter()
            .filter_map(|item| extract_poem(item, &source, self.config.min_content_chars))
            .collect()
    }
}

fn json_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

fn read_items(path: &Path) -> Result<Vec<Value>> {
    let data = fs::read_to_string(path).with_context(|| format!("cannot read {:?}", path))?;
    let value: Value =
        serde_json::from_str(&data).with_context(|| format!("invalid JSON in {:?}", path))?;
    match value {
        Value::Array(items) => Ok(items),
        _ => Ok(Vec::new()),
    }
}

fn text_field(item: &Value, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Builds a request from one corpus entry, or `None` when the entry is not
/// an object or its content is too short.
pub fn extract_poem(item: &Value, source: &str, min_content_chars: usize) -> Option<AnalysisRequest> {
    if !item.is_object() {
        return None;
    }
    let title = text_field(item, "title").unwrap_or_else(|| UNTITLED.to_string());
    let author = text_field(item, "author").unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
    let content = text_field(item, "content").unwrap_or_else(|| {
        item.get("paragraphs")
            .and_then(Value::as_array)
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    });

    if content.trim().chars().count() > min_content_chars {
        Some(AnalysisRequest::new(title, author, content, source))
    } else {
        None
    }
}
