use serde::{Deserialize, Serialize};
use std::fmt;

pub const UNTITLED: &str = "untitled";
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// A single poem submitted for analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub title: String,
    pub author: String,
    pub content: String,
    /// File (or other origin) the poem was read from.
    pub source: String,
}

impl AnalysisRequest {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            content: content.into(),
            source: source.into(),
        }
    }

    pub fn key(&self) -> PoemKey {
        PoemKey::new(&self.title, &self.author)
    }
}

/// `(title, author)` pair identifying a poem across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoemKey {
    pub title: String,
    pub author: String,
}

impl PoemKey {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
        }
    }
}

impl fmt::Display for PoemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "《{}》 - {}", self.title, self.author)
    }
}
