use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("completion contained no usable text")]
    EmptyCompletion,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("field `{field}` has unexpected type {found}")]
    TypeMismatch { field: &'static str, found: &'static str },

    #[error("export I/O failure at {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AnalysisError {
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure must stop the batch rather than become an error record.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AnalysisError::Persistence { .. } | AnalysisError::Serialization(_)
        )
    }
}
