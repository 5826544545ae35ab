mod loader;

pub use loader::{
    extract_poem, CorpusConfig, CorpusLoader, CorpusStats, LoadMode, DEFAULT_DATABASES,
    DEFAULT_DATA_DIR, MIN_CONTENT_CHARS,
};
