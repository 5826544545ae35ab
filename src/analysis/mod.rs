mod error;
mod llm_client;
mod normalizer;
mod pipeline;
mod prompt;
mod response;

pub use error::AnalysisError;
pub use llm_client::{
    ChatCompletionClient, ClientConfig, Completion, LLMClient, MockLLMClient, DEFAULT_ENDPOINT,
    DEFAULT_MODEL,
};
pub use normalizer::{normalize_date, normalize_imagery, parse_date, FieldNormalizer};
pub use pipeline::{
    BatchSummary, PoemAnalyzer, RunConfig, DEFAULT_OUTPUT_DIR, DEFAULT_PROJECT,
};
pub use prompt::{PromptBuilder, PromptTemplate};
pub use response::{clean_response, recover_json, RecoveredJson, RecoveryStrategy};
