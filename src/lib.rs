pub mod analysis;
pub mod corpus;
pub mod domain;
pub mod store;
pub mod utils;

pub use analysis::{AnalysisError, ChatCompletionClient, LLMClient, MockLLMClient, PoemAnalyzer};
pub use domain::{AnalysisRecord, AnalysisRequest, PoemKey, StandardizedAnalysis};
pub use store::{ExportLoader, ExportWriter, RunState};
