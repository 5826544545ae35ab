mod analysis;
mod flower;
mod poem;

pub use analysis::{AnalysisRecord, StandardizedAnalysis};
pub use flower::{FlowerSynonymTable, NO_FLOWER};
pub use poem::{AnalysisRequest, PoemKey, UNKNOWN_AUTHOR, UNTITLED};
