pub mod cost;

pub use cost::{cost_of_tokens, estimate_batch, estimate_tokens, CostEstimate};
