/// Rough token budget of one analysis call.
pub const TOKENS_PER_POEM: u64 = 800;
/// Price per million tokens.
pub const PRICE_PER_MILLION_TOKENS: f64 = 0.14;

const TOKENS_PER_CHAR: f64 = 1.4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    pub poems: usize,
    pub tokens: u64,
    pub cost: f64,
}

pub fn estimate_batch(poems: usize) -> CostEstimate {
    let tokens = poems as u64 * TOKENS_PER_POEM;
    CostEstimate {
        poems,
        tokens,
        cost: cost_of_tokens(tokens),
    }
}

pub fn cost_of_tokens(tokens: u64) -> f64 {
    tokens as f64 * PRICE_PER_MILLION_TOKENS / 1_000_000.0
}

/// Character-based token estimate for calls whose usage was not reported.
pub fn estimate_tokens(prompt: &str, completion: &str) -> u64 {
    let chars = prompt.chars().count() + completion.chars().count();
    (chars as f64 * TOKENS_PER_CHAR).ceil() as u64
}
