/// Size metric applied to step inputs and outputs for trace telemetry.
///
/// Only feeds the trace; control flow never depends on it.
pub trait TokenCounter: Send + Sync {
    fn estimate(&self, text: &str) -> u64;
}

/// Estimate token count from text using the chars/4 heuristic.
///
/// Uses ceiling division to avoid underestimating by a fraction.
pub fn estimate_tokens(text: &str) -> u64 {
    let chars = text.chars().count() as u64;
    chars.div_ceil(4)
}

/// Tokens removed by a compression step. Zero for every other step.
pub fn tokens_saved(compresses: bool, tokens_in: u64, tokens_out: u64) -> u64 {
    if compresses {
        tokens_in.saturating_sub(tokens_out)
    } else {
        0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl TokenCounter for HeuristicTokenCounter {
    fn estimate(&self, text: &str) -> u64 {
        estimate_tokens(text)
    }
}
