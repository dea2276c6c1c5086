pub mod token_estimate;

pub use token_estimate::{HeuristicTokenCounter, TokenCounter, estimate_tokens, tokens_saved};
