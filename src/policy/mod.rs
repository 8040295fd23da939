//! Ranking policy definitions.

pub mod matching;
pub mod ranker;

pub use matching::find_best_match;
pub use ranker::{PairingStrategy, RankerPolicy};
