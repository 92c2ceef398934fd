//! Claim extraction from narrative text.

mod extractor;
mod patterns;
mod sentences;

pub use extractor::{ClaimExtractor, merge_claims};
pub use patterns::{RawMatch, parse_amount, scan};
pub use sentences::{Sentence, split_sentences};
