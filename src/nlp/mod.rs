//! Tokenization and part-of-speech tagging used to turn raw text into tokens
//! the feature extractor understands.

mod pos;
mod tokenizer;

pub use pos::RulePosTagger;
pub use tokenizer::WordTokenizer;

pub trait Tokenizer {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

pub trait PosTagger {
    /// One tag per word, in order.
    fn tag(&self, words: &[String]) -> Vec<String>;
}
