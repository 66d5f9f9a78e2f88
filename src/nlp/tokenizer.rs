use unicode_segmentation::UnicodeSegmentation;

use super::Tokenizer;

/// Splits text on Unicode word boundaries (UAX #29) and drops the
/// whitespace segments, so punctuation marks come out as their own tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_word_bounds()
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .collect()
    }
}
