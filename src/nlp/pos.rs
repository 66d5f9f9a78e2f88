use std::collections::HashMap;

use super::PosTagger;

/// Closed-class words and frequent irregular forms with their Penn Treebank tag.
const LEXICON: &[(&str, &str)] = &[
    // determiners
    ("the", "DT"), ("a", "DT"), ("an", "DT"), ("this", "DT"), ("that", "DT"), ("these", "DT"),
    ("those", "DT"), ("every", "DT"), ("each", "DT"), ("some", "DT"), ("any", "DT"), ("no", "DT"),
    ("all", "DT"), ("both", "DT"), ("another", "DT"),
    // prepositions and subordinating conjunctions
    ("of", "IN"), ("in", "IN"), ("on", "IN"), ("at", "IN"), ("by", "IN"), ("for", "IN"),
    ("with", "IN"), ("from", "IN"), ("about", "IN"), ("into", "IN"), ("over", "IN"),
    ("after", "IN"), ("before", "IN"), ("under", "IN"), ("between", "IN"), ("through", "IN"),
    ("during", "IN"), ("without", "IN"), ("since", "IN"), ("until", "IN"), ("against", "IN"),
    ("among", "IN"), ("than", "IN"), ("because", "IN"), ("if", "IN"), ("while", "IN"),
    ("although", "IN"), ("though", "IN"), ("whether", "IN"), ("as", "IN"), ("upon", "IN"),
    ("near", "IN"), ("per", "IN"), ("via", "IN"),
    ("to", "TO"),
    // coordinating conjunctions
    ("and", "CC"), ("or", "CC"), ("but", "CC"), ("nor", "CC"), ("yet", "CC"), ("plus", "CC"),
    // pronouns
    ("i", "PRP"), ("you", "PRP"), ("he", "PRP"), ("she", "PRP"), ("it", "PRP"), ("we", "PRP"),
    ("they", "PRP"), ("me", "PRP"), ("him", "PRP"), ("us", "PRP"), ("them", "PRP"),
    ("himself", "PRP"), ("herself", "PRP"), ("itself", "PRP"), ("themselves", "PRP"),
    ("my", "PRP$"), ("your", "PRP$"), ("his", "PRP$"), ("her", "PRP$"), ("its", "PRP$"),
    ("our", "PRP$"), ("their", "PRP$"),
    // wh-words
    ("when", "WRB"), ("where", "WRB"), ("why", "WRB"), ("how", "WRB"), ("what", "WP"),
    ("who", "WP"), ("whom", "WP"), ("whose", "WP$"), ("which", "WDT"),
    // modals
    ("can", "MD"), ("could", "MD"), ("will", "MD"), ("would", "MD"), ("shall", "MD"),
    ("should", "MD"), ("may", "MD"), ("might", "MD"), ("must", "MD"),
    // auxiliaries
    ("is", "VBZ"), ("are", "VBP"), ("am", "VBP"), ("was", "VBD"), ("were", "VBD"), ("be", "VB"),
    ("been", "VBN"), ("being", "VBG"), ("has", "VBZ"), ("have", "VBP"), ("had", "VBD"),
    ("does", "VBZ"), ("do", "VBP"), ("did", "VBD"),
    // irregular participles and past forms
    ("born", "VBN"), ("held", "VBN"), ("written", "VBN"), ("made", "VBN"), ("built", "VBN"),
    ("known", "VBN"), ("given", "VBN"), ("taken", "VBN"), ("done", "VBN"), ("seen", "VBN"),
    ("found", "VBN"), ("won", "VBD"), ("wrote", "VBD"), ("went", "VBD"), ("came", "VBD"),
    ("took", "VBD"), ("said", "VBD"), ("began", "VBD"), ("became", "VBD"), ("died", "VBD"),
    // adverbs and particles
    ("not", "RB"), ("n't", "RB"), ("very", "RB"), ("also", "RB"), ("too", "RB"), ("ago", "RB"),
    ("now", "RB"), ("then", "RB"), ("there", "EX"),
    // number words
    ("one", "CD"), ("two", "CD"), ("three", "CD"), ("four", "CD"), ("five", "CD"), ("six", "CD"),
    ("seven", "CD"), ("eight", "CD"), ("nine", "CD"), ("ten", "CD"), ("hundred", "CD"),
    ("thousand", "CD"), ("million", "CD"),
];

/// (suffix, tag) tried in order on lowercased unknown words.
const SUFFIXES: &[(&str, &str)] = &[
    ("ing", "VBG"),
    ("ed", "VBD"),
    ("ly", "RB"),
    ("est", "JJS"),
    ("ous", "JJ"),
    ("ful", "JJ"),
    ("able", "JJ"),
    ("ible", "JJ"),
    ("ive", "JJ"),
    ("less", "JJ"),
    ("ic", "JJ"),
    ("al", "JJ"),
    ("tion", "NN"),
    ("ment", "NN"),
    ("ness", "NN"),
    ("ity", "NN"),
    ("ism", "NN"),
    ("ss", "NN"),
    ("s", "NNS"),
];

/// Lexicon and heuristics Penn Treebank tagger.
///
/// Unknown capitalized words are proper nouns, numbers are `CD`, punctuation
/// maps to the Treebank punctuation tags and everything else falls back on
/// suffix rules and finally `NN`.
#[derive(Debug, Clone)]
pub struct RulePosTagger {
    lexicon: HashMap<&'static str, &'static str>,
}

impl Default for RulePosTagger {
    fn default() -> Self {
        Self::new()
    }
}

impl RulePosTagger {
    pub fn new() -> Self {
        Self { lexicon: LEXICON.iter().copied().collect() }
    }

    pub fn tag_word(&self, word: &str) -> &'static str {
        if let Some(tag) = punctuation_tag(word) {
            return tag;
        }
        if is_number(word) {
            return "CD";
        }
        let lower = word.to_lowercase();
        if let Some(&tag) = self.lexicon.get(lower.as_str()) {
            return tag;
        }
        if word.chars().next().is_some_and(char::is_uppercase) {
            return "NNP";
        }
        SUFFIXES
            .iter()
            .find(|(suffix, _)| lower.len() > suffix.len() + 1 && lower.ends_with(suffix))
            .map(|(_, tag)| *tag)
            .unwrap_or("NN")
    }
}

impl PosTagger for RulePosTagger {
    fn tag(&self, words: &[String]) -> Vec<String> {
        words.iter().map(|w| self.tag_word(w).to_string()).collect()
    }
}

fn punctuation_tag(word: &str) -> Option<&'static str> {
    if word.is_empty() || word.chars().any(char::is_alphanumeric) {
        return None;
    }
    let tag = match word {
        "." | "?" | "!" => ".",
        "," => ",",
        ":" | ";" | "-" | "--" | "..." => ":",
        "(" | "[" | "{" => "(",
        ")" | "]" | "}" => ")",
        "\"" | "``" | "“" | "‘" => "``",
        "''" | "”" | "’" | "'" => "''",
        "$" | "€" | "£" => "$",
        "#" => "#",
        _ => "SYM",
    };
    Some(tag)
}

fn is_number(word: &str) -> bool {
    word.chars().any(|c| c.is_ascii_digit())
        && word.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '/' | ':'))
}
