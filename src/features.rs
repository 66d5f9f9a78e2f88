//! Per-token feature maps over a fixed two-token context window.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::corpus::AnnotatedToken;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Str(String),
    Bool(bool),
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

pub type FeatureMap = BTreeMap<String, FeatureValue>;

/// Features of the token at `i`. `i` must be a valid index into `sentence`.
pub fn word2features(sentence: &[AnnotatedToken], i: usize) -> FeatureMap {
    let n = sentence.len();
    let token = &sentence[i];
    let mut features = FeatureMap::new();
    features.insert("pos".into(), token.pos.as_str().into());
    features.insert("word".into(), token.word.as_str().into());
    features.insert("BOS".into(), (i == 0).into());
    features.insert("EOS".into(), (i + 1 == n).into());

    if i > 0 {
        let prev = &sentence[i - 1];
        features.insert("word-1".into(), prev.word.as_str().into());
        features.insert("pos-1".into(), prev.pos.as_str().into());
    }
    if i > 1 {
        let prev = &sentence[i - 2];
        features.insert("word-2".into(), prev.word.as_str().into());
        features.insert("pos-2".into(), prev.pos.as_str().into());
    }
    if i + 1 < n {
        let next = &sentence[i + 1];
        features.insert("word+1".into(), next.word.as_str().into());
        features.insert("pos+1".into(), next.pos.as_str().into());
    }
    if i + 2 < n {
        let next = &sentence[i + 2];
        features.insert("word+2".into(), next.word.as_str().into());
        features.insert("pos+2".into(), next.pos.as_str().into());
    }
    features
}

pub fn sent2features(sentence: &[AnnotatedToken]) -> Vec<FeatureMap> {
    (0..sentence.len()).map(|i| word2features(sentence, i)).collect()
}

pub fn sent2labels(sentence: &[AnnotatedToken]) -> Vec<String> {
    sentence.iter().map(|t| t.label.clone()).collect()
}

pub fn sent2tokens(sentence: &[AnnotatedToken]) -> Vec<String> {
    sentence.iter().map(|t| t.word.clone()).collect()
}

/// Renders a feature map as weighted CRF attributes.
///
/// String features become `name:value` with weight 1, boolean features keep
/// their bare name and weigh 1 when set and 0 otherwise.
pub fn attributes(features: &FeatureMap) -> Vec<(String, f64)> {
    features
        .iter()
        .map(|(name, value)| match value {
            FeatureValue::Str(s) => (format!("{name}:{s}"), 1.0),
            FeatureValue::Bool(b) => (name.clone(), if *b { 1.0 } else { 0.0 }),
        })
        .collect()
}
