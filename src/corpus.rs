use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{error::Result, gate, nlp::PosTagger};

/// Label of tokens that carry no annotation, and of every token at tagging time.
pub const NO_LABEL: &str = "O";

/// File name fragments of OS metadata files that show up in annotation folders.
const OS_ARTIFACTS: &[&str] = &["ds_store", "thumbs.db"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedToken {
    pub word: String,
    pub label: String,
    pub pos: String,
}

impl AnnotatedToken {
    pub fn new(word: &str, label: &str, pos: &str) -> Self {
        Self { word: word.to_string(), label: label.to_string(), pos: pos.to_string() }
    }
}

pub type Sentence = Vec<AnnotatedToken>;

/// Labeled sentences, one per annotated document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    pub sentences: Vec<Sentence>,
}

impl From<Vec<Sentence>> for Corpus {
    fn from(sentences: Vec<Sentence>) -> Self {
        Self { sentences }
    }
}

impl Corpus {
    /// Reads every GATE document in `folder`.
    ///
    /// Documents that fail to parse or carry no annotations are logged and
    /// skipped. Each annotated span is tagged as a single word, so a
    /// multi-word span gets one POS tag.
    pub fn build<P: AsRef<Path>>(folder: P, pos_tagger: &dyn PosTagger, set: Option<&str>) -> Result<Self> {
        let folder = folder.as_ref();
        let mut paths: Vec<PathBuf> = fs::read_dir(folder)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()?;
        paths.sort();

        let mut corpus = Corpus::default();
        for path in paths {
            if is_os_artifact(&path) {
                log::debug!("skip {}", path.display());
                continue;
            }
            if !path.is_file() {
                continue;
            }
            let spans = match gate::load(&path, set) {
                Ok(spans) => spans,
                Err(e) => {
                    log::warn!("failed to load {}: {e}", path.display());
                    continue;
                }
            };
            if spans.is_empty() {
                log::warn!("no annotations in {}", path.display());
                continue;
            }
            let words: Vec<String> = spans.iter().map(|s| s.text.clone()).collect();
            let tags = pos_tagger.tag(&words);
            let sentence = spans
                .into_iter()
                .zip(tags)
                .map(|(span, pos)| AnnotatedToken { word: span.text, label: span.kind, pos })
                .collect();
            corpus.sentences.push(sentence);
        }
        log::info!("read {} annotated documents from {}", corpus.len(), folder.display());
        Ok(corpus)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bson::to_vec(self)?;
        fs::write(path.as_ref(), bytes)?;
        log::info!("wrote {} sentences to {}", self.len(), path.as_ref().display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        let corpus: Corpus = bson::from_slice(&bytes)?;
        log::info!("read {} sentences from {}", corpus.len(), path.as_ref().display());
        Ok(corpus)
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn total_tokens(&self) -> usize {
        self.sentences.iter().map(Vec::len).sum()
    }

    /// Distinct labels in the corpus.
    pub fn labels(&self) -> BTreeSet<&str> {
        self.sentences.iter().flatten().map(|t| t.label.as_str()).collect()
    }
}

fn is_os_artifact(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .is_some_and(|name| OS_ARTIFACTS.iter().any(|a| name.contains(a)))
}
