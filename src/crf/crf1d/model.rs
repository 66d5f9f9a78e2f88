use std::{fs, io::Write, path::Path};

use serde::{de::Error as _, Deserialize, Serialize};

use crate::{
    crf::{model::Model, tagger::Tagger},
    error::Result,
    quark::{Quark, StringTable},
};

use super::tagger::Crf1dTagger;

/// Ids of the features fired by one attribute (state features) or leaving
/// one label (transition features).
pub type FeatRefs = Vec<usize>;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Clone, Copy)]
pub enum FeatType {
    /// attribute -> label
    State,
    /// label -> label
    Transition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub ftype: FeatType,
    pub src: usize,
    pub dst: usize,
    pub weight: f64,
}

/// A fitted linear-chain CRF.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Crf1dModel {
    labels: Quark,
    attrs: Quark,
    features: Vec<Feature>,
    #[serde(skip)]
    attr_refs: Vec<FeatRefs>,
    #[serde(skip)]
    label_refs: Vec<FeatRefs>,
}

impl Crf1dModel {
    pub fn new(labels: Quark, attrs: Quark, features: Vec<Feature>) -> Self {
        let mut this = Self { labels, attrs, features, ..Default::default() };
        this.init_references();
        this
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_memory(&fs::read(path)?)
    }

    pub fn from_memory(buffer: &[u8]) -> Result<Self> {
        let mut this: Self = serde_json::from_slice(buffer)?;
        let (L, A) = (this.labels.len(), this.attrs.len());
        let out_of_range = |f: &&Feature| {
            f.dst >= L
                || match f.ftype {
                    FeatType::State => f.src >= A,
                    FeatType::Transition => f.src >= L,
                }
        };
        if let Some(f) = this.features.iter().find(out_of_range) {
            return Err(serde_json::Error::custom(format!("feature out of range: {f:?}")).into());
        }
        this.init_references();
        Ok(this)
    }

    /// Tagger bound to this model.
    pub fn crf1d_tagger(&self) -> Crf1dTagger<'_> {
        Crf1dTagger::new(self)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let f = fs::File::create(path.as_ref())?;
        serde_json::to_writer(std::io::BufWriter::new(f), self)?;
        log::info!("wrote model to {}", path.as_ref().display());
        Ok(())
    }

    fn init_references(&mut self) {
        self.attr_refs = vec![FeatRefs::new(); self.attrs.len()];
        self.label_refs = vec![FeatRefs::new(); self.labels.len()];
        for (fid, f) in self.features.iter().enumerate() {
            match f.ftype {
                FeatType::State => {
                    if let Some(refs) = self.attr_refs.get_mut(f.src) {
                        refs.push(fid);
                    }
                }
                FeatType::Transition => {
                    if let Some(refs) = self.label_refs.get_mut(f.src) {
                        refs.push(fid);
                    }
                }
            }
        }
    }

    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    pub fn num_attrs(&self) -> usize {
        self.attrs.len()
    }

    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    pub(crate) fn label_refs(&self, lid: usize) -> &[usize] {
        &self.label_refs[lid]
    }

    pub(crate) fn attr_refs(&self, aid: usize) -> &[usize] {
        self.attr_refs.get(aid).map(Vec::as_slice).unwrap_or_default()
    }

    pub(crate) fn feature(&self, fid: usize) -> &Feature {
        &self.features[fid]
    }
}

impl Model for Crf1dModel {
    fn tagger(&self) -> impl Tagger + '_ {
        self.crf1d_tagger()
    }

    fn labels(&self) -> &Quark {
        &self.labels
    }

    fn attrs(&self) -> &Quark {
        &self.attrs
    }

    fn dump<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        writeln!(w, "LABELS = {{")?;
        for (i, label) in self.labels.iter().enumerate() {
            writeln!(w, "  {i:5}: {label}")?;
        }
        writeln!(w, "}}\n")?;

        writeln!(w, "ATTRIBUTES = {{")?;
        for (i, attr) in self.attrs.iter().enumerate() {
            writeln!(w, "  {i:5}: {attr}")?;
        }
        writeln!(w, "}}\n")?;

        let name = |q: &Quark, id: usize| q.to_str(id).unwrap_or("?").to_string();
        writeln!(w, "TRANSITIONS = {{")?;
        for f in self.features.iter().filter(|f| f.ftype == FeatType::Transition) {
            writeln!(w, "  ({}) {} --> {}: {:.6}", 1, name(&self.labels, f.src), name(&self.labels, f.dst), f.weight)?;
        }
        writeln!(w, "}}\n")?;

        writeln!(w, "STATE_FEATURES = {{")?;
        for f in self.features.iter().filter(|f| f.ftype == FeatType::State) {
            writeln!(w, "  ({}) {} --> {}: {:.6}", 0, name(&self.attrs, f.src), name(&self.labels, f.dst), f.weight)?;
        }
        writeln!(w, "}}")
    }
}
