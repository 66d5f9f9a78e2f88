use std::{collections::BTreeMap, time::Instant};

use super::crf1d::{
    context::{Crf1dContext, CtxOpt, ResetOpt},
    model::{Crf1dModel, FeatRefs, FeatType, Feature},
};
use crate::{
    dataset::{Dataset, Sequence},
    error::Result,
};

#[derive(Debug, Clone, PartialEq)]
struct Feat {
    ftype: FeatType,
    src: usize,
    dst: usize,
    freq: f64,
}

/// Feature generation switches.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureOpt {
    /// Connect every observed attribute with every label.
    pub possible_states: bool,
    /// Generate transition features for every label pair.
    pub possible_transitions: bool,
    /// Features observed less often than this are dropped.
    pub minfreq: f64,
}

impl Default for FeatureOpt {
    fn default() -> Self {
        Self { possible_states: false, possible_transitions: true, minfreq: 0.0 }
    }
}

/// Objective and gradients of a linear-chain CRF over a training set.
#[derive(Debug, Default)]
pub struct Crf1dEncoder {
    opt: FeatureOpt,
    features: Vec<Feat>,
    attrs: Vec<FeatRefs>,
    forward_trans: Vec<FeatRefs>,
    ctx: Crf1dContext,
}

impl Crf1dEncoder {
    pub fn new(opt: FeatureOpt) -> Self {
        Self { opt, ..Default::default() }
    }

    pub fn num_labels(&self) -> usize {
        self.forward_trans.len()
    }

    fn state_score(&mut self, seq: &Sequence, w: &[f64]) {
        let L = self.num_labels();
        for (t, item) in seq.items.iter().enumerate() {
            for attr in item {
                /* State feature associates the attribute #a with the label #(f->dst). */
                for &fid in &self.attrs[attr.id] {
                    let f = &self.features[fid];
                    self.ctx.state[L * t + f.dst] += w[fid] * attr.value;
                }
            }
        }
    }

    fn transition_score(&mut self, w: &[f64]) {
        let L = self.num_labels();
        for i in 0..L {
            for &fid in &self.forward_trans[i] {
                self.ctx.trans[L * i + self.features[fid].dst] = w[fid];
            }
        }
    }

    fn model_expectation(&self, seq: &Sequence, g: &mut [f64], weight: f64) {
        let L = self.num_labels();
        for (t, item) in seq.items.iter().enumerate() {
            for attr in item {
                for &fid in &self.attrs[attr.id] {
                    let f = &self.features[fid];
                    g[fid] += self.ctx.mexp_state[L * t + f.dst] * attr.value * weight;
                }
            }
        }
        for i in 0..L {
            for &fid in &self.forward_trans[i] {
                let f = &self.features[fid];
                g[fid] += self.ctx.mexp_trans[L * i + f.dst] * weight;
            }
        }
    }

    /// Packs the weights into a model, dropping features that ended at zero.
    pub fn to_model(&self, ds: &Dataset, w: &[f64]) -> Crf1dModel {
        let features: Vec<Feature> = self
            .features
            .iter()
            .zip(w)
            .filter(|(_, &weight)| weight != 0.0)
            .map(|(f, &weight)| Feature { ftype: f.ftype, src: f.src, dst: f.dst, weight })
            .collect();
        log::info!("model has {} active features of {}", features.len(), self.features.len());
        Crf1dModel::new(ds.labels.clone(), ds.attrs.clone(), features)
    }
}

fn init_references(attrs: &mut [FeatRefs], forward_trans: &mut [FeatRefs], features: &[Feat]) {
    for (k, f) in features.iter().enumerate() {
        match f.ftype {
            FeatType::State => attrs[f.src].push(k),
            FeatType::Transition => forward_trans[f.src].push(k),
        }
    }
}

/// Collects the features observed in `ds`, ordered by (type, src, dst).
fn generate_features(ds: &Dataset, opt: &FeatureOpt) -> Vec<Feat> {
    let L = ds.num_labels();
    let mut set: BTreeMap<(FeatType, usize, usize), f64> = BTreeMap::new();
    let mut add = |ftype: FeatType, src: usize, dst: usize, freq: f64| *set.entry((ftype, src, dst)).or_insert(0.0) += freq;

    for seq in &ds.seqs {
        let mut prev = None;
        for (item, &curr) in seq.items.iter().zip(&seq.labels) {
            if let Some(prev) = prev {
                add(FeatType::Transition, prev, curr, seq.weight);
            }
            for attr in item {
                add(FeatType::State, attr.id, curr, seq.weight * attr.value);
                if opt.possible_states {
                    for i in 0..L {
                        add(FeatType::State, attr.id, i, 0.0);
                    }
                }
            }
            prev = Some(curr);
        }
    }
    if opt.possible_transitions {
        for i in 0..L {
            for j in 0..L {
                add(FeatType::Transition, i, j, 0.0);
            }
        }
    }

    set.into_iter()
        .filter(|(_, freq)| *freq >= opt.minfreq)
        .map(|((ftype, src, dst), freq)| Feat { ftype, src, dst, freq })
        .collect()
}

/// Interface for a graphical model.
pub trait Encoder {
    /// Generates features for a training set and sizes the workspace.
    fn set_data(&mut self, ds: &Dataset);
    fn num_features(&self) -> usize;
    /// Negative log-likelihood of `ds` under weights `w`; writes its gradient to `g`.
    fn objective_and_gradients_batch(&mut self, ds: &Dataset, w: &[f64], g: &mut [f64]) -> f64;
}

impl Encoder for Crf1dEncoder {
    fn set_data(&mut self, ds: &Dataset) {
        let L = ds.num_labels();
        let A = ds.num_attrs();
        let N = ds.len();
        let T = ds.max_seq_length();
        log::info!("set data (L: {L}, A: {A}, N: {N}, T: {T})");
        self.ctx = Crf1dContext::new(CtxOpt::VITERBI | CtxOpt::MARGINALS, L, T);

        let begin = Instant::now();
        self.features = generate_features(ds, &self.opt);
        log::info!(
            "feature generation (min_freq: {}, possible_states: {}, possible_transitions: {}): {} features in {:?}",
            self.opt.minfreq,
            self.opt.possible_states,
            self.opt.possible_transitions,
            self.features.len(),
            begin.elapsed()
        );
        self.attrs = vec![FeatRefs::new(); A];
        self.forward_trans = vec![FeatRefs::new(); L];
        init_references(&mut self.attrs, &mut self.forward_trans, &self.features);
    }

    fn num_features(&self) -> usize {
        self.features.len()
    }

    fn objective_and_gradients_batch(&mut self, ds: &Dataset, w: &[f64], g: &mut [f64]) -> f64 {
        /* Initialize the gradients with observation expectations. */
        for (g, f) in g.iter_mut().zip(&self.features) {
            *g = -f.freq;
        }

        /* Transition scores do not depend on the sequence. */
        self.ctx.reset(ResetOpt::TRANS);
        self.transition_score(w);
        self.ctx.exp_transition();

        let mut logl = 0.0;
        for seq in &ds.seqs {
            self.ctx.set_num_items(seq.len());
            self.ctx.reset(ResetOpt::STATE);
            self.state_score(seq, w);
            self.ctx.exp_state();

            self.ctx.alpha_score();
            self.ctx.beta_score();
            self.ctx.marginals();

            let logp = self.ctx.score(&seq.labels) - self.ctx.lognorm();
            logl += logp * seq.weight;

            self.model_expectation(seq, g, seq.weight);
        }
        -logl
    }
}

pub trait Crf1dTrainer {
    /// Fits a model on `ds`.
    fn train(&mut self, ds: &Dataset) -> Result<Crf1dModel>;
}
