use crate::{crf::tagger::Tagger, dataset::Sequence};

use super::{
    context::{Crf1dContext, CtxOpt, ResetOpt},
    model::Crf1dModel,
};

/// How far the lattice of the current sequence has been computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Level {
    None,
    Set,
    AlphaBeta,
    Marginals,
}

#[derive(Debug)]
pub struct Crf1dTagger<'a> {
    model: &'a Crf1dModel,
    ctx: Crf1dContext,
    level: Level,
}

impl<'a> Crf1dTagger<'a> {
    pub fn new(model: &'a Crf1dModel) -> Self {
        let L = model.num_labels();
        let mut this = Self { model, ctx: Crf1dContext::new(CtxOpt::VITERBI | CtxOpt::MARGINALS, L, 0), level: Level::None };
        this.transition_score();
        this
    }

    fn transition_score(&mut self) {
        let L = self.model.num_labels();
        for i in 0..L {
            for &fid in self.model.label_refs(i) {
                let f = self.model.feature(fid);
                self.ctx.trans[L * i + f.dst] = f.weight;
            }
        }
    }

    fn state_score(&mut self, seq: &Sequence) {
        let L = self.model.num_labels();
        for (t, item) in seq.items.iter().enumerate() {
            for attr in item {
                for &fid in self.model.attr_refs(attr.id) {
                    let f = self.model.feature(fid);
                    self.ctx.state[L * t + f.dst] += f.weight * attr.value;
                }
            }
        }
    }

    fn compute_alpha_beta(&mut self) {
        if self.level < Level::AlphaBeta {
            self.ctx.exp_state();
            self.ctx.exp_transition();
            self.ctx.alpha_score();
            self.ctx.beta_score();
            self.level = Level::AlphaBeta;
        }
    }

    fn compute_marginals(&mut self) {
        self.compute_alpha_beta();
        if self.level < Level::Marginals {
            self.ctx.marginals();
            self.level = Level::Marginals;
        }
    }

    /// Probability of a label path under the model.
    pub fn probability(&mut self, path: &[usize]) -> f64 {
        (self.score(path) - self.lognorm()).exp()
    }
}

impl Tagger for Crf1dTagger<'_> {
    fn set_seq(&mut self, seq: &Sequence) {
        self.ctx.set_num_items(seq.len());
        self.ctx.reset(ResetOpt::STATE);
        self.state_score(seq);
        self.level = Level::Set;
    }

    fn len(&self) -> usize {
        self.ctx.num_items()
    }

    fn viterbi(&mut self) -> (Vec<usize>, f64) {
        self.ctx.viterbi()
    }

    fn lognorm(&mut self) -> f64 {
        self.compute_alpha_beta();
        self.ctx.lognorm()
    }

    fn marginal_point(&mut self, l: usize, t: usize) -> f64 {
        self.compute_marginals();
        self.ctx.mexp_state[self.ctx.num_labels * t + l]
    }

    fn score(&self, path: &[usize]) -> f64 {
        self.ctx.score(path)
    }
}
