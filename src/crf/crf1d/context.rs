#![allow(non_snake_case)]

use bitflags::bitflags;

bitflags! {
    /// Functionality a context allocates buffers for.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct CtxOpt: u32 {
        const VITERBI = 0x01;
        const MARGINALS = 0x02;
        const ALL = 0xFF;
    }
}

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct ResetOpt: u32 {
        const STATE = 0x01;
        const TRANS = 0x02;
        const ALL = 0xFF;
    }
}

/// Lattice workspace of a linear-chain CRF: score matrices, forward/backward
/// scores and marginals for one sequence of at most `cap_items` items.
///
/// All `[T][L]` matrices are stored row-major in flat vectors.
#[derive(Debug, Default)]
pub struct Crf1dContext {
    flag: CtxOpt,
    /// The total number of distinct labels (L).
    pub num_labels: usize,
    /// The number of items (T) in the current sequence.
    num_items: usize,
    /// Number of items the buffers are allocated for.
    cap_items: usize,
    /// Logarithm of the normalization factor (total score of all paths).
    log_norm: f64,
    /// `[T][L]` state scores: total weight of state features firing label `l` at `t`.
    pub state: Vec<f64>,
    /// `[L][L]` transition scores from label `i` to label `j`.
    pub trans: Vec<f64>,
    /// `[T][L]` scaled forward scores.
    alpha_score: Vec<f64>,
    /// `[T][L]` scaled backward scores.
    beta_score: Vec<f64>,
    /// `[T]` scaling coefficients shared by alpha and beta.
    scale_factor: Vec<f64>,
    /// `[L]` work space.
    row: Vec<f64>,
    /// `[T][L]` best predecessor of `(t, j)`; VITERBI only.
    backward_edge: Vec<usize>,
    /// `[T][L]` exp of state scores; MARGINALS only.
    exp_state: Vec<f64>,
    /// `[L][L]` exp of transition scores; MARGINALS only.
    exp_trans: Vec<f64>,
    /// `[T][L]` marginal probability of label `l` at `t`; MARGINALS only.
    pub mexp_state: Vec<f64>,
    /// `[L][L]` expected count of transition `i -> j` over the sequence; MARGINALS only.
    pub mexp_trans: Vec<f64>,
}

impl Crf1dContext {
    pub fn new(flag: CtxOpt, L: usize, T: usize) -> Self {
        let mut this = Self { flag, num_labels: L, trans: vec![0.0; L * L], ..Default::default() };
        if flag.contains(CtxOpt::MARGINALS) {
            this.exp_trans = vec![0.0; L * L];
            this.mexp_trans = vec![0.0; L * L];
        }
        this.set_num_items(T);
        this.num_items = 0;
        this
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    /// Makes room for a sequence of `T` items, growing buffers when needed.
    pub fn set_num_items(&mut self, T: usize) {
        let L = self.num_labels;
        self.num_items = T;
        if self.cap_items < T {
            self.alpha_score = vec![0.0; T * L];
            self.beta_score = vec![0.0; T * L];
            self.scale_factor = vec![0.0; T];
            self.row = vec![0.0; L];
            if self.flag.contains(CtxOpt::VITERBI) {
                self.backward_edge = vec![0; T * L];
            }
            self.state = vec![0.0; T * L];
            if self.flag.contains(CtxOpt::MARGINALS) {
                self.exp_state = vec![0.0; T * L];
                self.mexp_state = vec![0.0; T * L];
            }
            self.cap_items = T;
        }
    }

    pub fn reset(&mut self, opts: ResetOpt) {
        let T = self.num_items;
        let L = self.num_labels;

        if opts.contains(ResetOpt::STATE) {
            self.state[..T * L].fill(0.0);
        }
        if opts.contains(ResetOpt::TRANS) {
            self.trans.fill(0.0);
        }
        if self.flag.contains(CtxOpt::MARGINALS) {
            self.mexp_state[..T * L].fill(0.0);
            self.mexp_trans.fill(0.0);
            self.log_norm = 0.0;
        }
    }

    pub fn exp_state(&mut self) {
        let n = self.num_items * self.num_labels;
        for (e, s) in self.exp_state[..n].iter_mut().zip(&self.state[..n]) {
            *e = s.exp();
        }
    }

    pub fn exp_transition(&mut self) {
        for (e, s) in self.exp_trans.iter_mut().zip(&self.trans) {
            *e = s.exp();
        }
    }

    /// Scaled forward pass. Requires `exp_state` and `exp_transition`.
    pub fn alpha_score(&mut self) {
        let L = self.num_labels;
        let T = self.num_items;
        if T == 0 {
            self.log_norm = 0.0;
            return;
        }

        /* alpha[0][j] = state[0][j] */
        self.alpha_score[..L].copy_from_slice(&self.exp_state[..L]);
        self.scale_factor[0] = normalize(&mut self.alpha_score[..L]);

        /* alpha[t][j] = state[t][j] * \sum_{i} alpha[t-1][i] * trans[i][j] */
        for t in 1..T {
            let (prev, cur) = self.alpha_score.split_at_mut(L * t);
            let prev = &prev[L * (t - 1)..];
            let cur = &mut cur[..L];
            cur.fill(0.0);
            for i in 0..L {
                let a = prev[i];
                let trans = &self.exp_trans[L * i..L * (i + 1)];
                for j in 0..L {
                    cur[j] += a * trans[j];
                }
            }
            for j in 0..L {
                cur[j] *= self.exp_state[L * t + j];
            }
            self.scale_factor[t] = normalize(cur);
        }

        /* log(norm) = - \sum_{t} log(C[t]) */
        self.log_norm = -self.scale_factor[..T].iter().map(|c| c.ln()).sum::<f64>();
    }

    /// Scaled backward pass using the scale factors of [`Self::alpha_score`].
    pub fn beta_score(&mut self) {
        let L = self.num_labels;
        let T = self.num_items;
        if T == 0 {
            return;
        }

        let last = self.scale_factor[T - 1];
        self.beta_score[L * (T - 1)..L * T].fill(last);

        for t in (0..T - 1).rev() {
            /* row[j] = state[t+1][j] * beta[t+1][j] */
            for j in 0..L {
                self.row[j] = self.beta_score[L * (t + 1) + j] * self.exp_state[L * (t + 1) + j];
            }
            /* beta[t][i] = C[t] * \sum_{j} trans[i][j] * row[j] */
            for i in 0..L {
                let trans = &self.exp_trans[L * i..L * (i + 1)];
                let s: f64 = trans.iter().zip(&self.row).map(|(a, b)| a * b).sum();
                self.beta_score[L * t + i] = s * self.scale_factor[t];
            }
        }
    }

    /// State marginals and transition expectations from the scaled scores.
    pub fn marginals(&mut self) {
        let L = self.num_labels;
        let T = self.num_items;

        /*
        p(t,i) = fwd[t][i] * bwd[t][i] / norm
               = (1. / C[t]) * fwd'[t][i] * bwd'[t][i]
        */
        for t in 0..T {
            let inv = 1.0 / self.scale_factor[t];
            for i in 0..L {
                let k = L * t + i;
                self.mexp_state[k] = self.alpha_score[k] * self.beta_score[k] * inv;
            }
        }

        /*
        p(t,i,t+1,j) = fwd'[t][i] * edge[i][j] * state[t+1][j] * bwd'[t+1][j]
        summed over t.
        */
        for t in 0..T.saturating_sub(1) {
            for j in 0..L {
                self.row[j] = self.beta_score[L * (t + 1) + j] * self.exp_state[L * (t + 1) + j];
            }
            for i in 0..L {
                let a = self.alpha_score[L * t + i];
                for j in 0..L {
                    self.mexp_trans[L * i + j] += a * self.exp_trans[L * i + j] * self.row[j];
                }
            }
        }
    }

    /// Unnormalized log score of a label path.
    pub fn score(&self, labels: &[usize]) -> f64 {
        let L = self.num_labels;
        let T = self.num_items;
        assert!(labels.len() >= T, "path shorter than the sequence");
        if T == 0 {
            return 0.0;
        }

        let mut i = labels[0];
        let mut r = self.state[i];
        for t in 1..T {
            let j = labels[t];
            r += self.trans[L * i + j];
            r += self.state[L * t + j];
            i = j;
        }
        r
    }

    pub fn lognorm(&self) -> f64 {
        self.log_norm
    }

    /// Best label path and its unnormalized score. Works on state and
    /// transition scores in the log domain.
    pub fn viterbi(&mut self) -> (Vec<usize>, f64) {
        let L = self.num_labels;
        let T = self.num_items;
        if T == 0 || L == 0 {
            return (vec![0; T], 0.0);
        }

        self.alpha_score[..L].copy_from_slice(&self.state[..L]);
        for t in 1..T {
            for j in 0..L {
                let mut max_score = f64::NEG_INFINITY;
                let mut argmax = 0;
                for i in 0..L {
                    /* Transit from (t-1, i) to (t, j). */
                    let score = self.alpha_score[L * (t - 1) + i] + self.trans[L * i + j];
                    if max_score < score {
                        max_score = score;
                        argmax = i;
                    }
                }
                self.backward_edge[L * t + j] = argmax;
                self.alpha_score[L * t + j] = max_score + self.state[L * t + j];
            }
        }

        /* Find the node (#T, #i) that reaches EOS with the maximum score. */
        let mut labels = vec![0; T];
        let mut max_score = f64::NEG_INFINITY;
        for i in 0..L {
            let score = self.alpha_score[L * (T - 1) + i];
            if max_score < score {
                max_score = score;
                labels[T - 1] = i;
            }
        }
        /* Tag labels by tracing the backward links. */
        for t in (0..T - 1).rev() {
            labels[t] = self.backward_edge[L * (t + 1) + labels[t + 1]];
        }
        (labels, max_score)
    }
}

/// Scales `v` to sum to one and returns the scaling coefficient.
fn normalize(v: &mut [f64]) -> f64 {
    let sum: f64 = v.iter().sum();
    let c = if sum != 0.0 { 1.0 / sum } else { 1.0 };
    v.iter_mut().for_each(|x| *x *= c);
    c
}
