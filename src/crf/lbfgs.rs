use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::{
    crf1d::model::Crf1dModel,
    trainer::{Crf1dEncoder, Crf1dTrainer, Encoder},
};
use crate::{
    dataset::Dataset,
    error::{Error, Result},
};

/// Sufficient decrease constant of the Armijo condition.
const FTOL: f64 = 1e-4;
/// Curvature constant of the Wolfe condition.
const WOLFE: f64 = 0.9;
const MIN_STEP: f64 = 1e-20;
const MAX_STEP: f64 = 1e20;

/// Optimizer and regularization parameters.
#[derive(Debug, Clone, PartialEq, clap::Args, Serialize, Deserialize)]
#[serde(default)]
pub struct LbfgsParams {
    /// Coefficient of the L2 regularization term.
    #[arg(long, default_value_t = 1.0)]
    pub c2: f64,
    /// Number of corrections kept to approximate the inverse Hessian.
    #[arg(long, default_value_t = 6)]
    pub memory: usize,
    /// Stop when |g| / max(1, |w|) falls below this.
    #[arg(long, default_value_t = 1e-5)]
    pub epsilon: f64,
    /// Distance (in iterations) for the objective improvement test.
    #[arg(long, default_value_t = 10)]
    pub past: usize,
    /// Minimum relative improvement over `past` iterations.
    #[arg(long, default_value_t = 1e-5)]
    pub delta: f64,
    #[arg(long, default_value_t = 100)]
    pub max_iterations: usize,
    #[arg(long, default_value_t = 20)]
    pub linesearch_max_iterations: usize,
}

impl Default for LbfgsParams {
    fn default() -> Self {
        Self {
            c2: 1.0,
            memory: 6,
            epsilon: 1e-5,
            past: 10,
            delta: 1e-5,
            max_iterations: 100,
            linesearch_max_iterations: 20,
        }
    }
}

impl LbfgsParams {
    pub fn validate(&self) -> Result<()> {
        if self.memory == 0 {
            return Err(Error::InvalidParameter("memory must be positive".into()));
        }
        if self.c2.is_nan() || self.c2 < 0.0 {
            return Err(Error::InvalidParameter(format!("c2 must be non-negative, got {}", self.c2)));
        }
        if [self.epsilon, self.delta].iter().any(|v| v.is_nan() || *v < 0.0) {
            return Err(Error::InvalidParameter("epsilon and delta must be non-negative".into()));
        }
        if self.linesearch_max_iterations == 0 {
            return Err(Error::InvalidParameter("linesearch_max_iterations must be positive".into()));
        }
        Ok(())
    }
}

/// Why the optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    Converged,
    /// The objective stopped improving by `delta` over `past` iterations.
    Stalled,
    MaxIterations,
    /// The line search gave up; the last accepted point is kept.
    LineSearchFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub stop: Stop,
    pub iterations: usize,
    pub fx: f64,
}

/// One correction pair of the limited-memory update.
#[derive(Debug, Clone)]
struct Correction {
    s: Vec<f64>,
    y: Vec<f64>,
    /// 1 / (y . s)
    rho: f64,
    alpha: f64,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// Backtracking line search along `d` from `xp`, accepting the first step
/// that satisfies the Armijo and Wolfe conditions. Returns the number of
/// evaluations, or `None` when no acceptable step was found.
#[allow(clippy::too_many_arguments)]
fn backtracking<F>(
    x: &mut [f64],
    fx: &mut f64,
    g: &mut [f64],
    d: &[f64],
    step: &mut f64,
    xp: &[f64],
    max_iterations: usize,
    evaluate: &mut F,
) -> Option<usize>
where
    F: FnMut(&[f64], &mut [f64]) -> f64,
{
    const DEC: f64 = 0.5;
    const INC: f64 = 2.1;

    let finit = *fx;
    let dginit = dot(g, d);
    if dginit > 0.0 {
        /* Not a descent direction. */
        return None;
    }
    let dgtest = FTOL * dginit;

    for count in 1..=max_iterations {
        for ((x, &xp), &d) in x.iter_mut().zip(xp).zip(d) {
            *x = xp + *step * d;
        }
        *fx = evaluate(x, g);

        let width = if *fx > finit + *step * dgtest {
            DEC
        } else if dot(g, d) < WOLFE * dginit {
            INC
        } else {
            return Some(count);
        };

        if *step < MIN_STEP || *step > MAX_STEP {
            return None;
        }
        *step *= width;
    }
    None
}

/// Minimizes `evaluate` from the starting point `x`, which holds the best
/// point found on return. `evaluate` writes the gradient at its first
/// argument into its second and returns the objective.
pub fn minimize<F>(x: &mut [f64], params: &LbfgsParams, mut evaluate: F) -> Result<Report>
where
    F: FnMut(&[f64], &mut [f64]) -> f64,
{
    params.validate()?;
    let n = x.len();
    let m = params.memory;

    let mut g = vec![0.0; n];
    let mut fx = evaluate(x, &mut g);
    let mut pf = vec![fx; params.past.max(1)];

    if norm(&g) / norm(x).max(1.0) <= params.epsilon {
        return Ok(Report { stop: Stop::Converged, iterations: 0, fx });
    }

    let mut d: Vec<f64> = g.iter().map(|v| -v).collect();
    let mut step = 1.0 / norm(&d);
    let mut xp = vec![0.0; n];
    let mut gp = vec![0.0; n];
    /* Oldest correction first. */
    let mut lm: Vec<Correction> = Vec::with_capacity(m);

    let mut k = 1;
    loop {
        xp.copy_from_slice(x);
        gp.copy_from_slice(&g);
        let fp = fx;
        let begin = Instant::now();

        let ls = backtracking(x, &mut fx, &mut g, &d, &mut step, &xp, params.linesearch_max_iterations, &mut evaluate);
        let Some(ls) = ls else {
            log::warn!("line search failed at iteration {k}, keeping the previous point");
            x.copy_from_slice(&xp);
            return Ok(Report { stop: Stop::LineSearchFailed, iterations: k - 1, fx: fp });
        };

        let xnorm = norm(x);
        let gnorm = norm(&g);
        log::info!(
            "iteration {k}: loss {fx:.6}, |w| {xnorm:.4}, |g| {gnorm:.4}, step {step:.4}, evaluations {ls}, {:?}",
            begin.elapsed()
        );

        if gnorm / xnorm.max(1.0) <= params.epsilon {
            return Ok(Report { stop: Stop::Converged, iterations: k, fx });
        }

        if params.past > 0 {
            if params.past <= k && fx != 0.0 {
                let rate = (pf[k % params.past] - fx) / fx;
                if rate.abs() < params.delta {
                    return Ok(Report { stop: Stop::Stalled, iterations: k, fx });
                }
            }
            pf[k % params.past] = fx;
        }

        if k >= params.max_iterations {
            return Ok(Report { stop: Stop::MaxIterations, iterations: k, fx });
        }

        /* Update the correction pairs: s = x - xp, y = g - gp. */
        let s: Vec<f64> = x.iter().zip(&xp).map(|(a, b)| a - b).collect();
        let y: Vec<f64> = g.iter().zip(&gp).map(|(a, b)| a - b).collect();
        let ys = dot(&y, &s);
        let yy = dot(&y, &y);
        if ys > 0.0 {
            if lm.len() == m {
                lm.remove(0);
            }
            lm.push(Correction { s, y, rho: 1.0 / ys, alpha: 0.0 });
        }

        /* Two-loop recursion for d = -H g, newest correction first. */
        d.iter_mut().zip(&g).for_each(|(d, g)| *d = -g);
        for c in lm.iter_mut().rev() {
            c.alpha = c.rho * dot(&c.s, &d);
            for (d, y) in d.iter_mut().zip(&c.y) {
                *d -= c.alpha * y;
            }
        }
        if ys > 0.0 {
            let scale = ys / yy;
            d.iter_mut().for_each(|d| *d *= scale);
        }
        for c in &lm {
            let beta = c.rho * dot(&c.y, &d);
            for (d, s) in d.iter_mut().zip(&c.s) {
                *d += s * (c.alpha - beta);
            }
        }

        step = 1.0;
        k += 1;
    }
}

/// L-BFGS trainer with L2 regularization.
#[derive(Debug, Default)]
pub struct Lbfgs {
    params: LbfgsParams,
    encoder: Crf1dEncoder,
}

impl Lbfgs {
    pub fn new(params: LbfgsParams, encoder: Crf1dEncoder) -> Self {
        Self { params, encoder }
    }
}

impl Crf1dTrainer for Lbfgs {
    fn train(&mut self, ds: &Dataset) -> Result<Crf1dModel> {
        if ds.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        self.params.validate()?;
        self.encoder.set_data(ds);
        let K = self.encoder.num_features();
        log::info!("L-BFGS: {:?}", self.params);

        let c2 = self.params.c2;
        let encoder = &mut self.encoder;
        let mut w = vec![0.0; K];
        let begin = Instant::now();
        let report = minimize(&mut w, &self.params, |x, g| {
            let mut f = encoder.objective_and_gradients_batch(ds, x, g);
            /* L2 regularization. */
            if c2 > 0.0 {
                let c22 = c2 * 2.0;
                for (g, x) in g.iter_mut().zip(x) {
                    *g += c22 * x;
                }
                f += c2 * dot(x, x);
            }
            f
        })?;
        log::info!(
            "L-BFGS stopped ({:?}) after {} iterations, loss {:.6}, {:?}",
            report.stop,
            report.iterations,
            report.fx,
            begin.elapsed()
        );
        Ok(self.encoder.to_model(ds, &w))
    }
}

/// Fits a CRF on `ds` with default feature generation.
pub fn train(ds: &Dataset, params: &LbfgsParams) -> Result<Crf1dModel> {
    Lbfgs::new(params.clone(), Crf1dEncoder::default()).train(ds)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::crf::{model::Model, tagger::Tagger};

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        params: LbfgsParams,
    }

    #[test]
    fn cli_defaults_match_default() {
        let cli = Cli::parse_from(["test"]);
        assert_eq!(cli.params, LbfgsParams::default());
        let cli = Cli::parse_from(["test", "--c2", "0.5", "--max-iterations", "7"]);
        assert_eq!(cli.params.c2, 0.5);
        assert_eq!(cli.params.max_iterations, 7);
    }

    #[test]
    fn validate() {
        assert!(LbfgsParams::default().validate().is_ok());
        for bad in [
            LbfgsParams { memory: 0, ..Default::default() },
            LbfgsParams { c2: -1.0, ..Default::default() },
            LbfgsParams { epsilon: f64::NAN, ..Default::default() },
            LbfgsParams { linesearch_max_iterations: 0, ..Default::default() },
        ] {
            assert!(matches!(bad.validate(), Err(Error::InvalidParameter(..))), "{bad:?}");
        }
    }

    #[test]
    fn minimizes_quadratic() {
        /* f(x) = sum_i (i + 1) * (x_i - i)^2 */
        let mut x = vec![0.0; 5];
        let params = LbfgsParams { epsilon: 1e-6, past: 0, ..Default::default() };
        let report = minimize(&mut x, &params, |x, g| {
            let mut f = 0.0;
            for (i, (x, g)) in x.iter().zip(g.iter_mut()).enumerate() {
                let a = (i + 1) as f64;
                let r = x - i as f64;
                f += a * r * r;
                *g = 2.0 * a * r;
            }
            f
        })
        .expect("failed to minimize");
        assert_eq!(report.stop, Stop::Converged);
        for (i, v) in x.iter().enumerate() {
            assert!((v - i as f64).abs() < 1e-5, "x[{i}] = {v}");
        }
        assert!(report.fx < 1e-9);
    }

    #[test]
    fn stops_at_max_iterations() {
        /* Rosenbrock needs more than two iterations from (-1.2, 1). */
        let mut x = vec![-1.2, 1.0];
        let params = LbfgsParams { max_iterations: 2, past: 0, ..Default::default() };
        let report = minimize(&mut x, &params, |x, g| {
            let (a, b) = (x[0], x[1]);
            g[0] = -2.0 * (1.0 - a) - 400.0 * a * (b - a * a);
            g[1] = 200.0 * (b - a * a);
            (1.0 - a).powi(2) + 100.0 * (b - a * a).powi(2)
        })
        .expect("failed to minimize");
        assert_eq!(report.stop, Stop::MaxIterations);
        assert_eq!(report.iterations, 2);
        assert!(report.fx < 24.2);
    }

    #[test]
    fn empty_dataset() {
        assert!(matches!(train(&Dataset::default(), &LbfgsParams::default()), Err(Error::EmptyCorpus)));
    }

    #[test]
    fn learns_separable_data() {
        let item = |name: &str| vec![(name.to_string(), 1.0)];
        let mut ds = Dataset::default();
        for _ in 0..3 {
            ds.append(&[item("when"), item("was"), item("1938")], &["O", "O", "DATE"]);
            ds.append(&[item("paris"), item("was"), item("when")], &["LOC", "O", "O"]);
        }
        let params = LbfgsParams { c2: 0.01, ..Default::default() };
        let model = train(&ds, &params).expect("failed to train");
        assert_eq!(model.num_labels(), 3);

        let mut tagger = model.tagger();
        for seq in &ds.seqs {
            tagger.set_seq(seq);
            assert_eq!(tagger.viterbi().0, seq.labels);
        }
    }
}
