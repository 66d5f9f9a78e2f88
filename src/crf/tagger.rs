use crate::dataset::Sequence;

/// Inference over one sequence at a time.
pub trait Tagger {
    /// Loads a sequence and computes its state scores.
    fn set_seq(&mut self, seq: &Sequence);
    /// Number of items in the current sequence.
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Most probable label path and its unnormalized score.
    fn viterbi(&mut self) -> (Vec<usize>, f64);
    /// Log of the partition function.
    fn lognorm(&mut self) -> f64;
    /// Marginal probability of label `l` at position `t`.
    fn marginal_point(&mut self, l: usize, t: usize) -> f64;
    /// Unnormalized log score of a label path.
    fn score(&self, path: &[usize]) -> f64;
}
