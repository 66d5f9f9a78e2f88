use std::{collections::BTreeMap, fmt::Display, iter::zip};

/// Label-wise performance values.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LabelMeasure {
    /// Number of correct predictions.
    pub num_correct: usize,
    /// Number of occurrences of the label in the gold-standard data.
    pub num_observation: usize,
    /// Number of predictions.
    pub num_prediction: usize,
    pub precision: f64,
    pub recall: f64,
    pub fmeasure: f64,
}

impl LabelMeasure {
    fn compute(&mut self) {
        self.precision = 0.0;
        self.recall = 0.0;
        self.fmeasure = 0.0;
        if self.num_prediction > 0 {
            self.precision = self.num_correct as f64 / self.num_prediction as f64;
        }
        if self.num_observation > 0 {
            self.recall = self.num_correct as f64 / self.num_observation as f64;
        }
        if self.precision + self.recall > 0.0 {
            self.fmeasure = self.precision * self.recall * 2.0 / (self.precision + self.recall);
        }
    }
}

/// Overall performance values, accumulated sentence by sentence.
#[derive(Debug, Default, Clone)]
pub struct Evaluation {
    tbl: BTreeMap<String, LabelMeasure>,

    /// Number of correctly predicted items.
    item_total_correct: usize,
    /// Total number of items.
    item_total_num: usize,
    item_accuracy: f64,

    /// Number of correctly predicted sequences.
    inst_total_correct: usize,
    /// Total number of sequences.
    inst_total_num: usize,
    inst_accuracy: f64,

    macro_precision: f64,
    macro_recall: f64,
    macro_fmeasure: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimation {
    pub precision: f64,
    pub recall: f64,
    pub fmeasure: f64,
}

impl Evaluation {
    /// Adds one sequence. Extra items of the longer slice are ignored.
    pub fn accumulate<R: AsRef<str>, P: AsRef<str>>(&mut self, reference: &[R], prediction: &[P]) {
        let mut matched = 0;
        for (r, p) in zip(reference, prediction) {
            let (r, p) = (r.as_ref(), p.as_ref());
            self.tbl.entry(r.to_string()).or_default().num_observation += 1;
            self.tbl.entry(p.to_string()).or_default().num_prediction += 1;
            if r == p {
                self.tbl.entry(r.to_string()).or_default().num_correct += 1;
                matched += 1;
            }
            self.item_total_num += 1;
        }
        self.item_total_correct += matched;

        if matched == reference.len() && matched == prediction.len() {
            self.inst_total_correct += 1;
        }
        self.inst_total_num += 1;
    }

    /// Computes the label-wise scores and their macro average over the
    /// labels seen in the gold standard.
    pub fn evaluate(&mut self) -> Estimation {
        let mut observed = 0;
        self.macro_precision = 0.0;
        self.macro_recall = 0.0;
        self.macro_fmeasure = 0.0;
        for lev in self.tbl.values_mut() {
            lev.compute();
            if lev.num_observation == 0 {
                continue;
            }
            observed += 1;
            self.macro_precision += lev.precision;
            self.macro_recall += lev.recall;
            self.macro_fmeasure += lev.fmeasure;
        }
        if observed > 0 {
            self.macro_precision /= observed as f64;
            self.macro_recall /= observed as f64;
            self.macro_fmeasure /= observed as f64;
        }
        if self.item_total_num > 0 {
            self.item_accuracy = self.item_total_correct as f64 / self.item_total_num as f64;
        }
        if self.inst_total_num > 0 {
            self.inst_accuracy = self.inst_total_correct as f64 / self.inst_total_num as f64;
        }
        Estimation { precision: self.macro_precision, recall: self.macro_recall, fmeasure: self.macro_fmeasure }
    }

    /// F1 of `labels` averaged with their gold-standard support as weights.
    /// Items of other labels only count as wrong predictions. Returns `None`
    /// when none of `labels` occurs in the gold standard.
    pub fn weighted_fmeasure<S: AsRef<str>>(&self, labels: &[S]) -> Option<f64> {
        let mut support = 0;
        let mut total = 0.0;
        for label in labels {
            if let Some(lev) = self.tbl.get(label.as_ref()) {
                let mut lev = lev.clone();
                lev.compute();
                support += lev.num_observation;
                total += lev.fmeasure * lev.num_observation as f64;
            }
        }
        (support > 0).then(|| total / support as f64)
    }

    pub fn label(&self, label: &str) -> Option<&LabelMeasure> {
        self.tbl.get(label)
    }

    pub fn item_accuracy(&self) -> f64 {
        self.item_accuracy
    }

    pub fn sequence_accuracy(&self) -> f64 {
        self.inst_accuracy
    }
}

impl Display for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Performance by label (#match, #model, #ref) (precision, recall, F1):")?;
        for (label, lev) in &self.tbl {
            if lev.num_observation == 0 {
                writeln!(
                    f,
                    "    {label}: ({}, {}, {}) (******, ******, ******)",
                    lev.num_correct, lev.num_prediction, lev.num_observation
                )?;
            } else {
                writeln!(
                    f,
                    "    {label}: ({}, {}, {}) ({:.4}, {:.4}, {:.4})",
                    lev.num_correct, lev.num_prediction, lev.num_observation, lev.precision, lev.recall, lev.fmeasure
                )?;
            }
        }
        writeln!(
            f,
            "Macro-average precision, recall, F1: ({:.6}, {:.6}, {:.6})",
            self.macro_precision, self.macro_recall, self.macro_fmeasure
        )?;
        writeln!(f, "Item accuracy: {} / {} ({:.4})", self.item_total_correct, self.item_total_num, self.item_accuracy)?;
        write!(f, "Instance accuracy: {} / {} ({:.4})", self.inst_total_correct, self.inst_total_num, self.inst_accuracy)
    }
}
