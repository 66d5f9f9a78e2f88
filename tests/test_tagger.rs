use std::fs;

use gatecrf::{
    crf::lbfgs::{self, Lbfgs},
    crf::trainer::{Crf1dEncoder, Crf1dTrainer, FeatureOpt},
    quark::StringTable,
    Crf1dModel, Dataset, Error, LbfgsParams, Model, Sequence, Tagger,
};
use tempfile::tempdir;

fn item(attrs: &[(&str, f64)]) -> Vec<(String, f64)> {
    attrs.iter().map(|(name, value)| (name.to_string(), *value)).collect()
}

fn weather() -> (Vec<Vec<(String, f64)>>, Vec<&'static str>) {
    let xseq = vec![
        item(&[("walk", 1.0), ("shop", 0.5)]),
        item(&[("walk", 1.0)]),
        item(&[("walk", 1.0), ("clean", 0.5)]),
        item(&[("shop", 0.5), ("clean", 0.5)]),
        item(&[("walk", 0.5), ("clean", 1.0)]),
        item(&[("clean", 1.0), ("shop", 0.1)]),
        item(&[("walk", 1.0), ("shop", 0.5)]),
        item(&[("walk", 1.0)]),
        item(&[("clean", 1.0)]),
    ];
    let yseq = vec!["sunny", "sunny", "sunny", "rainy", "rainy", "rainy", "sunny", "sunny", "rainy"];
    (xseq, yseq)
}

fn trained() -> Crf1dModel {
    let (xseq, yseq) = weather();
    let mut ds = Dataset::default();
    ds.append(&xseq, &yseq);
    let params = LbfgsParams { c2: 0.01, max_iterations: 200, ..Default::default() };
    lbfgs::train(&ds, &params).expect("failed to train")
}

fn predict(model: &Crf1dModel, xseq: &[Vec<(String, f64)>]) -> Vec<String> {
    let seq = Sequence::lookup(xseq, model.attrs());
    let mut tagger = model.tagger();
    tagger.set_seq(&seq);
    tagger
        .viterbi()
        .0
        .into_iter()
        .map(|id| model.labels().to_str(id).unwrap().to_string())
        .collect()
}

#[test]
fn reproduces_training_labels() {
    let (xseq, yseq) = weather();
    let model = trained();
    assert_eq!(predict(&model, &xseq), yseq);
}

#[test]
fn unknown_attributes_are_ignored() {
    let model = trained();
    let xseq = vec![item(&[("walk", 1.0), ("swim", 1.0)]), item(&[("fly", 1.0)])];
    assert_eq!(predict(&model, &xseq).len(), 2);
}

#[test]
fn model_file_round_trip() {
    let (xseq, _) = weather();
    let model = trained();
    let dir = tempdir().expect("failed to create dir");
    let path = dir.path().join("model.json");
    model.save(&path).expect("failed to save model");
    let back = Crf1dModel::from_path(&path).expect("failed to open model");
    assert_eq!(back.num_features(), model.num_features());
    assert_eq!(predict(&back, &xseq), predict(&model, &xseq));

    let from_memory = Crf1dModel::from_memory(&fs::read(&path).unwrap()).expect("failed to read model");
    assert_eq!(predict(&from_memory, &xseq), predict(&model, &xseq));
}

#[test]
fn open_not_existing_model_does_not_panic() {
    assert!(matches!(Crf1dModel::from_path("tests/does-not-exist.json"), Err(Error::Io(..))));
    assert!(matches!(Crf1dModel::from_memory(b"\x00\x01\x02"), Err(Error::InvalidModel(..))));
}

#[test]
fn dump_model() {
    let model = trained();
    let dir = tempdir().expect("failed to create dir");
    let path = dir.path().join("model.dump");
    model.dump(fs::File::create(&path).unwrap()).expect("failed to dump model");
    let dump = fs::read_to_string(&path).unwrap();
    assert!(dump.starts_with("LABELS = {"));
    assert!(dump.contains("sunny"));
    assert!(dump.contains("STATE_FEATURES = {"));
}

#[test]
fn marginals_sum_to_one() {
    let (xseq, _) = weather();
    let model = trained();
    let seq = Sequence::lookup(&xseq, model.attrs());
    let mut tagger = model.tagger();
    tagger.set_seq(&seq);
    for t in 0..tagger.len() {
        let total: f64 = (0..model.num_labels()).map(|l| tagger.marginal_point(l, t)).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}

#[test]
fn trainer_with_possible_states() {
    let (xseq, yseq) = weather();
    let mut ds = Dataset::default();
    ds.append(&xseq, &yseq);
    let opt = FeatureOpt { possible_states: true, ..Default::default() };
    let mut trainer = Lbfgs::new(LbfgsParams { c2: 0.01, ..Default::default() }, Crf1dEncoder::new(opt));
    let model = trainer.train(&ds).expect("failed to train");
    assert_eq!(predict(&model, &xseq), yseq);
}
