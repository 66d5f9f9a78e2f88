use std::{fs, path::Path};

use gatecrf::{nlp::RulePosTagger, train_test_split, Corpus, Error, LbfgsParams, SequenceTagger, NO_LABEL};
use tempfile::tempdir;

/// Writes a GATE document annotating every word of `words` with its label.
fn write_document(path: &Path, words: &[(&str, &str)]) {
    let mut text = String::new();
    let mut annotations = String::new();
    for (id, (word, label)) in words.iter().enumerate() {
        if !text.is_empty() {
            text.push(' ');
        }
        let start = text.chars().count();
        text.push_str(word);
        let end = text.chars().count();
        annotations.push_str(&format!(
            "<Annotation Id=\"{id}\" Type=\"{label}\" StartNode=\"{start}\" EndNode=\"{end}\">\n</Annotation>\n"
        ));
    }
    let xml = format!(
        "<?xml version='1.0' encoding='UTF-8'?>\n<GateDocument version=\"3\">\n\
         <TextWithNodes>{text}</TextWithNodes>\n\
         <AnnotationSet Name=\"Original markups\">\n<Annotation Id=\"99\" Type=\"paragraph\" StartNode=\"0\" EndNode=\"3\"/>\n</AnnotationSet>\n\
         <AnnotationSet>\n{annotations}</AnnotationSet>\n</GateDocument>\n"
    );
    fs::write(path, xml).expect("failed to write document");
}

fn write_folder(dir: &Path) {
    let docs: Vec<Vec<(&str, &str)>> = vec![
        vec![("When", "O"), ("was", "O"), ("Superman", "PERSON"), ("born", "O")],
        vec![("When", "O"), ("was", "O"), ("Batman", "PERSON"), ("born", "O")],
        vec![("When", "O"), ("was", "O"), ("Einstein", "PERSON"), ("born", "O")],
        vec![("Where", "O"), ("was", "O"), ("Superman", "PERSON"), ("born", "O")],
        vec![("Superman", "PERSON"), ("was", "O"), ("born", "O"), ("in", "O"), ("1938", "DATE")],
        vec![("When", "O"), ("was", "O"), ("the", "O"), ("Battle", "EVENT"), ("of", "EVENT"), ("Gettysburg", "EVENT"), ("held", "O")],
        vec![("The", "O"), ("Battle", "EVENT"), ("of", "EVENT"), ("Hastings", "EVENT"), ("was", "O"), ("in", "O"), ("1066", "DATE")],
        vec![("When", "O"), ("was", "O"), ("the", "O"), ("lord", "WORK"), ("of", "WORK"), ("the", "WORK"), ("rings", "WORK"), ("written", "O")],
        vec![("Mary", "PERSON"), ("was", "O"), ("born", "O"), ("in", "O"), ("1901", "DATE")],
        vec![("When", "O"), ("was", "O"), ("Mary", "PERSON"), ("born", "O")],
    ];
    for (i, words) in docs.iter().enumerate() {
        write_document(&dir.join(format!("doc{i:02}.xml")), words);
    }
    fs::write(dir.join("Thumbs.db"), b"\x00\x01").expect("failed to write artifact");
    let truncated = r#"<GateDocument><TextWithNodes>Mary had</TextWithNodes><AnnotationSet><Annotation Id="1" Type="BROKEN" StartNode="0" EndNode="4"/>"#;
    fs::write(dir.join("broken.xml"), truncated).expect("failed to write document");
}

fn params() -> LbfgsParams {
    LbfgsParams { c2: 0.1, ..Default::default() }
}

#[test]
fn build_train_and_tag() {
    let dir = tempdir().expect("failed to create dir");
    write_folder(dir.path());
    let corpus = Corpus::build(dir.path(), &RulePosTagger::new(), None).expect("failed to build corpus");
    assert_eq!(corpus.len(), 10);
    assert_eq!(corpus.sentences[0][2].word, "Superman");
    assert_eq!(corpus.sentences[0][2].pos, "NNP");
    assert!(!corpus.labels().contains("paragraph"));
    assert!(!corpus.labels().contains("BROKEN"));

    let snapshot = dir.path().join("corpus.bson");
    corpus.save(&snapshot).expect("failed to save snapshot");
    assert_eq!(Corpus::load(&snapshot).expect("failed to load snapshot"), corpus);

    let mut tagger = SequenceTagger::new(params());
    tagger.train(&corpus, 0.2, 0).expect("failed to train");
    assert_eq!(tagger.held_out().len(), 2);
    let score = tagger.test_set_score();
    assert!((0.0..=1.0).contains(&score), "score {score}");

    let model = tagger.model().expect("model");
    let labels: Vec<&str> = gatecrf::Model::labels(model).iter().collect();
    for sentence in ["When was Superman born", "When was the Battle of Gettysburg held", "When was the lord of the rings written"] {
        let tagged = tagger.tag(sentence).expect("failed to tag");
        assert_eq!(tagged.len(), sentence.split_whitespace().count());
        for ((word, label), expected) in tagged.iter().zip(sentence.split_whitespace()) {
            assert_eq!(word, expected);
            assert!(labels.contains(&label.as_str()), "unknown label {label}");
        }
    }
    let tagged = tagger.tag("When was Superman born").expect("failed to tag");
    assert_eq!(tagged[0].1, NO_LABEL);
    assert_eq!(tagged[2].1, "PERSON");
    assert!(tagger.tag("   ").expect("failed to tag").is_empty());
}

#[test]
fn same_seed_same_score() {
    let dir = tempdir().expect("failed to create dir");
    write_folder(dir.path());
    let corpus = Corpus::build(dir.path(), &RulePosTagger::new(), None).expect("failed to build corpus");

    let a = train_test_split(&corpus.sentences, 0.25, 42).expect("failed to split");
    let b = train_test_split(&corpus.sentences, 0.25, 42).expect("failed to split");
    assert_eq!(a, b);
    assert_eq!(a.test.len(), 3);

    let mut first = SequenceTagger::new(params());
    first.train(&corpus, 0.25, 42).expect("failed to train");
    let mut second = SequenceTagger::new(params());
    second.train(&corpus, 0.25, 42).expect("failed to train");
    assert_eq!(first.held_out(), a.test.as_slice());
    assert_eq!(first.test_set_score(), second.test_set_score());
}

#[test]
fn annotation_set_selection() {
    let dir = tempdir().expect("failed to create dir");
    write_folder(dir.path());
    let corpus =
        Corpus::build(dir.path(), &RulePosTagger::new(), Some("Original markups")).expect("failed to build corpus");
    assert_eq!(corpus.len(), 10);
    assert!(corpus.sentences.iter().all(|s| s.len() == 1 && s[0].label == "paragraph"));
}

#[test]
fn training_needs_sentences() {
    let mut tagger = SequenceTagger::default();
    assert!(matches!(tagger.train(&Corpus::default(), 0.2, 0), Err(Error::EmptyCorpus)));
    assert!(!tagger.is_trained());
}
