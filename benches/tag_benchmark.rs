use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gatecrf::{AnnotatedToken, Corpus, LbfgsParams, SequenceTagger};

fn trained() -> SequenceTagger {
    let mut sentences = Vec::new();
    for person in ["Superman", "Batman", "Einstein", "Mary", "Ada"] {
        sentences.push(vec![
            AnnotatedToken::new("When", "O", "WRB"),
            AnnotatedToken::new("was", "O", "VBD"),
            AnnotatedToken::new(person, "PERSON", "NNP"),
            AnnotatedToken::new("born", "O", "VBN"),
        ]);
    }
    let mut tagger = SequenceTagger::new(LbfgsParams::default());
    tagger.train(&Corpus::from(sentences), 0.2, 0).expect("failed to train");
    tagger
}

fn bench_tag(c: &mut Criterion) {
    let tagger = trained();
    c.bench_function("tag short sentence", |b| {
        b.iter(|| tagger.tag(black_box("When was Superman born")).expect("failed to tag"))
    });
    let long = "When was the Battle of Gettysburg held and when was the lord of the rings written ".repeat(10);
    c.bench_function("tag long sentence", |b| b.iter(|| tagger.tag(black_box(&long)).expect("failed to tag")));
}

criterion_group!(benches, bench_tag);
criterion_main!(benches);
