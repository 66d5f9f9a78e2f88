use crate::{
    corpus::{AnnotatedToken, Corpus, Sentence, NO_LABEL},
    crf::{
        crf1d::model::Crf1dModel,
        lbfgs::{self, LbfgsParams},
        model::Model,
        tagger::Tagger,
    },
    dataset::{Dataset, Sequence},
    error::{Error, Result},
    evaluation::Evaluation,
    features::{attributes, sent2features, sent2labels},
    nlp::{PosTagger, RulePosTagger, Tokenizer, WordTokenizer},
    quark::StringTable,
};

/// Score returned by [`SequenceTagger::evaluate`] when no model is fitted.
pub const NOT_TRAINED_SCORE: f64 = -1.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<Sentence>,
    pub test: Vec<Sentence>,
}

/// Seeded shuffle split. The test partition takes `ceil(n * test_fraction)`
/// sentences and the train partition the rest.
pub fn train_test_split(sentences: &[Sentence], test_fraction: f64, seed: u64) -> Result<TrainTestSplit> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(Error::InvalidParameter(format!("test fraction must be in (0, 1), got {test_fraction}")));
    }
    let n = sentences.len();
    if n == 0 {
        return Err(Error::EmptyCorpus);
    }
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test >= n {
        return Err(Error::InvalidParameter(format!(
            "test fraction {test_fraction} leaves no training sentences out of {n}"
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = oorandom::Rand64::new(seed.into());
    for i in (1..n).rev() {
        let j = rng.rand_range(0..(i as u64 + 1)) as usize;
        order.swap(i, j);
    }
    let (test, train) = order.split_at(n_test);
    Ok(TrainTestSplit {
        train: train.iter().map(|&i| sentences[i].clone()).collect(),
        test: test.iter().map(|&i| sentences[i].clone()).collect(),
    })
}

fn sentence_attributes(sentence: &[AnnotatedToken]) -> Vec<Vec<(String, f64)>> {
    sent2features(sentence).iter().map(attributes).collect()
}

/// Interns labeled sentences for training.
pub fn to_dataset(sentences: &[Sentence]) -> Dataset {
    let mut ds = Dataset::default();
    for sentence in sentences {
        ds.append(&sentence_attributes(sentence), &sent2labels(sentence));
    }
    ds
}

/// Handle owning the fitted model, the held-out sentences and the text
/// processing used to tag raw sentences.
pub struct SequenceTagger {
    params: LbfgsParams,
    tokenizer: Box<dyn Tokenizer>,
    pos_tagger: Box<dyn PosTagger>,
    model: Option<Crf1dModel>,
    held_out: Vec<Sentence>,
}

impl Default for SequenceTagger {
    fn default() -> Self {
        Self::new(LbfgsParams::default())
    }
}

impl SequenceTagger {
    pub fn new(params: LbfgsParams) -> Self {
        Self::with_nlp(params, Box::new(WordTokenizer), Box::new(RulePosTagger::new()))
    }

    pub fn with_nlp(params: LbfgsParams, tokenizer: Box<dyn Tokenizer>, pos_tagger: Box<dyn PosTagger>) -> Self {
        Self { params, tokenizer, pos_tagger, model: None, held_out: Vec::new() }
    }

    /// Ready-to-tag handle around an existing model.
    pub fn from_model(model: Crf1dModel) -> Self {
        Self { model: Some(model), ..Default::default() }
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&Crf1dModel> {
        self.model.as_ref()
    }

    /// Sentences kept aside by the last [`Self::train`].
    pub fn held_out(&self) -> &[Sentence] {
        &self.held_out
    }

    /// Splits `corpus`, fits a model on the train partition and keeps the
    /// test partition for [`Self::test_set_score`].
    pub fn train(&mut self, corpus: &Corpus, test_fraction: f64, seed: u64) -> Result<()> {
        let split = train_test_split(&corpus.sentences, test_fraction, seed)?;
        log::info!("train: {} sentences, test: {} sentences", split.train.len(), split.test.len());
        let ds = to_dataset(&split.train);
        log::info!(
            "dataset: {} sequences, {} items, {} attributes, {} labels",
            ds.len(),
            ds.total_items(),
            ds.num_attrs(),
            ds.num_labels()
        );
        self.model = Some(lbfgs::train(&ds, &self.params)?);
        self.held_out = split.test;
        Ok(())
    }

    fn fitted(&self) -> Result<&Crf1dModel> {
        self.model.as_ref().ok_or(Error::NotTrained)
    }

    /// Best label sequence for an already featurized sentence.
    pub fn predict(&self, sentence: &[AnnotatedToken]) -> Result<Vec<String>> {
        Ok(self.predict_with_probability(sentence)?.0)
    }

    fn predict_with_probability(&self, sentence: &[AnnotatedToken]) -> Result<(Vec<String>, f64)> {
        let model = self.fitted()?;
        let seq = Sequence::lookup(&sentence_attributes(sentence), model.attrs());
        let mut tagger = model.crf1d_tagger();
        tagger.set_seq(&seq);
        let (path, score) = tagger.viterbi();
        let probability = (score - tagger.lognorm()).exp();
        let labels = path
            .into_iter()
            .map(|id| model.labels().to_str(id).unwrap_or(NO_LABEL).to_string())
            .collect();
        Ok((labels, probability))
    }

    /// Per-label report over `sentences`, `None` when no model is fitted.
    pub fn evaluation(&self, sentences: &[Sentence]) -> Option<Evaluation> {
        let model = self.model.as_ref()?;
        let mut evaluation = Evaluation::default();
        for sentence in sentences {
            let reference = sent2labels(sentence);
            let prediction = self.predict(sentence).ok()?;
            evaluation.accumulate(&reference, &prediction);
        }
        evaluation.evaluate();
        log::debug!("{} labels in model\n{evaluation}", model.num_labels());
        Some(evaluation)
    }

    /// Support-weighted F1 over every model label except [`NO_LABEL`].
    /// Returns [`NOT_TRAINED_SCORE`] when no model is fitted.
    pub fn evaluate(&self, sentences: &[Sentence]) -> f64 {
        let (Some(model), Some(evaluation)) = (self.model.as_ref(), self.evaluation(sentences)) else {
            log::warn!("evaluate called before training");
            return NOT_TRAINED_SCORE;
        };
        let labels: Vec<&str> = model.labels().iter().filter(|l| *l != NO_LABEL).collect();
        evaluation.weighted_fmeasure(&labels).unwrap_or_else(|| {
            log::warn!("no reference tokens carry a scored label, F1 is ill-defined and set to 0.0");
            0.0
        })
    }

    /// Evaluates the held-out partition of the last training run.
    pub fn test_set_score(&self) -> f64 {
        self.evaluate(&self.held_out)
    }

    fn annotate(&self, raw: &str) -> Vec<AnnotatedToken> {
        let words = self.tokenizer.tokenize(raw);
        let tags = self.pos_tagger.tag(&words);
        words.iter().zip(&tags).map(|(word, pos)| AnnotatedToken::new(word, NO_LABEL, pos)).collect()
    }

    /// Tokenizes and tags a raw sentence into (token, label) pairs.
    pub fn tag(&self, raw: &str) -> Result<Vec<(String, String)>> {
        Ok(self.tag_with_probability(raw)?.0)
    }

    /// Like [`Self::tag`], also returning the probability of the label path.
    pub fn tag_with_probability(&self, raw: &str) -> Result<(Vec<(String, String)>, f64)> {
        self.fitted()?;
        let sentence = self.annotate(raw);
        let (labels, probability) = self.predict_with_probability(&sentence)?;
        let tagged = sentence.into_iter().map(|t| t.word).zip(labels).collect();
        Ok((tagged, probability))
    }
}
