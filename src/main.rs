use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, Parser};
use gatecrf::{nlp::RulePosTagger, Corpus, Error, LbfgsParams, SequenceTagger};

const DEFAULT_SENTENCES: &[&str] = &[
    "When was Superman born",
    "When was the Battle of Gettysburg held",
    "When was the lord of the rings written",
];

/// Train a CRF tagger on GATE annotated documents, report its F1 score on a
/// held-out split and tag a few sentences.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Argv {
    /// read annotated GATE documents from a folder (DIR)
    #[arg(long, value_name = "DIR", conflicts_with = "pickle")]
    folder: Option<PathBuf>,
    /// read a corpus snapshot written by an earlier --folder run (FILE)
    #[arg(long, value_name = "FILE")]
    pickle: Option<PathBuf>,
    /// where a --folder run writes its corpus snapshot
    #[arg(long, value_name = "FILE", default_value = "corpus.bson")]
    snapshot: PathBuf,
    /// only use annotations from this annotation set
    #[arg(long, value_name = "NAME")]
    annotation_set: Option<String>,
    /// fraction of sentences held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    test_size: f64,
    /// seed of the train/test shuffle
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[command(flatten)]
    lbfgs: LbfgsParams,
    /// save the fitted model as JSON (FILE)
    #[arg(long, value_name = "FILE")]
    model: Option<PathBuf>,
    /// more logging, repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// sentences to tag after training
    #[arg(value_name = "SENTENCE")]
    sentences: Vec<String>,
}

fn run(argv: Argv) -> gatecrf::Result<()> {
    let corpus = match (&argv.folder, &argv.pickle) {
        (Some(folder), _) => {
            let corpus = Corpus::build(folder, &RulePosTagger::new(), argv.annotation_set.as_deref())?;
            corpus.save(&argv.snapshot)?;
            corpus
        }
        (None, Some(pickle)) => Corpus::load(pickle)?,
        (None, None) => return Err(Error::InvalidParameter("either --folder or --pickle is required".into())),
    };
    log::info!("corpus: {} sentences, {} tokens, labels {:?}", corpus.len(), corpus.total_tokens(), corpus.labels());

    let mut tagger = SequenceTagger::new(argv.lbfgs.clone());
    tagger.train(&corpus, argv.test_size, argv.seed)?;
    if let Some(path) = &argv.model {
        if let Some(model) = tagger.model() {
            model.save(path)?;
        }
    }
    println!("F1 Score: {}", tagger.test_set_score());

    let sentences: Vec<String> = if argv.sentences.is_empty() {
        DEFAULT_SENTENCES.iter().map(|s| s.to_string()).collect()
    } else {
        argv.sentences.clone()
    };
    for sentence in &sentences {
        let tagged = tagger.tag(sentence)?;
        let line: Vec<String> = tagged.iter().map(|(word, label)| format!("{word}/{label}")).collect();
        println!("{}", line.join(" "));
    }
    Ok(())
}

fn main() {
    let argv = Argv::parse();
    let level = match argv.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    log::debug!("{:?}", argv);

    if argv.folder.is_none() && argv.pickle.is_none() {
        let _ = Argv::command().print_help();
        std::process::exit(2);
    }
    if let Err(e) = run(argv) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
