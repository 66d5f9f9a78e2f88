//! Linear-chain CRF sequence tagging trained from GATE XML annotations.
//!
//! [`corpus::Corpus::build`] reads a folder of annotated documents,
//! [`pipeline::SequenceTagger`] fits a CRF on a seeded split, reports the
//! weighted F1 of the held-out part and tags raw sentences.

pub mod corpus;
pub mod crf;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod gate;
pub mod nlp;
pub mod pipeline;
pub mod quark;

pub use corpus::{AnnotatedToken, Corpus, Sentence, NO_LABEL};
pub use crf::{crf1d::model::Crf1dModel, lbfgs::LbfgsParams, model::Model, tagger::Tagger};
pub use dataset::{Attr, Dataset, Item, Sequence};
pub use error::{Error, Result};
pub use evaluation::Evaluation;
pub use pipeline::{train_test_split, SequenceTagger, TrainTestSplit};
pub use quark::Quark;
