use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),
    /// The document is well-formed XML but not a usable GATE document.
    #[error("malformed GATE document: {0}")]
    Parse(String),
    #[error("failed to write corpus snapshot: {0}")]
    SnapshotWrite(#[from] bson::ser::Error),
    #[error("failed to read corpus snapshot: {0}")]
    SnapshotRead(#[from] bson::de::Error),
    #[error("invalid model: {0}")]
    InvalidModel(#[from] serde_json::Error),
    #[error("model has not been trained")]
    NotTrained,
    #[error("corpus is empty")]
    EmptyCorpus,
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, Error>;
