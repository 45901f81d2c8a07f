use thiserror::Error;

#[derive(Error, Debug)]
/// Export error
pub enum ExportError {
    #[error("Credential: {0}")]
    Credential(String),

    #[error("Count probe: {0}")]
    CountFetch(String),

    #[error("Page {page} fetch failed: {reason}")]
    PageFetch { page: u32, reason: String },

    #[error("Page {page} could not be parsed: {reason}")]
    PageParse { page: u32, reason: String },

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("ItemWriter from: {0}")]
    ItemWriter(String),

    #[error("Step: {0}")]
    Step(String),

    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),
}
