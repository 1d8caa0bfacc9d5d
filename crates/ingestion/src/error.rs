//! Error types for the ingestion pipeline.

use thiserror::Error;
use tms_common::TmsError;

pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// Validation failed; no tiles were generated and the layer record
    /// was removed. The message is safe to surface to the submitter.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Archive could not be read or extracted.
    #[error("archive error: {0}")]
    Archive(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure past validation: reprojection, tiling or storage. Tiles
    /// persisted before the failure stay in the store.
    #[error(transparent)]
    Pipeline(#[from] TmsError),
}

impl From<zip::result::ZipError> for IngestError {
    fn from(err: zip::result::ZipError) -> Self {
        IngestError::Archive(err.to_string())
    }
}
