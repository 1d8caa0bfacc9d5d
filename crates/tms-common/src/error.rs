//! Error taxonomy shared across the raster-tms workspace.

use thiserror::Error;

/// Result type alias using TmsError.
pub type TmsResult<T> = Result<T, TmsError>;

/// Primary error type for tiling and ingestion operations.
///
/// Per-band, per-tile resampling gaps are not represented here: they are
/// absorbed where they occur by leaving nodata in the destination. Only
/// conditions that abort an ingestion (or a lookup) surface as errors.
#[derive(Debug, Error)]
pub enum TmsError {
    // === Source errors ===
    #[error("invalid source: {0}")]
    InvalidSource(String),

    #[error("unsupported sample type: {0}")]
    UnsupportedSampleType(String),

    #[error("visual tile needs 3 bands, source has {0}")]
    InsufficientBands(usize),

    // === Projection errors ===
    #[error("projection error: {0}")]
    Projection(String),

    // === Encoding errors ===
    #[error("tile encoding failed: {0}")]
    Encoding(String),

    // === Storage errors ===
    #[error("layer not found: {0}")]
    LayerNotFound(String),

    #[error("storage error: {0}")]
    Storage(String),

    // === Infrastructure errors ===
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for TmsError {
    fn from(err: std::io::Error) -> Self {
        TmsError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for TmsError {
    fn from(err: serde_json::Error) -> Self {
        TmsError::Internal(format!("JSON error: {err}"))
    }
}
