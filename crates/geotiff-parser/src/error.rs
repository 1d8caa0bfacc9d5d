//! Error types for GeoTIFF parsing.

use thiserror::Error;
use tms_common::TmsError;

/// Result type for GeoTIFF operations.
pub type GeoTiffResult<T> = Result<T, GeoTiffError>;

/// Error types for GeoTIFF reading and writing.
#[derive(Error, Debug)]
pub enum GeoTiffError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF structure could not be decoded
    #[error("TIFF decode error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Missing or malformed georeferencing tags
    #[error("missing georeferencing: {0}")]
    MissingGeoreferencing(String),

    /// Sample type outside the supported set
    #[error("unsupported sample type: {0}")]
    UnsupportedSampleType(String),

    /// Color layout the pipeline cannot consume
    #[error("unsupported color layout: {0}")]
    UnsupportedLayout(String),

    /// Invalid raster shape or band data
    #[error("invalid raster: {0}")]
    InvalidRaster(String),
}

impl From<GeoTiffError> for TmsError {
    fn from(err: GeoTiffError) -> Self {
        match err {
            GeoTiffError::UnsupportedSampleType(s) => TmsError::UnsupportedSampleType(s),
            other => TmsError::InvalidSource(other.to_string()),
        }
    }
}
