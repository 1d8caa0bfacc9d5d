//! Raster ingestion: source validation, zip extraction, and the
//! orchestrator that drives a file from upload to a served tile pyramid.

pub mod error;
pub mod orchestrator;
pub mod validate;

pub use error::{IngestError, IngestResult};
pub use orchestrator::{IngestReport, IngestRequest, IngestState, Ingestor};
pub use validate::{is_tif, is_zip, resolve_sources};
