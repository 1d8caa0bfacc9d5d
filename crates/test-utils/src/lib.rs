//! Shared test utilities for the raster-tms workspace.
//!
//! Synthetic raster generators and on-disk GeoTIFF fixtures with
//! predictable, verifiable data patterns.
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;
