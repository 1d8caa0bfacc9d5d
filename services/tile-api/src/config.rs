//! Service configuration.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "tile-api")]
#[command(about = "TMS raster tile pyramid server")]
pub struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "TILE_API_LISTEN")]
    pub listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "TILE_API_LOG_LEVEL")]
    pub log_level: String,

    /// Tile cache budget in megabytes
    #[arg(long, default_value_t = 256, env = "TILE_API_CACHE_MB")]
    pub cache_mb: u64,

    /// Scratch directory for archive extraction
    #[arg(long, default_value = "/tmp/tile-api", env = "TILE_API_SCRATCH_DIR")]
    pub scratch_dir: PathBuf,

    /// Default minimum zoom for submitted layers
    #[arg(long, default_value_t = 0, env = "TILE_API_MIN_ZOOM")]
    pub default_min_zoom: u32,

    /// Default maximum zoom for submitted layers
    #[arg(long, default_value_t = 6, env = "TILE_API_MAX_ZOOM")]
    pub default_max_zoom: u32,
}
