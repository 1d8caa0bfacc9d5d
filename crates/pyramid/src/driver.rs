//! The pyramid driver: walks a zoom range over a reprojected raster and
//! pushes composited tiles into a caller-supplied sink.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use geotiff_parser::{GeoTransform, SourceRaster};
use tms_common::{
    LayerKind, Polygon, TileIndex, TilingScheme, TmsError, TmsResult,
};

use crate::compose::{compose_visual, AnalyticTile, TilePayload};
use crate::projection::CoordTransformer;
use crate::resample::{apply_mapping, build_mapping};

/// Per-layer rendering knobs carried from the layer record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Band whose nodata value masks analytic tiles. The stored nodata is
    /// file-level, so this mostly guards band count; it exists so the
    /// band-0 convention is configuration, not an unstated assumption.
    pub nodata_band_index: usize,
    /// R, G, B source bands for visual compositing.
    pub visual_band_indices: [usize; 3],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            nodata_band_index: 0,
            visual_band_indices: [0, 1, 2],
        }
    }
}

/// Summary of one pyramid run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PyramidReport {
    /// (zoom, tiles emitted) per processed zoom, ascending.
    pub zoom_counts: Vec<(u32, u64)>,
    pub total_tiles: u64,
    /// Wall-clock seconds; diagnostic only.
    pub elapsed_secs: f64,
    /// Source bounds ring in the scheme CRS.
    pub footprint: Polygon,
}

/// Generates the tile pyramid for one raster.
///
/// The raster must already be in the scheme CRS. Zooms run ascending; at
/// each zoom the covering index rectangle is partitioned into
/// single-tile quadrants (x-major) and every tile is resampled,
/// composited per the layer kind and handed to `sink` synchronously.
/// Sink errors abort the run and propagate untouched. Only one tile's
/// buffers are live at a time.
pub fn generate_pyramid<F>(
    src: &SourceRaster,
    scheme: &TilingScheme,
    kind: LayerKind,
    config: &RenderConfig,
    min_zoom: u32,
    max_zoom: u32,
    mut sink: F,
) -> TmsResult<PyramidReport>
where
    F: FnMut(TileIndex, TilePayload) -> TmsResult<()>,
{
    if src.srid != scheme.srid {
        return Err(TmsError::Projection(format!(
            "raster is EPSG:{} but the scheme is EPSG:{}; reproject first",
            src.srid, scheme.srid
        )));
    }
    if min_zoom > max_zoom {
        return Err(TmsError::Internal(format!(
            "zoom range inverted: {min_zoom} > {max_zoom}"
        )));
    }
    if config.nodata_band_index >= src.band_count() {
        return Err(TmsError::InvalidSource(format!(
            "nodata band {} out of range for {} bands",
            config.nodata_band_index,
            src.band_count()
        )));
    }
    if kind == LayerKind::Visual {
        let needed = config.visual_band_indices.iter().max().copied().unwrap_or(0);
        if needed >= src.band_count() {
            return Err(TmsError::InsufficientBands(src.band_count()));
        }
    }

    let started = Instant::now();
    let bounds = src.bounds();
    let nodata = src.nodata.unwrap_or(0.0);
    // Same-CRS by the check above, so this is the identity fast path.
    let to_source = CoordTransformer::new(scheme.srid, src.srid)?;

    let mut zoom_counts = Vec::with_capacity((max_zoom - min_zoom + 1) as usize);
    let mut total_tiles = 0u64;

    for zoom in min_zoom..=max_zoom {
        let pixel_size = scheme.pixel_size(zoom);
        let mut count = 0u64;

        for quadrant in scheme.make_quadrants(&bounds, zoom, 1) {
            let (x, y) = (quadrant.x0, quadrant.y0);
            let tile_bbox = scheme.tile_world_bbox(x, y, zoom);
            let dst_transform =
                GeoTransform::new(tile_bbox.min_x, tile_bbox.max_y, pixel_size, -pixel_size);

            let mapping = build_mapping(
                scheme.tile_size,
                scheme.tile_size,
                &dst_transform,
                &to_source,
                src.width,
                src.height,
                &src.transform,
            );

            let payload = match kind {
                LayerKind::Analytic => {
                    let bands = src
                        .bands
                        .iter()
                        .map(|band| apply_mapping(band, &mapping, nodata))
                        .collect();
                    TilePayload::Analytic(AnalyticTile {
                        size: scheme.tile_size,
                        sample_type: src.sample_type,
                        bands,
                        nodata,
                        origin: (tile_bbox.min_x, tile_bbox.max_y),
                        pixel_scale: pixel_size,
                    })
                }
                LayerKind::Visual => {
                    let bands: Vec<_> = config
                        .visual_band_indices
                        .iter()
                        .map(|&i| apply_mapping(&src.bands[i], &mapping, nodata))
                        .collect();
                    TilePayload::Visual(compose_visual(&bands, [0, 1, 2], scheme.tile_size)?)
                }
            };

            sink(TileIndex::new(zoom, x, y), payload)?;
            count += 1;
        }

        debug!(zoom, tiles = count, "zoom level tiled");
        zoom_counts.push((zoom, count));
        total_tiles += count;
    }

    let elapsed_secs = started.elapsed().as_secs_f64();
    info!(total_tiles, elapsed_secs, "pyramid complete");

    Ok(PyramidReport {
        zoom_counts,
        total_tiles,
        elapsed_secs,
        footprint: Polygon::from_bbox(&bounds, scheme.srid),
    })
}
