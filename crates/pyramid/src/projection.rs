//! Coordinate transforms between EPSG coordinate systems and whole-raster
//! reprojection into the scheme CRS.
//!
//! Transforms run through proj4rs with proj strings resolved from the
//! crs-definitions database, so any EPSG code in that database works
//! without a system PROJ installation.

use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use tracing::debug;

use geotiff_parser::{GeoTransform, SourceRaster};
use tms_common::{BoundingBox, TmsError, TmsResult};

use crate::resample::{apply_mapping, build_mapping};

/// Points sampled per bbox edge when deriving reprojected bounds. Edge
/// densification catches the bowing that straight corners miss in curved
/// projections.
const EDGE_SAMPLES: usize = 21;

/// A reusable point transform between two EPSG coordinate systems.
pub struct CoordTransformer {
    source: Proj,
    target: Proj,
    source_geographic: bool,
    target_geographic: bool,
    identity: bool,
}

impl CoordTransformer {
    /// Builds a transformer; unknown EPSG codes are a fatal
    /// [`TmsError::Projection`].
    pub fn new(source_epsg: u32, target_epsg: u32) -> TmsResult<Self> {
        let source_str = proj_string(source_epsg)?;
        let target_str = proj_string(target_epsg)?;

        let source = Proj::from_proj_string(source_str)
            .map_err(|e| TmsError::Projection(format!("EPSG:{source_epsg}: {e:?}")))?;
        let target = Proj::from_proj_string(target_str)
            .map_err(|e| TmsError::Projection(format!("EPSG:{target_epsg}: {e:?}")))?;

        Ok(Self {
            source,
            target,
            source_geographic: source_str.contains("+proj=longlat"),
            target_geographic: target_str.contains("+proj=longlat"),
            identity: source_epsg == target_epsg,
        })
    }

    /// Transforms one point. proj4rs works in radians for geographic
    /// coordinate systems; degree conversion happens here so callers only
    /// ever see conventional units.
    pub fn transform(&self, x: f64, y: f64) -> TmsResult<(f64, f64)> {
        if self.identity {
            return Ok((x, y));
        }

        let (x_in, y_in) = if self.source_geographic {
            (x.to_radians(), y.to_radians())
        } else {
            (x, y)
        };

        let mut point = (x_in, y_in, 0.0);
        transform(&self.source, &self.target, &mut point)
            .map_err(|e| TmsError::Projection(format!("{e:?}")))?;

        if self.target_geographic {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }

    /// Projects a bbox by sampling [`EDGE_SAMPLES`] points along each edge
    /// and taking the envelope of the points that transform. Fails only
    /// when no edge point transforms at all.
    pub fn transform_bounds(&self, bbox: &BoundingBox) -> TmsResult<BoundingBox> {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        let mut hits = 0usize;

        let steps = (EDGE_SAMPLES - 1) as f64;
        for i in 0..EDGE_SAMPLES {
            let t = i as f64 / steps;
            let x = bbox.min_x + t * bbox.width();
            let y = bbox.min_y + t * bbox.height();
            for (px, py) in [
                (x, bbox.min_y),
                (x, bbox.max_y),
                (bbox.min_x, y),
                (bbox.max_x, y),
            ] {
                if let Ok((tx, ty)) = self.transform(px, py) {
                    if tx.is_finite() && ty.is_finite() {
                        min_x = min_x.min(tx);
                        min_y = min_y.min(ty);
                        max_x = max_x.max(tx);
                        max_y = max_y.max(ty);
                        hits += 1;
                    }
                }
            }
        }

        if hits == 0 {
            return Err(TmsError::Projection(
                "no boundary point transformed to the target system".to_string(),
            ));
        }
        Ok(BoundingBox::new(min_x, min_y, max_x, max_y))
    }
}

fn proj_string(epsg: u32) -> TmsResult<&'static str> {
    u16::try_from(epsg)
        .ok()
        .and_then(crs_definitions::from_code)
        .map(|def| def.proj4)
        .ok_or_else(|| {
            TmsError::Projection(format!("EPSG:{epsg} is not in the crs-definitions database"))
        })
}

/// Reprojects a whole raster into `dst_epsg`. Same-CRS input is returned
/// unchanged.
///
/// The destination keeps the source pixel counts; its bounds come from
/// densified edge sampling and each band is resampled nearest-neighbor
/// with nodata fill. Runs once per source file, before any tiling.
pub fn reproject_raster(src: &SourceRaster, dst_epsg: u32) -> TmsResult<SourceRaster> {
    if src.srid == dst_epsg {
        return Ok(src.clone());
    }

    let forward = CoordTransformer::new(src.srid, dst_epsg)?;
    let inverse = CoordTransformer::new(dst_epsg, src.srid)?;

    let dst_bounds = forward.transform_bounds(&src.bounds())?;
    let dst_transform = GeoTransform::new(
        dst_bounds.min_x,
        dst_bounds.max_y,
        dst_bounds.width() / f64::from(src.width),
        -(dst_bounds.height() / f64::from(src.height)),
    );

    let fill = src.nodata.unwrap_or(0.0);
    let mapping = build_mapping(
        src.width,
        src.height,
        &dst_transform,
        &inverse,
        src.width,
        src.height,
        &src.transform,
    );
    let bands = src
        .bands
        .iter()
        .map(|band| apply_mapping(band, &mapping, fill))
        .collect();

    debug!(
        from = src.srid,
        to = dst_epsg,
        width = src.width,
        height = src.height,
        "reprojected raster"
    );

    SourceRaster::new(
        src.width,
        src.height,
        dst_epsg,
        dst_transform,
        src.sample_type,
        bands,
        src.nodata,
    )
    .map_err(TmsError::from)
}
