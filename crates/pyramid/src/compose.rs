//! Tile compositors: datatype-preserving analytic tiles and RGBA visual
//! tiles with a coverage-mask alpha.

use serde::{Deserialize, Serialize};

use tms_common::{BandBuf, SampleType, TmsError, TmsResult};

use crate::png::encode_rgba;

/// A tile that preserves the source samples exactly, one buffer per band.
///
/// `origin` is the world coordinate of the tile's top-left corner and
/// `pixel_scale` the ground units per pixel, both in the scheme CRS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticTile {
    pub size: u32,
    pub sample_type: SampleType,
    pub bands: Vec<BandBuf>,
    pub nodata: f64,
    pub origin: (f64, f64),
    pub pixel_scale: f64,
}

impl AnalyticTile {
    /// Approximate heap footprint, used for cache accounting.
    pub fn byte_size(&self) -> usize {
        self.bands
            .iter()
            .map(|b| b.len() * b.sample_type().byte_size())
            .sum()
    }

    /// Renders the tile to an RGBA PNG for serving.
    ///
    /// The first three bands become R, G, B (a single band is replicated
    /// to gray); values convert to u8 with saturation. Alpha is 0 where
    /// the three channel samples sum to 3x the nodata value, 255
    /// elsewhere.
    pub fn render_png(&self) -> TmsResult<Vec<u8>> {
        let first = self
            .bands
            .first()
            .ok_or_else(|| TmsError::Encoding("analytic tile has no bands".to_string()))?;
        let r = first;
        let g = self.bands.get(1).unwrap_or(first);
        let b = self.bands.get(2).unwrap_or(first);

        let pixels = self.size as usize * self.size as usize;
        let empty_sum = 3.0 * self.nodata;
        let (ru, gu, bu) = (r.to_u8_lossy(), g.to_u8_lossy(), b.to_u8_lossy());

        let mut rgba = Vec::with_capacity(pixels * 4);
        for i in 0..pixels {
            let covered = r.get_f64(i) + g.get_f64(i) + b.get_f64(i) != empty_sum;
            rgba.push(ru[i]);
            rgba.push(gu[i]);
            rgba.push(bu[i]);
            rgba.push(if covered { 255 } else { 0 });
        }
        encode_rgba(&rgba, self.size as usize, self.size as usize)
    }
}

/// A pre-rendered RGBA PNG tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualTile(pub Vec<u8>);

impl VisualTile {
    pub fn byte_size(&self) -> usize {
        self.0.len()
    }
}

/// Either payload kind, as produced by the driver and held by stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TilePayload {
    Analytic(AnalyticTile),
    Visual(VisualTile),
}

impl TilePayload {
    pub fn byte_size(&self) -> usize {
        match self {
            TilePayload::Analytic(t) => t.byte_size(),
            TilePayload::Visual(t) => t.byte_size(),
        }
    }
}

/// Composites resampled bands into a visual PNG tile.
///
/// `band_indices` select the R, G, B source bands; any index past the
/// available bands is fatal ([`TmsError::InsufficientBands`]), extra
/// bands are ignored. Per pixel, alpha is 255 iff the three u8 channels
/// sum to a nonzero value, giving a coverage mask with no intermediate
/// alpha levels.
pub fn compose_visual(
    bands: &[BandBuf],
    band_indices: [usize; 3],
    size: u32,
) -> TmsResult<VisualTile> {
    let select = |i: usize| -> TmsResult<Vec<u8>> {
        bands
            .get(i)
            .map(BandBuf::to_u8_lossy)
            .ok_or(TmsError::InsufficientBands(bands.len()))
    };
    let r = select(band_indices[0])?;
    let g = select(band_indices[1])?;
    let b = select(band_indices[2])?;

    let pixels = size as usize * size as usize;
    let mut rgba = Vec::with_capacity(pixels * 4);
    for i in 0..pixels {
        let sum = u16::from(r[i]) + u16::from(g[i]) + u16::from(b[i]);
        rgba.push(r[i]);
        rgba.push(g[i]);
        rgba.push(b[i]);
        rgba.push(if sum > 0 { 255 } else { 0 });
    }

    Ok(VisualTile(encode_rgba(&rgba, size as usize, size as usize)?))
}
