//! Sample datatypes and per-band pixel buffers.
//!
//! Tile payloads preserve the source datatype exactly, so the supported
//! types form a closed enumeration with stable integer tags used by the
//! tile encoding. Anything outside it is rejected at ingestion time.

use crate::error::TmsError;
use serde::{Deserialize, Serialize};

/// The closed set of supported sample datatypes.
///
/// Tag values are part of the stored tile format; do not renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    U8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl SampleType {
    /// Stable integer tag for payload encoding.
    pub fn tag(&self) -> u8 {
        match self {
            SampleType::U8 => 1,
            SampleType::U16 => 2,
            SampleType::I16 => 3,
            SampleType::U32 => 4,
            SampleType::I32 => 5,
            SampleType::F32 => 6,
            SampleType::F64 => 7,
        }
    }

    /// Decode an integer tag back to a sample type.
    pub fn from_tag(tag: u8) -> Result<Self, TmsError> {
        match tag {
            1 => Ok(SampleType::U8),
            2 => Ok(SampleType::U16),
            3 => Ok(SampleType::I16),
            4 => Ok(SampleType::U32),
            5 => Ok(SampleType::I32),
            6 => Ok(SampleType::F32),
            7 => Ok(SampleType::F64),
            other => Err(TmsError::UnsupportedSampleType(format!("tag {other}"))),
        }
    }

    /// Bytes per sample.
    pub fn byte_size(&self) -> usize {
        match self {
            SampleType::U8 => 1,
            SampleType::U16 | SampleType::I16 => 2,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 4,
            SampleType::F64 => 8,
        }
    }

    /// All supported types, in tag order.
    pub fn all() -> [SampleType; 7] {
        [
            SampleType::U8,
            SampleType::U16,
            SampleType::I16,
            SampleType::U32,
            SampleType::I32,
            SampleType::F32,
            SampleType::F64,
        ]
    }
}

impl std::fmt::Display for SampleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SampleType::U8 => "uint8",
            SampleType::U16 => "uint16",
            SampleType::I16 => "int16",
            SampleType::U32 => "uint32",
            SampleType::I32 => "int32",
            SampleType::F32 => "float32",
            SampleType::F64 => "float64",
        };
        write!(f, "{name}")
    }
}

/// One band's samples in row-major order, tagged by datatype.
///
/// Resampling a `BandBuf` always yields the same variant; the variant and
/// the band's [`SampleType`] stay in lockstep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BandBuf {
    U8(Vec<u8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl BandBuf {
    /// The sample type of this buffer.
    pub fn sample_type(&self) -> SampleType {
        match self {
            BandBuf::U8(_) => SampleType::U8,
            BandBuf::U16(_) => SampleType::U16,
            BandBuf::I16(_) => SampleType::I16,
            BandBuf::U32(_) => SampleType::U32,
            BandBuf::I32(_) => SampleType::I32,
            BandBuf::F32(_) => SampleType::F32,
            BandBuf::F64(_) => SampleType::F64,
        }
    }

    /// Number of samples in the buffer.
    pub fn len(&self) -> usize {
        match self {
            BandBuf::U8(v) => v.len(),
            BandBuf::U16(v) => v.len(),
            BandBuf::I16(v) => v.len(),
            BandBuf::U32(v) => v.len(),
            BandBuf::I32(v) => v.len(),
            BandBuf::F32(v) => v.len(),
            BandBuf::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A buffer of `len` samples, all set to `fill`, of the given type.
    ///
    /// The fill value is cast into the target type the way the sample
    /// arithmetic does everywhere else (saturating `as` casts).
    pub fn filled(sample_type: SampleType, len: usize, fill: f64) -> Self {
        match sample_type {
            SampleType::U8 => BandBuf::U8(vec![fill as u8; len]),
            SampleType::U16 => BandBuf::U16(vec![fill as u16; len]),
            SampleType::I16 => BandBuf::I16(vec![fill as i16; len]),
            SampleType::U32 => BandBuf::U32(vec![fill as u32; len]),
            SampleType::I32 => BandBuf::I32(vec![fill as i32; len]),
            SampleType::F32 => BandBuf::F32(vec![fill as f32; len]),
            SampleType::F64 => BandBuf::F64(vec![fill; len]),
        }
    }

    /// Sample at `index` converted to f64, for datatype-independent reads
    /// (alpha masks, nodata comparisons).
    pub fn get_f64(&self, index: usize) -> f64 {
        match self {
            BandBuf::U8(v) => f64::from(v[index]),
            BandBuf::U16(v) => f64::from(v[index]),
            BandBuf::I16(v) => f64::from(v[index]),
            BandBuf::U32(v) => f64::from(v[index]),
            BandBuf::I32(v) => f64::from(v[index]),
            BandBuf::F32(v) => f64::from(v[index]),
            BandBuf::F64(v) => v[index],
        }
    }

    /// The whole band converted to u8 with saturation, for visual
    /// compositing.
    pub fn to_u8_lossy(&self) -> Vec<u8> {
        match self {
            BandBuf::U8(v) => v.clone(),
            BandBuf::U16(v) => v.iter().map(|&s| s.min(255) as u8).collect(),
            BandBuf::I16(v) => v.iter().map(|&s| s.clamp(0, 255) as u8).collect(),
            BandBuf::U32(v) => v.iter().map(|&s| s.min(255) as u8).collect(),
            BandBuf::I32(v) => v.iter().map(|&s| s.clamp(0, 255) as u8).collect(),
            BandBuf::F32(v) => v.iter().map(|&s| s.clamp(0.0, 255.0) as u8).collect(),
            BandBuf::F64(v) => v.iter().map(|&s| s.clamp(0.0, 255.0) as u8).collect(),
        }
    }
}
