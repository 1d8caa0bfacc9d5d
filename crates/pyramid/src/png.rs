//! Minimal RGBA PNG encoding (color type 6).
//!
//! Hand-rolled writer: zlib-compressed IDAT via flate2, chunk CRCs via
//! crc32fast, filter type 0 on every scanline. Tiles are small and served
//! once-compressed, so no palette or filter heuristics.

use std::io::Write;

use tms_common::{TmsError, TmsResult};

/// Encodes RGBA pixel data (4 bytes per pixel, row-major) into a PNG.
pub fn encode_rgba(pixels: &[u8], width: usize, height: usize) -> TmsResult<Vec<u8>> {
    if pixels.len() != width * height * 4 {
        return Err(TmsError::Encoding(format!(
            "expected {} RGBA bytes for {width}x{height}, got {}",
            width * height * 4,
            pixels.len()
        )));
    }

    let mut png = Vec::new();

    // PNG signature
    png.extend_from_slice(&[137, 80, 78, 71, 13, 10, 26, 10]);

    // IHDR chunk
    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(6); // color type: RGBA
    ihdr.push(0); // compression method
    ihdr.push(0); // filter method
    ihdr.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr);

    // IDAT chunk
    let idat = deflate_idat(pixels, width, height)
        .map_err(|e| TmsError::Encoding(format!("IDAT compression failed: {e}")))?;
    write_chunk(&mut png, b"IDAT", &idat);

    // IEND chunk
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

fn deflate_idat(pixels: &[u8], width: usize, height: usize) -> std::io::Result<Vec<u8>> {
    // Filter byte 0 (no filter) prefixes each scanline.
    let mut raw = Vec::with_capacity(height * (1 + width * 4));
    for y in 0..height {
        raw.push(0);
        let start = y * width * 4;
        raw.extend_from_slice(&pixels[start..start + width * 4]);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&raw)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_structure() {
        let pixels = [255u8, 0, 0, 255, 0, 255, 0, 128];
        let png = encode_rgba(&pixels, 2, 1).unwrap();

        assert_eq!(&png[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
        assert_eq!(&png[12..16], b"IHDR");
        assert_eq!(&png[16..20], 2u32.to_be_bytes()); // width
        assert_eq!(&png[20..24], 1u32.to_be_bytes()); // height
        assert_eq!(png[25], 6); // RGBA color type
        assert_eq!(&png[png.len() - 8..png.len() - 4], b"IEND");
    }

    #[test]
    fn test_length_mismatch_is_error() {
        assert!(matches!(
            encode_rgba(&[0u8; 7], 2, 1),
            Err(TmsError::Encoding(_))
        ));
    }
}
