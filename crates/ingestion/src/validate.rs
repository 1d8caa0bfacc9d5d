//! Source validation and archive extraction.
//!
//! Validation is deliberately shallow: a source passes if it is a `.tif`
//! (or a `.zip` of `.tif`s) that opens as a TIFF with nonzero dimensions.
//! Sample-type and georeferencing problems only surface later, at the
//! full decode, so a structurally valid file with unsupported contents is
//! accepted here and fails during tiling.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use zip::ZipArchive;

use geotiff_parser::probe_geotiff;

use crate::error::{IngestError, IngestResult};

pub fn is_tif(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tif"))
}

pub fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
}

/// Resolves a submitted path into the list of raster files to ingest.
///
/// A `.tif` resolves to itself; a `.zip` is extracted into `scratch` and
/// every member becomes an independent source. Each resolved file is
/// probed; any unreadable file rejects the whole submission.
pub fn resolve_sources(path: &Path, scratch: &Path) -> IngestResult<Vec<PathBuf>> {
    let sources = if is_tif(path) {
        vec![path.to_path_buf()]
    } else if is_zip(path) {
        extract_archive(path, scratch)?
    } else {
        return Err(IngestError::Rejected(format!(
            "unsupported source extension: {}",
            path.display()
        )));
    };

    if sources.is_empty() {
        return Err(IngestError::Rejected(format!(
            "archive contains no .tif members: {}",
            path.display()
        )));
    }

    for source in &sources {
        let probe = probe_geotiff(source).map_err(|e| {
            warn!(source = %source.display(), %e, "source failed validation");
            IngestError::Rejected(format!("{} is not a readable raster: {e}", source.display()))
        })?;
        info!(
            source = %source.display(),
            width = probe.width,
            height = probe.height,
            "source validated"
        );
    }

    Ok(sources)
}

/// Extracts every file member of the archive into `scratch`, preserving
/// member order. Non-`.tif` members reject the submission.
fn extract_archive(path: &Path, scratch: &Path) -> IngestResult<Vec<PathBuf>> {
    std::fs::create_dir_all(scratch)?;
    let mut archive = ZipArchive::new(File::open(path)?)?;

    let mut extracted = Vec::new();
    for i in 0..archive.len() {
        let mut member = archive.by_index(i)?;
        if member.is_dir() {
            continue;
        }

        let member_path = member.mangled_name();
        let Some(file_name) = member_path.file_name() else {
            continue;
        };
        let out_path = scratch.join(file_name);
        if !is_tif(&out_path) {
            return Err(IngestError::Rejected(format!(
                "archive member is not a .tif: {}",
                member_path.display()
            )));
        }

        let mut out = File::create(&out_path)?;
        io::copy(&mut member, &mut out)?;
        extracted.push(out_path);
    }

    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotiff_parser::{write_geotiff, GeoTransform, SourceRaster};
    use std::io::Write;
    use tms_common::{BandBuf, SampleType};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn tiny_raster() -> SourceRaster {
        SourceRaster::new(
            2,
            2,
            3857,
            GeoTransform::new(0.0, 200.0, 100.0, -100.0),
            SampleType::U8,
            vec![BandBuf::U8(vec![1, 2, 3, 4])],
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_extension_checks() {
        assert!(is_tif(Path::new("/data/a.tif")));
        assert!(is_tif(Path::new("/data/a.TIF")));
        assert!(!is_tif(Path::new("/data/a.tiff")));
        assert!(is_zip(Path::new("/data/batch.zip")));
        assert!(!is_zip(Path::new("/data/batch.tar.gz")));
    }

    #[test]
    fn test_single_tif_resolves_to_itself() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.tif");
        write_geotiff(&path, &tiny_raster()).unwrap();

        let sources = resolve_sources(&path, dir.path()).unwrap();
        assert_eq!(sources, vec![path]);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();
        assert!(matches!(
            resolve_sources(&path, dir.path()),
            Err(IngestError::Rejected(_))
        ));
    }

    #[test]
    fn test_unreadable_tif_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.tif");
        std::fs::write(&path, "not a tiff at all").unwrap();
        assert!(matches!(
            resolve_sources(&path, dir.path()),
            Err(IngestError::Rejected(_))
        ));
    }

    #[test]
    fn test_zip_members_extracted_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let tif_a = dir.path().join("a.tif");
        let tif_b = dir.path().join("b.tif");
        write_geotiff(&tif_a, &tiny_raster()).unwrap();
        write_geotiff(&tif_b, &tiny_raster()).unwrap();

        let zip_path = dir.path().join("pair.zip");
        let mut writer = ZipWriter::new(File::create(&zip_path).unwrap());
        for (name, src) in [("a.tif", &tif_a), ("b.tif", &tif_b)] {
            writer
                .start_file(name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(&std::fs::read(src).unwrap()).unwrap();
        }
        writer.finish().unwrap();

        let scratch = dir.path().join("scratch");
        let sources = resolve_sources(&zip_path, &scratch).unwrap();
        assert_eq!(sources.len(), 2);
        assert!(sources[0].ends_with("a.tif"));
        assert!(sources[1].ends_with("b.tif"));
        assert!(sources.iter().all(|p| p.exists()));
    }

    #[test]
    fn test_zip_with_non_tif_member_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("mixed.zip");
        let mut writer = ZipWriter::new(File::create(&zip_path).unwrap());
        writer
            .start_file("readme.md", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"# docs").unwrap();
        writer.finish().unwrap();

        let scratch = dir.path().join("scratch");
        assert!(matches!(
            resolve_sources(&zip_path, &scratch),
            Err(IngestError::Rejected(_))
        ));
    }
}
