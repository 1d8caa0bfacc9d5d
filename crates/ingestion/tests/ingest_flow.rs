//! End-to-end ingestion runs against the in-memory store.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use geotiff_parser::{write_geotiff, write_u64_geotiff, GeoTransform, SourceRaster};
use ingestion::{IngestError, IngestRequest, Ingestor};
use storage::{MemoryTileStore, TileStore};
use tms_common::{
    BandBuf, LayerId, LayerKind, LayerRecord, SampleType, TileIndex, TmsError, WEB_MERCATOR,
};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// A 3-band u8 mercator raster spanning exactly two tile-spans at z2,
/// aligned on tile boundaries: columns 1..=3 and rows 1..=3 are covered
/// once boundary tiles are pulled in.
fn two_span_rgb_raster() -> SourceRaster {
    let scheme = WEB_MERCATOR;
    let span = scheme.tile_span(2);
    let half = scheme.world_size / 2.0;
    let size = 64u32;
    let step = 2.0 * span / f64::from(size);

    let samples = (size * size) as usize;
    SourceRaster::new(
        size,
        size,
        3857,
        GeoTransform::new(-half + span, half - span, step, -step),
        SampleType::U8,
        vec![
            BandBuf::filled(SampleType::U8, samples, 180.0),
            BandBuf::filled(SampleType::U8, samples, 90.0),
            BandBuf::filled(SampleType::U8, samples, 45.0),
        ],
        Some(0.0),
    )
    .unwrap()
}

fn visual_record(name: &str) -> LayerRecord {
    LayerRecord::new(LayerId::new(name), name, LayerKind::Visual).with_zoom_range(2, 2)
}

fn ingestor(store: &Arc<MemoryTileStore>, scratch: &Path) -> Ingestor {
    Ingestor::new(
        Arc::clone(store) as Arc<dyn TileStore>,
        WEB_MERCATOR,
        scratch.to_path_buf(),
    )
}

#[test]
fn boundary_aligned_visual_ingest_produces_nine_tiles() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("imagery.tif");
    write_geotiff(&tif, &two_span_rgb_raster()).unwrap();

    let store = Arc::new(MemoryTileStore::new());
    let layer = LayerId::new("imagery");
    let report = ingestor(&store, dir.path())
        .ingest(&IngestRequest {
            layer: visual_record("imagery"),
            source: tif,
        })
        .unwrap();

    // The covering index rectangle at z2 is 3x3.
    assert_eq!(report.total_tiles(), 9);
    assert_eq!(store.tile_count(&layer), 9);

    let record = store.layer(&layer).unwrap();
    assert!(record.available);
    assert!(!record.coverage.is_empty());

    for x in 1..=3u32 {
        for y in 1..=3u32 {
            let tile = store
                .get_tile(&layer, TileIndex::new(2, x, y))
                .unwrap_or_else(|| panic!("tile 2/{x}/{y} missing"));
            match tile {
                pyramid::TilePayload::Visual(png) => {
                    assert_eq!(&png.0[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
                }
                other => panic!("visual layer stored {other:?}"),
            }
        }
    }
}

#[test]
fn unsupported_member_aborts_but_keeps_sibling_tiles() {
    let dir = tempfile::tempdir().unwrap();

    // Member 1: a valid u8 raster. Member 2: structurally a fine TIFF,
    // but uint64 samples.
    let good = dir.path().join("good.tif");
    write_geotiff(&good, &two_span_rgb_raster()).unwrap();

    let transform = two_span_rgb_raster().transform;
    let bad = dir.path().join("wide.tif");
    write_u64_geotiff(&bad, 4, 4, 3857, &transform, &[7; 16]).unwrap();

    let zip_path = dir.path().join("batch.zip");
    let mut writer = ZipWriter::new(File::create(&zip_path).unwrap());
    for (name, src) in [("a_good.tif", &good), ("b_wide.tif", &bad)] {
        writer
            .start_file(name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(&std::fs::read(src).unwrap()).unwrap();
    }
    writer.finish().unwrap();

    let store = Arc::new(MemoryTileStore::new());
    let layer = LayerId::new("batch");
    let result = ingestor(&store, dir.path()).ingest(&IngestRequest {
        layer: visual_record("batch"),
        source: zip_path,
    });

    // Validation passed (both members open as TIFFs); the run fails at
    // the second member's decode.
    match result {
        Err(IngestError::Pipeline(TmsError::UnsupportedSampleType(_))) => {}
        other => panic!("expected UnsupportedSampleType, got {other:?}"),
    }

    // Member 1's tiles persist; the layer never becomes available.
    assert_eq!(store.tile_count(&layer), 9);
    let record = store.layer(&layer).unwrap();
    assert!(!record.available);
    assert!(record.coverage.is_empty());
}

#[test]
fn reingestion_regenerates_the_layer() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("imagery.tif");
    write_geotiff(&tif, &two_span_rgb_raster()).unwrap();

    let store = Arc::new(MemoryTileStore::new());
    let layer = LayerId::new("imagery");
    let ing = ingestor(&store, dir.path());

    ing.ingest(&IngestRequest {
        layer: visual_record("imagery"),
        source: tif.clone(),
    })
    .unwrap();
    assert_eq!(store.tile_count(&layer), 9);

    // Same id resubmitted with a narrower zoom range: the old record
    // and its tiles are dropped, not merged.
    let narrower =
        LayerRecord::new(layer.clone(), "imagery", LayerKind::Visual).with_zoom_range(1, 1);
    let report = ing
        .ingest(&IngestRequest {
            layer: narrower,
            source: tif,
        })
        .unwrap();

    assert_eq!(report.total_tiles(), 4);
    assert_eq!(store.tile_count(&layer), 4);
    let record = store.layer(&layer).unwrap();
    assert!(record.available);
    assert_eq!(record.min_zoom, 1);
    assert!(store.get_tile(&layer, TileIndex::new(2, 1, 1)).is_none());
}

#[test]
fn rejection_removes_the_layer_record() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("data.csv");
    std::fs::write(&source, "x,y\n1,2\n").unwrap();

    let store = Arc::new(MemoryTileStore::new());
    let layer = LayerId::new("csv");
    let result = ingestor(&store, dir.path()).ingest(&IngestRequest {
        layer: visual_record("csv"),
        source,
    });

    assert!(matches!(result, Err(IngestError::Rejected(_))));
    assert!(store.layer(&layer).is_none());
    assert_eq!(store.tile_count(&layer), 0);
}

#[test]
fn analytic_ingest_preserves_sample_type() {
    let dir = tempfile::tempdir().unwrap();
    let scheme = WEB_MERCATOR;
    let half = scheme.world_size / 2.0;
    let size = 32u32;
    let step = scheme.tile_span(1) / f64::from(size);

    // Single-band int16 raster inside tile (1, 0, 1).
    let raster = SourceRaster::new(
        size,
        size,
        3857,
        GeoTransform::new(
            -half + scheme.tile_span(1) * 0.25,
            half - scheme.tile_span(1) * 0.25,
            step,
            -step,
        ),
        SampleType::I16,
        vec![BandBuf::filled(SampleType::I16, (size * size) as usize, -42.0)],
        Some(-9999.0),
    )
    .unwrap();
    let tif = dir.path().join("dem.tif");
    write_geotiff(&tif, &raster).unwrap();

    let store = Arc::new(MemoryTileStore::new());
    let layer = LayerId::new("dem");
    let record = LayerRecord::new(layer.clone(), "dem", LayerKind::Analytic).with_zoom_range(0, 1);
    ingestor(&store, dir.path())
        .ingest(&IngestRequest {
            layer: record,
            source: tif,
        })
        .unwrap();

    let tile = store.get_tile(&layer, TileIndex::new(0, 0, 0)).unwrap();
    match tile {
        pyramid::TilePayload::Analytic(t) => {
            assert_eq!(t.sample_type, SampleType::I16);
            assert_eq!(t.nodata, -9999.0);
            assert_eq!(t.bands.len(), 1);
        }
        other => panic!("analytic layer stored {other:?}"),
    }
}
