//! The ingestion orchestrator.
//!
//! Drives one submission through
//! `Validating -> Reprojecting -> Tiling -> Aggregating -> Available`,
//! with `Rejected` the only terminal failure state reachable from
//! validation. Rejection removes the layer record and generates nothing.
//! Failures after validation leave the layer unavailable but keep any
//! tiles already written; sibling files of a multi-file archive are not
//! rolled back.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use geotiff_parser::open_geotiff;
use pyramid::{generate_pyramid, reproject_raster, PyramidReport, RenderConfig};
use storage::TileStore;
use tms_common::{LayerId, LayerRecord, MultiPolygon, TilingScheme};

use crate::error::{IngestError, IngestResult};
use crate::validate::resolve_sources;

/// Orchestrator phases, in order. Logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestState {
    Validating,
    Reprojecting,
    Tiling,
    Aggregating,
    Available,
    Rejected,
}

/// One ingestion submission: the layer to create and the file to ingest.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub layer: LayerRecord,
    pub source: PathBuf,
}

/// Outcome of a completed ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub layer: LayerId,
    pub files: Vec<PyramidReport>,
    /// Wall-clock seconds for the whole run; diagnostic only.
    pub elapsed_secs: f64,
}

impl IngestReport {
    pub fn total_tiles(&self) -> u64 {
        self.files.iter().map(|f| f.total_tiles).sum()
    }
}

/// Runs ingestions against a store, one scheme for its lifetime.
pub struct Ingestor {
    store: Arc<dyn TileStore>,
    scheme: TilingScheme,
    scratch_dir: PathBuf,
}

impl Ingestor {
    pub fn new(store: Arc<dyn TileStore>, scheme: TilingScheme, scratch_dir: PathBuf) -> Self {
        Self {
            store,
            scheme,
            scratch_dir,
        }
    }

    /// The `Validating` phase, run synchronously at submission time.
    ///
    /// Creates the layer record, then checks the source. Resubmitting an
    /// existing layer id is a regeneration: the old record and its tiles
    /// are dropped and the layer is rebuilt from scratch. On any failure
    /// the record is deleted again and the submission is `Rejected`; the
    /// caller observes acceptance (the resolved file list) or a
    /// descriptive rejection.
    pub fn validate(&self, request: &IngestRequest) -> IngestResult<Vec<PathBuf>> {
        let layer_id = request.layer.id.clone();
        transition(&layer_id, IngestState::Validating);

        if self.store.layer(&layer_id).is_some() {
            info!(layer = %layer_id, "regenerating existing layer");
            self.store.delete_layer(&layer_id)?;
        }
        self.store
            .create_layer(request.layer.clone())
            .map_err(|e| IngestError::Rejected(e.to_string()))?;

        let scratch = self.scratch_dir.join(layer_id.to_string());
        match resolve_sources(&request.source, &scratch) {
            Ok(sources) => Ok(sources),
            Err(err) => {
                transition(&layer_id, IngestState::Rejected);
                // Remove the partial record; nothing was generated.
                if let Err(delete_err) = self.store.delete_layer(&layer_id) {
                    warn!(layer = %layer_id, %delete_err, "rejected layer cleanup failed");
                }
                Err(match err {
                    IngestError::Rejected(msg) => IngestError::Rejected(msg),
                    other => IngestError::Rejected(other.to_string()),
                })
            }
        }
    }

    /// The phases after validation, CPU-bound and strictly sequential.
    ///
    /// Each source is reprojected once, tiled over the layer's zoom
    /// range, and its footprint collected; the footprint union and the
    /// availability flag land only after every file succeeds.
    ///
    /// Multi-file archives are processed one file at a time, so the
    /// state cycles `Reprojecting -> Tiling` per file. Only one
    /// reprojected raster is live at a time.
    pub fn run_accepted(
        &self,
        layer_id: &LayerId,
        sources: &[PathBuf],
    ) -> IngestResult<IngestReport> {
        let record = self
            .store
            .layer(layer_id)
            .ok_or_else(|| IngestError::Rejected(format!("layer {layer_id} does not exist")))?;
        let config = RenderConfig {
            nodata_band_index: record.nodata_band_index,
            visual_band_indices: record.visual_band_indices,
        };

        let started = Instant::now();
        let mut reports = Vec::with_capacity(sources.len());
        let mut coverage = MultiPolygon::default();

        for source in sources {
            transition(layer_id, IngestState::Reprojecting);
            let raster = open_geotiff(source).map_err(tms_common::TmsError::from)?;
            let mercator = reproject_raster(&raster, self.scheme.srid)?;

            transition(layer_id, IngestState::Tiling);
            let store = Arc::clone(&self.store);
            let report = generate_pyramid(
                &mercator,
                &self.scheme,
                record.kind,
                &config,
                record.min_zoom,
                record.max_zoom,
                |index, payload| store.put_tile(layer_id, index, payload),
            )?;

            info!(
                layer = %layer_id,
                source = %source.display(),
                tiles = report.total_tiles,
                "file tiled"
            );
            coverage.push(report.footprint.clone());
            reports.push(report);
        }

        transition(layer_id, IngestState::Aggregating);
        self.store.set_coverage(layer_id, coverage)?;

        transition(layer_id, IngestState::Available);
        self.store.set_available(layer_id, true)?;

        let report = IngestReport {
            layer: layer_id.clone(),
            files: reports,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        info!(
            layer = %layer_id,
            files = report.files.len(),
            tiles = report.total_tiles(),
            elapsed_secs = report.elapsed_secs,
            "ingestion complete"
        );
        Ok(report)
    }

    /// Validation plus the full pipeline in one call, for synchronous
    /// callers and tests. Service submissions split the two halves
    /// across the job queue instead.
    pub fn ingest(&self, request: &IngestRequest) -> IngestResult<IngestReport> {
        let sources = self.validate(request)?;
        self.run_accepted(&request.layer.id, &sources)
    }
}

fn transition(layer: &LayerId, state: IngestState) {
    info!(%layer, ?state, "ingest state");
}
