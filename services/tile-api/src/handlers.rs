//! HTTP handlers: tile lookup, layer submission, job status, health.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, warn};
use uuid::Uuid;

use ingestion::{IngestError, IngestRequest};
use pyramid::TilePayload;
use tms_common::{LayerId, LayerKind, LayerRecord, TileIndex, TmsError};

use crate::state::AppState;

/// Tile lookup: `GET /tms/{layer}/{z}/{x}/{y}.png`.
///
/// Cache first, then store. A missing layer or tile answers 200 with an
/// empty `image/png` body so map clients treat it as blank rather than
/// broken; only malformed requests and encoding failures are errors.
pub async fn tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((layer, z, x, y)): Path<(String, u32, u32, String)>,
) -> Response {
    let y = y.strip_suffix(".png").unwrap_or(&y);
    let Ok(y) = y.parse::<u32>() else {
        return (StatusCode::BAD_REQUEST, "invalid tile row").into_response();
    };

    let layer_id = LayerId::new(layer);
    let index = TileIndex::new(z, x, y);

    if let Some(bytes) = state.cache.get(&layer_id, index) {
        return png_response(bytes);
    }

    match state.store.get_tile(&layer_id, index) {
        Some(payload) => {
            let encoded = match payload {
                TilePayload::Visual(tile) => Ok(tile.0),
                TilePayload::Analytic(tile) => tile.render_png(),
            };
            match encoded {
                Ok(bytes) => {
                    let bytes = Bytes::from(bytes);
                    state.cache.put(&layer_id, index, bytes.clone());
                    png_response(bytes)
                }
                Err(err) => {
                    error!(layer = %layer_id, ?index, %err, "tile render failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
                }
            }
        }
        None => {
            debug!(layer = %layer_id, ?index, "tile absent, serving empty body");
            png_response(Bytes::new())
        }
    }
}

fn png_response(bytes: Bytes) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], bytes).into_response()
}

#[derive(Debug, Deserialize)]
pub struct SubmitLayerRequest {
    pub name: String,
    pub path: PathBuf,
    pub kind: LayerKind,
    pub min_zoom: Option<u32>,
    pub max_zoom: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SubmitLayerResponse {
    pub job_id: Uuid,
    pub layer_id: String,
}

/// Layer submission: `POST /layers`.
///
/// Validation runs synchronously so the caller observes acceptance (202
/// with job and layer ids) or a descriptive 400; the tiling itself is
/// queued.
pub async fn submit_layer_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<SubmitLayerRequest>,
) -> Response {
    let slug = slugify(&req.name);
    if slug.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "layer name must contain alphanumeric characters" })),
        )
            .into_response();
    }
    let layer_id = LayerId::new(slug);
    let record = LayerRecord::new(layer_id.clone(), &req.name, req.kind).with_zoom_range(
        req.min_zoom.unwrap_or(state.default_min_zoom),
        req.max_zoom.unwrap_or(state.default_max_zoom),
    );
    let request = IngestRequest {
        layer: record,
        source: req.path,
    };

    // Validating opens files; keep it off the executor threads.
    let ingestor = Arc::clone(&state.ingestor);
    let validation = {
        let ingestor = Arc::clone(&ingestor);
        tokio::task::spawn_blocking(move || {
            let sources = ingestor.validate(&request)?;
            Ok::<_, IngestError>(sources)
        })
        .await
    };

    match validation {
        Ok(Ok(sources)) => {
            // Resubmission regenerates the layer; stale rendered tiles
            // must not outlive the old record.
            state.cache.invalidate_layer(&layer_id);
            let job_layer = layer_id.clone();
            let job_id = state.queue.submit(layer_id.clone(), move || {
                match ingestor.run_accepted(&job_layer, &sources) {
                    Ok(_) => Ok(()),
                    Err(IngestError::Pipeline(err)) => Err(err),
                    Err(other) => Err(TmsError::Internal(other.to_string())),
                }
            });
            (
                StatusCode::ACCEPTED,
                Json(SubmitLayerResponse {
                    job_id,
                    layer_id: layer_id.to_string(),
                }),
            )
                .into_response()
        }
        Ok(Err(err)) => {
            warn!(layer = %layer_id, %err, "submission rejected");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
        Err(join_err) => {
            error!(%join_err, "validation task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "validation task failed" })),
            )
                .into_response()
        }
    }
}

/// Job status: `GET /jobs/{id}`.
pub async fn job_status_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return (StatusCode::BAD_REQUEST, "invalid job id").into_response();
    };
    match state.queue.status(id) {
        Some(info) => Json(info).into_response(),
        None => (StatusCode::NOT_FOUND, "unknown job id").into_response(),
    }
}

pub async fn health_handler() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

/// Layer ids are the submitted name, lowercased with runs of
/// non-alphanumerics collapsed to single hyphens.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_hyphen = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}
