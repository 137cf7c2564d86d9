//! Import endpoint
//!
//! `POST /import/{isolates|resistance|prevalence}` with the raw
//! spreadsheet bytes as the request body. The pipeline runs synchronously;
//! the response is the full import report (200 even when it contains
//! per-record failures) or a 400 for fatal run-level errors.

use crate::error::{ApiError, ApiResult};
use crate::import::{self, report::ImportReport, FactKind};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use tracing::info;

/// POST /import/:kind
pub async fn import_handler(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    body: Bytes,
) -> ApiResult<Json<ImportReport>> {
    let kind = FactKind::parse(&kind)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown fact kind: {kind}")))?;

    info!(kind = kind.as_str(), bytes = body.len(), "Import upload received");

    let report = import::run_import(&state.db, &state.config, kind, &body).await?;
    Ok(Json(report))
}

pub fn import_routes() -> Router<AppState> {
    Router::new().route("/import/:kind", post(import_handler))
}
