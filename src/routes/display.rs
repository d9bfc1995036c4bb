//! Display endpoints: the per-venue playback session. The display calls
//! these to come online and to report player outcomes; commands flow back to
//! it over the venue SSE stream.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use uuid::Uuid;

use crate::{
    dto::playback::{AdvanceResponse, DisplaySessionResponse},
    error::AppError,
    services::playback_service,
    state::SharedState,
};

/// Display-facing endpoints scoped to one venue.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/display/venues/{id}/session", post(start_session))
        .route("/display/venues/{id}/ended", post(playback_ended))
        .route("/display/venues/{id}/load-failed", post(load_failed))
}

#[utoipa::path(
    post,
    path = "/display/venues/{id}/session",
    tag = "display",
    params(("id" = Uuid, Path, description = "Venue identifier")),
    responses((status = 200, description = "Session started; current entry and control state", body = DisplaySessionResponse))
)]
/// Bring the venue's display online and resume or start playback.
pub async fn start_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DisplaySessionResponse>, AppError> {
    let session = playback_service::start_session(&state, id).await?;
    Ok(Json(session))
}

#[utoipa::path(
    post,
    path = "/display/venues/{id}/ended",
    tag = "display",
    params(("id" = Uuid, Path, description = "Venue identifier")),
    responses((status = 200, description = "Queue advanced", body = AdvanceResponse))
)]
/// Report that the current video finished playing.
pub async fn playback_ended(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AdvanceResponse>, AppError> {
    let advanced = playback_service::playback_ended(&state, id).await?;
    Ok(Json(advanced))
}

#[utoipa::path(
    post,
    path = "/display/venues/{id}/load-failed",
    tag = "display",
    params(("id" = Uuid, Path, description = "Venue identifier")),
    responses((status = 200, description = "Bad entry skipped, queue advanced", body = AdvanceResponse))
)]
/// Report that the player could not load the current video.
pub async fn load_failed(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AdvanceResponse>, AppError> {
    let advanced = playback_service::load_failed(&state, id).await?;
    Ok(Json(advanced))
}
