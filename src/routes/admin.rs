//! Venue-admin endpoints: accreditation, moderation, prices, and the
//! playback remote control. Gated by a static key header, per the shared
//! passphrase model; the platform key is accepted here too so the operator
//! can assist any venue.

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        common::{QueueEntrySnapshot, VenueSnapshot},
        ledger::{AccreditRequest, TransactionSummary},
        playback::{AdvanceResponse, PauseRequest, PlaybackControlSummary, VolumeRequest},
        venue::UpdatePricesRequest,
    },
    error::AppError,
    services::{ledger_service, playback_service, queue_service, venue_service},
    state::SharedState,
};

const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Venue-admin management endpoints.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/venues/{id}/accredit", post(accredit))
        .route("/admin/venues/{id}/prices", put(update_prices))
        .route("/admin/queue/{entry_id}/approve", post(approve_entry))
        .route("/admin/queue/{entry_id}", delete(remove_entry))
        .route("/admin/venues/{id}/playback", get(get_playback_control))
        .route("/admin/venues/{id}/playback/pause", post(pause))
        .route("/admin/venues/{id}/playback/volume", put(volume))
        .route("/admin/venues/{id}/playback/skip", post(skip))
        .route_layer(middleware::from_fn_with_state(state, require_admin_key))
}

#[utoipa::path(
    post,
    path = "/admin/venues/{id}/accredit",
    tag = "admin",
    params(("X-Admin-Key" = String, Header, description = "Venue admin key"),
    ("id" = Uuid, Path, description = "Venue identifier")),
    request_body = AccreditRequest,
    responses(
        (status = 200, description = "Credits accredited to the screen pool", body = TransactionSummary),
        (status = 409, description = "Insufficient platform stock")
    )
)]
/// Move credits from the venue's platform stock into the public screen pool.
pub async fn accredit(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<AccreditRequest>>,
) -> Result<Json<TransactionSummary>, AppError> {
    let transaction = ledger_service::accredit_to_screen(&state, id, payload).await?;
    Ok(Json(transaction))
}

#[utoipa::path(
    put,
    path = "/admin/venues/{id}/prices",
    tag = "admin",
    params(("X-Admin-Key" = String, Header, description = "Venue admin key"),
    ("id" = Uuid, Path, description = "Venue identifier")),
    request_body = UpdatePricesRequest,
    responses((status = 200, description = "Prices updated", body = VenueSnapshot))
)]
/// Update the venue's buy and sell prices per credit.
pub async fn update_prices(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<UpdatePricesRequest>>,
) -> Result<Json<VenueSnapshot>, AppError> {
    let venue = venue_service::update_prices(&state, id, payload).await?;
    Ok(Json(venue))
}

#[utoipa::path(
    post,
    path = "/admin/queue/{entry_id}/approve",
    tag = "admin",
    params(("X-Admin-Key" = String, Header, description = "Venue admin key"),
    ("entry_id" = Uuid, Path, description = "Queue entry identifier")),
    responses(
        (status = 200, description = "Entry approved", body = QueueEntrySnapshot),
        (status = 409, description = "Entry is not pending")
    )
)]
/// Approve a pending request so it becomes eligible for playback.
pub async fn approve_entry(
    State(state): State<SharedState>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<QueueEntrySnapshot>, AppError> {
    let entry = queue_service::approve(&state, entry_id).await?;
    Ok(Json(entry))
}

#[utoipa::path(
    delete,
    path = "/admin/queue/{entry_id}",
    tag = "admin",
    params(("X-Admin-Key" = String, Header, description = "Venue admin key"),
    ("entry_id" = Uuid, Path, description = "Queue entry identifier")),
    responses((status = 204, description = "Entry removed; the spent credit is not refunded"))
)]
/// Reject a pending request or remove a queued entry.
pub async fn remove_entry(
    State(state): State<SharedState>,
    Path(entry_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    queue_service::reject(&state, entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/admin/venues/{id}/playback",
    tag = "admin",
    params(("X-Admin-Key" = String, Header, description = "Venue admin key"),
    ("id" = Uuid, Path, description = "Venue identifier")),
    responses((status = 200, description = "Current remote-control record", body = PlaybackControlSummary))
)]
/// Return the venue's playback control record, creating it if needed.
pub async fn get_playback_control(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlaybackControlSummary>, AppError> {
    let control = playback_service::get_control(&state, id).await?;
    Ok(Json(control))
}

#[utoipa::path(
    post,
    path = "/admin/venues/{id}/playback/pause",
    tag = "admin",
    params(("X-Admin-Key" = String, Header, description = "Venue admin key"),
    ("id" = Uuid, Path, description = "Venue identifier")),
    request_body = PauseRequest,
    responses((status = 200, description = "Pause state forwarded to the display", body = PlaybackControlSummary))
)]
/// Pause or resume the display without changing queue state.
pub async fn pause(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PauseRequest>,
) -> Result<Json<PlaybackControlSummary>, AppError> {
    let control = playback_service::set_paused(&state, id, payload.paused).await?;
    Ok(Json(control))
}

#[utoipa::path(
    put,
    path = "/admin/venues/{id}/playback/volume",
    tag = "admin",
    params(("X-Admin-Key" = String, Header, description = "Venue admin key"),
    ("id" = Uuid, Path, description = "Venue identifier")),
    request_body = VolumeRequest,
    responses((status = 200, description = "Volume forwarded to the display", body = PlaybackControlSummary))
)]
/// Set the display volume without changing queue state.
pub async fn volume(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<VolumeRequest>>,
) -> Result<Json<PlaybackControlSummary>, AppError> {
    let control = playback_service::set_volume(&state, id, payload.volume).await?;
    Ok(Json(control))
}

#[utoipa::path(
    post,
    path = "/admin/venues/{id}/playback/skip",
    tag = "admin",
    params(("X-Admin-Key" = String, Header, description = "Venue admin key"),
    ("id" = Uuid, Path, description = "Venue identifier")),
    responses((status = 200, description = "Current entry skipped", body = AdvanceResponse))
)]
/// Skip the current entry, exactly as if playback had ended naturally.
pub async fn skip(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AdvanceResponse>, AppError> {
    let advanced = playback_service::request_skip(&state, id).await?;
    Ok(Json(advanced))
}

async fn require_admin_key(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing admin key header `X-Admin-Key`".into()))?;

    let config = state.config();
    if provided == config.admin_key() || provided == config.platform_key() {
        Ok(next.run(req).await)
    } else {
        Err(AppError::Unauthorized("invalid admin key".into()))
    }
}
