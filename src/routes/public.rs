//! Patron-facing endpoints: venue snapshot, queue, movements feed, catalog
//! search, and the credit-spending enqueue. No authentication; the screen
//! pool is a public resource anyone in the bar can spend from.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        common::{QueueEntrySnapshot, VenueSnapshot},
        ledger::TransactionSummary,
        queue::{EnqueueRequest, QueueSnapshot},
    },
    error::AppError,
    services::{ledger_service, queue_service, venue_service},
    state::SharedState,
};

/// Movements shown on the patron feed.
const MOVEMENTS_LIMIT: usize = 10;

/// Public endpoints scoped to one venue.
pub fn router() -> Router<SharedState> {
    let router = Router::new()
        .route("/venues/{id}", get(get_venue))
        .route("/venues/{id}/queue", get(get_queue).post(enqueue))
        .route("/venues/{id}/movements", get(get_movements));

    #[cfg(feature = "youtube-catalog")]
    let router = router.route("/venues/{id}/catalog", get(catalog::search_catalog));

    router
}

#[utoipa::path(
    get,
    path = "/venues/{id}",
    tag = "public",
    params(("id" = Uuid, Path, description = "Venue identifier")),
    responses(
        (status = 200, description = "Venue snapshot", body = VenueSnapshot),
        (status = 404, description = "Unknown venue")
    )
)]
/// Return the venue snapshot, including the public screen pool.
pub async fn get_venue(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<VenueSnapshot>, AppError> {
    let payload = venue_service::get_venue(&state, id).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/venues/{id}/queue",
    tag = "public",
    params(("id" = Uuid, Path, description = "Venue identifier")),
    responses((status = 200, description = "Current queue grouped by state", body = QueueSnapshot))
)]
/// Return the venue's queue: now playing, approved, and pending entries.
pub async fn get_queue(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QueueSnapshot>, AppError> {
    let payload = queue_service::get_queue(&state, id).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/venues/{id}/movements",
    tag = "public",
    params(("id" = Uuid, Path, description = "Venue identifier")),
    responses((status = 200, description = "Recent pool movements", body = [TransactionSummary]))
)]
/// Return the latest accreditations and consumptions for the public feed.
pub async fn get_movements(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TransactionSummary>>, AppError> {
    let payload = ledger_service::recent_movements(&state, id, MOVEMENTS_LIMIT).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    post,
    path = "/venues/{id}/queue",
    tag = "public",
    params(("id" = Uuid, Path, description = "Venue identifier")),
    request_body = EnqueueRequest,
    responses(
        (status = 201, description = "Request enqueued, one credit consumed", body = QueueEntrySnapshot),
        (status = 409, description = "Screen pool is empty")
    )
)]
/// Enqueue a video, spending one screen-pool credit.
pub async fn enqueue(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<EnqueueRequest>>,
) -> Result<(StatusCode, Json<QueueEntrySnapshot>), AppError> {
    let entry = queue_service::enqueue(&state, id, payload).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[cfg(feature = "youtube-catalog")]
mod catalog {
    use super::*;
    use axum::extract::Query;

    use crate::{
        dto::catalog::{CatalogItem, CatalogSearchQuery},
        services::catalog_service,
    };

    #[utoipa::path(
        get,
        path = "/venues/{id}/catalog",
        tag = "public",
        params(
            ("id" = Uuid, Path, description = "Venue identifier"),
            ("q" = String, Query, description = "Free-text search query")
        ),
        responses((status = 200, description = "Catalog search results", body = [CatalogItem]))
    )]
    /// Search the external video catalog.
    pub async fn search_catalog(
        State(state): State<SharedState>,
        Path(id): Path<Uuid>,
        Valid(Query(query)): Valid<Query<CatalogSearchQuery>>,
    ) -> Result<Json<Vec<CatalogItem>>, AppError> {
        // The venue gate keeps the endpoint from being a free search proxy.
        venue_service::get_venue(&state, id).await?;
        let results = catalog_service::search(&state, &query.q).await?;
        Ok(Json(results))
    }
}
