//! Platform-operator endpoints: venue provisioning, stock sales, the
//! cross-venue transaction ledger, and corrections. Gated by the platform
//! key header.

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        common::VenueSnapshot,
        ledger::{PurchaseStockRequest, TransactionFilterQuery, TransactionSummary},
        venue::{CreateVenueRequest, PlatformSummaryResponse, SetActiveRequest},
    },
    error::AppError,
    services::{ledger_service, venue_service},
    state::SharedState,
};

const PLATFORM_KEY_HEADER: &str = "x-platform-key";

/// Platform-admin management endpoints.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/platform/venues", get(list_venues).post(create_venue))
        .route("/platform/venues/{id}", delete(delete_venue))
        .route("/platform/venues/{id}/stock", post(purchase_stock))
        .route("/platform/venues/{id}/active", put(set_active))
        .route("/platform/summary", get(summary))
        .route("/platform/transactions", get(list_transactions))
        .route("/platform/transactions/{id}", delete(reverse_transaction))
        .route_layer(middleware::from_fn_with_state(state, require_platform_key))
}

#[utoipa::path(
    post,
    path = "/platform/venues",
    tag = "platform",
    params(("X-Platform-Key" = String, Header, description = "Platform admin key")),
    request_body = CreateVenueRequest,
    responses((status = 201, description = "Venue created", body = VenueSnapshot))
)]
/// Create a new venue with zero balances and default prices.
pub async fn create_venue(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateVenueRequest>>,
) -> Result<(StatusCode, Json<VenueSnapshot>), AppError> {
    let venue = venue_service::create_venue(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(venue)))
}

#[utoipa::path(
    get,
    path = "/platform/venues",
    tag = "platform",
    params(("X-Platform-Key" = String, Header, description = "Platform admin key")),
    responses((status = 200, description = "All venues with balances", body = [VenueSnapshot]))
)]
/// List every venue known to the platform.
pub async fn list_venues(
    State(state): State<SharedState>,
) -> Result<Json<Vec<VenueSnapshot>>, AppError> {
    Ok(Json(venue_service::list_venues(&state).await?))
}

#[utoipa::path(
    get,
    path = "/platform/summary",
    tag = "platform",
    params(("X-Platform-Key" = String, Header, description = "Platform admin key")),
    responses((status = 200, description = "Aggregated balances", body = PlatformSummaryResponse))
)]
/// Aggregated venue count and balance totals for the dashboard.
pub async fn summary(
    State(state): State<SharedState>,
) -> Result<Json<PlatformSummaryResponse>, AppError> {
    Ok(Json(venue_service::platform_summary(&state).await?))
}

#[utoipa::path(
    post,
    path = "/platform/venues/{id}/stock",
    tag = "platform",
    params(("X-Platform-Key" = String, Header, description = "Platform admin key"),
    ("id" = Uuid, Path, description = "Venue identifier")),
    request_body = PurchaseStockRequest,
    responses((status = 200, description = "Stock granted", body = TransactionSummary))
)]
/// Sell stock to a venue: `platform_stock += quantity`, with an audit row.
pub async fn purchase_stock(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<PurchaseStockRequest>>,
) -> Result<Json<TransactionSummary>, AppError> {
    let transaction = ledger_service::purchase_stock(&state, id, payload).await?;
    Ok(Json(transaction))
}

#[utoipa::path(
    put,
    path = "/platform/venues/{id}/active",
    tag = "platform",
    params(("X-Platform-Key" = String, Header, description = "Platform admin key"),
    ("id" = Uuid, Path, description = "Venue identifier")),
    request_body = SetActiveRequest,
    responses((status = 200, description = "Active flag updated", body = VenueSnapshot))
)]
/// Activate or deactivate a venue without touching its data.
pub async fn set_active(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActiveRequest>,
) -> Result<Json<VenueSnapshot>, AppError> {
    let venue = venue_service::set_active(&state, id, payload.active).await?;
    Ok(Json(venue))
}

#[utoipa::path(
    delete,
    path = "/platform/venues/{id}",
    tag = "platform",
    params(("X-Platform-Key" = String, Header, description = "Platform admin key"),
    ("id" = Uuid, Path, description = "Venue identifier")),
    responses((status = 204, description = "Venue deleted with cascade"))
)]
/// Hard-delete a venue and everything it owns.
pub async fn delete_venue(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    venue_service::delete_venue(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/platform/transactions",
    tag = "platform",
    params(("X-Platform-Key" = String, Header, description = "Platform admin key"),
    ("venue_id" = Option<Uuid>, Query, description = "Restrict to one venue"),
    ("kind" = Option<String>, Query, description = "Restrict to one transaction kind"),
    ("from" = Option<String>, Query, description = "Lower creation-time bound (RFC3339 or YYYY-MM-DD)"),
    ("to" = Option<String>, Query, description = "Upper creation-time bound, inclusive")),
    responses((status = 200, description = "Transactions, newest first", body = [TransactionSummary]))
)]
/// List transactions across venues with optional filters.
pub async fn list_transactions(
    State(state): State<SharedState>,
    Query(query): Query<TransactionFilterQuery>,
) -> Result<Json<Vec<TransactionSummary>>, AppError> {
    Ok(Json(ledger_service::list_transactions(&state, query).await?))
}

#[utoipa::path(
    delete,
    path = "/platform/transactions/{id}",
    tag = "platform",
    params(("X-Platform-Key" = String, Header, description = "Platform admin key"),
    ("id" = Uuid, Path, description = "Transaction identifier")),
    responses((status = 204, description = "Transaction reversed"))
)]
/// Delete a transaction as a correction, compensating stock for purchases.
pub async fn reverse_transaction(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ledger_service::reverse_transaction(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn require_platform_key(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(PLATFORM_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing platform key header `X-Platform-Key`".into())
        })?;

    if provided == state.config().platform_key() {
        Ok(next.run(req).await)
    } else {
        Err(AppError::Unauthorized("invalid platform key".into()))
    }
}
