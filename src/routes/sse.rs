use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/venues/{id}",
    tag = "sse",
    params(("id" = Uuid, Path, description = "Venue to subscribe to")),
    responses((status = 200, description = "Venue change feed", content_type = "text/event-stream", body = String))
)]
/// Stream realtime change events for one venue to any connected role surface.
pub async fn venue_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe_venue(&state, id);
    let handshake = sse_service::handshake_event(&state, id).await;
    info!(venue_id = %id, "new venue SSE connection");
    sse_service::to_sse_stream(receiver, handshake, id)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/venues/{id}", get(venue_stream))
}
