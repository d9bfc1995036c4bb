use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Jukebox Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::venue_stream,
        crate::routes::public::get_venue,
        crate::routes::public::get_queue,
        crate::routes::public::get_movements,
        crate::routes::public::enqueue,
        crate::routes::display::start_session,
        crate::routes::display::playback_ended,
        crate::routes::display::load_failed,
        crate::routes::admin::accredit,
        crate::routes::admin::approve_entry,
        crate::routes::admin::remove_entry,
        crate::routes::admin::skip,
        crate::routes::platform::create_venue,
        crate::routes::platform::list_venues,
        crate::routes::platform::purchase_stock,
        crate::routes::platform::list_transactions,
        crate::routes::platform::reverse_transaction,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::common::VenueSnapshot,
            crate::dto::common::QueueEntrySnapshot,
            crate::dto::queue::QueueSnapshot,
            crate::dto::ledger::TransactionSummary,
            crate::dto::playback::PlaybackControlSummary,
            crate::dao::models::QueueState,
            crate::dao::models::TransactionKind,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Per-venue server-sent event streams"),
        (name = "public", description = "Patron endpoints"),
        (name = "display", description = "Venue display endpoints"),
        (name = "admin", description = "Venue administration endpoints"),
        (name = "platform", description = "Platform operator endpoints"),
    )
)]
pub struct ApiDoc;
