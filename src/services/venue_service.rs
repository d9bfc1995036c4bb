//! Business logic for venue management. Venues are the root aggregate;
//! everything else (queue entries, transactions, playback control) is owned
//! by exactly one venue and follows it on deletion.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::VenueEntity,
    dto::{
        common::VenueSnapshot,
        venue::{CreateVenueRequest, PlatformSummaryResponse, UpdatePricesRequest},
    },
    error::ServiceError,
    services::change_events,
    state::SharedState,
};

/// Create a new venue with zero balances and the configured default prices.
pub async fn create_venue(
    state: &SharedState,
    request: CreateVenueRequest,
) -> Result<VenueSnapshot, ServiceError> {
    let name = request.name.trim().to_owned();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(
            "venue name must not be empty".into(),
        ));
    }

    let store = state.require_ledger_store().await?;
    let now = SystemTime::now();
    let venue = VenueEntity {
        id: Uuid::new_v4(),
        name,
        platform_stock: 0,
        screen_pool: 0,
        buy_price: state.config().default_buy_price(),
        sell_price: state.config().default_sell_price(),
        active: true,
        created_at: now,
        updated_at: now,
    };

    store.create_venue(venue.clone()).await?;
    info!(venue_id = %venue.id, name = %venue.name, "venue created");

    Ok(venue.into())
}

/// All venues known to the platform.
pub async fn list_venues(state: &SharedState) -> Result<Vec<VenueSnapshot>, ServiceError> {
    let store = state.require_ledger_store().await?;
    let venues = store.list_venues().await?;
    Ok(venues.into_iter().map(Into::into).collect())
}

/// One venue by id.
pub async fn get_venue(state: &SharedState, id: Uuid) -> Result<VenueSnapshot, ServiceError> {
    let store = state.require_ledger_store().await?;
    let venue = store
        .find_venue(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("venue `{id}` not found")))?;
    Ok(venue.into())
}

/// Aggregated dashboard numbers across all venues.
pub async fn platform_summary(
    state: &SharedState,
) -> Result<PlatformSummaryResponse, ServiceError> {
    let store = state.require_ledger_store().await?;
    let venues = store.list_venues().await?;

    let summary = PlatformSummaryResponse {
        venues: venues.len(),
        active_venues: venues.iter().filter(|venue| venue.active).count(),
        total_stock: venues
            .iter()
            .map(|venue| u64::from(venue.platform_stock))
            .sum(),
        total_pool: venues
            .iter()
            .map(|venue| u64::from(venue.screen_pool))
            .sum(),
    };

    Ok(summary)
}

/// Update a venue's per-credit prices. Historical transaction totals are
/// untouched; they were computed at write time.
pub async fn update_prices(
    state: &SharedState,
    id: Uuid,
    request: UpdatePricesRequest,
) -> Result<VenueSnapshot, ServiceError> {
    let store = state.require_ledger_store().await?;
    let updated = store
        .update_venue_prices(id, request.buy_price, request.sell_price)
        .await?;
    if !updated {
        return Err(ServiceError::NotFound(format!("venue `{id}` not found")));
    }

    change_events::refresh_venue(state, id).await;
    get_venue(state, id).await
}

/// Flip a venue's active flag. The normal "remove venue" path; balances and
/// history stay intact.
pub async fn set_active(
    state: &SharedState,
    id: Uuid,
    active: bool,
) -> Result<VenueSnapshot, ServiceError> {
    let store = state.require_ledger_store().await?;
    let updated = store.set_venue_active(id, active).await?;
    if !updated {
        return Err(ServiceError::NotFound(format!("venue `{id}` not found")));
    }

    info!(venue_id = %id, active, "venue active flag updated");
    change_events::refresh_venue(state, id).await;
    get_venue(state, id).await
}

/// Hard-delete a venue and everything it owns.
pub async fn delete_venue(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_ledger_store().await?;
    let deleted = store.delete_venue(id).await?;
    if !deleted {
        return Err(ServiceError::NotFound(format!("venue `{id}` not found")));
    }

    state.playback_sessions().remove(&id);
    state.changes().forget(id);
    info!(venue_id = %id, "venue deleted with cascade");
    Ok(())
}
