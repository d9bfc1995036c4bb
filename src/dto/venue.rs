//! DTO definitions for venue management endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Payload creating a new venue as a platform-admin action.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateVenueRequest {
    /// Display name of the bar.
    #[validate(length(min = 1, max = 80))]
    pub name: String,
}

/// Payload updating a venue's per-credit prices.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdatePricesRequest {
    /// What the venue pays the platform per credit.
    #[validate(range(min = 1))]
    pub buy_price: u32,
    /// What the venue charges patrons per credit.
    #[validate(range(min = 1))]
    pub sell_price: u32,
}

/// Payload toggling a venue's active flag.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// Aggregated platform dashboard numbers.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlatformSummaryResponse {
    /// Number of venues known to the platform.
    pub venues: usize,
    /// Venues currently flagged active.
    pub active_venues: usize,
    /// Sum of platform stock across all venues.
    pub total_stock: u64,
    /// Sum of screen pools across all venues.
    pub total_pool: u64,
}
