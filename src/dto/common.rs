use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{QueueEntryEntity, QueueState, VenueEntity},
    dto::format_system_time,
};

/// Venue as exposed to clients. Patron surfaces only need the screen pool
/// and prices, but one snapshot type serves every role.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct VenueSnapshot {
    pub id: Uuid,
    pub name: String,
    pub platform_stock: u32,
    pub screen_pool: u32,
    pub buy_price: u32,
    pub sell_price: u32,
    pub active: bool,
    /// RFC3339 creation timestamp.
    pub created_at: String,
}

impl From<VenueEntity> for VenueSnapshot {
    fn from(venue: VenueEntity) -> Self {
        Self {
            id: venue.id,
            name: venue.name,
            platform_stock: venue.platform_stock,
            screen_pool: venue.screen_pool,
            buy_price: venue.buy_price,
            sell_price: venue.sell_price,
            active: venue.active,
            created_at: format_system_time(venue.created_at),
        }
    }
}

/// Queue entry as exposed to clients and the change feed.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct QueueEntrySnapshot {
    pub id: Uuid,
    pub venue_id: Uuid,
    pub video_id: String,
    pub title: String,
    pub thumbnail_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    pub state: QueueState,
    pub requested_by: String,
    pub position: u32,
    /// RFC3339 creation timestamp.
    pub created_at: String,
}

impl From<QueueEntryEntity> for QueueEntrySnapshot {
    fn from(entry: QueueEntryEntity) -> Self {
        Self {
            id: entry.id,
            venue_id: entry.venue_id,
            video_id: entry.video_id,
            title: entry.title,
            thumbnail_url: entry.thumbnail_url,
            channel_name: entry.channel_name,
            state: entry.state,
            requested_by: entry.requested_by,
            position: entry.position,
            created_at: format_system_time(entry.created_at),
        }
    }
}
