//! DTO definitions for the catalog search endpoint.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Query parameters for a catalog search.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CatalogSearchQuery {
    /// Free-text query: artist, song, or video title.
    #[validate(length(min = 1, max = 120))]
    pub q: String,
}

/// One catalog search result. Only `external_id` and `title` matter for an
/// enqueue; the rest is display-only.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct CatalogItem {
    /// External catalog identifier, usable in an enqueue request.
    pub external_id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub channel_name: String,
    /// Raw ISO-8601 duration as returned by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_iso8601: Option<String>,
    /// Duration formatted as `m:ss` or `h:mm:ss`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_display: Option<String>,
}
