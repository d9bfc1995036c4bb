//! Catalog search against the YouTube Data API.
//!
//! Two round trips: a text search for candidates, then a contentDetails
//! lookup to attach durations. The core only needs `external_id` and
//! `title`; everything else is display sugar. Without an API key the search
//! degrades to an empty result list instead of failing the patron surface.

use std::sync::OnceLock;

use serde::Deserialize;
use tracing::warn;

use crate::{dto::catalog::CatalogItem, error::ServiceError, state::SharedState};

const SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
const VIDEOS_URL: &str = "https://www.googleapis.com/youtube/v3/videos";
const MAX_RESULTS: usize = 10;

fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(reqwest::Client::new)
}

/// Search the external catalog for videos matching a free-text query.
pub async fn search(state: &SharedState, query: &str) -> Result<Vec<CatalogItem>, ServiceError> {
    let Some(api_key) = state.config().catalog_api_key() else {
        warn!("catalog search requested but no API key is configured");
        return Ok(Vec::new());
    };

    let max_results = MAX_RESULTS.to_string();
    let search: SearchResponse = http_client()
        .get(SEARCH_URL)
        .query(&[
            ("part", "snippet"),
            ("maxResults", max_results.as_str()),
            ("q", query),
            ("type", "video"),
            ("key", api_key),
        ])
        .send()
        .await
        .map_err(upstream)?
        .error_for_status()
        .map_err(upstream)?
        .json()
        .await
        .map_err(upstream)?;

    if search.items.is_empty() {
        return Ok(Vec::new());
    }

    let ids = search
        .items
        .iter()
        .map(|item| item.id.video_id.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let details: DetailsResponse = http_client()
        .get(VIDEOS_URL)
        .query(&[
            ("part", "contentDetails"),
            ("id", ids.as_str()),
            ("key", api_key),
        ])
        .send()
        .await
        .map_err(upstream)?
        .error_for_status()
        .map_err(upstream)?
        .json()
        .await
        .map_err(upstream)?;

    let items = search
        .items
        .into_iter()
        .map(|item| {
            let duration = details
                .items
                .iter()
                .find(|detail| detail.id == item.id.video_id)
                .map(|detail| detail.content_details.duration.clone());
            let thumbnail = item
                .snippet
                .thumbnails
                .medium
                .or(item.snippet.thumbnails.default)
                .map(|thumb| thumb.url)
                .unwrap_or_default();

            CatalogItem {
                external_id: item.id.video_id,
                title: item.snippet.title,
                thumbnail_url: thumbnail,
                channel_name: item.snippet.channel_title,
                duration_display: duration.as_deref().and_then(format_iso8601_duration),
                duration_iso8601: duration,
            }
        })
        .collect();

    Ok(items)
}

/// Render an ISO-8601 `PT#H#M#S` duration as `m:ss` or `h:mm:ss`.
pub fn format_iso8601_duration(duration: &str) -> Option<String> {
    let rest = duration.strip_prefix("PT")?;

    let mut hours = 0u32;
    let mut minutes = 0u32;
    let mut seconds = 0u32;
    let mut digits = String::new();

    for c in rest.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let value: u32 = digits.parse().ok()?;
        digits.clear();
        match c {
            'H' => hours = value,
            'M' => minutes = value,
            'S' => seconds = value,
            _ => return None,
        }
    }
    if !digits.is_empty() {
        return None;
    }

    Some(if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    })
}

fn upstream(err: reqwest::Error) -> ServiceError {
    ServiceError::Upstream(err.to_string())
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: VideoId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct VideoId {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(rename = "channelTitle")]
    channel_title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    #[serde(default)]
    items: Vec<DetailsItem>,
}

#[derive(Debug, Deserialize)]
struct DetailsItem {
    id: String,
    #[serde(rename = "contentDetails")]
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_durations_render_without_hours() {
        assert_eq!(format_iso8601_duration("PT3M33S").as_deref(), Some("3:33"));
        assert_eq!(format_iso8601_duration("PT45S").as_deref(), Some("0:45"));
        assert_eq!(format_iso8601_duration("PT4M").as_deref(), Some("4:00"));
    }

    #[test]
    fn long_durations_render_with_hours() {
        assert_eq!(
            format_iso8601_duration("PT1H2M3S").as_deref(),
            Some("1:02:03")
        );
        assert_eq!(format_iso8601_duration("PT2H").as_deref(), Some("2:00:00"));
    }

    #[test]
    fn malformed_durations_are_rejected() {
        assert!(format_iso8601_duration("3M33S").is_none());
        assert!(format_iso8601_duration("PT3X").is_none());
        assert!(format_iso8601_duration("PT33").is_none());
    }
}
