//! DTO definitions for queue endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{QueueEntryEntity, QueueState},
    dto::{common::QueueEntrySnapshot, validation::validate_video_id},
};

/// Requester label used when the patron does not provide one.
const DEFAULT_REQUESTER: &str = "guest";

/// Payload enqueueing one video; spends one screen-pool credit.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct EnqueueRequest {
    /// External catalog identifier of the video.
    #[validate(custom(function = validate_video_id))]
    pub video_id: String,
    /// Video title as shown in search results.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Thumbnail URL, display-only.
    #[validate(url)]
    pub thumbnail_url: String,
    /// Channel name, display-only.
    #[serde(default)]
    pub channel_name: Option<String>,
    /// Free-text label for who requested the video.
    #[serde(default)]
    #[validate(length(max = 60))]
    pub requested_by: Option<String>,
}

impl EnqueueRequest {
    /// Requester label, defaulting when the patron stays anonymous.
    pub fn requester(&self) -> String {
        self.requested_by
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .unwrap_or(DEFAULT_REQUESTER)
            .to_owned()
    }
}

/// Queue of a venue grouped the way every role surface renders it.
#[derive(Debug, Serialize, ToSchema)]
pub struct QueueSnapshot {
    /// Entry currently on the display, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now_playing: Option<QueueEntrySnapshot>,
    /// Approved entries in playback order.
    pub approved: Vec<QueueEntrySnapshot>,
    /// Requests awaiting moderation, oldest first.
    pub pending: Vec<QueueEntrySnapshot>,
}

impl QueueSnapshot {
    /// Group a `(position, created_at)`-ordered entry list by state.
    pub fn from_entries(entries: Vec<QueueEntryEntity>) -> Self {
        let mut now_playing = None;
        let mut approved = Vec::new();
        let mut pending = Vec::new();

        for entry in entries {
            match entry.state {
                QueueState::Playing => now_playing = Some(entry.into()),
                QueueState::Approved => approved.push(entry.into()),
                QueueState::Pending => pending.push(entry.into()),
            }
        }

        Self {
            now_playing,
            approved,
            pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use uuid::Uuid;

    use super::*;

    fn entry(position: u32, state: QueueState) -> QueueEntryEntity {
        QueueEntryEntity {
            id: Uuid::new_v4(),
            venue_id: Uuid::new_v4(),
            video_id: "dQw4w9WgXcQ".into(),
            title: format!("song {position}"),
            thumbnail_url: "https://example.invalid/t.jpg".into(),
            channel_name: None,
            state,
            credit_cost: 1,
            requested_by: "guest".into(),
            position,
            created_at: SystemTime::now(),
        }
    }

    #[test]
    fn snapshot_groups_entries_by_state() {
        let entries = vec![
            entry(0, QueueState::Playing),
            entry(1, QueueState::Approved),
            entry(2, QueueState::Approved),
            entry(3, QueueState::Pending),
        ];

        let snapshot = QueueSnapshot::from_entries(entries);
        assert!(snapshot.now_playing.is_some());
        assert_eq!(snapshot.approved.len(), 2);
        assert_eq!(snapshot.pending.len(), 1);
        assert!(snapshot.approved[0].position < snapshot.approved[1].position);
    }

    #[test]
    fn blank_requester_falls_back_to_default() {
        let request = EnqueueRequest {
            video_id: "dQw4w9WgXcQ".into(),
            title: "song".into(),
            thumbnail_url: "https://example.invalid/t.jpg".into(),
            channel_name: None,
            requested_by: Some("   ".into()),
        };
        assert_eq!(request.requester(), DEFAULT_REQUESTER);
    }
}
