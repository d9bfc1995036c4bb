//! DTO definitions for playback control and display endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{dao::models::PlaybackControlEntity, dto::common::QueueEntrySnapshot};

/// Payload toggling pause from the remote control.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PauseRequest {
    pub paused: bool,
}

/// Payload setting the player volume from the remote control.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct VolumeRequest {
    /// Player volume, 0-100.
    #[validate(range(max = 100))]
    pub volume: u8,
}

/// Remote-control record as exposed to clients.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct PlaybackControlSummary {
    pub volume: u8,
    pub paused: bool,
    pub skip_requested: bool,
}

impl From<PlaybackControlEntity> for PlaybackControlSummary {
    fn from(control: PlaybackControlEntity) -> Self {
        Self {
            volume: control.volume,
            paused: control.paused,
            skip_requested: control.skip_requested,
        }
    }
}

/// State handed to a display when its session starts.
#[derive(Debug, Serialize, ToSchema)]
pub struct DisplaySessionResponse {
    /// Entry the display should load immediately, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now_playing: Option<QueueEntrySnapshot>,
    /// Current remote-control record.
    pub control: PlaybackControlSummary,
}

/// Outcome of a completion or skip report.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdvanceResponse {
    /// Next entry to load, or absent when the queue ran dry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now_playing: Option<QueueEntrySnapshot>,
}
