use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::{
    common::{QueueEntrySnapshot, VenueSnapshot},
    ledger::TransactionSummary,
    playback::PlaybackControlSummary,
    queue::QueueSnapshot,
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across the per-venue change feed.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already-serialised data field.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Venue the stream is scoped to.
    pub venue_id: uuid::Uuid,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a venue record changes (balances, prices, active flag).
pub struct VenueUpdatedEvent {
    pub venue: VenueSnapshot,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast whenever the venue's queue changes; carries the full queue so
/// subscribers do not need a follow-up fetch.
pub struct QueueChangedEvent(pub QueueSnapshot);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a ledger entry is appended or reversed.
pub struct TransactionAppendedEvent {
    pub transaction: TransactionSummary,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the remote-control record changes.
pub struct PlaybackControlEvent {
    pub control: PlaybackControlSummary,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "command", rename_all = "snake_case")]
/// Directive pushed to the venue's display.
pub enum PlayerCommand {
    /// Load and play an entry at the given volume.
    Load {
        entry: QueueEntrySnapshot,
        volume: u8,
    },
    /// Pause the current video without changing queue state.
    Pause,
    /// Resume the current video.
    Resume,
    /// Set the player volume without changing queue state.
    SetVolume { volume: u8 },
    /// Nothing left to play; show the idle screen.
    Idle,
}
