use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// A tenant of the platform: a bar with its own credit balances and queue.
///
/// `platform_stock` counts credits bought from the platform operator and not
/// yet spendable by patrons; `screen_pool` counts credits accredited into
/// public circulation. Both are unsigned so a negative balance is
/// unrepresentable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VenueEntity {
    /// Primary key of the venue.
    pub id: Uuid,
    /// Display name shown on every role surface.
    pub name: String,
    /// Credits purchased from the platform, not yet publicly spendable.
    pub platform_stock: u32,
    /// Credits accredited to the public screen pool.
    pub screen_pool: u32,
    /// Price per credit the venue pays the platform, in whole currency units.
    pub buy_price: u32,
    /// Price per credit the venue charges patrons, in whole currency units.
    pub sell_price: u32,
    /// Whether the venue is currently operating; deactivation is a flag flip.
    pub active: bool,
    /// Creation timestamp for auditing.
    pub created_at: SystemTime,
    /// Last time the venue record was updated.
    pub updated_at: SystemTime,
}

/// Lifecycle state of a queue entry.
///
/// Completion and rejection delete the row instead of parking it in a
/// terminal state, so there is no dead `completed` member here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    /// Requested by a patron, awaiting moderation.
    Pending,
    /// Approved by a moderator, eligible for playback.
    Approved,
    /// Currently on the venue's display. At most one per venue.
    Playing,
}

impl QueueState {
    /// Wire name of the state, matching its serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueState::Pending => "pending",
            QueueState::Approved => "approved",
            QueueState::Playing => "playing",
        }
    }
}

/// One requested video and its lifecycle state, owned by exactly one venue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueEntryEntity {
    /// Primary key of the entry.
    pub id: Uuid,
    /// Venue this entry belongs to.
    pub venue_id: Uuid,
    /// External catalog identifier of the video.
    pub video_id: String,
    /// Video title as returned by the catalog.
    pub title: String,
    /// Thumbnail URL, display-only.
    pub thumbnail_url: String,
    /// Channel name, display-only.
    pub channel_name: Option<String>,
    /// Current lifecycle state.
    pub state: QueueState,
    /// Credits consumed when this entry was created (normally 1).
    pub credit_cost: u32,
    /// Free-text label for who requested the video.
    pub requested_by: String,
    /// Insertion-order hint; never renumbered after deletions.
    pub position: u32,
    /// Creation timestamp; tie-breaker after `position`.
    pub created_at: SystemTime,
}

/// Category of an immutable ledger entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Platform operator sold stock to a venue.
    PlatformPurchase,
    /// Venue moved stock into the public screen pool.
    VenueAccreditation,
    /// A patron spent one screen-pool credit on an enqueue.
    Consumption,
}

impl TransactionKind {
    /// Wire name of the kind, matching its serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::PlatformPurchase => "platform_purchase",
            TransactionKind::VenueAccreditation => "venue_accreditation",
            TransactionKind::Consumption => "consumption",
        }
    }
}

/// Immutable ledger entry, append-only apart from platform-admin corrections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionEntity {
    /// Primary key of the transaction.
    pub id: Uuid,
    /// Venue this transaction belongs to.
    pub venue_id: Uuid,
    /// What kind of movement this records.
    pub kind: TransactionKind,
    /// Number of credits moved.
    pub quantity: u32,
    /// Price per credit at write time.
    pub unit_price: u32,
    /// `quantity * unit_price`, computed and stored at write time so later
    /// price changes never rewrite history.
    pub total: u64,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// Song title, present on consumption entries.
    pub song_title: Option<String>,
    /// Requester label, present on consumption entries.
    pub requested_by: Option<String>,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Filters accepted when listing transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Restrict to one transaction kind.
    pub kind: Option<TransactionKind>,
    /// Lower bound on `created_at`, inclusive.
    pub from: Option<SystemTime>,
    /// Upper bound on `created_at`, inclusive.
    pub to: Option<SystemTime>,
}

/// Per-venue singleton carrying remote-control intent for the display.
///
/// Created lazily on first use; `skip_requested` is edge-triggered and
/// cleared once consumed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaybackControlEntity {
    /// Venue this control record belongs to (one per venue).
    pub venue_id: Uuid,
    /// Player volume, 0-100.
    pub volume: u8,
    /// Whether playback is paused.
    pub paused: bool,
    /// Pending skip request, cleared after the advance completes.
    pub skip_requested: bool,
}

impl PlaybackControlEntity {
    /// Control record created when a venue's display first comes online.
    pub fn with_defaults(venue_id: Uuid) -> Self {
        Self {
            venue_id,
            volume: 50,
            paused: false,
            skip_requested: false,
        }
    }
}

/// Partial update applied to a venue's playback control record.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackControlUpdate {
    /// New volume, when set.
    pub volume: Option<u8>,
    /// New paused flag, when set.
    pub paused: Option<bool>,
    /// New skip flag, when set.
    pub skip_requested: Option<bool>,
}

impl PlaybackControlUpdate {
    /// Merge this partial update into an existing control record.
    pub fn apply(self, control: &mut PlaybackControlEntity) {
        if let Some(volume) = self.volume {
            control.volume = volume;
        }
        if let Some(paused) = self.paused {
            control.paused = paused;
        }
        if let Some(skip) = self.skip_requested {
            control.skip_requested = skip;
        }
    }
}
