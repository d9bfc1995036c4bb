//! Typed helpers that push row-change notifications onto the per-venue
//! change feed. Broadcast failures never fail the mutation that triggered
//! them; they are logged and dropped.

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::models::{PlaybackControlEntity, QueueEntryEntity, QueueState, TransactionEntity, VenueEntity},
    dto::{
        ledger::TransactionSummary,
        queue::QueueSnapshot,
        sse::{
            PlaybackControlEvent, PlayerCommand, QueueChangedEvent, ServerEvent, SystemStatus,
            TransactionAppendedEvent, VenueUpdatedEvent,
        },
    },
    state::SharedState,
};

const EVENT_VENUE_UPDATED: &str = "venue.updated";
const EVENT_QUEUE_CHANGED: &str = "queue.changed";
const EVENT_TRANSACTION_APPENDED: &str = "transaction.appended";
const EVENT_PLAYBACK_CONTROL: &str = "playback.control";
const EVENT_PLAYER_COMMAND: &str = "player.command";
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Broadcast the venue record after a balance, price, or flag change.
pub fn broadcast_venue_updated(state: &SharedState, venue: VenueEntity) {
    let venue_id = venue.id;
    let payload = VenueUpdatedEvent {
        venue: venue.into(),
    };
    send_event(state, venue_id, EVENT_VENUE_UPDATED, &payload);
}

/// Broadcast the full queue after any entry changed, so subscribers do not
/// need a follow-up fetch.
pub fn broadcast_queue_changed(
    state: &SharedState,
    venue_id: Uuid,
    entries: Vec<QueueEntryEntity>,
) {
    let payload = QueueChangedEvent(QueueSnapshot::from_entries(entries));
    send_event(state, venue_id, EVENT_QUEUE_CHANGED, &payload);
}

/// Broadcast a freshly appended ledger entry.
pub fn broadcast_transaction_appended(state: &SharedState, transaction: TransactionEntity) {
    let venue_id = transaction.venue_id;
    let payload = TransactionAppendedEvent {
        transaction: TransactionSummary::from(transaction),
    };
    send_event(state, venue_id, EVENT_TRANSACTION_APPENDED, &payload);
}

/// Broadcast the remote-control record after an update.
pub fn broadcast_playback_control(state: &SharedState, control: PlaybackControlEntity) {
    let venue_id = control.venue_id;
    let payload = PlaybackControlEvent {
        control: control.into(),
    };
    send_event(state, venue_id, EVENT_PLAYBACK_CONTROL, &payload);
}

/// Push a directive to the venue's display.
pub fn broadcast_player_command(state: &SharedState, venue_id: Uuid, command: PlayerCommand) {
    send_event(state, venue_id, EVENT_PLAYER_COMMAND, &command);
}

/// Re-fetch the venue record and broadcast it. Store failures are logged,
/// not propagated; the mutation that triggered the refresh already happened.
pub async fn refresh_venue(state: &SharedState, venue_id: Uuid) {
    let Ok(store) = state.require_ledger_store().await else {
        return;
    };
    match store.find_venue(venue_id).await {
        Ok(Some(venue)) => broadcast_venue_updated(state, venue),
        Ok(None) => {}
        Err(err) => warn!(%venue_id, error = %err, "failed to refresh venue for broadcast"),
    }
}

/// Re-fetch the queue and broadcast it.
pub async fn refresh_queue(state: &SharedState, venue_id: Uuid) {
    let Ok(store) = state.require_ledger_store().await else {
        return;
    };
    let states = vec![QueueState::Pending, QueueState::Approved, QueueState::Playing];
    match store.list_queue(venue_id, states).await {
        Ok(entries) => broadcast_queue_changed(state, venue_id, entries),
        Err(err) => warn!(%venue_id, error = %err, "failed to refresh queue for broadcast"),
    }
}

/// Tell every connected session when the backend enters or leaves degraded
/// mode, so clients can distinguish connectivity failure from legitimately
/// empty state. Runs for the lifetime of the process.
pub async fn run_degraded_notifier(state: SharedState) {
    let mut watcher = state.degraded_watcher();

    while watcher.changed().await.is_ok() {
        let degraded = *watcher.borrow_and_update();
        match ServerEvent::json(Some(EVENT_SYSTEM_STATUS.to_string()), &SystemStatus { degraded }) {
            Ok(event) => state.changes().broadcast_all(event),
            Err(err) => warn!(error = %err, "failed to serialize system status payload"),
        }
    }
}

fn send_event(state: &SharedState, venue_id: Uuid, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.changes().broadcast(venue_id, event),
        Err(err) => warn!(event, error = %err, "failed to serialize change feed payload"),
    }
}
