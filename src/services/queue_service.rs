//! Queue lifecycle operations: enqueue (which spends one screen-pool
//! credit), moderation, and the selection rule for what plays next.

use std::time::SystemTime;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        ledger_store::LedgerStore,
        models::{QueueEntryEntity, QueueState, TransactionEntity, TransactionKind, VenueEntity},
    },
    dto::{
        common::QueueEntrySnapshot,
        queue::{EnqueueRequest, QueueSnapshot},
    },
    error::ServiceError,
    services::change_events,
    state::{
        SharedState,
        queue::{QueueEvent, QueueTransition, next_transition},
    },
};

const ACTIVE_STATES: [QueueState; 3] = [
    QueueState::Pending,
    QueueState::Approved,
    QueueState::Playing,
];

/// The venue's queue grouped by state, in `(position, created_at)` order.
pub async fn get_queue(state: &SharedState, venue_id: Uuid) -> Result<QueueSnapshot, ServiceError> {
    let store = state.require_ledger_store().await?;
    if store.find_venue(venue_id).await?.is_none() {
        return Err(venue_not_found(venue_id));
    }

    let entries = store.list_queue(venue_id, ACTIVE_STATES.to_vec()).await?;
    Ok(QueueSnapshot::from_entries(entries))
}

/// Spend one screen-pool credit and insert a pending request.
///
/// The debit is an atomic conditional decrement, so two patrons racing for
/// the last credit cannot both win. If anything after the debit fails the
/// credit is refunded; the pair is never observably half-applied.
pub async fn enqueue(
    state: &SharedState,
    venue_id: Uuid,
    request: EnqueueRequest,
) -> Result<QueueEntrySnapshot, ServiceError> {
    let store = state.require_ledger_store().await?;
    let venue = store
        .find_venue(venue_id)
        .await?
        .ok_or_else(|| venue_not_found(venue_id))?;
    if !venue.active {
        return Err(ServiceError::InvalidState(
            "venue is not currently accepting requests".into(),
        ));
    }

    let consumed = store.consume_screen_credit(venue_id).await?;
    if !consumed {
        return Err(ServiceError::InsufficientCredits);
    }

    match insert_entry_with_audit(state, store.as_ref(), &venue, request).await {
        Ok(entry) => {
            info!(
                %venue_id,
                entry_id = %entry.id,
                title = %entry.title,
                "request enqueued, one credit consumed"
            );
            change_events::refresh_venue(state, venue_id).await;
            change_events::refresh_queue(state, venue_id).await;
            Ok(entry.into())
        }
        Err(err) => {
            if let Err(refund_err) = store.refund_screen_credit(venue_id).await {
                error!(
                    %venue_id,
                    error = %refund_err,
                    "failed to refund credit after enqueue failure"
                );
            }
            Err(err)
        }
    }
}

async fn insert_entry_with_audit(
    state: &SharedState,
    store: &dyn LedgerStore,
    venue: &VenueEntity,
    request: EnqueueRequest,
) -> Result<QueueEntryEntity, ServiceError> {
    // Append-to-end hint; positions are never renumbered after deletions.
    let position = store
        .list_queue(venue.id, vec![QueueState::Approved])
        .await?
        .len() as u32;

    let requester = request.requester();
    let entry = QueueEntryEntity {
        id: Uuid::new_v4(),
        venue_id: venue.id,
        video_id: request.video_id,
        title: request.title,
        thumbnail_url: request.thumbnail_url,
        channel_name: request.channel_name,
        state: QueueState::Pending,
        credit_cost: 1,
        requested_by: requester.clone(),
        position,
        created_at: SystemTime::now(),
    };
    store.insert_queue_entry(entry.clone()).await?;

    // Zero-valued audit row: the consumption is logged, not re-billed.
    let transaction = TransactionEntity {
        id: Uuid::new_v4(),
        venue_id: venue.id,
        kind: TransactionKind::Consumption,
        quantity: 1,
        unit_price: 0,
        total: 0,
        description: Some(format!("Consumed 1 credit for \"{}\"", entry.title)),
        song_title: Some(entry.title.clone()),
        requested_by: Some(requester),
        created_at: SystemTime::now(),
    };
    if let Err(err) = store.insert_transaction(transaction.clone()).await {
        if let Err(delete_err) = store.delete_queue_entry(entry.id).await {
            error!(
                entry_id = %entry.id,
                error = %delete_err,
                "failed to remove entry after audit append failure"
            );
        }
        return Err(err.into());
    }
    change_events::broadcast_transaction_appended(state, transaction);

    Ok(entry)
}

/// Moderator approves a pending request.
pub async fn approve(
    state: &SharedState,
    entry_id: Uuid,
) -> Result<QueueEntrySnapshot, ServiceError> {
    let store = state.require_ledger_store().await?;
    let mut entry = store
        .find_queue_entry(entry_id)
        .await?
        .ok_or_else(|| entry_not_found(entry_id))?;

    match next_transition(entry.state, QueueEvent::Approve)? {
        QueueTransition::To(next) => {
            store.update_queue_entry_state(entry_id, next).await?;
            entry.state = next;
        }
        QueueTransition::Removed => unreachable!("approve never removes an entry"),
    }

    info!(%entry_id, venue_id = %entry.venue_id, "request approved");
    change_events::refresh_queue(state, entry.venue_id).await;
    Ok(entry.into())
}

/// Moderator rejects a request or removes a queued entry.
///
/// The spent credit is intentionally not refunded: rejection costing a
/// credit is the spam deterrent. The consumption stays in the ledger.
pub async fn reject(state: &SharedState, entry_id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_ledger_store().await?;
    let entry = store
        .find_queue_entry(entry_id)
        .await?
        .ok_or_else(|| entry_not_found(entry_id))?;

    match next_transition(entry.state, QueueEvent::Remove)? {
        QueueTransition::Removed => {
            store.delete_queue_entry(entry_id).await?;
        }
        QueueTransition::To(_) => unreachable!("removal never re-states an entry"),
    }

    info!(
        %entry_id,
        venue_id = %entry.venue_id,
        state = entry.state.as_str(),
        "entry removed, credit not refunded"
    );
    change_events::refresh_queue(state, entry.venue_id).await;
    Ok(())
}

/// Pick the next approved entry and transition it to `playing`.
///
/// Deterministic rule: smallest `(position, created_at)` wins, so entries
/// play in request order. Returns `None` (not an error) when the approved
/// queue is empty or something is already playing.
pub async fn select_next(
    state: &SharedState,
    venue_id: Uuid,
) -> Result<Option<QueueEntryEntity>, ServiceError> {
    let store = state.require_ledger_store().await?;
    let claimed = store.claim_next_playing(venue_id).await?;

    if let Some(entry) = &claimed {
        info!(%venue_id, entry_id = %entry.id, title = %entry.title, "now playing");
        change_events::refresh_queue(state, venue_id).await;
    }

    Ok(claimed)
}

/// Remove the current `playing` entry, then select its successor.
///
/// A no-op when nothing is playing: it neither fails nor conjures a
/// `playing` entry out of nowhere.
pub async fn advance_on_completion(
    state: &SharedState,
    venue_id: Uuid,
) -> Result<Option<QueueEntryEntity>, ServiceError> {
    let store = state.require_ledger_store().await?;
    let Some(playing) = store.find_playing(venue_id).await? else {
        return Ok(None);
    };

    match next_transition(playing.state, QueueEvent::Complete)? {
        QueueTransition::Removed => {
            store.delete_queue_entry(playing.id).await?;
        }
        QueueTransition::To(_) => unreachable!("completion never re-states an entry"),
    }
    info!(%venue_id, entry_id = %playing.id, "playback finished, entry removed");

    let next = store.claim_next_playing(venue_id).await?;
    if next.is_none() {
        warn!(%venue_id, "queue ran dry after completion");
    }
    change_events::refresh_queue(state, venue_id).await;

    Ok(next)
}

fn venue_not_found(venue_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("venue `{venue_id}` not found"))
}

fn entry_not_found(entry_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("queue entry `{entry_id}` not found"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::ledger_store::memory::MemoryLedgerStore,
        dto::{
            ledger::{AccreditRequest, PurchaseStockRequest},
            venue::CreateVenueRequest,
        },
        services::{ledger_service, venue_service},
        state::AppState,
    };

    async fn test_state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .install_ledger_store(Arc::new(MemoryLedgerStore::new()))
            .await;
        state
    }

    async fn venue_with_pool(state: &SharedState, pool: u32) -> Uuid {
        let venue = venue_service::create_venue(
            state,
            CreateVenueRequest {
                name: "La Esquina".into(),
            },
        )
        .await
        .unwrap();
        if pool > 0 {
            ledger_service::purchase_stock(
                state,
                venue.id,
                PurchaseStockRequest {
                    quantity: pool,
                    unit_price: 40,
                },
            )
            .await
            .unwrap();
            ledger_service::accredit_to_screen(state, venue.id, AccreditRequest { quantity: pool })
                .await
                .unwrap();
        }
        venue.id
    }

    fn request(title: &str, requester: &str) -> EnqueueRequest {
        EnqueueRequest {
            video_id: "dQw4w9WgXcQ".into(),
            title: title.into(),
            thumbnail_url: "https://example.invalid/t.jpg".into(),
            channel_name: None,
            requested_by: Some(requester.into()),
        }
    }

    #[tokio::test]
    async fn pool_is_consumed_exactly_and_then_declines() {
        let state = test_state().await;
        let venue_id = venue_with_pool(&state, 5).await;

        for n in 0..5 {
            enqueue(&state, venue_id, request(&format!("song {n}"), "guest"))
                .await
                .unwrap();
        }

        let err = enqueue(&state, venue_id, request("one too many", "guest"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientCredits));

        let venue = venue_service::get_venue(&state, venue_id).await.unwrap();
        assert_eq!(venue.screen_pool, 0);
    }

    #[tokio::test]
    async fn concurrent_enqueues_cannot_overspend_the_last_credit() {
        let state = test_state().await;
        let venue_id = venue_with_pool(&state, 1).await;

        let (a, b) = tokio::join!(
            enqueue(&state, venue_id, request("first", "Alice")),
            enqueue(&state, venue_id, request("second", "Bob")),
        );

        let successes = [&a, &b].iter().filter(|result| result.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(
            [a, b]
                .into_iter()
                .filter_map(Result::err)
                .all(|err| matches!(err, ServiceError::InsufficientCredits))
        );

        let venue = venue_service::get_venue(&state, venue_id).await.unwrap();
        assert_eq!(venue.screen_pool, 0);
    }

    #[tokio::test]
    async fn approved_entries_play_in_request_order() {
        let state = test_state().await;
        let venue_id = venue_with_pool(&state, 3).await;

        for requester in ["Alice", "Bob", "Carol"] {
            let snapshot = enqueue(
                &state,
                venue_id,
                request(&format!("{requester}'s song"), requester),
            )
            .await
            .unwrap();
            approve(&state, snapshot.id).await.unwrap();
        }

        let first = select_next(&state, venue_id).await.unwrap().unwrap();
        assert_eq!(first.requested_by, "Alice");

        let second = advance_on_completion(&state, venue_id).await.unwrap().unwrap();
        assert_eq!(second.requested_by, "Bob");

        let third = advance_on_completion(&state, venue_id).await.unwrap().unwrap();
        assert_eq!(third.requested_by, "Carol");

        assert!(advance_on_completion(&state, venue_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn advance_without_a_playing_entry_is_a_no_op() {
        let state = test_state().await;
        let venue_id = venue_with_pool(&state, 1).await;
        let snapshot = enqueue(&state, venue_id, request("waiting", "Dana"))
            .await
            .unwrap();
        approve(&state, snapshot.id).await.unwrap();

        // Nothing is playing yet, so advancing must not start anything.
        assert!(advance_on_completion(&state, venue_id).await.unwrap().is_none());

        let queue = get_queue(&state, venue_id).await.unwrap();
        assert!(queue.now_playing.is_none());
        assert_eq!(queue.approved.len(), 1);
    }

    #[tokio::test]
    async fn at_most_one_entry_plays_per_venue() {
        let state = test_state().await;
        let venue_id = venue_with_pool(&state, 2).await;

        for title in ["a", "b"] {
            let snapshot = enqueue(&state, venue_id, request(title, "guest")).await.unwrap();
            approve(&state, snapshot.id).await.unwrap();
        }

        assert!(select_next(&state, venue_id).await.unwrap().is_some());
        // Second selection is refused while the first is still playing.
        assert!(select_next(&state, venue_id).await.unwrap().is_none());

        let queue = get_queue(&state, venue_id).await.unwrap();
        assert!(queue.now_playing.is_some());
        assert_eq!(queue.approved.len(), 1);
    }

    #[tokio::test]
    async fn rejection_deletes_the_row_without_refunding() {
        let state = test_state().await;
        let venue_id = venue_with_pool(&state, 1).await;
        let snapshot = enqueue(&state, venue_id, request("noisy request", "Eve"))
            .await
            .unwrap();

        reject(&state, snapshot.id).await.unwrap();

        let queue = get_queue(&state, venue_id).await.unwrap();
        assert!(queue.pending.is_empty());

        // Pool stays at zero: the credit bought a moderation decision.
        let venue = venue_service::get_venue(&state, venue_id).await.unwrap();
        assert_eq!(venue.screen_pool, 0);
    }

    #[tokio::test]
    async fn pending_entries_cannot_be_selected() {
        let state = test_state().await;
        let venue_id = venue_with_pool(&state, 1).await;
        enqueue(&state, venue_id, request("unmoderated", "Frank"))
            .await
            .unwrap();

        assert!(select_next(&state, venue_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn enqueue_against_an_inactive_venue_is_refused() {
        let state = test_state().await;
        let venue_id = venue_with_pool(&state, 1).await;
        venue_service::set_active(&state, venue_id, false).await.unwrap();

        let err = enqueue(&state, venue_id, request("after hours", "Grace"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        // The declined request did not burn a credit.
        let venue = venue_service::get_venue(&state, venue_id).await.unwrap();
        assert_eq!(venue.screen_pool, 1);
    }

    #[tokio::test]
    async fn consumption_is_audited_with_the_song_title() {
        let state = test_state().await;
        let venue_id = venue_with_pool(&state, 1).await;
        enqueue(&state, venue_id, request("Bohemian Rhapsody", "Henry"))
            .await
            .unwrap();

        let movements = ledger_service::recent_movements(&state, venue_id, 5)
            .await
            .unwrap();
        let consumption = movements
            .iter()
            .find(|movement| movement.kind == TransactionKind::Consumption)
            .unwrap();
        assert_eq!(consumption.song_title.as_deref(), Some("Bohemian Rhapsody"));
        assert_eq!(consumption.requested_by.as_deref(), Some("Henry"));
        assert_eq!(consumption.total, 0);
    }
}
