//! Per-display playback session control.
//!
//! The display drives an external embeddable player; this service decides
//! what it should load next and forwards remote-control intent (pause,
//! volume, skip) over the change feed without touching queue state.

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{PlaybackControlEntity, PlaybackControlUpdate, QueueEntryEntity},
    dto::{
        playback::{AdvanceResponse, DisplaySessionResponse, PlaybackControlSummary},
        sse::PlayerCommand,
    },
    error::ServiceError,
    services::{change_events, queue_service},
    state::{PlaybackSession, SharedState},
};

/// Bring a venue's display session online.
///
/// Creates the playback control record lazily, resumes the current `playing`
/// entry if one exists, and otherwise selects the next approved entry.
pub async fn start_session(
    state: &SharedState,
    venue_id: Uuid,
) -> Result<DisplaySessionResponse, ServiceError> {
    let store = state.require_ledger_store().await?;
    if store.find_venue(venue_id).await?.is_none() {
        return Err(venue_not_found(venue_id));
    }

    let control = store
        .upsert_playback_control(venue_id, PlaybackControlUpdate::default())
        .await?;

    let current = match store.find_playing(venue_id).await? {
        Some(entry) => Some(entry),
        None => queue_service::select_next(state, venue_id).await?,
    };

    sync_session(state, venue_id, current.as_ref());
    if let Some(entry) = &current {
        command_load(state, entry, control.volume);
    }
    info!(%venue_id, active = current.is_some(), "display session started");

    Ok(DisplaySessionResponse {
        now_playing: current.map(Into::into),
        control: control.into(),
    })
}

/// The display reported that the current video finished playing.
pub async fn playback_ended(
    state: &SharedState,
    venue_id: Uuid,
) -> Result<AdvanceResponse, ServiceError> {
    ensure_venue(state, venue_id).await?;
    advance_and_command(state, venue_id).await
}

/// The display could not load the current video. Treated exactly like a
/// natural completion so one bad catalog id never stalls the queue.
pub async fn load_failed(
    state: &SharedState,
    venue_id: Uuid,
) -> Result<AdvanceResponse, ServiceError> {
    let store = state.require_ledger_store().await?;
    if store.find_venue(venue_id).await?.is_none() {
        return Err(venue_not_found(venue_id));
    }

    if let Some(playing) = store.find_playing(venue_id).await? {
        warn!(
            %venue_id,
            entry_id = %playing.id,
            video_id = %playing.video_id,
            "player reported a load failure; skipping forward"
        );
    }

    advance_and_command(state, venue_id).await
}

/// Remote pause/resume. Forwarded to the player; queue state is untouched.
pub async fn set_paused(
    state: &SharedState,
    venue_id: Uuid,
    paused: bool,
) -> Result<PlaybackControlSummary, ServiceError> {
    ensure_venue(state, venue_id).await?;
    let store = state.require_ledger_store().await?;

    let control = store
        .upsert_playback_control(
            venue_id,
            PlaybackControlUpdate {
                paused: Some(paused),
                ..Default::default()
            },
        )
        .await?;

    change_events::broadcast_playback_control(state, control.clone());
    let command = if paused {
        PlayerCommand::Pause
    } else {
        PlayerCommand::Resume
    };
    change_events::broadcast_player_command(state, venue_id, command);

    Ok(control.into())
}

/// Remote volume change. Forwarded to the player; queue state is untouched.
pub async fn set_volume(
    state: &SharedState,
    venue_id: Uuid,
    volume: u8,
) -> Result<PlaybackControlSummary, ServiceError> {
    ensure_venue(state, venue_id).await?;
    let store = state.require_ledger_store().await?;

    let control = store
        .upsert_playback_control(
            venue_id,
            PlaybackControlUpdate {
                volume: Some(volume),
                ..Default::default()
            },
        )
        .await?;

    change_events::broadcast_playback_control(state, control.clone());
    change_events::broadcast_player_command(state, venue_id, PlayerCommand::SetVolume { volume });

    Ok(control.into())
}

/// Remote skip. Raises the edge-triggered flag, advances exactly as if the
/// player had reported completion, then clears the flag so a slow display
/// cannot act on the same edge twice.
pub async fn request_skip(
    state: &SharedState,
    venue_id: Uuid,
) -> Result<AdvanceResponse, ServiceError> {
    ensure_venue(state, venue_id).await?;
    let store = state.require_ledger_store().await?;

    let control = store
        .upsert_playback_control(
            venue_id,
            PlaybackControlUpdate {
                skip_requested: Some(true),
                ..Default::default()
            },
        )
        .await?;
    change_events::broadcast_playback_control(state, control);

    let response = advance_and_command(state, venue_id).await?;

    let cleared = store
        .upsert_playback_control(
            venue_id,
            PlaybackControlUpdate {
                skip_requested: Some(false),
                ..Default::default()
            },
        )
        .await?;
    change_events::broadcast_playback_control(state, cleared);

    Ok(response)
}

/// Current remote-control record, created lazily.
pub async fn get_control(
    state: &SharedState,
    venue_id: Uuid,
) -> Result<PlaybackControlSummary, ServiceError> {
    ensure_venue(state, venue_id).await?;
    let store = state.require_ledger_store().await?;
    let control = store
        .upsert_playback_control(venue_id, PlaybackControlUpdate::default())
        .await?;
    Ok(control.into())
}

/// Advance the queue and tell the display what to do next.
async fn advance_and_command(
    state: &SharedState,
    venue_id: Uuid,
) -> Result<AdvanceResponse, ServiceError> {
    let next = match queue_service::advance_on_completion(state, venue_id).await? {
        Some(entry) => Some(entry),
        // Nothing was playing (already removed, or a fresh display); the
        // display is free, so hand it the head of the approved queue.
        None => queue_service::select_next(state, venue_id).await?,
    };

    sync_session(state, venue_id, next.as_ref());
    match &next {
        Some(entry) => {
            let volume = current_volume(state, venue_id).await;
            command_load(state, entry, volume);
        }
        None => {
            change_events::broadcast_player_command(state, venue_id, PlayerCommand::Idle);
        }
    }

    Ok(AdvanceResponse {
        now_playing: next.map(Into::into),
    })
}

fn sync_session(state: &SharedState, venue_id: Uuid, current: Option<&QueueEntryEntity>) {
    let mut session = state
        .playback_sessions()
        .entry(venue_id)
        .or_insert_with(PlaybackSession::new);
    match current {
        Some(entry) => session.begin(entry.id),
        None => {
            session.finish();
        }
    }
}

fn command_load(state: &SharedState, entry: &QueueEntryEntity, volume: u8) {
    change_events::broadcast_player_command(
        state,
        entry.venue_id,
        PlayerCommand::Load {
            entry: entry.clone().into(),
            volume,
        },
    );
}

async fn current_volume(state: &SharedState, venue_id: Uuid) -> u8 {
    match state.require_ledger_store().await {
        Ok(store) => match store.get_playback_control(venue_id).await {
            Ok(Some(control)) => control.volume,
            _ => PlaybackControlEntity::with_defaults(venue_id).volume,
        },
        Err(_) => PlaybackControlEntity::with_defaults(venue_id).volume,
    }
}

async fn ensure_venue(state: &SharedState, venue_id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_ledger_store().await?;
    if store.find_venue(venue_id).await?.is_none() {
        return Err(venue_not_found(venue_id));
    }
    Ok(())
}

fn venue_not_found(venue_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("venue `{venue_id}` not found"))
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
            queue::EnqueueRequest,
            venue::CreateVenueRequest,
        },
        services::{ledger_service, queue_service, venue_service},
        state::AppState,
    };

    async fn test_state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .install_ledger_store(Arc::new(MemoryLedgerStore::new()))
            .await;
        state
    }

    async fn venue_with_approved_songs(state: &SharedState, titles: &[&str]) -> Uuid {
        let venue = venue_service::create_venue(
            state,
            CreateVenueRequest {
                name: "Subsuelo".into(),
            },
        )
        .await
        .unwrap();
        let quantity = titles.len() as u32 + 1;
        ledger_service::purchase_stock(
            state,
            venue.id,
            PurchaseStockRequest {
                quantity,
                unit_price: 40,
            },
        )
        .await
        .unwrap();
        ledger_service::accredit_to_screen(state, venue.id, AccreditRequest { quantity })
            .await
            .unwrap();

        for title in titles {
            let snapshot = queue_service::enqueue(
                state,
                venue.id,
                EnqueueRequest {
                    video_id: "dQw4w9WgXcQ".into(),
                    title: (*title).into(),
                    thumbnail_url: "https://example.invalid/t.jpg".into(),
                    channel_name: None,
                    requested_by: None,
                },
            )
            .await
            .unwrap();
            queue_service::approve(state, snapshot.id).await.unwrap();
        }

        venue.id
    }

    #[tokio::test]
    async fn starting_a_session_picks_up_the_queue_head() {
        let state = test_state().await;
        let venue_id = venue_with_approved_songs(&state, &["first", "second"]).await;

        let session = start_session(&state, venue_id).await.unwrap();
        assert_eq!(session.now_playing.unwrap().title, "first");
        assert_eq!(session.control.volume, 50);
    }

    #[tokio::test]
    async fn starting_a_session_with_an_empty_queue_stays_idle() {
        let state = test_state().await;
        let venue_id = venue_with_approved_songs(&state, &[]).await;

        let session = start_session(&state, venue_id).await.unwrap();
        assert!(session.now_playing.is_none());
    }

    #[tokio::test]
    async fn completion_reports_walk_the_queue_in_order() {
        let state = test_state().await;
        let venue_id = venue_with_approved_songs(&state, &["first", "second"]).await;
        start_session(&state, venue_id).await.unwrap();

        let advanced = playback_ended(&state, venue_id).await.unwrap();
        assert_eq!(advanced.now_playing.unwrap().title, "second");

        let drained = playback_ended(&state, venue_id).await.unwrap();
        assert!(drained.now_playing.is_none());
    }

    #[tokio::test]
    async fn load_failure_skips_forward_like_a_completion() {
        let state = test_state().await;
        let venue_id = venue_with_approved_songs(&state, &["broken", "working"]).await;
        start_session(&state, venue_id).await.unwrap();

        let advanced = load_failed(&state, venue_id).await.unwrap();
        assert_eq!(advanced.now_playing.unwrap().title, "working");
    }

    #[tokio::test]
    async fn skip_advances_and_clears_the_flag() {
        let state = test_state().await;
        let venue_id = venue_with_approved_songs(&state, &["first", "second"]).await;
        start_session(&state, venue_id).await.unwrap();

        let advanced = request_skip(&state, venue_id).await.unwrap();
        assert_eq!(advanced.now_playing.unwrap().title, "second");

        let control = get_control(&state, venue_id).await.unwrap();
        assert!(!control.skip_requested);
    }

    #[tokio::test]
    async fn pause_and_volume_leave_the_queue_untouched() {
        let state = test_state().await;
        let venue_id = venue_with_approved_songs(&state, &["only"]).await;
        start_session(&state, venue_id).await.unwrap();

        let paused = set_paused(&state, venue_id, true).await.unwrap();
        assert!(paused.paused);

        let loud = set_volume(&state, venue_id, 80).await.unwrap();
        assert_eq!(loud.volume, 80);

        let queue = queue_service::get_queue(&state, venue_id).await.unwrap();
        assert_eq!(queue.now_playing.unwrap().title, "only");
    }
}
