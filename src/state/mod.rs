mod change_feed;
pub mod playback;
pub mod queue;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use crate::{config::AppConfig, dao::ledger_store::LedgerStore, error::ServiceError};

pub use self::change_feed::ChangeFeed;
pub use self::playback::PlaybackSession;

pub type SharedState = Arc<AppState>;

/// Per-venue broadcast channel capacity for the change feed.
const CHANGE_FEED_CAPACITY: usize = 16;

/// Central application state storing the ledger store handle, the change
/// feed, and per-display playback sessions.
pub struct AppState {
    config: AppConfig,
    ledger_store: RwLock<Option<Arc<dyn LedgerStore>>>,
    changes: ChangeFeed,
    playback_sessions: DashMap<Uuid, PlaybackSession>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            ledger_store: RwLock::new(None),
            changes: ChangeFeed::new(CHANGE_FEED_CAPACITY),
            playback_sessions: DashMap::new(),
            degraded: degraded_tx,
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current ledger store, if one is installed.
    pub async fn ledger_store(&self) -> Option<Arc<dyn LedgerStore>> {
        let guard = self.ledger_store.read().await;
        guard.as_ref().cloned()
    }

    /// Ledger store handle, or the degraded-mode error when none is installed.
    pub async fn require_ledger_store(&self) -> Result<Arc<dyn LedgerStore>, ServiceError> {
        self.ledger_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new ledger store implementation and leave degraded mode.
    pub async fn install_ledger_store(&self, store: Arc<dyn LedgerStore>) {
        {
            let mut guard = self.ledger_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current ledger store and enter degraded mode.
    pub async fn clear_ledger_store(&self) {
        {
            let mut guard = self.ledger_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.ledger_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Per-venue change notification channel.
    pub fn changes(&self) -> &ChangeFeed {
        &self.changes
    }

    /// Registry of playback sessions keyed by venue.
    pub fn playback_sessions(&self) -> &DashMap<Uuid, PlaybackSession> {
        &self.playback_sessions
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }
}
