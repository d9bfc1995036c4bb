//! In-memory [`LedgerStore`] backend.
//!
//! All tables live behind one `RwLock`, and every conditional mutation runs
//! under the write lock, so the atomicity the trait demands holds trivially.
//! Used by the service tests and as the `MEMORY_STORE=1` dev mode.

use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    ledger_store::LedgerStore,
    models::{
        PlaybackControlEntity, PlaybackControlUpdate, QueueEntryEntity, QueueState,
        TransactionEntity, TransactionFilter, VenueEntity,
    },
    storage::StorageResult,
};

/// Ledger store keeping every table in process memory.
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    inner: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    venues: IndexMap<Uuid, VenueEntity>,
    queue: IndexMap<Uuid, QueueEntryEntity>,
    transactions: IndexMap<Uuid, TransactionEntity>,
    playback: IndexMap<Uuid, PlaybackControlEntity>,
}

impl MemoryLedgerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn with_venue_mut<T>(
        &self,
        id: Uuid,
        mutate: impl FnOnce(&mut VenueEntity) -> T,
    ) -> Option<T> {
        let mut tables = self.inner.write().await;
        let venue = tables.venues.get_mut(&id)?;
        let result = mutate(venue);
        venue.updated_at = std::time::SystemTime::now();
        Some(result)
    }
}

fn queue_sort_key(entry: &QueueEntryEntity) -> (u32, std::time::SystemTime) {
    (entry.position, entry.created_at)
}

fn matches_filter(transaction: &TransactionEntity, filter: &TransactionFilter) -> bool {
    if let Some(kind) = filter.kind {
        if transaction.kind != kind {
            return false;
        }
    }
    if let Some(from) = filter.from {
        if transaction.created_at < from {
            return false;
        }
    }
    if let Some(to) = filter.to {
        if transaction.created_at > to {
            return false;
        }
    }
    true
}

impl LedgerStore for MemoryLedgerStore {
    fn create_venue(&self, venue: VenueEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.write().await;
            tables.venues.insert(venue.id, venue);
            Ok(())
        })
    }

    fn find_venue(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<VenueEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            Ok(tables.venues.get(&id).cloned())
        })
    }

    fn list_venues(&self) -> BoxFuture<'static, StorageResult<Vec<VenueEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            Ok(tables.venues.values().cloned().collect())
        })
    }

    fn update_venue_prices(
        &self,
        id: Uuid,
        buy_price: u32,
        sell_price: u32,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let updated = store
                .with_venue_mut(id, |venue| {
                    venue.buy_price = buy_price;
                    venue.sell_price = sell_price;
                })
                .await;
            Ok(updated.is_some())
        })
    }

    fn set_venue_active(&self, id: Uuid, active: bool) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let updated = store.with_venue_mut(id, |venue| venue.active = active).await;
            Ok(updated.is_some())
        })
    }

    fn delete_venue(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.write().await;
            let removed = tables.venues.shift_remove(&id).is_some();
            if removed {
                tables.queue.retain(|_, entry| entry.venue_id != id);
                tables
                    .transactions
                    .retain(|_, transaction| transaction.venue_id != id);
                tables.playback.shift_remove(&id);
            }
            Ok(removed)
        })
    }

    fn add_stock(&self, venue_id: Uuid, quantity: u32) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let updated = store
                .with_venue_mut(venue_id, |venue| {
                    venue.platform_stock = venue.platform_stock.saturating_add(quantity);
                })
                .await;
            Ok(updated.is_some())
        })
    }

    fn deduct_stock_floored(
        &self,
        venue_id: Uuid,
        quantity: u32,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let updated = store
                .with_venue_mut(venue_id, |venue| {
                    venue.platform_stock = venue.platform_stock.saturating_sub(quantity);
                })
                .await;
            Ok(updated.is_some())
        })
    }

    fn accredit_credits(
        &self,
        venue_id: Uuid,
        quantity: u32,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let applied = store
                .with_venue_mut(venue_id, |venue| {
                    if venue.platform_stock < quantity {
                        return false;
                    }
                    venue.platform_stock -= quantity;
                    venue.screen_pool += quantity;
                    true
                })
                .await;
            Ok(applied.unwrap_or(false))
        })
    }

    fn revoke_accreditation(
        &self,
        venue_id: Uuid,
        quantity: u32,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let applied = store
                .with_venue_mut(venue_id, |venue| {
                    if venue.screen_pool < quantity {
                        return false;
                    }
                    venue.screen_pool -= quantity;
                    venue.platform_stock += quantity;
                    true
                })
                .await;
            Ok(applied.unwrap_or(false))
        })
    }

    fn consume_screen_credit(&self, venue_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let applied = store
                .with_venue_mut(venue_id, |venue| {
                    if venue.screen_pool < 1 {
                        return false;
                    }
                    venue.screen_pool -= 1;
                    true
                })
                .await;
            Ok(applied.unwrap_or(false))
        })
    }

    fn refund_screen_credit(&self, venue_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let updated = store
                .with_venue_mut(venue_id, |venue| {
                    venue.screen_pool = venue.screen_pool.saturating_add(1);
                })
                .await;
            Ok(updated.is_some())
        })
    }

    fn insert_queue_entry(&self, entry: QueueEntryEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.write().await;
            tables.queue.insert(entry.id, entry);
            Ok(())
        })
    }

    fn find_queue_entry(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            Ok(tables.queue.get(&id).cloned())
        })
    }

    fn list_queue(
        &self,
        venue_id: Uuid,
        states: Vec<QueueState>,
    ) -> BoxFuture<'static, StorageResult<Vec<QueueEntryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            let mut entries: Vec<QueueEntryEntity> = tables
                .queue
                .values()
                .filter(|entry| entry.venue_id == venue_id && states.contains(&entry.state))
                .cloned()
                .collect();
            entries.sort_by_key(queue_sort_key);
            Ok(entries)
        })
    }

    fn update_queue_entry_state(
        &self,
        id: Uuid,
        state: QueueState,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.write().await;
            match tables.queue.get_mut(&id) {
                Some(entry) => {
                    entry.state = state;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn delete_queue_entry(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.write().await;
            Ok(tables.queue.shift_remove(&id).is_some())
        })
    }

    fn find_playing(
        &self,
        venue_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            Ok(tables
                .queue
                .values()
                .find(|entry| entry.venue_id == venue_id && entry.state == QueueState::Playing)
                .cloned())
        })
    }

    fn claim_next_playing(
        &self,
        venue_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.write().await;

            let already_playing = tables
                .queue
                .values()
                .any(|entry| entry.venue_id == venue_id && entry.state == QueueState::Playing);
            if already_playing {
                return Ok(None);
            }

            let next_id = tables
                .queue
                .values()
                .filter(|entry| {
                    entry.venue_id == venue_id && entry.state == QueueState::Approved
                })
                .min_by_key(|entry| queue_sort_key(entry))
                .map(|entry| entry.id);

            match next_id {
                Some(id) => {
                    let entry = tables
                        .queue
                        .get_mut(&id)
                        .expect("entry id just looked up under the same lock");
                    entry.state = QueueState::Playing;
                    Ok(Some(entry.clone()))
                }
                None => Ok(None),
            }
        })
    }

    fn insert_transaction(
        &self,
        transaction: TransactionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.write().await;
            tables.transactions.insert(transaction.id, transaction);
            Ok(())
        })
    }

    fn find_transaction(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<TransactionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            Ok(tables.transactions.get(&id).cloned())
        })
    }

    fn list_transactions(
        &self,
        venue_id: Option<Uuid>,
        filter: TransactionFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<TransactionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            let mut transactions: Vec<TransactionEntity> = tables
                .transactions
                .values()
                .filter(|transaction| {
                    venue_id.is_none_or(|id| transaction.venue_id == id)
                        && matches_filter(transaction, &filter)
                })
                .cloned()
                .collect();
            transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(transactions)
        })
    }

    fn delete_transaction(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.write().await;
            Ok(tables.transactions.shift_remove(&id).is_some())
        })
    }

    fn get_playback_control(
        &self,
        venue_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlaybackControlEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.read().await;
            Ok(tables.playback.get(&venue_id).cloned())
        })
    }

    fn upsert_playback_control(
        &self,
        venue_id: Uuid,
        update: PlaybackControlUpdate,
    ) -> BoxFuture<'static, StorageResult<PlaybackControlEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.write().await;
            let control = tables
                .playback
                .entry(venue_id)
                .or_insert_with(|| PlaybackControlEntity::with_defaults(venue_id));
            update.apply(control);
            Ok(control.clone())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn venue(stock: u32, pool: u32) -> VenueEntity {
        VenueEntity {
            id: Uuid::new_v4(),
            name: "Test Bar".into(),
            platform_stock: stock,
            screen_pool: pool,
            buy_price: 3,
            sell_price: 5,
            active: true,
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
        }
    }

    fn entry(venue_id: Uuid, position: u32, state: QueueState) -> QueueEntryEntity {
        QueueEntryEntity {
            id: Uuid::new_v4(),
            venue_id,
            video_id: "dQw4w9WgXcQ".into(),
            title: format!("song {position}"),
            thumbnail_url: "https://example.invalid/thumb.jpg".into(),
            channel_name: None,
            state,
            credit_cost: 1,
            requested_by: "guest".into(),
            position,
            created_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn accredit_is_guarded_by_available_stock() {
        let store = MemoryLedgerStore::new();
        let v = venue(10, 0);
        let id = v.id;
        store.create_venue(v).await.unwrap();

        assert!(store.accredit_credits(id, 10).await.unwrap());
        assert!(!store.accredit_credits(id, 1).await.unwrap());

        let v = store.find_venue(id).await.unwrap().unwrap();
        assert_eq!((v.platform_stock, v.screen_pool), (0, 10));
    }

    #[tokio::test]
    async fn consume_never_drives_the_pool_negative() {
        let store = MemoryLedgerStore::new();
        let v = venue(0, 1);
        let id = v.id;
        store.create_venue(v).await.unwrap();

        assert!(store.consume_screen_credit(id).await.unwrap());
        assert!(!store.consume_screen_credit(id).await.unwrap());

        let v = store.find_venue(id).await.unwrap().unwrap();
        assert_eq!(v.screen_pool, 0);
    }

    #[tokio::test]
    async fn deduct_stock_is_floored_at_zero() {
        let store = MemoryLedgerStore::new();
        let v = venue(30, 0);
        let id = v.id;
        store.create_venue(v).await.unwrap();

        assert!(store.deduct_stock_floored(id, 50).await.unwrap());

        let v = store.find_venue(id).await.unwrap().unwrap();
        assert_eq!(v.platform_stock, 0);
    }

    #[tokio::test]
    async fn claim_next_respects_position_then_creation_order() {
        let store = MemoryLedgerStore::new();
        let v = venue(0, 0);
        let venue_id = v.id;
        store.create_venue(v).await.unwrap();

        // Inserted out of order on purpose.
        let second = entry(venue_id, 1, QueueState::Approved);
        let first = entry(venue_id, 0, QueueState::Approved);
        store.insert_queue_entry(second.clone()).await.unwrap();
        store.insert_queue_entry(first.clone()).await.unwrap();

        let claimed = store.claim_next_playing(venue_id).await.unwrap().unwrap();
        assert_eq!(claimed.id, first.id);
        assert_eq!(claimed.state, QueueState::Playing);

        // A second claim is refused while the first entry is still playing.
        assert!(store.claim_next_playing(venue_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claim_next_ignores_pending_entries() {
        let store = MemoryLedgerStore::new();
        let v = venue(0, 0);
        let venue_id = v.id;
        store.create_venue(v).await.unwrap();
        store
            .insert_queue_entry(entry(venue_id, 0, QueueState::Pending))
            .await
            .unwrap();

        assert!(store.claim_next_playing(venue_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_venue_cascades() {
        let store = MemoryLedgerStore::new();
        let v = venue(0, 0);
        let venue_id = v.id;
        store.create_venue(v).await.unwrap();
        store
            .insert_queue_entry(entry(venue_id, 0, QueueState::Pending))
            .await
            .unwrap();
        store
            .upsert_playback_control(venue_id, PlaybackControlUpdate::default())
            .await
            .unwrap();

        assert!(store.delete_venue(venue_id).await.unwrap());
        assert!(
            store
                .list_queue(venue_id, vec![QueueState::Pending])
                .await
                .unwrap()
                .is_empty()
        );
        assert!(
            store
                .get_playback_control(venue_id)
                .await
                .unwrap()
                .is_none()
        );
    }
}
