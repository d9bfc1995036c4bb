/// In-memory backend used by tests and the no-database dev mode.
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{
    PlaybackControlEntity, PlaybackControlUpdate, QueueEntryEntity, QueueState, TransactionEntity,
    TransactionFilter, VenueEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for venues, queues, transactions,
/// and playback control records.
///
/// Balance mutations are expressed as atomic conditional updates rather than
/// read-modify-write so concurrent patrons can never drive a balance
/// negative. The conditional methods return `false` when the guard did not
/// hold (or the venue does not exist); callers classify which.
pub trait LedgerStore: Send + Sync {
    fn create_venue(&self, venue: VenueEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_venue(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<VenueEntity>>>;
    fn list_venues(&self) -> BoxFuture<'static, StorageResult<Vec<VenueEntity>>>;
    fn update_venue_prices(
        &self,
        id: Uuid,
        buy_price: u32,
        sell_price: u32,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    fn set_venue_active(&self, id: Uuid, active: bool) -> BoxFuture<'static, StorageResult<bool>>;
    /// Delete the venue and cascade to its queue entries, transactions, and
    /// playback control record.
    fn delete_venue(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    /// `platform_stock += quantity`. `false` when the venue does not exist.
    fn add_stock(&self, venue_id: Uuid, quantity: u32) -> BoxFuture<'static, StorageResult<bool>>;
    /// `platform_stock = max(0, platform_stock - quantity)`, used when a
    /// purchase transaction is reversed out of order.
    fn deduct_stock_floored(
        &self,
        venue_id: Uuid,
        quantity: u32,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Atomically move `quantity` credits from stock to the screen pool,
    /// guarded by `platform_stock >= quantity`.
    fn accredit_credits(
        &self,
        venue_id: Uuid,
        quantity: u32,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Inverse of [`LedgerStore::accredit_credits`], guarded by
    /// `screen_pool >= quantity`. Compensation path only.
    fn revoke_accreditation(
        &self,
        venue_id: Uuid,
        quantity: u32,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Atomically decrement the screen pool by one, guarded by
    /// `screen_pool >= 1`.
    fn consume_screen_credit(&self, venue_id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// `screen_pool += 1`. Compensation path when an enqueue fails after the
    /// credit was consumed.
    fn refund_screen_credit(&self, venue_id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    fn insert_queue_entry(&self, entry: QueueEntryEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_queue_entry(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>>;
    /// Entries for a venue restricted to `states`, ordered by
    /// `(position, created_at)`.
    fn list_queue(
        &self,
        venue_id: Uuid,
        states: Vec<QueueState>,
    ) -> BoxFuture<'static, StorageResult<Vec<QueueEntryEntity>>>;
    fn update_queue_entry_state(
        &self,
        id: Uuid,
        state: QueueState,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    fn delete_queue_entry(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// The venue's current `playing` entry, if any.
    fn find_playing(
        &self,
        venue_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>>;
    /// Atomically transition the head approved entry (smallest
    /// `(position, created_at)`) to `playing` and return it.
    ///
    /// Must return `None` without mutating anything when the venue already
    /// has a `playing` entry, so at most one `playing` row can exist per
    /// venue no matter how many displays race.
    fn claim_next_playing(
        &self,
        venue_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>>;

    fn insert_transaction(
        &self,
        transaction: TransactionEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn find_transaction(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<TransactionEntity>>>;
    /// Transactions, newest first, optionally scoped to one venue and
    /// filtered by kind and creation-time bounds.
    fn list_transactions(
        &self,
        venue_id: Option<Uuid>,
        filter: TransactionFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<TransactionEntity>>>;
    fn delete_transaction(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    fn get_playback_control(
        &self,
        venue_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlaybackControlEntity>>>;
    /// Merge a partial update into the venue's control record, creating it
    /// with defaults first when absent. Returns the record after the update.
    fn upsert_playback_control(
        &self,
        venue_id: Uuid,
        update: PlaybackControlUpdate,
    ) -> BoxFuture<'static, StorageResult<PlaybackControlEntity>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
