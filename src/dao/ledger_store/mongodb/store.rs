use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime, Document, doc},
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoPlaybackControlDocument, MongoQueueEntryDocument, MongoTransactionDocument,
        MongoVenueDocument, doc_id, uuid_as_binary,
    },
};
use crate::dao::{
    ledger_store::LedgerStore,
    models::{
        PlaybackControlEntity, PlaybackControlUpdate, QueueEntryEntity, QueueState,
        TransactionEntity, TransactionFilter, VenueEntity,
    },
    storage::StorageResult,
};

const VENUE_COLLECTION: &str = "venues";
const QUEUE_COLLECTION: &str = "queue_entries";
const TRANSACTION_COLLECTION: &str = "transactions";
const PLAYBACK_COLLECTION: &str = "playback_controls";

#[derive(Clone)]
pub struct MongoLedgerStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoLedgerStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let queue = database.collection::<Document>(QUEUE_COLLECTION);
        let order_index = mongodb::IndexModel::builder()
            .keys(doc! {"venue_id": 1, "position": 1, "created_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("queue_order_idx".to_owned()))
                    .build(),
            )
            .build();
        queue
            .create_index(order_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: QUEUE_COLLECTION,
                index: "venue_id,position,created_at",
                source,
            })?;

        // Partial unique index: the store itself refuses a second `playing`
        // row per venue, whatever the callers do.
        let single_playing = mongodb::IndexModel::builder()
            .keys(doc! {"venue_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("queue_single_playing_idx".to_owned()))
                    .unique(Some(true))
                    .partial_filter_expression(Some(doc! {"state": "playing"}))
                    .build(),
            )
            .build();
        queue
            .create_index(single_playing)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: QUEUE_COLLECTION,
                index: "venue_id (state=playing)",
                source,
            })?;

        let transactions = database.collection::<Document>(TRANSACTION_COLLECTION);
        let transaction_index = mongodb::IndexModel::builder()
            .keys(doc! {"venue_id": 1, "created_at": -1})
            .options(
                IndexOptions::builder()
                    .name(Some("transaction_venue_created_idx".to_owned()))
                    .build(),
            )
            .build();
        transactions
            .create_index(transaction_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: TRANSACTION_COLLECTION,
                index: "venue_id,created_at",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn venues(&self) -> Collection<MongoVenueDocument> {
        self.database().await.collection(VENUE_COLLECTION)
    }

    async fn queue(&self) -> Collection<MongoQueueEntryDocument> {
        self.database().await.collection(QUEUE_COLLECTION)
    }

    async fn transactions(&self) -> Collection<MongoTransactionDocument> {
        self.database().await.collection(TRANSACTION_COLLECTION)
    }

    async fn playback(&self) -> Collection<MongoPlaybackControlDocument> {
        self.database().await.collection(PLAYBACK_COLLECTION)
    }

    /// Apply a guarded `$inc` to a venue's balances; `false` when the guard
    /// (or the venue itself) did not match.
    async fn adjust_balances(
        &self,
        venue_id: Uuid,
        mut filter: Document,
        increments: Document,
    ) -> MongoResult<bool> {
        filter.insert("_id", uuid_as_binary(venue_id));
        let update = doc! {
            "$inc": increments,
            "$currentDate": {"updated_at": true},
        };
        let result = self
            .venues()
            .await
            .update_one(filter, update)
            .await
            .map_err(|source| MongoDaoError::AdjustBalances {
                id: venue_id,
                source,
            })?;
        Ok(result.matched_count > 0)
    }

    async fn find_venue(&self, id: Uuid) -> MongoResult<Option<VenueEntity>> {
        let document = self
            .venues()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadVenue { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn delete_venue(&self, id: Uuid) -> MongoResult<bool> {
        let result = self
            .venues()
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::DeleteVenue { id, source })?;

        if result.deleted_count == 0 {
            return Ok(false);
        }

        let venue_filter = doc! {"venue_id": uuid_as_binary(id)};
        self.queue()
            .await
            .delete_many(venue_filter.clone())
            .await
            .map_err(|source| MongoDaoError::DeleteVenue { id, source })?;
        self.transactions()
            .await
            .delete_many(venue_filter)
            .await
            .map_err(|source| MongoDaoError::DeleteVenue { id, source })?;
        self.playback()
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::DeleteVenue { id, source })?;

        Ok(true)
    }

    async fn list_queue(
        &self,
        venue_id: Uuid,
        states: Vec<QueueState>,
    ) -> MongoResult<Vec<QueueEntryEntity>> {
        let state_names: Vec<&str> = states.iter().map(QueueState::as_str).collect();
        let documents: Vec<MongoQueueEntryDocument> = self
            .queue()
            .await
            .find(doc! {
                "venue_id": uuid_as_binary(venue_id),
                "state": {"$in": state_names},
            })
            .sort(doc! {"position": 1, "created_at": 1})
            .await
            .map_err(|source| MongoDaoError::ListQueue { venue_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListQueue { venue_id, source })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn find_playing(&self, venue_id: Uuid) -> MongoResult<Option<QueueEntryEntity>> {
        let document = self
            .queue()
            .await
            .find_one(doc! {
                "venue_id": uuid_as_binary(venue_id),
                "state": QueueState::Playing.as_str(),
            })
            .await
            .map_err(|source| MongoDaoError::ListQueue { venue_id, source })?;
        Ok(document.map(Into::into))
    }

    async fn claim_next_playing(&self, venue_id: Uuid) -> MongoResult<Option<QueueEntryEntity>> {
        if self.find_playing(venue_id).await?.is_some() {
            return Ok(None);
        }

        // Racing displays are caught by the partial unique index: the losing
        // update errors instead of producing a second playing row.
        let claimed = self
            .queue()
            .await
            .find_one_and_update(
                doc! {
                    "venue_id": uuid_as_binary(venue_id),
                    "state": QueueState::Approved.as_str(),
                },
                doc! {"$set": {"state": QueueState::Playing.as_str()}},
            )
            .sort(doc! {"position": 1, "created_at": 1})
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::ClaimNextPlaying { venue_id, source })?;

        Ok(claimed.map(Into::into))
    }

    async fn list_transactions(
        &self,
        venue_id: Option<Uuid>,
        filter: TransactionFilter,
    ) -> MongoResult<Vec<TransactionEntity>> {
        let mut query = Document::new();
        if let Some(id) = venue_id {
            query.insert("venue_id", uuid_as_binary(id));
        }
        if let Some(kind) = filter.kind {
            query.insert("kind", kind.as_str());
        }
        let mut created_at = Document::new();
        if let Some(from) = filter.from {
            created_at.insert("$gte", DateTime::from_system_time(from));
        }
        if let Some(to) = filter.to {
            created_at.insert("$lte", DateTime::from_system_time(to));
        }
        if !created_at.is_empty() {
            query.insert("created_at", created_at);
        }

        let documents: Vec<MongoTransactionDocument> = self
            .transactions()
            .await
            .find(query)
            .sort(doc! {"created_at": -1})
            .await
            .map_err(|source| MongoDaoError::ListTransactions { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListTransactions { source })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn upsert_playback_control(
        &self,
        venue_id: Uuid,
        update: PlaybackControlUpdate,
    ) -> MongoResult<PlaybackControlEntity> {
        let defaults = PlaybackControlEntity::with_defaults(venue_id);

        let mut set = Document::new();
        let mut set_on_insert = Document::new();
        match update.volume {
            Some(volume) => {
                set.insert("volume", i32::from(volume));
            }
            None => {
                set_on_insert.insert("volume", i32::from(defaults.volume));
            }
        }
        match update.paused {
            Some(paused) => {
                set.insert("paused", paused);
            }
            None => {
                set_on_insert.insert("paused", defaults.paused);
            }
        }
        match update.skip_requested {
            Some(skip) => {
                set.insert("skip_requested", skip);
            }
            None => {
                set_on_insert.insert("skip_requested", defaults.skip_requested);
            }
        }

        let mut modifications = Document::new();
        if !set.is_empty() {
            modifications.insert("$set", set);
        }
        if !set_on_insert.is_empty() {
            modifications.insert("$setOnInsert", set_on_insert);
        }

        let control = self
            .playback()
            .await
            .find_one_and_update(doc_id(venue_id), modifications)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::PlaybackControl { venue_id, source })?;

        Ok(control.map(Into::into).unwrap_or(defaults))
    }
}

impl LedgerStore for MongoLedgerStore {
    fn create_venue(&self, venue: VenueEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = venue.id;
            let document: MongoVenueDocument = venue.into();
            store
                .venues()
                .await
                .replace_one(doc_id(id), &document)
                .upsert(true)
                .await
                .map_err(|source| MongoDaoError::SaveVenue { id, source })?;
            Ok(())
        })
    }

    fn find_venue(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<VenueEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_venue(id).await.map_err(Into::into) })
    }

    fn list_venues(&self) -> BoxFuture<'static, StorageResult<Vec<VenueEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoVenueDocument> = store
                .venues()
                .await
                .find(doc! {})
                .sort(doc! {"created_at": -1})
                .await
                .map_err(|source| MongoDaoError::ListVenues { source })?
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::ListVenues { source })?;
            Ok(documents.into_iter().map(Into::into).collect())
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
            let result = store
                .venues()
                .await
                .update_one(
                    doc_id(id),
                    doc! {
                        "$set": {
                            "buy_price": i64::from(buy_price),
                            "sell_price": i64::from(sell_price),
                        },
                        "$currentDate": {"updated_at": true},
                    },
                )
                .await
                .map_err(|source| MongoDaoError::UpdateVenue { id, source })?;
            Ok(result.matched_count > 0)
        })
    }

    fn set_venue_active(&self, id: Uuid, active: bool) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let result = store
                .venues()
                .await
                .update_one(
                    doc_id(id),
                    doc! {
                        "$set": {"active": active},
                        "$currentDate": {"updated_at": true},
                    },
                )
                .await
                .map_err(|source| MongoDaoError::UpdateVenue { id, source })?;
            Ok(result.matched_count > 0)
        })
    }

    fn delete_venue(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_venue(id).await.map_err(Into::into) })
    }

    fn add_stock(&self, venue_id: Uuid, quantity: u32) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .adjust_balances(
                    venue_id,
                    Document::new(),
                    doc! {"platform_stock": i64::from(quantity)},
                )
                .await
                .map_err(Into::into)
        })
    }

    fn deduct_stock_floored(
        &self,
        venue_id: Uuid,
        quantity: u32,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            // Pipeline update so the floor is applied server-side in one
            // atomic step.
            let pipeline = vec![doc! {
                "$set": {
                    "platform_stock": {
                        "$max": [0, {"$subtract": ["$platform_stock", i64::from(quantity)]}],
                    },
                    "updated_at": "$$NOW",
                }
            }];
            let result = store
                .venues()
                .await
                .update_one(doc_id(venue_id), pipeline)
                .await
                .map_err(|source| MongoDaoError::AdjustBalances {
                    id: venue_id,
                    source,
                })?;
            Ok(result.matched_count > 0)
        })
    }

    fn accredit_credits(
        &self,
        venue_id: Uuid,
        quantity: u32,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .adjust_balances(
                    venue_id,
                    doc! {"platform_stock": {"$gte": i64::from(quantity)}},
                    doc! {
                        "platform_stock": -i64::from(quantity),
                        "screen_pool": i64::from(quantity),
                    },
                )
                .await
                .map_err(Into::into)
        })
    }

    fn revoke_accreditation(
        &self,
        venue_id: Uuid,
        quantity: u32,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .adjust_balances(
                    venue_id,
                    doc! {"screen_pool": {"$gte": i64::from(quantity)}},
                    doc! {
                        "screen_pool": -i64::from(quantity),
                        "platform_stock": i64::from(quantity),
                    },
                )
                .await
                .map_err(Into::into)
        })
    }

    fn consume_screen_credit(&self, venue_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .adjust_balances(
                    venue_id,
                    doc! {"screen_pool": {"$gte": 1_i64}},
                    doc! {"screen_pool": -1_i64},
                )
                .await
                .map_err(Into::into)
        })
    }

    fn refund_screen_credit(&self, venue_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .adjust_balances(venue_id, Document::new(), doc! {"screen_pool": 1_i64})
                .await
                .map_err(Into::into)
        })
    }

    fn insert_queue_entry(&self, entry: QueueEntryEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = entry.id;
            let document: MongoQueueEntryDocument = entry.into();
            store
                .queue()
                .await
                .insert_one(&document)
                .await
                .map_err(|source| MongoDaoError::SaveQueueEntry { id, source })?;
            Ok(())
        })
    }

    fn find_queue_entry(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .queue()
                .await
                .find_one(doc_id(id))
                .await
                .map_err(|source| MongoDaoError::LoadQueueEntry { id, source })?;
            Ok(document.map(Into::into))
        })
    }

    fn list_queue(
        &self,
        venue_id: Uuid,
        states: Vec<QueueState>,
    ) -> BoxFuture<'static, StorageResult<Vec<QueueEntryEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_queue(venue_id, states).await.map_err(Into::into) })
    }

    fn update_queue_entry_state(
        &self,
        id: Uuid,
        state: QueueState,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let result = store
                .queue()
                .await
                .update_one(doc_id(id), doc! {"$set": {"state": state.as_str()}})
                .await
                .map_err(|source| MongoDaoError::UpdateQueueEntry { id, source })?;
            Ok(result.matched_count > 0)
        })
    }

    fn delete_queue_entry(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let result = store
                .queue()
                .await
                .delete_one(doc_id(id))
                .await
                .map_err(|source| MongoDaoError::DeleteQueueEntry { id, source })?;
            Ok(result.deleted_count > 0)
        })
    }

    fn find_playing(
        &self,
        venue_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_playing(venue_id).await.map_err(Into::into) })
    }

    fn claim_next_playing(
        &self,
        venue_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QueueEntryEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.claim_next_playing(venue_id).await.map_err(Into::into) })
    }

    fn insert_transaction(
        &self,
        transaction: TransactionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = transaction.id;
            let document: MongoTransactionDocument = transaction.into();
            store
                .transactions()
                .await
                .insert_one(&document)
                .await
                .map_err(|source| MongoDaoError::SaveTransaction { id, source })?;
            Ok(())
        })
    }

    fn find_transaction(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<TransactionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .transactions()
                .await
                .find_one(doc_id(id))
                .await
                .map_err(|source| MongoDaoError::LoadTransaction { id, source })?;
            Ok(document.map(Into::into))
        })
    }

    fn list_transactions(
        &self,
        venue_id: Option<Uuid>,
        filter: TransactionFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<TransactionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_transactions(venue_id, filter)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_transaction(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let result = store
                .transactions()
                .await
                .delete_one(doc_id(id))
                .await
                .map_err(|source| MongoDaoError::DeleteTransaction { id, source })?;
            Ok(result.deleted_count > 0)
        })
    }

    fn get_playback_control(
        &self,
        venue_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlaybackControlEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .playback()
                .await
                .find_one(doc_id(venue_id))
                .await
                .map_err(|source| MongoDaoError::PlaybackControl { venue_id, source })?;
            Ok(document.map(Into::into))
        })
    }

    fn upsert_playback_control(
        &self,
        venue_id: Uuid,
        update: PlaybackControlUpdate,
    ) -> BoxFuture<'static, StorageResult<PlaybackControlEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .upsert_playback_control(venue_id, update)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
