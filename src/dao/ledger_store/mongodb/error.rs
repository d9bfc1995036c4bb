use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save venue `{id}`")]
    SaveVenue {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load venue `{id}`")]
    LoadVenue {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list venues")]
    ListVenues {
        #[source]
        source: MongoError,
    },
    #[error("failed to update venue `{id}`")]
    UpdateVenue {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete venue `{id}`")]
    DeleteVenue {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to adjust balances for venue `{id}`")]
    AdjustBalances {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to save queue entry `{id}`")]
    SaveQueueEntry {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load queue entry `{id}`")]
    LoadQueueEntry {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list queue for venue `{venue_id}`")]
    ListQueue {
        venue_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to update queue entry `{id}`")]
    UpdateQueueEntry {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete queue entry `{id}`")]
    DeleteQueueEntry {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to claim next playing entry for venue `{venue_id}`")]
    ClaimNextPlaying {
        venue_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to save transaction `{id}`")]
    SaveTransaction {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load transaction `{id}`")]
    LoadTransaction {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list transactions")]
    ListTransactions {
        #[source]
        source: MongoError,
    },
    #[error("failed to delete transaction `{id}`")]
    DeleteTransaction {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to access playback control for venue `{venue_id}`")]
    PlaybackControl {
        venue_id: Uuid,
        #[source]
        source: MongoError,
    },
}
