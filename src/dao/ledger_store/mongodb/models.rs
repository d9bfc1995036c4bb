use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    PlaybackControlEntity, QueueEntryEntity, QueueState, TransactionEntity, TransactionKind,
    VenueEntity,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoVenueDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    name: String,
    platform_stock: i64,
    screen_pool: i64,
    buy_price: i64,
    sell_price: i64,
    active: bool,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<VenueEntity> for MongoVenueDocument {
    fn from(value: VenueEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            platform_stock: i64::from(value.platform_stock),
            screen_pool: i64::from(value.screen_pool),
            buy_price: i64::from(value.buy_price),
            sell_price: i64::from(value.sell_price),
            active: value.active,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoVenueDocument> for VenueEntity {
    fn from(value: MongoVenueDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
            platform_stock: clamp_count(value.platform_stock),
            screen_pool: clamp_count(value.screen_pool),
            buy_price: clamp_count(value.buy_price),
            sell_price: clamp_count(value.sell_price),
            active: value.active,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQueueEntryDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    venue_id: Uuid,
    video_id: String,
    title: String,
    thumbnail_url: String,
    channel_name: Option<String>,
    state: QueueState,
    credit_cost: i64,
    requested_by: String,
    position: i64,
    created_at: DateTime,
}

impl From<QueueEntryEntity> for MongoQueueEntryDocument {
    fn from(value: QueueEntryEntity) -> Self {
        Self {
            id: value.id,
            venue_id: value.venue_id,
            video_id: value.video_id,
            title: value.title,
            thumbnail_url: value.thumbnail_url,
            channel_name: value.channel_name,
            state: value.state,
            credit_cost: i64::from(value.credit_cost),
            requested_by: value.requested_by,
            position: i64::from(value.position),
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoQueueEntryDocument> for QueueEntryEntity {
    fn from(value: MongoQueueEntryDocument) -> Self {
        Self {
            id: value.id,
            venue_id: value.venue_id,
            video_id: value.video_id,
            title: value.title,
            thumbnail_url: value.thumbnail_url,
            channel_name: value.channel_name,
            state: value.state,
            credit_cost: clamp_count(value.credit_cost),
            requested_by: value.requested_by,
            position: clamp_count(value.position),
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTransactionDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    venue_id: Uuid,
    kind: TransactionKind,
    quantity: i64,
    unit_price: i64,
    total: i64,
    description: Option<String>,
    song_title: Option<String>,
    requested_by: Option<String>,
    created_at: DateTime,
}

impl From<TransactionEntity> for MongoTransactionDocument {
    fn from(value: TransactionEntity) -> Self {
        Self {
            id: value.id,
            venue_id: value.venue_id,
            kind: value.kind,
            quantity: i64::from(value.quantity),
            unit_price: i64::from(value.unit_price),
            total: value.total as i64,
            description: value.description,
            song_title: value.song_title,
            requested_by: value.requested_by,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoTransactionDocument> for TransactionEntity {
    fn from(value: MongoTransactionDocument) -> Self {
        Self {
            id: value.id,
            venue_id: value.venue_id,
            kind: value.kind,
            quantity: clamp_count(value.quantity),
            unit_price: clamp_count(value.unit_price),
            total: value.total.max(0) as u64,
            description: value.description,
            song_title: value.song_title,
            requested_by: value.requested_by,
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlaybackControlDocument {
    #[serde(rename = "_id")]
    venue_id: Uuid,
    volume: i32,
    paused: bool,
    skip_requested: bool,
}

impl From<PlaybackControlEntity> for MongoPlaybackControlDocument {
    fn from(value: PlaybackControlEntity) -> Self {
        Self {
            venue_id: value.venue_id,
            volume: i32::from(value.volume),
            paused: value.paused,
            skip_requested: value.skip_requested,
        }
    }
}

impl From<MongoPlaybackControlDocument> for PlaybackControlEntity {
    fn from(value: MongoPlaybackControlDocument) -> Self {
        Self {
            venue_id: value.venue_id,
            volume: value.volume.clamp(0, 100) as u8,
            paused: value.paused,
            skip_requested: value.skip_requested,
        }
    }
}

fn clamp_count(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
