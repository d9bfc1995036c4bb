//! DTO definitions for ledger endpoints.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use time::{Date, Month, OffsetDateTime, Time, format_description::well_known::Rfc3339};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{TransactionEntity, TransactionFilter, TransactionKind},
    dto::format_system_time,
    error::ServiceError,
};

/// Payload for a platform-admin stock purchase on behalf of a venue.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PurchaseStockRequest {
    /// Credits to add to the venue's platform stock.
    #[validate(range(min = 1, max = 100_000))]
    pub quantity: u32,
    /// Price per credit charged for this purchase.
    pub unit_price: u32,
}

/// Payload moving credits from platform stock to the screen pool.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AccreditRequest {
    /// Credits to accredit to the public pool.
    #[validate(range(min = 1, max = 100_000))]
    pub quantity: u32,
}

/// Ledger entry as exposed to clients.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct TransactionSummary {
    pub id: Uuid,
    pub venue_id: Uuid,
    pub kind: TransactionKind,
    pub quantity: u32,
    pub unit_price: u32,
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
    /// RFC3339 creation timestamp.
    pub created_at: String,
}

impl From<TransactionEntity> for TransactionSummary {
    fn from(transaction: TransactionEntity) -> Self {
        Self {
            id: transaction.id,
            venue_id: transaction.venue_id,
            kind: transaction.kind,
            quantity: transaction.quantity,
            unit_price: transaction.unit_price,
            total: transaction.total,
            description: transaction.description,
            song_title: transaction.song_title,
            requested_by: transaction.requested_by,
            created_at: format_system_time(transaction.created_at),
        }
    }
}

/// Query parameters accepted when listing transactions.
///
/// `from`/`to` accept either RFC3339 timestamps or plain `YYYY-MM-DD` dates;
/// a plain `to` date is inclusive of its whole day.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TransactionFilterQuery {
    /// Restrict to one venue.
    pub venue_id: Option<Uuid>,
    /// Restrict to one transaction kind.
    pub kind: Option<TransactionKind>,
    /// Lower creation-time bound, inclusive.
    pub from: Option<String>,
    /// Upper creation-time bound, inclusive.
    pub to: Option<String>,
}

impl TransactionFilterQuery {
    /// Parse the query into the storage-level filter.
    pub fn into_filter(self) -> Result<(Option<Uuid>, TransactionFilter), ServiceError> {
        let from = self
            .from
            .as_deref()
            .map(|value| parse_bound(value, DayBound::Start))
            .transpose()?;
        let to = self
            .to
            .as_deref()
            .map(|value| parse_bound(value, DayBound::End))
            .transpose()?;

        Ok((
            self.venue_id,
            TransactionFilter {
                kind: self.kind,
                from,
                to,
            },
        ))
    }
}

#[derive(Clone, Copy)]
enum DayBound {
    Start,
    End,
}

fn parse_bound(value: &str, bound: DayBound) -> Result<SystemTime, ServiceError> {
    if let Ok(timestamp) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(timestamp.into());
    }

    let date = parse_plain_date(value).ok_or_else(|| {
        ServiceError::InvalidInput(format!(
            "invalid time bound `{value}`: expected RFC3339 or YYYY-MM-DD"
        ))
    })?;

    let time = match bound {
        DayBound::Start => Time::MIDNIGHT,
        DayBound::End => Time::from_hms(23, 59, 59).expect("constant time is valid"),
    };

    Ok(date.with_time(time).assume_utc().into())
}

fn parse_plain_date(value: &str) -> Option<Date> {
    let mut parts = value.splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u8 = parts.next()?.parse().ok()?;
    let day: u8 = parts.next()?.parse().ok()?;
    let month = Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_bounds_are_accepted() {
        let query = TransactionFilterQuery {
            from: Some("2024-05-01T10:00:00Z".into()),
            ..Default::default()
        };
        let (_, filter) = query.into_filter().unwrap();
        assert!(filter.from.is_some());
    }

    #[test]
    fn plain_end_date_covers_the_whole_day() {
        let query = TransactionFilterQuery {
            from: Some("2024-05-01".into()),
            to: Some("2024-05-01".into()),
            ..Default::default()
        };
        let (_, filter) = query.into_filter().unwrap();

        let span = filter
            .to
            .unwrap()
            .duration_since(filter.from.unwrap())
            .unwrap();
        assert_eq!(span.as_secs(), 23 * 3600 + 59 * 60 + 59);
    }

    #[test]
    fn garbage_bounds_are_rejected() {
        let query = TransactionFilterQuery {
            from: Some("yesterday".into()),
            ..Default::default()
        };
        assert!(query.into_filter().is_err());
    }
}
