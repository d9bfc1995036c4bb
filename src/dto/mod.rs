use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

#[cfg(feature = "youtube-catalog")]
pub mod catalog;
pub mod common;
pub mod health;
pub mod ledger;
pub mod playback;
pub mod queue;
pub mod sse;
pub mod validation;
pub mod venue;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
