#[cfg(feature = "youtube-catalog")]
/// External video catalog search.
pub mod catalog_service;
/// Change feed event generation.
pub mod change_events;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Credit ledger operations and transaction reporting.
pub mod ledger_service;
/// Playback session control for venue displays.
pub mod playback_service;
/// Queue lifecycle operations.
pub mod queue_service;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor.
pub mod storage_supervisor;
/// Venue management operations.
pub mod venue_service;
