use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// Per-venue change notification channel.
///
/// Each venue aggregate gets its own broadcast hub, created lazily on first
/// use. Delivery is at-least-once with no ordering guarantee across tables;
/// subscribers are expected to re-fetch full state on (re)connect. Dropping
/// the receiver is the unsubscribe.
pub struct ChangeFeed {
    hubs: DashMap<Uuid, broadcast::Sender<ServerEvent>>,
    capacity: usize,
}

impl ChangeFeed {
    /// Build the feed with the per-venue channel capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            capacity,
        }
    }

    /// Register a new subscriber for one venue's events.
    pub fn subscribe(&self, venue_id: Uuid) -> broadcast::Receiver<ServerEvent> {
        self.hubs
            .entry(venue_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Send an event to the venue's current subscribers, ignoring delivery
    /// errors. Nothing is buffered for venues nobody watches.
    pub fn broadcast(&self, venue_id: Uuid, event: ServerEvent) {
        if let Some(hub) = self.hubs.get(&venue_id) {
            let _ = hub.send(event);
        }
    }

    /// Send an event to every venue's subscribers, for system-wide news like
    /// degraded-mode flips.
    pub fn broadcast_all(&self, event: ServerEvent) {
        for hub in self.hubs.iter() {
            let _ = hub.send(event.clone());
        }
    }

    /// Drop the hub for a venue, typically after the venue itself is deleted.
    pub fn forget(&self, venue_id: Uuid) {
        self.hubs.remove(&venue_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str) -> ServerEvent {
        ServerEvent::new(Some(name.to_string()), "{}".to_string())
    }

    #[tokio::test]
    async fn events_reach_only_the_venue_subscribers() {
        let feed = ChangeFeed::new(8);
        let venue_a = Uuid::new_v4();
        let venue_b = Uuid::new_v4();

        let mut rx_a = feed.subscribe(venue_a);
        let mut rx_b = feed.subscribe(venue_b);

        feed.broadcast(venue_a, event("queue.changed"));

        let received = rx_a.recv().await.unwrap();
        assert_eq!(received.event.as_deref(), Some("queue.changed"));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_a_no_op() {
        let feed = ChangeFeed::new(8);
        feed.broadcast(Uuid::new_v4(), event("venue.updated"));
    }
}
