use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::trace;
use uuid::Uuid;

use crate::event::{destination_key, HubEvent};

const DESTINATION_QUEUE_DEPTH: usize = 64;

/// In-process pub/sub for the hub. Two kinds of listener:
///
/// - dashboard: every event, fed by a broadcast channel so any number of
///   connected dashboards can subscribe independently.
/// - per-destination: only events addressed to one (league, bbs_index),
///   fed by bounded mpsc queues kept in a registry. Delivery is best
///   effort — a full or disconnected queue is dropped from the registry
///   silently rather than surfaced as an error.
pub struct EventBus {
    dashboard: tokio::sync::broadcast::Sender<HubEvent>,
    destinations: Mutex<HashMap<String, Vec<mpsc::Sender<HubEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        let (dashboard, _rx) = tokio::sync::broadcast::channel(1024);
        Self {
            dashboard,
            destinations: Mutex::new(HashMap::new()),
        }
    }

    /// Publish an event to every dashboard listener and, if addressed,
    /// the matching per-destination listeners.
    pub fn publish(&self, event: HubEvent) {
        // Dashboard channel: a SendError here just means no one is
        // listening right now, which is expected and not an error.
        let _ = self.dashboard.send(event.clone());

        if let Some(key) = event.destination_key() {
            let mut destinations = self.destinations.lock().expect("event bus mutex poisoned");
            if let Some(senders) = destinations.get_mut(&key) {
                senders.retain(|tx| match tx.try_send(event.clone()) {
                    Ok(()) => true,
                    Err(_) => {
                        trace!(destination = %key, "dropping unresponsive event listener");
                        false
                    }
                });
                if senders.is_empty() {
                    destinations.remove(&key);
                }
            }
        }
    }

    pub fn subscribe_dashboard(&self) -> tokio::sync::broadcast::Receiver<HubEvent> {
        self.dashboard.subscribe()
    }

    /// Subscribe to events addressed to one destination (league + bbs_index).
    pub fn subscribe_destination(
        &self,
        league_id: Uuid,
        dest_bbs_index: &str,
    ) -> mpsc::Receiver<HubEvent> {
        let (tx, rx) = mpsc::channel(DESTINATION_QUEUE_DEPTH);
        let key = destination_key(league_id, dest_bbs_index);
        self.destinations
            .lock()
            .expect("event bus mutex poisoned")
            .entry(key)
            .or_default()
            .push(tx);
        rx
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_upload(league_id: Uuid, dest: &str) -> HubEvent {
        HubEvent::PacketUploaded {
            packet_id: Uuid::new_v4(),
            filename: "555B0201.001".to_string(),
            league_id,
            source_bbs_index: "02".to_string(),
            dest_bbs_index: dest.to_string(),
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn dashboard_listener_sees_every_event() {
        let bus = EventBus::new();
        let mut dash = bus.subscribe_dashboard();
        let league_id = Uuid::new_v4();

        bus.publish(sample_upload(league_id, "01"));
        let received = dash.recv().await.unwrap();
        assert!(matches!(received, HubEvent::PacketUploaded { .. }));
    }

    #[tokio::test]
    async fn destination_listener_only_sees_its_own_route() {
        let bus = EventBus::new();
        let league_id = Uuid::new_v4();
        let mut mine = bus.subscribe_destination(league_id, "01");
        let mut other = bus.subscribe_destination(league_id, "02");

        bus.publish(sample_upload(league_id, "01"));

        let received = mine.try_recv().unwrap();
        assert!(matches!(received, HubEvent::PacketUploaded { .. }));
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_destination_receiver_is_deregistered_on_next_publish() {
        let bus = EventBus::new();
        let league_id = Uuid::new_v4();
        let rx = bus.subscribe_destination(league_id, "01");
        drop(rx);

        bus.publish(sample_upload(league_id, "01"));
        assert!(bus.destinations.lock().unwrap().is_empty());
    }
}
