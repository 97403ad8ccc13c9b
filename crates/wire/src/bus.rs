// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Event Bus (§4.7): a process-local broadcast hub. Durable persistence
//! happens inline at the point each event is produced (the PTY Supervisor and
//! Scheduler write to the store before calling [`EventPublisher::publish`]),
//! so the bus itself only needs to fan the already-durable event out to the
//! dashboard broadcaster and the recovery listener — it is not itself a
//! subscriber on the write path.

use gsdh_core::event::{Event, EventPublisher};
use tokio::sync::broadcast;

/// Broadcast channel capacity. A lagging subscriber drops old events rather
/// than block the publisher (§5 backpressure policy).
const CHANNEL_CAPACITY: usize = 1024;

pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Spawn a task that logs a line for every `recovery:complete` event,
    /// matching the one wired-in diagnostic consumer named in §4.7.
    pub fn spawn_recovery_listener(&self) {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(Event::RecoveryComplete { orphaned_count, recovered, at }) => {
                        let recovered_sessions: Vec<String> = recovered.iter().map(|r| r.session.to_string()).collect();
                        tracing::info!(orphaned_count, at, recovered = ?recovered_sessions, "recovery complete");
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "recovery listener dropped events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: Event) {
        // No receivers is the common case between dashboard connections; a
        // failed send here just means nobody is listening right now.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsdh_core::session::{SessionId, SlotId};

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(Event::SessionStarted { session: SessionId::new(), slot: SlotId(1), at: 0 });
        let received = rx.recv().await.unwrap();
        assert!(matches!(received, Event::SessionStarted { .. }));
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(Event::RecoveryComplete { orphaned_count: 0, recovered: vec![], at: 0 });
    }
}
