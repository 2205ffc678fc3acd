use tokio::sync::broadcast;

use crate::dto::event::OutboundEvent;

/// Broadcast hub fanning outbound events to every subscribed transport sink.
pub struct EventHub {
    sender: broadcast::Sender<OutboundEvent>,
}

impl EventHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<OutboundEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    ///
    /// A session with no connected subscriber (e.g. in tests) must still make
    /// progress, so send errors are dropped.
    pub fn broadcast(&self, event: OutboundEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let hub = EventHub::new(8);
        let mut rx = hub.subscribe();

        hub.broadcast(OutboundEvent::CountdownPhase {
            seconds_remaining: 3,
        });
        hub.broadcast(OutboundEvent::CountdownCue);

        assert_eq!(
            rx.recv().await.unwrap(),
            OutboundEvent::CountdownPhase {
                seconds_remaining: 3
            }
        );
        assert_eq!(rx.recv().await.unwrap(), OutboundEvent::CountdownCue);
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_not_an_error() {
        let hub = EventHub::new(8);
        hub.broadcast(OutboundEvent::CountdownCue);
    }
}
