//! Publish/subscribe for store mutations.
//!
//! Services publish after a write has succeeded; subscribers that fall
//! behind lose the oldest events rather than blocking publishers.

use tokio::sync::broadcast;

use crate::domain::AppEvent;

const DEFAULT_CAPACITY: usize = 64;

/// Broadcasts [`AppEvent`]s to every subscriber.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// New receiver seeing events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: AppEvent) {
        tracing::debug!(?event, "Publishing event");
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }
}

/// Drain everything currently queued on `rx`.
pub fn drain(rx: &mut broadcast::Receiver<AppEvent>) -> Vec<AppEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event subscriber lagged");
            }
            Err(_) => break,
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_subscribers_see_published_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let id = Uuid::new_v4();

        bus.publish(AppEvent::CvCreated(id));
        bus.publish(AppEvent::EntitlementChanged);

        assert_eq!(
            drain(&mut rx),
            vec![AppEvent::CvCreated(id), AppEvent::EntitlementChanged]
        );
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(1);
        bus.publish(AppEvent::EntitlementChanged);
    }
}
