

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use super::base::{Event, INVALIDATE_COUNTS};
use super::bus::EventBus;
use crate::core::error::NotificationError;


#[async_trait]
pub trait Notifier: Send + Sync {

    async fn invalidate_counts(&self, entity: &str, run_id: Uuid) -> Result<(), NotificationError>;
}


#[async_trait]
impl Notifier for Arc<dyn Notifier> {
    async fn invalidate_counts(&self, entity: &str, run_id: Uuid) -> Result<(), NotificationError> {
        (**self).invalidate_counts(entity, run_id).await
    }
}


pub struct EventBusNotifier {
    bus: Arc<EventBus>,
    require_subscriber: bool,
}

impl EventBusNotifier {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            require_subscriber: false,
        }
    }


    /// Treat an emit that reaches no handler as a failed delivery.
    pub fn require_subscriber(mut self) -> Self {
        self.require_subscriber = true;
        self
    }
}

#[async_trait]
impl Notifier for EventBusNotifier {
    async fn invalidate_counts(&self, entity: &str, run_id: Uuid) -> Result<(), NotificationError> {
        let event = Event::new(INVALIDATE_COUNTS, json!({ "entity": entity })).with_correlation(run_id);
        let delivered = self.bus.publish(event);
        debug!("Count invalidation for {} delivered to {} handlers", entity, delivered);

        if delivered == 0 && self.require_subscriber {
            return Err(NotificationError::Undelivered(INVALIDATE_COUNTS.to_string()));
        }
        Ok(())
    }
}


pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn invalidate_counts(&self, _entity: &str, _run_id: Uuid) -> Result<(), NotificationError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::EventHandler;
    use parking_lot::Mutex;

    #[tokio::test]
    async fn test_notifier_carries_entity_and_run_id() {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let handler: EventHandler = Arc::new(move |event: &Event| {
            seen_clone.lock().push(event.clone());
        });
        bus.subscribe(INVALIDATE_COUNTS, handler);

        let run_id = Uuid::new_v4();
        let notifier = EventBusNotifier::new(Arc::clone(&bus));
        notifier.invalidate_counts("Acme", run_id).await.unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].payload["entity"], "Acme");
        assert_eq!(seen[0].correlation_id, Some(run_id));
        assert_eq!(bus.journal(INVALIDATE_COUNTS)[0].event_id, seen[0].event_id);
    }

    #[tokio::test]
    async fn test_required_subscriber_missing() {
        let bus = Arc::new(EventBus::new());
        let notifier = EventBusNotifier::new(Arc::clone(&bus)).require_subscriber();
        let result = notifier.invalidate_counts("Acme", Uuid::new_v4()).await;
        assert!(matches!(result, Err(NotificationError::Undelivered(_))));
        assert_eq!(bus.journal(INVALIDATE_COUNTS).len(), 1);
    }
}
