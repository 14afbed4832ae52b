

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::base::Event;


pub const DEFAULT_JOURNAL_CAPACITY: usize = 256;


pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;


/// In-process fan-out for the signals a purge raises once it has finished.
///
/// Handlers run inline on the publishing task in subscription order, so the
/// count returned by [`EventBus::publish`] is the number that actually saw the
/// event. The last published events are kept in a bounded journal.
pub struct EventBus {
    handlers: RwLock<HashMap<String, Vec<EventHandler>>>,
    journal: Mutex<VecDeque<Event>>,
    journal_capacity: usize,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_journal_capacity(DEFAULT_JOURNAL_CAPACITY)
    }


    #[must_use]
    pub fn with_journal_capacity(journal_capacity: usize) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            journal: Mutex::new(VecDeque::with_capacity(journal_capacity.min(DEFAULT_JOURNAL_CAPACITY))),
            journal_capacity,
        }
    }


    pub fn subscribe(&self, event_type: &str, handler: EventHandler) {
        self.handlers
            .write()
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
        debug!("Subscribed handler to {}", event_type);
    }


    pub fn subscribers(&self, event_type: &str) -> usize {
        self.handlers.read().get(event_type).map_or(0, Vec::len)
    }


    /// Delivers `event` to every subscriber of its type and journals it.
    pub fn publish(&self, event: Event) -> usize {
        // Cloned out so a handler may subscribe or publish without deadlocking.
        let handlers: Vec<EventHandler> = self
            .handlers
            .read()
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        for handler in &handlers {
            handler(&event);
        }
        debug!("Published {} to {} handlers", event.event_type, handlers.len());

        if self.journal_capacity > 0 {
            let mut journal = self.journal.lock();
            if journal.len() == self.journal_capacity {
                journal.pop_front();
            }
            journal.push_back(event);
        }
        handlers.len()
    }


    /// Journaled events of `event_type`, oldest first.
    pub fn journal(&self, event_type: &str) -> Vec<Event> {
        self.journal
            .lock()
            .iter()
            .filter(|event| event.event_type == event_type)
            .cloned()
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
