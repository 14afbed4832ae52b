

pub mod base;
pub mod bus;
pub mod notifier;

pub use base::{Event, INVALIDATE_COUNTS};
pub use bus::{EventBus, EventHandler, DEFAULT_JOURNAL_CAPACITY};
pub use notifier::{EventBusNotifier, NoopNotifier, Notifier};
