

pub mod config;
pub mod error;
pub mod events;

pub use self::config::PurgeConfig;
pub use self::error::{NotificationError, PurgeError, Result};
pub use self::events::{Event, EventBus, EventBusNotifier, NoopNotifier, Notifier};
