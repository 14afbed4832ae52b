

pub mod auth;
pub mod core;
pub mod db;
pub mod purge;
pub mod schema;


pub use auth::{Authorizer, Caller, StaticAuthorizer};
pub use crate::core::config::PurgeConfig;
pub use crate::core::error::{PurgeError, Result};
pub use crate::core::events::{EventBus, EventBusNotifier, NoopNotifier, Notifier};
pub use db::{InMemoryStorage, Predicate, Storage, StorageError};
pub use purge::{CancellationFlag, PurgeManager, PurgeReport, PurgeState, RecordTypeOutcome};
pub use schema::{MetadataProvider, RecordType, SchemaError, SchemaRegistry};
