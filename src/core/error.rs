

use thiserror::Error;

use crate::db::StorageError;
use crate::schema::SchemaError;


#[derive(Error, Debug)]
pub enum PurgeError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Entity not found: {entity_type} {name}")]
    EntityNotFound { entity_type: String, name: String },

    #[error("Metadata unavailable: {0}")]
    MetadataUnavailable(#[from] SchemaError),

    #[error("Record type {record_type} has no link field to {entity_type}")]
    ScopeFieldMissing {
        record_type: String,
        entity_type: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PurgeError {
    pub fn entity_not_found(entity_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::EntityNotFound {
            entity_type: entity_type.into(),
            name: name.into(),
        }
    }


    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied(_) | Self::EntityNotFound { .. } | Self::MetadataUnavailable(_)
        )
    }
}


#[derive(Error, Debug, Clone)]
pub enum NotificationError {
    #[error("No subscriber accepted the signal: {0}")]
    Undelivered(String),

    #[error("Notifier failed: {0}")]
    Failed(String),
}

impl From<config::ConfigError> for PurgeError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}


pub type Result<T> = std::result::Result<T, PurgeError>;
