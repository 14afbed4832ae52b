

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::predicate::{NamePattern, Predicate};


pub type Record = serde_json::Map<String, Value>;


#[derive(Debug, Error, Clone)]
pub enum StorageError {
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}


#[async_trait]
pub trait Storage: Send + Sync {

    async fn fetch(&self, record_type: &str, name: &str) -> Result<Option<Record>, StorageError>;


    async fn select_names(&self, record_type: &str, predicate: &Predicate) -> Result<Vec<String>, StorageError>;


    async fn count_where(&self, record_type: &str, predicate: &Predicate) -> Result<usize, StorageError>;


    async fn delete_where(&self, record_type: &str, predicate: &Predicate) -> Result<usize, StorageError>;


    async fn update_where(
        &self,
        record_type: &str,
        predicate: &Predicate,
        assignments: &[(&str, Value)],
    ) -> Result<usize, StorageError>;


    /// Lexicographically greatest `name` matching `pattern`.
    async fn find_max_name(&self, record_type: &str, pattern: &NamePattern) -> Result<Option<String>, StorageError>;


    async fn counter(&self, prefix: &str) -> Result<Option<u64>, StorageError>;


    async fn upsert_counter(&self, prefix: &str, value: u64) -> Result<(), StorageError>;


    async fn delete_child_where(
        &self,
        child_type: &str,
        parent_type: &str,
        parent_predicate: &Predicate,
    ) -> Result<usize, StorageError> {
        let predicate = Predicate::child_of(parent_type, parent_predicate.clone());
        self.delete_where(child_type, &predicate).await
    }


    async fn count_child_where(
        &self,
        child_type: &str,
        parent_type: &str,
        parent_predicate: &Predicate,
    ) -> Result<usize, StorageError> {
        let predicate = Predicate::child_of(parent_type, parent_predicate.clone());
        self.count_where(child_type, &predicate).await
    }
}


#[async_trait]
impl Storage for Arc<dyn Storage> {
    async fn fetch(&self, record_type: &str, name: &str) -> Result<Option<Record>, StorageError> {
        (**self).fetch(record_type, name).await
    }

    async fn select_names(&self, record_type: &str, predicate: &Predicate) -> Result<Vec<String>, StorageError> {
        (**self).select_names(record_type, predicate).await
    }

    async fn count_where(&self, record_type: &str, predicate: &Predicate) -> Result<usize, StorageError> {
        (**self).count_where(record_type, predicate).await
    }

    async fn delete_where(&self, record_type: &str, predicate: &Predicate) -> Result<usize, StorageError> {
        (**self).delete_where(record_type, predicate).await
    }

    async fn update_where(
        &self,
        record_type: &str,
        predicate: &Predicate,
        assignments: &[(&str, Value)],
    ) -> Result<usize, StorageError> {
        (**self).update_where(record_type, predicate, assignments).await
    }

    async fn find_max_name(&self, record_type: &str, pattern: &NamePattern) -> Result<Option<String>, StorageError> {
        (**self).find_max_name(record_type, pattern).await
    }

    async fn counter(&self, prefix: &str) -> Result<Option<u64>, StorageError> {
        (**self).counter(prefix).await
    }

    async fn upsert_counter(&self, prefix: &str, value: u64) -> Result<(), StorageError> {
        (**self).upsert_counter(prefix, value).await
    }

    async fn delete_child_where(
        &self,
        child_type: &str,
        parent_type: &str,
        parent_predicate: &Predicate,
    ) -> Result<usize, StorageError> {
        (**self).delete_child_where(child_type, parent_type, parent_predicate).await
    }

    async fn count_child_where(
        &self,
        child_type: &str,
        parent_type: &str,
        parent_predicate: &Predicate,
    ) -> Result<usize, StorageError> {
        (**self).count_child_where(child_type, parent_type, parent_predicate).await
    }
}
