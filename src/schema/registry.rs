

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::models::RecordType;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9 _-]*$").unwrap();
}


#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Metadata provider unavailable: {0}")]
    Unavailable(String),
    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("Duplicate record type: {0}")]
    Duplicate(String),
    #[error("Schema load failed: {0}")]
    Load(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}


pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}


pub fn validate_identifier(name: &str) -> Result<(), SchemaError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}


#[async_trait]
pub trait MetadataProvider: Send + Sync {

    async fn get_record_type(&self, name: &str) -> Result<Arc<RecordType>, SchemaError>;

    /// Record types with at least one link field whose target is `entity_type`.
    async fn list_record_types_referencing(&self, entity_type: &str) -> Result<Vec<String>, SchemaError>;
}


#[async_trait]
impl MetadataProvider for Arc<dyn MetadataProvider> {
    async fn get_record_type(&self, name: &str) -> Result<Arc<RecordType>, SchemaError> {
        (**self).get_record_type(name).await
    }

    async fn list_record_types_referencing(&self, entity_type: &str) -> Result<Vec<String>, SchemaError> {
        (**self).list_record_types_referencing(entity_type).await
    }
}


#[derive(Debug, Serialize, Deserialize)]
pub struct SchemaFile {
    pub record_types: Vec<RecordType>,
}


/// Immutable, loaded-once map of record type descriptors.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    record_types: HashMap<String, Arc<RecordType>>,
}

impl SchemaRegistry {
    pub fn new(record_types: Vec<RecordType>) -> Result<Self, SchemaError> {
        let mut map = HashMap::with_capacity(record_types.len());

        for record_type in record_types {
            validate_identifier(&record_type.name)?;
            for field in &record_type.fields {
                validate_identifier(&field.name)?;
                if field.field_type.references_record_type() {
                    if let Some(target) = field.options.as_deref().filter(|t| !t.is_empty()) {
                        validate_identifier(target)?;
                    }
                }
            }

            if map.contains_key(&record_type.name) {
                return Err(SchemaError::Duplicate(record_type.name));
            }
            map.insert(record_type.name.clone(), Arc::new(record_type));
        }

        debug!("Schema registry built with {} record types", map.len());
        Ok(Self { record_types: map })
    }


    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile = serde_json::from_str(json)?;
        Self::new(file.record_types)
    }


    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path)?;
        let registry = Self::from_json(&content)
            .map_err(|e| SchemaError::Load(format!("{}: {}", path.display(), e)))?;
        info!("Loaded {} record types from {}", registry.len(), path.display());
        Ok(registry)
    }


    pub fn get(&self, name: &str) -> Option<&Arc<RecordType>> {
        self.record_types.get(name)
    }


    pub fn len(&self) -> usize {
        self.record_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_types.is_empty()
    }


    pub fn referencing(&self, entity_type: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .record_types
            .values()
            .filter(|rt| rt.references(entity_type))
            .map(|rt| rt.name.clone())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl MetadataProvider for SchemaRegistry {
    async fn get_record_type(&self, name: &str) -> Result<Arc<RecordType>, SchemaError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownRecordType(name.to_string()))
    }

    async fn list_record_types_referencing(&self, entity_type: &str) -> Result<Vec<String>, SchemaError> {
        Ok(self.referencing(entity_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::models::{FieldDef, FieldType};

    #[test]
    fn test_identifier_rules() {
        assert!(is_valid_identifier("Sales Order"));
        assert!(is_valid_identifier("naming_series"));
        assert!(is_valid_identifier("POS-Profile"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("Order`; drop table"));
        assert!(!is_valid_identifier("tab\"x"));
    }

    #[test]
    fn test_registry_rejects_bad_field_name() {
        let rt = RecordType::new("Sales Invoice").field(FieldDef::new("company`=1", FieldType::Data));
        assert!(matches!(
            SchemaRegistry::new(vec![rt]),
            Err(SchemaError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_registry_rejects_bad_link_target() {
        let rt = RecordType::new("Sales Invoice").field(FieldDef::link("company", "Company; --"));
        assert!(SchemaRegistry::new(vec![rt]).is_err());
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let result = SchemaRegistry::new(vec![RecordType::new("Lead"), RecordType::new("Lead")]);
        assert!(matches!(result, Err(SchemaError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_referencing_sorted() {
        let registry = SchemaRegistry::new(vec![
            RecordType::new("Sales Invoice").field(FieldDef::link("company", "Company")),
            RecordType::new("Customer"),
            RecordType::new("Journal Entry").field(FieldDef::link("company", "Company")),
        ])
        .unwrap();

        let names = registry.list_record_types_referencing("Company").await.unwrap();
        assert_eq!(names, vec!["Journal Entry".to_string(), "Sales Invoice".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_record_type() {
        let registry = SchemaRegistry::default();
        let result = registry.get_record_type("Ghost").await;
        assert!(matches!(result, Err(SchemaError::UnknownRecordType(_))));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "record_types": [
                {"name": "Company", "fields": [{"name": "owner", "field_type": "Data"}]},
                {"name": "Stock Entry", "fields": [
                    {"name": "naming_series", "field_type": "Select", "options": "STE-\n"},
                    {"name": "company", "field_type": "Link", "options": "Company"},
                    {"name": "items", "field_type": "Table", "options": "Stock Entry Detail"}
                ]},
                {"name": "Stock Entry Detail", "is_table": true}
            ]
        }"#;
        let registry = SchemaRegistry::from_json(json).unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.get("Stock Entry Detail").unwrap().is_table);
        assert_eq!(registry.referencing("Company"), vec!["Stock Entry".to_string()]);
    }
}
