

use std::collections::HashSet;
use std::sync::Arc;

use lazy_static::lazy_static;
use tracing::{debug, info};

use crate::core::error::Result;
use crate::schema::{MetadataProvider, RecordType};

lazy_static! {
    /// Shared master data that outlives any single company.
    pub static ref EXCLUDED_RECORD_TYPES: HashSet<&'static str> = [
        "Account",
        "Cost Center",
        "Warehouse",
        "Budget",
        "Party Account",
        "Employee",
        "Sales Taxes and Charges Template",
        "Purchase Taxes and Charges Template",
        "POS Profile",
        "BOM",
    ]
    .into_iter()
    .collect();
}


/// Resolved parent whose child-table delete already removes rows of another unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwningParent {
    pub record_type: String,
    pub scope_field: String,
}


/// One record type to cascade over, with every descriptor the executor needs.
#[derive(Debug, Clone)]
pub struct CascadeUnit {
    pub record_type: Arc<RecordType>,
    pub children: Vec<Arc<RecordType>>,
    pub owning_parents: Vec<OwningParent>,
}

impl CascadeUnit {
    pub fn name(&self) -> &str {
        &self.record_type.name
    }
}


pub struct CascadeResolver {
    provider: Arc<dyn MetadataProvider>,
    extra_excluded: HashSet<String>,
}

impl CascadeResolver {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            provider,
            extra_excluded: HashSet::new(),
        }
    }


    /// Adds to the built-in exclusions; the built-in set itself cannot be shrunk.
    pub fn with_extra_excluded<I, S>(mut self, record_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_excluded.extend(record_types.into_iter().map(Into::into));
        self
    }


    pub fn is_excluded(&self, record_type: &str) -> bool {
        EXCLUDED_RECORD_TYPES.contains(record_type) || self.extra_excluded.contains(record_type)
    }


    /// Record type names to cascade over, in the provider's order.
    pub async fn resolve_names(&self, entity_type: &str) -> Result<Vec<String>> {
        let referencing = self.provider.list_record_types_referencing(entity_type).await?;
        let total = referencing.len();

        let mut seen = HashSet::with_capacity(total);
        let resolved: Vec<String> = referencing
            .into_iter()
            .filter(|name| {
                let excluded = self.is_excluded(name);
                if excluded {
                    debug!("Excluding shared record type {} from cascade", name);
                }
                !excluded
            })
            .filter(|name| seen.insert(name.clone()))
            .collect();

        info!(
            "Resolved {} of {} record types referencing {}",
            resolved.len(),
            total,
            entity_type
        );
        Ok(resolved)
    }


    /// Fetches every descriptor the cascade will touch, children included.
    ///
    /// Any provider error surfaces here as `MetadataUnavailable`, before a single row is mutated.
    pub async fn resolve(&self, entity_type: &str) -> Result<Vec<CascadeUnit>> {
        let names = self.resolve_names(entity_type).await?;

        let mut descriptors = Vec::with_capacity(names.len());
        for name in &names {
            let record_type = self.provider.get_record_type(name).await?;
            let mut children = Vec::new();
            if Self::cascades_children(&record_type, entity_type) {
                for child in record_type.child_tables() {
                    children.push(self.provider.get_record_type(child).await?);
                }
            }
            descriptors.push((record_type, children));
        }

        let units: Vec<CascadeUnit> = descriptors
            .iter()
            .map(|(record_type, children)| CascadeUnit {
                record_type: Arc::clone(record_type),
                children: children.clone(),
                owning_parents: Self::owning_parents(&descriptors, &record_type.name, entity_type),
            })
            .collect();

        debug!(
            "Fetched {} descriptors for {} cascade units",
            units.iter().map(|u| 1 + u.children.len()).sum::<usize>(),
            units.len()
        );
        Ok(units)
    }

    fn cascades_children(record_type: &RecordType, entity_type: &str) -> bool {
        !record_type.is_single && !record_type.is_table && record_type.references(entity_type)
    }

    fn owning_parents(
        descriptors: &[(Arc<RecordType>, Vec<Arc<RecordType>>)],
        child: &str,
        entity_type: &str,
    ) -> Vec<OwningParent> {
        descriptors
            .iter()
            .map(|(parent, _)| parent)
            .filter(|parent| Self::cascades_children(parent, entity_type))
            .filter(|parent| parent.child_tables().any(|c| c == child))
            .filter_map(|parent| {
                parent.scope_field(entity_type).map(|scope| OwningParent {
                    record_type: parent.name.clone(),
                    scope_field: scope.name.clone(),
                })
            })
            .collect()
    }
}
