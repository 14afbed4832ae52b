

use serde_json::Value;
use tracing::{debug, info};

use super::models::LeadAddressStats;
use crate::db::{Predicate, Storage, StorageError, NAME_FIELD};

pub const BIN: &str = "Bin";
pub const WAREHOUSE: &str = "Warehouse";
pub const LEAD: &str = "Lead";
pub const ADDRESS: &str = "Address";

const COMPANY_FIELD: &str = "company";
const WAREHOUSE_FIELD: &str = "warehouse";
const LEAD_FIELD: &str = "lead";
const LEAD_NAME_FIELD: &str = "lead_name";
const CUSTOMER_FIELD: &str = "customer";
const SUPPLIER_FIELD: &str = "supplier";


/// Removes stock bins held in warehouses that belong to `entity`.
pub async fn delete_bins(storage: &dyn Storage, entity: &str, dry_run: bool) -> Result<usize, StorageError> {
    let predicate = Predicate::in_select(
        WAREHOUSE_FIELD,
        WAREHOUSE,
        NAME_FIELD,
        Predicate::eq(COMPANY_FIELD, entity),
    );

    let count = if dry_run {
        storage.count_where(BIN, &predicate).await?
    } else {
        storage.delete_where(BIN, &predicate).await?
    };

    info!("{} bins under warehouses of {}", count, entity);
    Ok(count)
}


/// For each lead of `entity`: drop addresses that belong to that lead alone,
/// then clear the lead link on every address that survived.
pub async fn delete_lead_addresses(
    storage: &dyn Storage,
    entity: &str,
    dry_run: bool,
) -> Result<LeadAddressStats, StorageError> {
    let leads = storage
        .select_names(LEAD, &Predicate::eq(COMPANY_FIELD, entity))
        .await?;

    let mut stats = LeadAddressStats {
        leads: leads.len(),
        ..Default::default()
    };

    for lead in &leads {
        let linked = Predicate::eq(LEAD_FIELD, lead.as_str());
        let exclusive = Predicate::and(vec![
            linked.clone(),
            Predicate::is_blank(CUSTOMER_FIELD),
            Predicate::is_blank(SUPPLIER_FIELD),
        ]);

        let (deleted, detached) = if dry_run {
            let exclusive_count = storage.count_where(ADDRESS, &exclusive).await?;
            let linked_count = storage.count_where(ADDRESS, &linked).await?;
            (exclusive_count, linked_count.saturating_sub(exclusive_count))
        } else {
            let deleted = storage.delete_where(ADDRESS, &exclusive).await?;
            let detached = storage
                .update_where(
                    ADDRESS,
                    &linked,
                    &[(LEAD_FIELD, Value::Null), (LEAD_NAME_FIELD, Value::Null)],
                )
                .await?;
            (deleted, detached)
        };

        debug!("Lead {}: {} addresses deleted, {} detached", lead, deleted, detached);
        stats.deleted += deleted;
        stats.detached += detached;
    }

    info!(
        "Lead address cleanup for {}: {} leads, {} deleted, {} detached",
        entity, stats.leads, stats.deleted, stats.detached
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStorage;
    use serde_json::json;

    fn storage() -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        storage.insert(WAREHOUSE, json!({"name": "Stores - A", "company": "Acme"}));
        storage.insert(WAREHOUSE, json!({"name": "Stores - G", "company": "Globex"}));
        storage.insert(BIN, json!({"name": "BIN-1", "warehouse": "Stores - A", "item_code": "Bolt"}));
        storage.insert(BIN, json!({"name": "BIN-2", "warehouse": "Stores - A", "item_code": "Nut"}));
        storage.insert(BIN, json!({"name": "BIN-3", "warehouse": "Stores - G", "item_code": "Bolt"}));

        storage.insert(LEAD, json!({"name": "LEAD-1", "company": "Acme"}));
        storage.insert(LEAD, json!({"name": "LEAD-2", "company": "Globex"}));
        storage.insert(ADDRESS, json!({"name": "ADDR-1", "lead": "LEAD-1", "lead_name": "Ann", "customer": "", "supplier": null}));
        storage.insert(ADDRESS, json!({"name": "ADDR-2", "lead": "LEAD-1", "lead_name": "Ann", "customer": "CUST-1"}));
        storage.insert(ADDRESS, json!({"name": "ADDR-3", "lead": "LEAD-1", "lead_name": "Ann", "supplier": "SUP-1"}));
        storage.insert(ADDRESS, json!({"name": "ADDR-4", "lead": "LEAD-2", "lead_name": "Bob"}));
        storage
    }

    #[tokio::test]
    async fn test_delete_bins() {
        let storage = storage();
        assert_eq!(delete_bins(&storage, "Acme", false).await.unwrap(), 2);
        assert_eq!(storage.count(BIN), 1);
        assert_eq!(storage.count(WAREHOUSE), 2);
    }

    #[tokio::test]
    async fn test_lead_addresses() {
        let storage = storage();
        let stats = delete_lead_addresses(&storage, "Acme", false).await.unwrap();

        assert_eq!(
            stats,
            LeadAddressStats {
                leads: 1,
                deleted: 1,
                detached: 2
            }
        );

        let addresses = storage.rows(ADDRESS);
        assert_eq!(addresses.len(), 3);
        assert!(!addresses.iter().any(|a| a["name"] == "ADDR-1"));
        for address in addresses.iter().filter(|a| a["name"] != "ADDR-4") {
            assert!(address["lead"].is_null());
            assert!(address["lead_name"].is_null());
        }
        let other = addresses.iter().find(|a| a["name"] == "ADDR-4").unwrap();
        assert_eq!(other["lead"], "LEAD-2");
    }

    #[tokio::test]
    async fn test_lead_addresses_dry_run() {
        let storage = storage();
        let stats = delete_lead_addresses(&storage, "Acme", true).await.unwrap();
        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.detached, 2);
        assert_eq!(storage.count(ADDRESS), 4);
    }

    #[tokio::test]
    async fn test_rerun_is_noop() {
        let storage = storage();
        delete_bins(&storage, "Acme", false).await.unwrap();
        delete_lead_addresses(&storage, "Acme", false).await.unwrap();

        assert_eq!(delete_bins(&storage, "Acme", false).await.unwrap(), 0);
        let stats = delete_lead_addresses(&storage, "Acme", false).await.unwrap();
        assert_eq!(stats.deleted, 0);
        assert_eq!(stats.detached, 0);
    }
}
