

use tracing::{debug, info};

use super::models::CounterReset;
use crate::db::{NamePattern, Predicate, Storage, StorageError};
use crate::schema::RecordType;


/// Numeric tail of `name` once `prefix` is stripped; anything unparsable counts as 0.
pub fn parse_suffix(name: &str, prefix: &str) -> u64 {
    name.strip_prefix(prefix)
        .map(str::trim)
        .and_then(|suffix| suffix.parse::<u64>().ok())
        .unwrap_or(0)
}


/// Recomputes every series counter of `record_type` from the rows that remain.
///
/// Prefixes are visited longest first and each shorter prefix ignores names
/// already claimed by a longer one, so `SO-` never absorbs `SO-ORD-` rows.
///
/// A dry run writes nothing and ignores rows matching `pending`, the rows a
/// real run would have deleted by now.
pub async fn renumber(
    storage: &dyn Storage,
    record_type: &RecordType,
    dry_run: bool,
    pending: Option<&Predicate>,
) -> Result<Vec<CounterReset>, StorageError> {
    let Some(spec) = record_type.naming_series() else {
        debug!("{} has no naming series, nothing to renumber", record_type.name);
        return Ok(Vec::new());
    };

    let mut claimed: Vec<&str> = Vec::new();
    let mut resets = Vec::new();

    for prefix in spec.by_specificity() {
        let pattern = NamePattern::new(prefix)
            .excluding(claimed.iter().copied())
            .unless(pending.filter(|_| dry_run).cloned());
        let current = storage
            .find_max_name(&record_type.name, &pattern)
            .await?
            .map_or(0, |last| parse_suffix(&last, prefix));
        let previous = storage.counter(prefix).await?;

        if !dry_run {
            storage.upsert_counter(prefix, current).await?;
        }
        debug!(
            "Series {} of {}: {:?} -> {}",
            prefix, record_type.name, previous, current
        );

        resets.push(CounterReset {
            prefix: prefix.to_string(),
            previous,
            current,
        });
        claimed.push(prefix);
    }

    info!("Renumbered {} series for {}", resets.len(), record_type.name);
    Ok(resets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStorage;
    use crate::schema::FieldDef;
    use serde_json::json;

    fn sales_order(prefixes: &[&str]) -> RecordType {
        RecordType::new("Sales Order")
            .field(FieldDef::naming_series(prefixes.iter().copied()))
            .field(FieldDef::link("company", "Company"))
    }

    #[test]
    fn test_parse_suffix() {
        assert_eq!(parse_suffix("SO-0005", "SO-"), 5);
        assert_eq!(parse_suffix("SO-", "SO-"), 0);
        assert_eq!(parse_suffix("SO-ABC", "SO-"), 0);
        assert_eq!(parse_suffix("SO-12-1", "SO-"), 0);
        assert_eq!(parse_suffix("PO-0005", "SO-"), 0);
    }

    #[tokio::test]
    async fn test_longest_prefix_first() {
        let storage = InMemoryStorage::new();
        storage.insert("Sales Order", json!({"name": "SO-ORD-0005"}));
        storage.insert("Sales Order", json!({"name": "SO-0003"}));
        storage.set_counter("SO-", 40);
        storage.set_counter("SO-ORD-", 12);

        let resets = renumber(&storage, &sales_order(&["SO-", "SO-ORD-"]), false, None).await.unwrap();

        assert_eq!(resets[0].prefix, "SO-ORD-");
        assert_eq!(resets[0].previous, Some(12));
        assert_eq!(storage.counter_value("SO-ORD-"), Some(5));
        assert_eq!(storage.counter_value("SO-"), Some(3));
    }

    #[tokio::test]
    async fn test_empty_prefix_resets_to_zero() {
        let storage = InMemoryStorage::new();
        storage.insert("Sales Order", json!({"name": "SO-ORD-0005"}));
        storage.set_counter("SO-", 9);

        renumber(&storage, &sales_order(&["SO-", "SO-ORD-"]), false, None).await.unwrap();

        assert_eq!(storage.counter_value("SO-"), Some(0));
        assert_eq!(storage.counter_value("SO-ORD-"), Some(5));
    }

    #[tokio::test]
    async fn test_counter_created_when_missing() {
        let storage = InMemoryStorage::new();
        storage.insert("Sales Order", json!({"name": "SO-0042"}));

        renumber(&storage, &sales_order(&["SO-"]), false, None).await.unwrap();
        assert_eq!(storage.counter_value("SO-"), Some(42));
    }

    #[tokio::test]
    async fn test_no_series_is_noop() {
        let storage = InMemoryStorage::new();
        let resets = renumber(&storage, &RecordType::new("Bin"), false, None).await.unwrap();
        assert!(resets.is_empty());
        assert!(storage.operations().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_leaves_counters() {
        let storage = InMemoryStorage::new();
        storage.set_counter("SO-", 9);

        let resets = renumber(&storage, &sales_order(&["SO-"]), true, None).await.unwrap();
        assert_eq!(resets[0].current, 0);
        assert_eq!(storage.counter_value("SO-"), Some(9));
    }

    #[tokio::test]
    async fn test_dry_run_ignores_pending_rows() {
        let storage = InMemoryStorage::new();
        storage.insert("Sales Order", json!({"name": "SO-0005", "company": "Acme"}));
        storage.insert("Sales Order", json!({"name": "SO-0003", "company": "Globex"}));
        storage.set_counter("SO-", 5);
        let pending = Predicate::eq("company", "Acme");

        let preview = renumber(&storage, &sales_order(&["SO-"]), true, Some(&pending)).await.unwrap();
        assert_eq!(preview[0].previous, Some(5));
        assert_eq!(preview[0].current, 3);
        assert_eq!(storage.counter_value("SO-"), Some(5));

        storage.delete_where("Sales Order", &pending).await.unwrap();
        let applied = renumber(&storage, &sales_order(&["SO-"]), false, None).await.unwrap();
        assert_eq!(applied, preview);
    }
}
