

use tracing::{debug, error, info, warn};

use super::models::{FailureStage, RecordTypeOutcome, RecordTypeReport};
use super::resolver::CascadeUnit;
use super::series::renumber;
use crate::core::error::PurgeError;
use crate::db::{Predicate, Storage};


/// Deletes one record type's rows scoped to an entity: children, then parents, then renumbers.
pub struct CascadeExecutor<'a> {
    storage: &'a dyn Storage,
    entity_type: &'a str,
    dry_run: bool,
}

impl<'a> CascadeExecutor<'a> {
    pub fn new(storage: &'a dyn Storage, entity_type: &'a str, dry_run: bool) -> Self {
        Self {
            storage,
            entity_type,
            dry_run,
        }
    }


    pub async fn execute(&self, unit: &CascadeUnit, entity_name: &str) -> RecordTypeReport {
        let record_type = &unit.record_type;
        let record_type_name = unit.name();
        let report = |outcome: RecordTypeOutcome| RecordTypeReport::new(record_type_name, outcome);
        let failed = |stage: FailureStage, error: String, child_rows: usize, rows: usize| {
            error!("Cascade on {} failed at {}: {}", record_type_name, stage, error);
            report(RecordTypeOutcome::Failed {
                stage,
                error,
                child_rows,
                rows,
            })
        };

        let Some(scope_field) = record_type.scope_field(self.entity_type) else {
            let err = PurgeError::ScopeFieldMissing {
                record_type: record_type_name.to_string(),
                entity_type: self.entity_type.to_string(),
            };
            warn!("Skipping cascade: {}", err);
            return report(RecordTypeOutcome::ScopeFieldMissing);
        };

        if record_type.is_single {
            debug!("{} is a single record type, never purged by scope", record_type_name);
            return report(RecordTypeOutcome::SkippedSingle);
        }

        let scope = Predicate::eq(scope_field.name.as_str(), entity_name);

        let mut child_rows = 0;
        for child in &unit.children {
            let result = if self.dry_run {
                self.storage
                    .count_child_where(&child.name, record_type_name, &scope)
                    .await
            } else {
                self.storage
                    .delete_child_where(&child.name, record_type_name, &scope)
                    .await
            };
            match result {
                Ok(n) => {
                    debug!("{} {} rows of {} under {}", self.verb(), n, child.name, record_type_name);
                    child_rows += n;
                }
                Err(e) => return failed(FailureStage::ChildRows, e.to_string(), child_rows, 0),
            }
        }

        // Rows an owning parent's child delete has already taken.
        let taken = Self::taken_by_parents(unit, entity_name);

        let rows = if self.dry_run {
            let remaining = match &taken {
                Some(taken) => Predicate::and(vec![scope.clone(), Predicate::not(taken.clone())]),
                None => scope.clone(),
            };
            self.storage.count_where(record_type_name, &remaining).await
        } else {
            warn!(
                "Deleting {} rows where {} = {} - THIS IS IRREVERSIBLE!",
                record_type_name, scope_field.name, entity_name
            );
            self.storage.delete_where(record_type_name, &scope).await
        };
        let rows = match rows {
            Ok(n) => n,
            Err(e) => return failed(FailureStage::Rows, e.to_string(), child_rows, 0),
        };

        let pending = match taken {
            Some(taken) => Predicate::or(vec![scope, taken]),
            None => scope,
        };
        let counters = match renumber(self.storage, record_type, self.dry_run, Some(&pending)).await {
            Ok(counters) => counters,
            Err(e) => return failed(FailureStage::Renumber, e.to_string(), child_rows, rows),
        };

        info!(
            "{} {} rows and {} child rows of {} for {}",
            self.verb(),
            rows,
            child_rows,
            record_type_name,
            entity_name
        );
        report(RecordTypeOutcome::Purged {
            child_rows,
            rows,
            counters,
        })
    }

    fn taken_by_parents(unit: &CascadeUnit, entity_name: &str) -> Option<Predicate> {
        if unit.owning_parents.is_empty() {
            return None;
        }
        Some(Predicate::or(
            unit.owning_parents
                .iter()
                .map(|parent| {
                    Predicate::child_of(
                        parent.record_type.as_str(),
                        Predicate::eq(parent.scope_field.as_str(), entity_name),
                    )
                })
                .collect(),
        ))
    }

    fn verb(&self) -> &'static str {
        if self.dry_run { "Would delete" } else { "Deleted" }
    }
}
