use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use uuid::Uuid;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PurgeState {
    Idle,
    Authorizing,
    Rejected,
    CleaningSpecialCases,
    Cascading,
    NotifyingDownstream,
    Cancelled,
    Done,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    ChildRows,
    Rows,
    Renumber,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterReset {
    pub prefix: String,
    pub previous: Option<u64>,
    pub current: u64,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordTypeOutcome {
    Purged {
        child_rows: usize,
        rows: usize,
        counters: Vec<CounterReset>,
    },
    SkippedSingle,
    ScopeFieldMissing,
    Failed {
        stage: FailureStage,
        error: String,
        child_rows: usize,
        rows: usize,
    },
    Cancelled,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTypeReport {
    pub record_type: String,
    #[serde(flatten)]
    pub outcome: RecordTypeOutcome,
}

impl RecordTypeReport {
    pub fn new(record_type: impl Into<String>, outcome: RecordTypeOutcome) -> Self {
        Self {
            record_type: record_type.into(),
            outcome,
        }
    }


    pub fn rows_deleted(&self) -> usize {
        match &self.outcome {
            RecordTypeOutcome::Purged { child_rows, rows, .. }
            | RecordTypeOutcome::Failed { child_rows, rows, .. } => child_rows + rows,
            _ => 0,
        }
    }


    pub fn is_failure(&self) -> bool {
        matches!(
            self.outcome,
            RecordTypeOutcome::Failed { .. } | RecordTypeOutcome::ScopeFieldMissing
        )
    }
}


#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadAddressStats {
    pub leads: usize,
    pub deleted: usize,
    pub detached: usize,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupFailure {
    pub cleanup: String,
    pub error: String,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeReport {
    pub run_id: Uuid,
    pub entity: String,
    pub dry_run: bool,
    pub state: PurgeState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub bins_deleted: usize,
    pub lead_addresses: LeadAddressStats,
    pub cleanup_failures: Vec<CleanupFailure>,
    pub record_types: Vec<RecordTypeReport>,
    pub notification_error: Option<String>,
}

impl PurgeReport {
    pub fn new(run_id: Uuid, entity: &str, dry_run: bool) -> Self {
        Self {
            run_id,
            entity: entity.to_string(),
            dry_run,
            state: PurgeState::Idle,
            started_at: Utc::now(),
            finished_at: None,
            bins_deleted: 0,
            lead_addresses: LeadAddressStats::default(),
            cleanup_failures: Vec::new(),
            record_types: Vec::new(),
            notification_error: None,
        }
    }


    /// Every row removed (or, in a dry run, that would be removed).
    pub fn total_rows_deleted(&self) -> usize {
        self.bins_deleted
            + self.lead_addresses.deleted
            + self.record_types.iter().map(RecordTypeReport::rows_deleted).sum::<usize>()
    }


    pub fn failures(&self) -> Vec<&RecordTypeReport> {
        self.record_types.iter().filter(|r| r.is_failure()).collect()
    }


    pub fn is_clean(&self) -> bool {
        self.cleanup_failures.is_empty() && self.failures().is_empty() && self.state == PurgeState::Done
    }


    pub fn record_type(&self, name: &str) -> Option<&RecordTypeReport> {
        self.record_types.iter().find(|r| r.record_type == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_totals() {
        let mut report = PurgeReport::new(Uuid::new_v4(), "Acme", false);
        report.bins_deleted = 2;
        report.lead_addresses.deleted = 1;
        report.record_types.push(RecordTypeReport::new(
            "Sales Order",
            RecordTypeOutcome::Purged {
                child_rows: 4,
                rows: 2,
                counters: Vec::new(),
            },
        ));
        report.record_types.push(RecordTypeReport::new(
            "Stock Entry",
            RecordTypeOutcome::Failed {
                stage: FailureStage::Renumber,
                error: "boom".to_string(),
                child_rows: 1,
                rows: 1,
            },
        ));
        report.record_types.push(RecordTypeReport::new("Global Defaults", RecordTypeOutcome::SkippedSingle));
        report.state = PurgeState::Done;

        assert_eq!(report.total_rows_deleted(), 11);
        assert_eq!(report.failures().len(), 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_outcome_serialization() {
        let report = RecordTypeReport::new("Global Defaults", RecordTypeOutcome::SkippedSingle);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["record_type"], "Global Defaults");
        assert_eq!(json["status"], "skipped_single");
        assert_eq!(PurgeState::NotifyingDownstream.to_string(), "notifying_downstream");
    }
}
