

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::cancel::CancellationFlag;
use super::cascade::CascadeExecutor;
use super::cleanup::{delete_bins, delete_lead_addresses};
use super::models::{CleanupFailure, PurgeReport, PurgeState, RecordTypeOutcome, RecordTypeReport};
use super::resolver::{CascadeResolver, CascadeUnit};
use crate::auth::{Authorizer, Caller};
use crate::core::config::PurgeConfig;
use crate::core::error::{PurgeError, Result};
use crate::core::events::Notifier;
use crate::db::Storage;
use crate::schema::MetadataProvider;


pub const OWNER_FIELD: &str = "owner";


pub struct PurgeManager {
    config: PurgeConfig,
    provider: Arc<dyn MetadataProvider>,
    storage: Arc<dyn Storage>,
    authorizer: Arc<dyn Authorizer>,
    notifier: Arc<dyn Notifier>,
    cancellation: CancellationFlag,
}

impl PurgeManager {
    pub fn new(
        config: PurgeConfig,
        provider: Arc<dyn MetadataProvider>,
        storage: Arc<dyn Storage>,
        authorizer: Arc<dyn Authorizer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        info!(
            "Initializing PurgeManager for {} (concurrency {}, dry_run {})",
            config.entity_type,
            config.effective_concurrency(),
            config.dry_run
        );
        Self {
            config,
            provider,
            storage,
            authorizer,
            notifier,
            cancellation: CancellationFlag::new(),
        }
    }


    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }


    pub fn cancellation(&self) -> CancellationFlag {
        self.cancellation.clone()
    }


    /// Deletes every transaction of `entity_name` on behalf of `caller`.
    ///
    /// Pre-flight failures (authorization, missing entity, metadata) return `Err`
    /// before anything is touched; every descriptor the cascade needs is fetched
    /// up front. Failures inside a record type's cascade are
    /// collected in the report and never stop its siblings.
    pub async fn purge_entity_transactions(&self, caller: &Caller, entity_name: &str) -> Result<PurgeReport> {
        let run_id = Uuid::new_v4();
        let dry_run = self.config.dry_run;
        let mut report = PurgeReport::new(run_id, entity_name, dry_run);

        self.transition(&mut report, PurgeState::Authorizing);
        if let Err(e) = self.authorize(caller, entity_name).await {
            self.transition(&mut report, PurgeState::Rejected);
            warn!("Purge {} of {} rejected for {}: {}", run_id, entity_name, caller, e);
            return Err(e);
        }

        let resolver = CascadeResolver::new(Arc::clone(&self.provider))
            .with_extra_excluded(self.config.extra_excluded.iter().cloned());
        let units = resolver.resolve(&self.config.entity_type).await?;

        if !dry_run {
            warn!(
                "PURGE of all {} transactions requested by {} (run {}) - THIS IS IRREVERSIBLE!",
                entity_name, caller, run_id
            );
        }

        self.transition(&mut report, PurgeState::CleaningSpecialCases);
        self.run_cleanups(&mut report, entity_name).await;

        self.transition(&mut report, PurgeState::Cascading);
        report.record_types = self.cascade(&units, entity_name).await;

        let cancelled = report
            .record_types
            .iter()
            .any(|r| r.outcome == RecordTypeOutcome::Cancelled);

        if !dry_run {
            self.transition(&mut report, PurgeState::NotifyingDownstream);
            if let Err(e) = self.notifier.invalidate_counts(entity_name, run_id).await {
                warn!("Count invalidation after purge {} failed: {}", run_id, e);
                report.notification_error = Some(PurgeError::from(e).to_string());
            }
        }

        let terminal = if cancelled { PurgeState::Cancelled } else { PurgeState::Done };
        self.transition(&mut report, terminal);
        report.finished_at = Some(Utc::now());

        let failures = report.failures().len() + report.cleanup_failures.len();
        if failures > 0 {
            error!("Purge {} of {} finished with {} failures", run_id, entity_name, failures);
        } else {
            info!(
                "Purge {} of {} finished: {} rows across {} record types",
                run_id,
                entity_name,
                report.total_rows_deleted(),
                report.record_types.len()
            );
        }
        Ok(report)
    }


    async fn authorize(&self, caller: &Caller, entity_name: &str) -> Result<()> {
        let role = &self.config.admin_role;
        if !self.authorizer.has_role(caller, role).await {
            return Err(PurgeError::PermissionDenied(format!(
                "{} requires the {} role",
                caller, role
            )));
        }

        let entity_type = &self.config.entity_type;
        let entity = self
            .storage
            .fetch(entity_type, entity_name)
            .await?
            .ok_or_else(|| PurgeError::entity_not_found(entity_type.as_str(), entity_name))?;

        let owner = entity.get(OWNER_FIELD).and_then(Value::as_str);
        if owner != Some(caller.user_id.as_str()) {
            return Err(PurgeError::PermissionDenied(format!(
                "transactions of {} can only be deleted by its creator",
                entity_name
            )));
        }

        debug!("{} authorized to purge {}", caller, entity_name);
        Ok(())
    }


    async fn run_cleanups(&self, report: &mut PurgeReport, entity_name: &str) {
        let storage = self.storage.as_ref();
        let dry_run = self.config.dry_run;

        let (bins, addresses) = tokio::join!(
            delete_bins(storage, entity_name, dry_run),
            delete_lead_addresses(storage, entity_name, dry_run),
        );

        match bins {
            Ok(count) => report.bins_deleted = count,
            Err(e) => {
                error!("Bin cleanup for {} failed: {}", entity_name, e);
                report.cleanup_failures.push(CleanupFailure {
                    cleanup: "bins".to_string(),
                    error: e.to_string(),
                });
            }
        }
        match addresses {
            Ok(stats) => report.lead_addresses = stats,
            Err(e) => {
                error!("Lead address cleanup for {} failed: {}", entity_name, e);
                report.cleanup_failures.push(CleanupFailure {
                    cleanup: "lead_addresses".to_string(),
                    error: e.to_string(),
                });
            }
        }
    }


    async fn cascade(&self, units: &[CascadeUnit], entity_name: &str) -> Vec<RecordTypeReport> {
        let executor = CascadeExecutor::new(self.storage.as_ref(), &self.config.entity_type, self.config.dry_run);
        let executor = &executor;
        let cancellation = &self.cancellation;

        let mut reports: Vec<(usize, RecordTypeReport)> = stream::iter(units.iter().enumerate())
            .map(|(index, unit)| async move {
                if cancellation.is_cancelled() {
                    debug!("Cancelled before cascading {}", unit.name());
                    return (index, RecordTypeReport::new(unit.name(), RecordTypeOutcome::Cancelled));
                }
                (index, executor.execute(unit, entity_name).await)
            })
            .buffer_unordered(self.config.effective_concurrency())
            .collect()
            .await;

        reports.sort_by_key(|(index, _)| *index);
        reports.into_iter().map(|(_, report)| report).collect()
    }

    fn transition(&self, report: &mut PurgeReport, state: PurgeState) {
        debug!("Purge {} of {}: {} -> {}", report.run_id, report.entity, report.state, state);
        report.state = state;
    }
}
