

pub mod cancel;
pub mod cascade;
pub mod cleanup;
pub mod manager;
pub mod models;
pub mod resolver;
pub mod series;

pub use cancel::CancellationFlag;
pub use cascade::CascadeExecutor;
pub use cleanup::{delete_bins, delete_lead_addresses};
pub use manager::PurgeManager;
pub use models::{
    CleanupFailure, CounterReset, FailureStage, LeadAddressStats, PurgeReport, PurgeState, RecordTypeOutcome,
    RecordTypeReport,
};
pub use resolver::{CascadeResolver, CascadeUnit, OwningParent, EXCLUDED_RECORD_TYPES};
pub use series::{parse_suffix, renumber};
