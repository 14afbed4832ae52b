

pub mod memory;
pub mod predicate;
pub mod storage;

pub use memory::{Dataset, InMemoryStorage, StorageOp};
pub use predicate::{is_blank, NamePattern, Predicate, SubSelect, NAME_FIELD, PARENT_FIELD};
pub use storage::{Record, Storage, StorageError};
