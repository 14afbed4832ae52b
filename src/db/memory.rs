

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::predicate::{is_blank, NamePattern, Predicate, NAME_FIELD};
use super::storage::{Record, Storage, StorageError};
use crate::schema::is_valid_identifier;


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub tables: BTreeMap<String, Vec<Record>>,
    #[serde(default)]
    pub series: BTreeMap<String, u64>,
}


/// Mutating operation as seen by the backend, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    Delete { record_type: String, rows: usize },
    Update { record_type: String, rows: usize },
    Counter { prefix: String, value: u64 },
}


#[derive(Debug, Default)]
pub struct InMemoryStorage {
    state: RwLock<Dataset>,
    failing: RwLock<HashSet<String>>,
    ops: Mutex<Vec<StorageOp>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }


    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            state: RwLock::new(dataset),
            ..Self::default()
        }
    }


    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let dataset: Dataset =
            serde_json::from_str(json).map_err(|e| StorageError::Backend(format!("invalid dataset: {}", e)))?;
        Ok(Self::from_dataset(dataset))
    }


    pub fn from_file(path: &Path) -> Result<Self, StorageError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StorageError::Unavailable(format!("{}: {}", path.display(), e)))?;
        let storage = Self::from_json(&content)?;
        info!(
            "Loaded dataset from {} ({} tables)",
            path.display(),
            storage.state.read().tables.len()
        );
        Ok(storage)
    }


    /// Inserts a JSON object row; non-object values are ignored.
    pub fn insert(&self, record_type: &str, row: Value) {
        if let Value::Object(record) = row {
            self.state
                .write()
                .tables
                .entry(record_type.to_string())
                .or_default()
                .push(record);
        }
    }


    pub fn set_counter(&self, prefix: &str, value: u64) {
        self.state.write().series.insert(prefix.to_string(), value);
    }


    pub fn counter_value(&self, prefix: &str) -> Option<u64> {
        self.state.read().series.get(prefix).copied()
    }


    pub fn rows(&self, record_type: &str) -> Vec<Record> {
        self.state
            .read()
            .tables
            .get(record_type)
            .cloned()
            .unwrap_or_default()
    }


    pub fn count(&self, record_type: &str) -> usize {
        self.state.read().tables.get(record_type).map_or(0, Vec::len)
    }


    pub fn snapshot(&self) -> Dataset {
        self.state.read().clone()
    }


    /// Makes every mutation against `record_type` fail with a backend error.
    pub fn fail_writes_on(&self, record_type: &str) {
        self.failing.write().insert(record_type.to_string());
    }


    pub fn operations(&self) -> Vec<StorageOp> {
        self.ops.lock().clone()
    }


    fn check_identifiers<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<(), StorageError> {
        for name in names {
            if !is_valid_identifier(name) {
                return Err(StorageError::InvalidIdentifier(name.to_string()));
            }
        }
        Ok(())
    }

    fn check_predicate(&self, record_type: &str, predicate: &Predicate) -> Result<(), StorageError> {
        self.check_identifiers(std::iter::once(record_type).chain(predicate.identifiers()))
    }

    fn check_writable(&self, record_type: &str) -> Result<(), StorageError> {
        if self.failing.read().contains(record_type) {
            return Err(StorageError::Backend(format!("write to {} rejected", record_type)));
        }
        Ok(())
    }

    fn record(&self, op: StorageOp) {
        self.ops.lock().push(op);
    }
}


enum Compiled<'a> {
    Eq(&'a str, &'a Value),
    IsBlank(&'a str),
    In(&'a str, Vec<Value>),
    And(Vec<Compiled<'a>>),
    Or(Vec<Compiled<'a>>),
    Not(Box<Compiled<'a>>),
}

impl<'a> Compiled<'a> {
    fn new(predicate: &'a Predicate, dataset: &Dataset) -> Self {
        match predicate {
            Predicate::Eq { field, value } => Self::Eq(field, value),
            Predicate::IsBlank { field } => Self::IsBlank(field),
            Predicate::In { field, select } => {
                let filter = Compiled::new(&select.filter, dataset);
                let values = dataset
                    .tables
                    .get(&select.record_type)
                    .map(|rows| {
                        rows.iter()
                            .filter(|row| filter.matches(row))
                            .filter_map(|row| row.get(&select.field))
                            .filter(|v| !v.is_null())
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                Self::In(field, values)
            }
            Predicate::And(predicates) => {
                Self::And(predicates.iter().map(|p| Compiled::new(p, dataset)).collect())
            }
            Predicate::Or(predicates) => {
                Self::Or(predicates.iter().map(|p| Compiled::new(p, dataset)).collect())
            }
            Predicate::Not(predicate) => Self::Not(Box::new(Compiled::new(predicate, dataset))),
        }
    }

    fn matches(&self, row: &Record) -> bool {
        match self {
            Self::Eq(field, value) => row.get(*field) == Some(*value),
            Self::IsBlank(field) => is_blank(row.get(*field)),
            Self::In(field, values) => row.get(*field).is_some_and(|v| values.contains(v)),
            Self::And(predicates) => predicates.iter().all(|p| p.matches(row)),
            Self::Or(predicates) => predicates.iter().any(|p| p.matches(row)),
            Self::Not(predicate) => !predicate.matches(row),
        }
    }
}

fn row_name(row: &Record) -> Option<&str> {
    row.get(NAME_FIELD).and_then(Value::as_str)
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn fetch(&self, record_type: &str, name: &str) -> Result<Option<Record>, StorageError> {
        self.check_identifiers([record_type])?;
        let state = self.state.read();
        Ok(state
            .tables
            .get(record_type)
            .and_then(|rows| rows.iter().find(|row| row_name(row) == Some(name)))
            .cloned())
    }

    async fn select_names(&self, record_type: &str, predicate: &Predicate) -> Result<Vec<String>, StorageError> {
        self.check_predicate(record_type, predicate)?;
        let state = self.state.read();
        let compiled = Compiled::new(predicate, &state);
        Ok(state
            .tables
            .get(record_type)
            .map(|rows| {
                rows.iter()
                    .filter(|row| compiled.matches(row))
                    .filter_map(row_name)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count_where(&self, record_type: &str, predicate: &Predicate) -> Result<usize, StorageError> {
        self.check_predicate(record_type, predicate)?;
        let state = self.state.read();
        let compiled = Compiled::new(predicate, &state);
        Ok(state
            .tables
            .get(record_type)
            .map_or(0, |rows| rows.iter().filter(|row| compiled.matches(row)).count()))
    }

    async fn delete_where(&self, record_type: &str, predicate: &Predicate) -> Result<usize, StorageError> {
        self.check_predicate(record_type, predicate)?;
        self.check_writable(record_type)?;

        let mut state = self.state.write();
        let doomed: Vec<usize> = {
            let compiled = Compiled::new(predicate, &state);
            state
                .tables
                .get(record_type)
                .map(|rows| {
                    rows.iter()
                        .enumerate()
                        .filter(|(_, row)| compiled.matches(row))
                        .map(|(i, _)| i)
                        .collect()
                })
                .unwrap_or_default()
        };

        if let Some(rows) = state.tables.get_mut(record_type) {
            let doomed: HashSet<usize> = doomed.iter().copied().collect();
            let mut index = 0;
            rows.retain(|_| {
                let keep = !doomed.contains(&index);
                index += 1;
                keep
            });
        }
        drop(state);

        debug!("Deleted {} rows from {}", doomed.len(), record_type);
        self.record(StorageOp::Delete {
            record_type: record_type.to_string(),
            rows: doomed.len(),
        });
        Ok(doomed.len())
    }

    async fn update_where(
        &self,
        record_type: &str,
        predicate: &Predicate,
        assignments: &[(&str, Value)],
    ) -> Result<usize, StorageError> {
        self.check_predicate(record_type, predicate)?;
        self.check_identifiers(assignments.iter().map(|(field, _)| *field))?;
        self.check_writable(record_type)?;

        let mut state = self.state.write();
        let targets: Vec<usize> = {
            let compiled = Compiled::new(predicate, &state);
            state
                .tables
                .get(record_type)
                .map(|rows| {
                    rows.iter()
                        .enumerate()
                        .filter(|(_, row)| compiled.matches(row))
                        .map(|(i, _)| i)
                        .collect()
                })
                .unwrap_or_default()
        };

        if let Some(rows) = state.tables.get_mut(record_type) {
            for &i in &targets {
                for (field, value) in assignments {
                    rows[i].insert((*field).to_string(), value.clone());
                }
            }
        }
        drop(state);

        debug!("Updated {} rows in {}", targets.len(), record_type);
        self.record(StorageOp::Update {
            record_type: record_type.to_string(),
            rows: targets.len(),
        });
        Ok(targets.len())
    }

    async fn find_max_name(&self, record_type: &str, pattern: &NamePattern) -> Result<Option<String>, StorageError> {
        match &pattern.unless {
            Some(unless) => self.check_predicate(record_type, unless)?,
            None => self.check_identifiers([record_type])?,
        }
        let state = self.state.read();
        let hidden = pattern.unless.as_ref().map(|p| Compiled::new(p, &state));
        Ok(state.tables.get(record_type).and_then(|rows| {
            rows.iter()
                .filter(|row| !hidden.as_ref().is_some_and(|h| h.matches(row)))
                .filter_map(row_name)
                .filter(|name| pattern.matches(name))
                .max()
                .map(str::to_string)
        }))
    }

    async fn counter(&self, prefix: &str) -> Result<Option<u64>, StorageError> {
        Ok(self.counter_value(prefix))
    }

    async fn upsert_counter(&self, prefix: &str, value: u64) -> Result<(), StorageError> {
        self.check_writable("Series")?;
        self.state.write().series.insert(prefix.to_string(), value);
        self.record(StorageOp::Counter {
            prefix: prefix.to_string(),
            value,
        });
        Ok(())
    }
}
