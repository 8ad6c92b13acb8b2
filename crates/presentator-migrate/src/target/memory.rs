//! In-memory target store with write counters and failure injection.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::core::record::TargetRecord;
use crate::core::traits::{Collection, RecordFilter, TargetStore};
use crate::error::{MigrateError, Result};

/// Writes performed against a [`MemoryTarget`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounters {
    pub inserts: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl WriteCounters {
    pub fn total(&self) -> usize {
        self.inserts + self.updates + self.deletes
    }
}

struct StoredCollection {
    id: String,
    records: BTreeMap<String, TargetRecord>,
}

#[derive(Default)]
struct State {
    collections: BTreeMap<String, StoredCollection>,
    counters: WriteCounters,
    failing_ids: HashSet<String>,
}

/// Collections of records keyed by collection name.
#[derive(Default)]
pub struct MemoryTarget {
    state: Mutex<State>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a target with the given (empty) collections.
    pub fn with_collections(names: &[&str]) -> Self {
        let target = Self::new();
        for name in names {
            target.add_collection(name);
        }
        target
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a collection; its id is derived from the name.
    pub fn add_collection(&self, name: &str) {
        self.lock()
            .collections
            .entry(name.to_string())
            .or_insert_with(|| StoredCollection {
                id: format!("pbc_{}", name),
                records: BTreeMap::new(),
            });
    }

    /// Store a record without counting it as a write.
    pub fn seed(&self, collection: &str, record: TargetRecord) {
        self.add_collection(collection);
        if let Some(stored) = self.lock().collections.get_mut(collection) {
            stored.records.insert(record.id.clone(), record);
        }
    }

    pub fn record(&self, collection: &str, id: &str) -> Option<TargetRecord> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|stored| stored.records.get(id).cloned())
    }

    pub fn ids(&self, collection: &str) -> Vec<String> {
        self.lock()
            .collections
            .get(collection)
            .map(|stored| stored.records.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn counters(&self) -> WriteCounters {
        self.lock().counters
    }

    pub fn reset_counters(&self) {
        self.lock().counters = WriteCounters::default();
    }

    /// Make every write or delete of this record id fail.
    pub fn fail_writes_for(&self, id: &str) {
        self.lock().failing_ids.insert(id.to_string());
    }

    fn records_of<'a>(
        state: &'a mut State,
        collection: &Collection,
    ) -> Result<&'a mut BTreeMap<String, TargetRecord>> {
        state
            .collections
            .get_mut(&collection.name)
            .map(|stored| &mut stored.records)
            .ok_or_else(|| MigrateError::CollectionNotFound(collection.name.clone()))
    }

    fn check_failure(state: &State, id: &str) -> Result<()> {
        if state.failing_ids.contains(id) {
            return Err(MigrateError::Store(format!("injected failure for {:?}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl TargetStore for MemoryTarget {
    async fn find_collection(&self, name: &str) -> Result<Collection> {
        self.lock()
            .collections
            .get(name)
            .map(|stored| Collection {
                id: stored.id.clone(),
                name: name.to_string(),
            })
            .ok_or_else(|| MigrateError::CollectionNotFound(name.to_string()))
    }

    async fn is_empty(&self, collection: &Collection) -> Result<bool> {
        let mut state = self.lock();
        Ok(Self::records_of(&mut state, collection)?.is_empty())
    }

    async fn find_by_id(
        &self,
        collection: &Collection,
        id: &str,
    ) -> Result<Option<TargetRecord>> {
        let mut state = self.lock();
        Ok(Self::records_of(&mut state, collection)?.get(id).cloned())
    }

    async fn find_first(
        &self,
        collection: &Collection,
        filter: &RecordFilter,
    ) -> Result<Option<TargetRecord>> {
        let mut state = self.lock();
        Ok(Self::records_of(&mut state, collection)?
            .values()
            .find(|record| filter.matches(record))
            .cloned())
    }

    async fn count(&self, collection: &Collection, filter: &RecordFilter) -> Result<u64> {
        let mut state = self.lock();
        Ok(Self::records_of(&mut state, collection)?
            .values()
            .filter(|record| filter.matches(record))
            .count() as u64)
    }

    async fn list_ids(&self, collection: &Collection) -> Result<Vec<String>> {
        let mut state = self.lock();
        Ok(Self::records_of(&mut state, collection)?
            .keys()
            .cloned()
            .collect())
    }

    async fn insert(&self, collection: &Collection, record: &TargetRecord) -> Result<()> {
        let mut state = self.lock();
        Self::check_failure(&state, &record.id)?;
        let records = Self::records_of(&mut state, collection)?;
        if records.contains_key(&record.id) {
            return Err(MigrateError::Store(format!(
                "record {:?} already exists in {}",
                record.id, collection.name
            )));
        }
        records.insert(record.id.clone(), record.clone());
        state.counters.inserts += 1;
        Ok(())
    }

    async fn update(&self, collection: &Collection, record: &TargetRecord) -> Result<()> {
        let mut state = self.lock();
        Self::check_failure(&state, &record.id)?;
        let records = Self::records_of(&mut state, collection)?;
        match records.get_mut(&record.id) {
            Some(stored) => *stored = record.clone(),
            None => {
                return Err(MigrateError::Store(format!(
                    "record {:?} not found in {}",
                    record.id, collection.name
                )))
            }
        }
        state.counters.updates += 1;
        Ok(())
    }

    async fn delete(&self, collection: &Collection, id: &str) -> Result<()> {
        let mut state = self.lock();
        Self::check_failure(&state, id)?;
        Self::records_of(&mut state, collection)?.remove(id);
        state.counters.deletes += 1;
        Ok(())
    }

    fn db_type(&self) -> &str {
        "memory"
    }

    async fn close(&self) {}
}
