//! Job registry: the single source of truth for job state.
//!
//! The id map is only locked long enough to look up or insert an entry; each
//! record carries its own lock, so runners updating different jobs never wait
//! on each other. Readers always receive a clone taken under the record lock.

use crate::error::{Error, Result};
use crate::types::{JobId, JobRecord};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

type Slot = Arc<Mutex<JobRecord>>;

/// Concurrency-safe map from job id to job record
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Slot>>,
}

impl JobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new record
    ///
    /// Fails with [`Error::IdCollision`] if the id is already present; the
    /// existing record is left untouched.
    pub async fn create(&self, record: JobRecord) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&record.id) {
            return Err(Error::IdCollision(record.id.to_string()));
        }
        jobs.insert(record.id.clone(), Arc::new(Mutex::new(record)));
        Ok(())
    }

    /// Snapshot of a record
    ///
    /// Ids that are not registered (never created, or cleared by a purge) yield
    /// the [`JobRecord::unknown`] sentinel instead of an error.
    pub async fn get(&self, id: &JobId) -> JobRecord {
        match self.slot(id).await {
            Some(slot) => slot.lock().await.clone(),
            None => JobRecord::unknown(id.clone()),
        }
    }

    /// Whether the id is registered
    pub async fn contains(&self, id: &JobId) -> bool {
        self.jobs.read().await.contains_key(id)
    }

    /// Atomically apply `mutator` to a record
    ///
    /// The mutator reports whether it changed anything; `updated_at` is only
    /// refreshed when it did. Returns `None` if the id is not registered.
    pub async fn update<F>(&self, id: &JobId, mutator: F) -> Option<bool>
    where
        F: FnOnce(&mut JobRecord) -> bool,
    {
        let slot = self.slot(id).await?;
        let mut record = slot.lock().await;
        let changed = mutator(&mut record);
        if changed {
            record.updated_at = Utc::now();
        }
        Some(changed)
    }

    /// Remove every record, returning how many were removed
    pub async fn clear(&self) -> usize {
        let mut jobs = self.jobs.write().await;
        let count = jobs.len();
        jobs.clear();
        count
    }

    /// Snapshots of all records, oldest first
    pub async fn list(&self) -> Vec<JobRecord> {
        let slots: Vec<Slot> = self.jobs.read().await.values().cloned().collect();

        let mut records = Vec::with_capacity(slots.len());
        for slot in slots {
            records.push(slot.lock().await.clone());
        }
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        records
    }

    /// Number of records that are pending or running
    pub async fn count_active(&self) -> usize {
        let slots: Vec<Slot> = self.jobs.read().await.values().cloned().collect();

        let mut active = 0;
        for slot in slots {
            if slot.lock().await.status.is_active() {
                active += 1;
            }
        }
        active
    }

    /// Number of registered records
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Whether no records are registered
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    async fn slot(&self, id: &JobId) -> Option<Slot> {
        self.jobs.read().await.get(id).cloned()
    }
}
