//! In-memory event store for embedding, demos and tests.
//!
//! # Invariants
//! - Each garment log is kept sorted by `occurred_at`; an event sharing a
//!   timestamp with existing ones is placed after them.
//! - `append_if_absent` holds the write lock across check and append.

use crate::model::event::{EventFilter, GarmentEvent};
use crate::model::garment::GarmentId;
use crate::repo::event_store::{EventStore, StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Event store backed by a process-local map.
#[derive(Default)]
pub struct InMemoryEventStore {
    logs: RwLock<HashMap<GarmentId, Vec<GarmentEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `garment_id` known to the store. Idempotent.
    pub fn register_garment(&self, garment_id: GarmentId) -> StoreResult<()> {
        self.write()?.entry(garment_id).or_default();
        Ok(())
    }

    /// Number of events logged for a garment, or `None` if it is unknown.
    pub fn log_len(&self, garment_id: GarmentId) -> StoreResult<Option<usize>> {
        Ok(self.read()?.get(&garment_id).map(Vec::len))
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<GarmentId, Vec<GarmentEvent>>>> {
        self.logs.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<GarmentId, Vec<GarmentEvent>>>> {
        self.logs.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl EventStore for InMemoryEventStore {
    fn append(&self, event: &GarmentEvent) -> StoreResult<()> {
        let mut logs = self.write()?;
        let log = logs
            .get_mut(&event.garment_id)
            .ok_or(StoreError::NotFound(event.garment_id))?;
        insert_in_log_order(log, event.clone());
        Ok(())
    }

    fn query(&self, garment_id: GarmentId, filter: &EventFilter) -> StoreResult<Vec<GarmentEvent>> {
        let logs = self.read()?;
        let log = logs
            .get(&garment_id)
            .ok_or(StoreError::NotFound(garment_id))?;
        Ok(log
            .iter()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect())
    }

    fn append_if_absent(&self, event: &GarmentEvent, filter: &EventFilter) -> StoreResult<bool> {
        let mut logs = self.write()?;
        let log = logs
            .get_mut(&event.garment_id)
            .ok_or(StoreError::NotFound(event.garment_id))?;
        if log.iter().any(|existing| filter.matches(existing)) {
            return Ok(false);
        }
        insert_in_log_order(log, event.clone());
        Ok(true)
    }
}

fn insert_in_log_order(log: &mut Vec<GarmentEvent>, event: GarmentEvent) {
    let position = log.partition_point(|existing| existing.occurred_at <= event.occurred_at);
    log.insert(position, event);
}
