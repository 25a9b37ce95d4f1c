use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use futures::stream::{self, BoxStream, StreamExt};

use super::model::{Event, InstanceSuffix};
use super::store::EventStore;

/// In-process `EventStore` keyed by id. Candidate streams iterate a snapshot
/// taken when the stream is created, in id order.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    rows: Mutex<BTreeMap<i64, Event>>,
    lookups: Mutex<u64>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
        let store = Self::new();
        for event in events {
            store.insert(event);
        }
        store
    }

    /// Insert or replace by id.
    pub fn insert(&self, event: Event) {
        self.rows().insert(event.id, event);
    }

    pub fn get(&self, id: i64) -> Option<Event> {
        self.rows().get(&id).cloned()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.rows().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    /// Point lookups served so far.
    pub fn lookups(&self) -> u64 {
        *self.lookups.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rows(&self) -> MutexGuard<'_, BTreeMap<i64, Event>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl EventStore for MemoryEventStore {
    async fn count_candidates(&self, suffix: &InstanceSuffix) -> Result<u64> {
        Ok(self.rows().values().filter(|e| e.is_candidate(suffix)).count() as u64)
    }

    fn stream_candidates<'a>(
        &'a self,
        suffix: &'a InstanceSuffix,
    ) -> BoxStream<'a, Result<Event>> {
        let snapshot: Vec<Event> = self
            .rows()
            .values()
            .filter(|e| e.is_candidate(suffix))
            .cloned()
            .collect();
        stream::iter(snapshot.into_iter().map(Ok)).boxed()
    }

    async fn find_candidate(&self, id: i64, suffix: &InstanceSuffix) -> Result<Option<Event>> {
        *self.lookups.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(self.rows().get(&id).filter(|e| e.is_candidate(suffix)).cloned())
    }

    async fn delete_events(&self, ids: &[i64]) -> Result<u64> {
        let mut rows = self.rows();
        Ok(ids.iter().filter(|id| rows.remove(*id).is_some()).count() as u64)
    }

    async fn backfill_references(&self, suffix: &InstanceSuffix) -> Result<u64> {
        let mut updated = 0;
        for event in self.rows().values_mut() {
            if event.reference.is_empty() {
                event.reference = suffix.reference_for(event.id);
                updated += 1;
            }
        }
        Ok(updated)
    }
}
