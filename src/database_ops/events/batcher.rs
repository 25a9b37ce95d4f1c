use std::collections::HashSet;
use std::num::NonZeroUsize;

use anyhow::Result;
use tracing::{debug, instrument};

use super::store::EventStore;

pub const DEFAULT_DELETE_BATCH: usize = 1000;

/// Split `ids` into ascending, disjoint batches of at most `batch_size`.
pub fn plan_batches(ids: &HashSet<i64>, batch_size: NonZeroUsize) -> Vec<Vec<i64>> {
    let mut sorted: Vec<i64> = ids.iter().copied().collect();
    sorted.sort_unstable();
    sorted
        .chunks(batch_size.get())
        .map(<[i64]>::to_vec)
        .collect()
}

/// Issue one bulk delete per batch. Each batch commits on its own, so a
/// failure part way leaves earlier batches deleted.
#[instrument(skip(store, ids), fields(total = ids.len(), batch_size = batch_size.get()))]
pub async fn delete_in_batches<S>(
    store: &S,
    ids: &HashSet<i64>,
    batch_size: NonZeroUsize,
) -> Result<u64>
where
    S: EventStore + ?Sized,
{
    let mut deleted = 0u64;
    for (n, batch) in plan_batches(ids, batch_size).iter().enumerate() {
        let removed = store.delete_events(batch).await?;
        debug!(batch = n, size = batch.len(), removed, "delete batch committed");
        deleted += removed;
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::events::memory_store::MemoryEventStore;
    use crate::database_ops::events::model::Event;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn batches_cover_input_exactly_once() {
        let ids: HashSet<i64> = (1..=2503).collect();
        let batches = plan_batches(&ids, size(1000));
        assert_eq!(
            batches.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![1000, 1000, 503]
        );
        let union: HashSet<i64> = batches.iter().flatten().copied().collect();
        assert_eq!(union, ids);
    }

    #[test]
    fn empty_input_plans_nothing() {
        assert!(plan_batches(&HashSet::new(), size(10)).is_empty());
    }

    #[tokio::test]
    async fn deletes_every_batch() {
        let store = MemoryEventStore::from_events((1..=25).map(|id| Event::new(id, "x")));
        let doomed: HashSet<i64> = (1..=20).collect();
        let deleted = delete_in_batches(&store, &doomed, size(7)).await.unwrap();
        assert_eq!(deleted, 20);
        assert_eq!(store.ids(), (21..=25).collect::<Vec<_>>());
    }
}
