use anyhow::Result;
use futures::stream::BoxStream;

use super::model::{Event, InstanceSuffix};

/// Storage operations the repair job needs from the events table.
///
/// Implementations must stream candidates without materialising the whole
/// pool, and must allow point lookups while a candidate stream is open.
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Number of imported events whose reference points into `suffix`.
    async fn count_candidates(&self, suffix: &InstanceSuffix) -> Result<u64>;

    /// Forward-only stream over the same set [`EventStore::count_candidates`] counts.
    fn stream_candidates<'a>(&'a self, suffix: &'a InstanceSuffix)
        -> BoxStream<'a, Result<Event>>;

    /// Point lookup restricted to candidates; a row that exists but is not a
    /// candidate comes back as `None`.
    async fn find_candidate(&self, id: i64, suffix: &InstanceSuffix) -> Result<Option<Event>>;

    /// Delete the given ids, returning rows removed.
    async fn delete_events(&self, ids: &[i64]) -> Result<u64>;

    /// Set `reference = "<id>@<suffix>"` wherever it is empty, returning rows updated.
    async fn backfill_references(&self, suffix: &InstanceSuffix) -> Result<u64>;
}
