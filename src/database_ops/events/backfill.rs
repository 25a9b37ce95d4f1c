use anyhow::Result;
use tracing::{info, instrument};

use super::model::InstanceSuffix;
use super::store::EventStore;

/// Give every event with an empty reference its canonical `"<id>@<suffix>"`.
/// Non-empty references, well-formed or not, are never touched.
#[instrument(skip(store), fields(suffix = %suffix))]
pub async fn backfill_references<S>(store: &S, suffix: &InstanceSuffix) -> Result<u64>
where
    S: EventStore + ?Sized,
{
    let updated = store.backfill_references(suffix).await?;
    info!(updated, "empty event references backfilled");
    Ok(updated)
}
