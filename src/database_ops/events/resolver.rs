use anyhow::Result;
use tracing::trace;

use super::model::{Event, InstanceSuffix};
use super::store::EventStore;

/// Follow `event`'s reference one hop.
///
/// Malformed references, missing rows, and rows that are not themselves
/// imported candidates all resolve to `None`. Only storage failures are errors.
pub async fn resolve_parent<S>(
    store: &S,
    event: &Event,
    suffix: &InstanceSuffix,
) -> Result<Option<Event>>
where
    S: EventStore + ?Sized,
{
    let Some(link) = event.parent_ref() else {
        trace!(event_id = event.id, reference = %event.reference, "reference has no parent id");
        return Ok(None);
    };
    store.find_candidate(link.parent_id, suffix).await
}
