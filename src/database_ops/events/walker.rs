use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, trace};

use super::equality::{looks_same, same_calendar};
use super::model::{Event, InstanceSuffix};
use super::resolver::resolve_parent;
use super::store::EventStore;

/// Why a walk stopped. Only used for tracing and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    /// An ancestor was already marked, so this candidate is marked too.
    AncestorMarked { ancestor_id: i64 },
    /// Same content and same calendar as an ancestor.
    Clone { ancestor_id: i64 },
    /// Content differs from an ancestor; kept.
    Diverged { ancestor_id: i64 },
    /// Chain ran out of qualifying parents; kept.
    Exhausted,
    /// Chain came back to a node already seen in this walk; kept.
    Cycle { ancestor_id: i64 },
}

impl WalkOutcome {
    pub fn marks_for_deletion(self) -> bool {
        matches!(self, Self::AncestorMarked { .. } | Self::Clone { .. })
    }
}

/// Walks each candidate's reference chain and accumulates the ids that are
/// redundant clones.
///
/// The marked set persists across [`AncestorWalker::visit`] calls and doubles
/// as a memo: once a chain suffix is known to be redundant, any later walk
/// that reaches it stops there.
pub struct AncestorWalker<'a, S: ?Sized> {
    store: &'a S,
    suffix: &'a InstanceSuffix,
    to_delete: HashSet<i64>,
}

impl<'a, S> AncestorWalker<'a, S>
where
    S: EventStore + ?Sized,
{
    pub fn new(store: &'a S, suffix: &'a InstanceSuffix) -> Self {
        Self {
            store,
            suffix,
            to_delete: HashSet::new(),
        }
    }

    pub async fn visit(&mut self, candidate: &Event) -> Result<WalkOutcome> {
        let outcome = self.walk(candidate).await?;
        if outcome.marks_for_deletion() {
            self.to_delete.insert(candidate.id);
        }
        trace!(event_id = candidate.id, ?outcome, "walk finished");
        Ok(outcome)
    }

    async fn walk(&self, candidate: &Event) -> Result<WalkOutcome> {
        let mut seen = HashSet::from([candidate.id]);
        let mut ancestor = resolve_parent(self.store, candidate, self.suffix).await?;

        while let Some(current) = ancestor {
            if self.to_delete.contains(&current.id) {
                return Ok(WalkOutcome::AncestorMarked {
                    ancestor_id: current.id,
                });
            }
            if !seen.insert(current.id) {
                debug!(
                    event_id = candidate.id,
                    ancestor_id = current.id,
                    "reference cycle; keeping event"
                );
                return Ok(WalkOutcome::Cycle {
                    ancestor_id: current.id,
                });
            }
            if !looks_same(candidate, &current) {
                return Ok(WalkOutcome::Diverged {
                    ancestor_id: current.id,
                });
            }
            if same_calendar(candidate, &current) {
                return Ok(WalkOutcome::Clone {
                    ancestor_id: current.id,
                });
            }
            // Same content in another calendar: keep climbing.
            ancestor = resolve_parent(self.store, &current, self.suffix).await?;
        }
        Ok(WalkOutcome::Exhausted)
    }

    pub fn marked(&self) -> &HashSet<i64> {
        &self.to_delete
    }

    pub fn into_marked(self) -> HashSet<i64> {
        self.to_delete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::events::memory_store::MemoryEventStore;

    const SUFFIX: &str = "cal.example.org";

    fn clone_of(id: i64, parent: i64, source: i64) -> Event {
        let mut e = Event::new(id, "Exam");
        e.reference = format!("{parent}@{SUFFIX}");
        e.import_source_id = Some(source);
        e.user_id = source;
        e
    }

    async fn visit_all(store: &MemoryEventStore, ids: &[i64]) -> (Vec<WalkOutcome>, HashSet<i64>) {
        let suffix = InstanceSuffix::new(SUFFIX).unwrap();
        let mut walker = AncestorWalker::new(store, &suffix);
        let mut outcomes = Vec::new();
        for id in ids {
            let e = store.get(*id).unwrap();
            outcomes.push(walker.visit(&e).await.unwrap());
        }
        (outcomes, walker.into_marked())
    }

    #[tokio::test]
    async fn same_subscription_clone_is_marked() {
        let store = MemoryEventStore::from_events([clone_of(1, 100, 7), clone_of(2, 1, 7)]);
        let (outcomes, marked) = visit_all(&store, &[1, 2]).await;
        assert_eq!(outcomes[0], WalkOutcome::Exhausted);
        assert_eq!(outcomes[1], WalkOutcome::Clone { ancestor_id: 1 });
        assert_eq!(marked, HashSet::from([2]));
    }

    #[tokio::test]
    async fn content_change_blocks_deletion() {
        let mut edited = clone_of(2, 1, 7);
        edited.location = "Hall 2".into();
        let store = MemoryEventStore::from_events([clone_of(1, 100, 7), edited]);
        let (outcomes, marked) = visit_all(&store, &[2]).await;
        assert_eq!(outcomes[0], WalkOutcome::Diverged { ancestor_id: 1 });
        assert!(marked.is_empty());
    }

    #[tokio::test]
    async fn climbs_across_calendars_until_home_calendar() {
        // 1 (src 7) <- 2 (src 8) <- 3 (src 7)
        let store = MemoryEventStore::from_events([
            clone_of(1, 100, 7),
            clone_of(2, 1, 8),
            clone_of(3, 2, 7),
        ]);
        let (outcomes, marked) = visit_all(&store, &[3]).await;
        assert_eq!(outcomes[0], WalkOutcome::Clone { ancestor_id: 1 });
        assert_eq!(marked, HashSet::from([3]));
    }

    #[tokio::test]
    async fn cross_calendar_chain_without_home_match_is_kept() {
        let store = MemoryEventStore::from_events([clone_of(1, 100, 8), clone_of(2, 1, 7)]);
        let (outcomes, marked) = visit_all(&store, &[2]).await;
        assert_eq!(outcomes[0], WalkOutcome::Exhausted);
        assert!(marked.is_empty());
    }

    #[tokio::test]
    async fn marked_ancestor_short_circuits() {
        let store = MemoryEventStore::from_events([
            clone_of(1, 100, 7),
            clone_of(2, 1, 7),
            clone_of(3, 2, 7),
        ]);
        let (outcomes, marked) = visit_all(&store, &[1, 2, 3]).await;
        assert_eq!(outcomes[2], WalkOutcome::AncestorMarked { ancestor_id: 2 });
        assert_eq!(marked, HashSet::from([2, 3]));
        // 1 -> 100 (missing), 2 -> 1, 3 -> 2
        assert_eq!(store.lookups(), 3);
    }

    #[tokio::test]
    async fn reference_cycles_terminate() {
        // 1 -> 2 -> 3 -> 1 with alternating calendars never reaching home.
        let store = MemoryEventStore::from_events([
            clone_of(1, 2, 7),
            clone_of(2, 3, 8),
            clone_of(3, 1, 9),
        ]);
        let (outcomes, marked) = visit_all(&store, &[1]).await;
        assert_eq!(outcomes[0], WalkOutcome::Cycle { ancestor_id: 1 });
        assert!(marked.is_empty());

        let self_loop = MemoryEventStore::from_events([clone_of(5, 5, 7)]);
        let (outcomes, _) = visit_all(&self_loop, &[5]).await;
        assert_eq!(outcomes[0], WalkOutcome::Cycle { ancestor_id: 5 });
    }
}
