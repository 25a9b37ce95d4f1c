//! Repair of calendar events duplicated by subscriptions that re-import their
//! own exported output.
//!
//! Candidates are imported events whose reference points back into this
//! instance. Each candidate's reference chain is walked one point lookup at a
//! time; clones are collected, deleted in batches, and empty references are
//! then backfilled.
pub mod backfill;
pub mod batcher;
pub mod equality;
pub mod job;
pub mod memory_store;
pub mod model;
pub mod pg_store;
pub mod resolver;
pub mod store;
pub mod walker;

pub use job::{run_repair, RepairOptions, RepairSummary};
pub use memory_store::MemoryEventStore;
pub use model::{Event, InstanceSuffix, ParentRef};
pub use pg_store::PgEventStore;
pub use store::EventStore;
