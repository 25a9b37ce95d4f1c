use std::num::NonZeroUsize;
use std::time::Instant;

use anyhow::{Context, Result};
use futures::TryStreamExt;
use tracing::{info, instrument};

use super::backfill::backfill_references;
use super::batcher::{delete_in_batches, DEFAULT_DELETE_BATCH};
use super::model::InstanceSuffix;
use super::store::EventStore;
use super::walker::AncestorWalker;
use crate::util::progress::{ProgressBar, ProgressRender};

/// Immutable settings for one repair run.
#[derive(Debug, Clone)]
pub struct RepairOptions {
    pub suffix: InstanceSuffix,
    pub delete_batch: NonZeroUsize,
}

impl RepairOptions {
    pub fn new(suffix: InstanceSuffix, delete_batch: usize) -> Result<Self> {
        let delete_batch = NonZeroUsize::new(delete_batch)
            .context("delete batch size must be at least 1")?;
        Ok(Self {
            suffix,
            delete_batch,
        })
    }

    pub fn with_default_batch(suffix: InstanceSuffix) -> Self {
        Self {
            suffix,
            delete_batch: NonZeroUsize::new(DEFAULT_DELETE_BATCH).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairSummary {
    pub candidates: u64,
    pub deleted: u64,
    pub backfilled: u64,
}

/// Count candidates, delete redundant clones, then backfill empty references.
///
/// `progress` is built once the candidate count is known and is advanced after
/// every candidate.
#[instrument(skip_all, fields(suffix = %opts.suffix))]
pub async fn run_repair<S, R, F>(store: &S, opts: &RepairOptions, progress: F) -> Result<RepairSummary>
where
    S: EventStore + ?Sized,
    R: ProgressRender,
    F: FnOnce(u64) -> Result<ProgressBar<R>>,
{
    let started = Instant::now();
    let candidates = store.count_candidates(&opts.suffix).await?;
    info!(candidates, "candidate events found");

    let mut bar = progress(candidates)?;
    let deleted = remove_clones(store, opts, &mut bar).await?;
    info!(deleted, "duplicate events deleted");

    let backfilled = backfill_references(store, &opts.suffix).await?;

    let summary = RepairSummary {
        candidates,
        deleted,
        backfilled,
    };
    info!(
        candidates,
        deleted,
        backfilled,
        took = ?started.elapsed(),
        "event repair complete"
    );
    Ok(summary)
}

/// Walk every candidate and delete the marked ones.
pub async fn remove_clones<S, R>(
    store: &S,
    opts: &RepairOptions,
    bar: &mut ProgressBar<R>,
) -> Result<u64>
where
    S: EventStore + ?Sized,
    R: ProgressRender,
{
    let marked = {
        let mut walker = AncestorWalker::new(store, &opts.suffix);
        let mut stream = store.stream_candidates(&opts.suffix);
        let mut processed = 0u64;
        while let Some(candidate) = stream.try_next().await? {
            walker.visit(&candidate).await?;
            processed += 1;
            bar.update(processed).context("writing progress")?;
        }
        if processed == 0 {
            bar.update(0).context("writing progress")?;
        }
        walker.into_marked()
    };
    info!(marked = marked.len(), "clone scan finished");
    delete_in_batches(store, &marked, opts.delete_batch).await
}
