use anyhow::{Context, Result};
use futures::stream::{BoxStream, StreamExt};
use tracing::{info, instrument};

use super::model::{Event, InstanceSuffix};
use super::store::EventStore;
use crate::util::db::Db;

macro_rules! select_events {
    ($predicate:literal) => {
        concat!(
            "SELECT id, reference, import_source_id, name, description, description_format, ",
            "start_time, duration, priority, location, category_id, course_id, group_id, user_id ",
            "FROM public.events WHERE ",
            $predicate
        )
    };
}

/// Minimum shape of `public.events` this job reads and writes.
const EVENTS_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS public.events (
    id                 bigserial PRIMARY KEY,
    reference          text      NOT NULL DEFAULT '',
    import_source_id   bigint,
    name               text      NOT NULL,
    description        text      NOT NULL DEFAULT '',
    description_format smallint  NOT NULL DEFAULT 1,
    start_time         bigint    NOT NULL DEFAULT 0,
    duration           bigint    NOT NULL DEFAULT 0,
    priority           integer,
    location           text      NOT NULL DEFAULT '',
    category_id        bigint    NOT NULL DEFAULT 0,
    course_id          bigint    NOT NULL DEFAULT 0,
    group_id           bigint    NOT NULL DEFAULT 0,
    user_id            bigint    NOT NULL DEFAULT 0
)
"#;

/// `EventStore` over the Postgres `public.events` table.
#[derive(Clone)]
pub struct PgEventStore {
    db: Db,
}

impl PgEventStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create the events table when it is missing. Existing tables are left alone.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(EVENTS_DDL)
            .execute(&self.db.pool)
            .await
            .context("creating public.events")?;
        info!("events schema ensured");
        Ok(())
    }
}

#[async_trait::async_trait]
impl EventStore for PgEventStore {
    #[instrument(skip(self), fields(suffix = %suffix))]
    async fn count_candidates(&self, suffix: &InstanceSuffix) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM public.events \
             WHERE import_source_id IS NOT NULL AND reference LIKE $1",
        )
        .persistent(false)
        .bind(suffix.like_pattern())
        .fetch_one(&self.db.pool)
        .await
        .context("counting candidate events")?;
        Ok(count.max(0) as u64)
    }

    fn stream_candidates<'a>(
        &'a self,
        suffix: &'a InstanceSuffix,
    ) -> BoxStream<'a, Result<Event>> {
        sqlx::query_as::<_, Event>(select_events!(
            "import_source_id IS NOT NULL AND reference LIKE $1 ORDER BY id"
        ))
        .persistent(false)
        .bind(suffix.like_pattern())
        .fetch(&self.db.pool)
        .map(|row| row.context("streaming candidate events"))
        .boxed()
    }

    #[instrument(skip(self), fields(suffix = %suffix))]
    async fn find_candidate(&self, id: i64, suffix: &InstanceSuffix) -> Result<Option<Event>> {
        sqlx::query_as::<_, Event>(select_events!(
            "id = $1 AND import_source_id IS NOT NULL AND reference LIKE $2"
        ))
        .persistent(false)
        .bind(id)
        .bind(suffix.like_pattern())
        .fetch_optional(&self.db.pool)
        .await
        .with_context(|| format!("looking up parent event {id}"))
    }

    #[instrument(skip(self, ids), fields(batch = ids.len()))]
    async fn delete_events(&self, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let res = sqlx::query("DELETE FROM public.events WHERE id = ANY($1)")
            .persistent(false)
            .bind(ids)
            .execute(&self.db.pool)
            .await
            .context("deleting duplicate events")?;
        Ok(res.rows_affected())
    }

    #[instrument(skip(self), fields(suffix = %suffix))]
    async fn backfill_references(&self, suffix: &InstanceSuffix) -> Result<u64> {
        let res = sqlx::query(
            "UPDATE public.events SET reference = id::text || '@' || $1 WHERE reference = ''",
        )
        .persistent(false)
        .bind(suffix.as_str())
        .execute(&self.db.pool)
        .await
        .context("backfilling empty event references")?;
        Ok(res.rows_affected())
    }
}
