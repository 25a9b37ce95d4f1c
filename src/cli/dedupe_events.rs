use anyhow::{Context, Result};
use tracing::info;

use crate::database_ops::events::batcher::DEFAULT_DELETE_BATCH;
use crate::database_ops::events::{
    run_repair, InstanceSuffix, PgEventStore, RepairOptions, RepairSummary,
};
use crate::util::db::{Db, MIN_CONNECTIONS};
use crate::util::env as env_util;
use crate::util::progress::stdout_progress;

pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100;
pub const DEFAULT_PROGRESS_WIDTH: usize = 40;
pub const DEFAULT_MAX_CONNS: u32 = 4;

/// Everything one `dedupe_events` run needs, resolved and checked up front.
// No Debug: `database_url` may carry credentials.
#[derive(Clone)]
pub struct DedupeConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub repair: RepairOptions,
    /// Progress output cadence in candidates.
    pub progress_interval: u64,
    pub progress_width: usize,
    /// Create `public.events` when it is missing.
    pub auto_migrate: bool,
}

impl DedupeConfig {
    /// Resolve from the environment. `suffix_override` (the CLI flag) wins over
    /// `INSTANCE_SUFFIX`, which wins over deriving from `PUBLIC_BASE_URL`.
    pub fn from_env(suffix_override: Option<String>) -> Result<Self> {
        env_util::init_env();
        let suffix = resolve_suffix(
            suffix_override,
            env_util::env_opt("INSTANCE_SUFFIX"),
            env_util::env_opt("PUBLIC_BASE_URL"),
        )?;
        let cfg = Self {
            database_url: env_util::db_url()?,
            max_connections: env_util::env_parse("DB_MAX_CONNS", DEFAULT_MAX_CONNS)?,
            repair: RepairOptions::new(
                suffix,
                env_util::env_parse("DEDUPE_DELETE_BATCH", DEFAULT_DELETE_BATCH)?,
            )?,
            progress_interval: env_util::env_parse("PROGRESS_INTERVAL", DEFAULT_PROGRESS_INTERVAL)?,
            progress_width: env_util::env_parse("PROGRESS_BAR_WIDTH", DEFAULT_PROGRESS_WIDTH)?,
            auto_migrate: env_util::env_flag("AUTO_MIGRATE", false),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.max_connections >= MIN_CONNECTIONS,
            "DB_MAX_CONNS must be at least {MIN_CONNECTIONS}, got {}",
            self.max_connections
        );
        anyhow::ensure!(self.progress_interval >= 1, "PROGRESS_INTERVAL must be at least 1");
        anyhow::ensure!(self.progress_width >= 1, "PROGRESS_BAR_WIDTH must be at least 1");
        Ok(())
    }
}

fn resolve_suffix(
    flag: Option<String>,
    env_suffix: Option<String>,
    base_url: Option<String>,
) -> Result<InstanceSuffix> {
    if let Some(explicit) = flag.or(env_suffix) {
        return InstanceSuffix::new(explicit);
    }
    let base = base_url.context(
        "no instance suffix: pass --instance-suffix, set INSTANCE_SUFFIX, or set PUBLIC_BASE_URL",
    )?;
    InstanceSuffix::from_base_url(&base)
}

pub async fn run(cfg: DedupeConfig) -> Result<RepairSummary> {
    env_util::preflight_check(
        "dedupe_events",
        &[],
        &[
            "DATABASE_URL",
            "INSTANCE_SUFFIX",
            "PUBLIC_BASE_URL",
            "DB_MAX_CONNS",
            "DEDUPE_DELETE_BATCH",
            "PROGRESS_INTERVAL",
        ],
    )?;
    info!(
        suffix = %cfg.repair.suffix,
        delete_batch = cfg.repair.delete_batch.get(),
        "starting event self-import repair"
    );

    let db = Db::connect(&cfg.database_url, cfg.max_connections).await?;
    let store = PgEventStore::new(db);
    if cfg.auto_migrate {
        store.ensure_schema().await?;
    }

    let (every, width) = (cfg.progress_interval, cfg.progress_width);
    run_repair(&store, &cfg.repair, |total| stdout_progress(total, every, width)).await
}
