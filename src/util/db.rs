use anyhow::{ensure, Context, Result};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

/// Candidate cursor plus point lookups need two connections at once.
pub const MIN_CONNECTIONS: u32 = 2;

#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        ensure!(
            max_connections >= MIN_CONNECTIONS,
            "DB_MAX_CONNS must be at least {MIN_CONNECTIONS}, got {max_connections}"
        );
        let use_prepared = crate::util::env::env_flag("USE_PREPARED", false);
        let mut connect_options =
            PgConnectOptions::from_str(database_url).context("parsing database url")?;

        if database_url.contains("sslmode=require") && !database_url.contains("sslmode=disable") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        if !use_prepared {
            // PgBouncer txn mode safe
            connect_options = connect_options.statement_cache_capacity(0);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await
            .context("connecting to postgres")?;
        info!(max_connections, "connected to db");
        Ok(Self { pool })
    }
}
