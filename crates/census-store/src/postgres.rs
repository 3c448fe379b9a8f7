//! # PostgreSQL Backend
//!
//! Durable tally storage in two tables, `census_entries` and
//! `country_tallies` (see `migrations/`).
//!
//! ## Atomicity
//!
//! Every `record` runs in one transaction that first takes
//! `pg_advisory_xact_lock` on a hash of the address. Two submissions for the
//! same address queue on that lock, including the very first one when no row
//! exists yet to lock with `SELECT ... FOR UPDATE`. Different addresses hash
//! to different locks and proceed in parallel. Counters are decremented with
//! `GREATEST(count - 1, 0)` so they cannot go negative.
//!
//! `stats` reads both tables inside one `REPEATABLE READ` snapshot, so it
//! never observes half of a `record`.
//!
//! ## Timeouts
//!
//! Pool acquisition is bounded by `acquire_timeout`. Each transaction sets
//! `statement_timeout` locally, so a stalled backend fails the call instead
//! of hanging it.

use std::time::Duration;

use census_core::{Address, CensusEntry, CensusStats, Nationality, RecordOutcome};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

use crate::backend::TallyBackend;
use crate::config::{BackendKind, ConfigError, StoreConfig};
use crate::error::StoreError;

/// Durable tally backend on a Postgres pool.
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: PgPool,
    statement_timeout: Duration,
}

impl PostgresBackend {
    /// Connect, then apply the embedded migrations.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let url = database_url(config)?;
        let pool = pool_options(config).connect(url).await?;
        tracing::info!(
            max_connections = config.max_connections,
            "connected to PostgreSQL census backend"
        );

        let backend = Self {
            pool,
            statement_timeout: config.statement_timeout,
        };
        backend.migrate().await?;
        Ok(backend)
    }

    /// Build the pool without opening a connection or running migrations.
    ///
    /// The first call that needs a connection pays the connect cost and
    /// reports [`StoreError::Unavailable`] if the server cannot be reached.
    pub fn connect_lazy(config: &StoreConfig) -> Result<Self, StoreError> {
        let url = database_url(config)?;
        let pool = pool_options(config).connect_lazy(url)?;
        Ok(Self {
            pool,
            statement_timeout: config.statement_timeout,
        })
    }

    /// Apply embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("census schema migrations applied");
        Ok(())
    }

    /// Open a transaction with the configured statement timeout.
    ///
    /// `SET TRANSACTION` must precede every other statement, so the optional
    /// isolation clause is issued first.
    async fn begin(
        &self,
        isolation: Option<&str>,
    ) -> Result<Transaction<'static, Postgres>, StoreError> {
        let mut tx = self.pool.begin().await?;
        if let Some(isolation) = isolation {
            sqlx::query(&format!("SET TRANSACTION {isolation}"))
                .execute(&mut *tx)
                .await?;
        }
        let timeout_ms = self.statement_timeout.as_millis();
        sqlx::query(&format!("SET LOCAL statement_timeout = {timeout_ms}"))
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

impl TallyBackend for PostgresBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn record(
        &self,
        address: &Address,
        nationality: &Nationality,
        at: DateTime<Utc>,
    ) -> Result<RecordOutcome, StoreError> {
        let mut tx = self.begin(None).await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(address.as_str())
            .execute(&mut *tx)
            .await?;

        let previous: Option<String> =
            sqlx::query_scalar("SELECT nationality FROM census_entries WHERE address = $1")
                .bind(address.as_str())
                .fetch_optional(&mut *tx)
                .await?;

        sqlx::query(
            "INSERT INTO census_entries (address, nationality, recorded_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (address)
             DO UPDATE SET nationality = EXCLUDED.nationality, recorded_at = EXCLUDED.recorded_at",
        )
        .bind(address.as_str())
        .bind(nationality.as_str())
        .bind(at)
        .execute(&mut *tx)
        .await?;

        let outcome = match previous {
            None => {
                increment(&mut tx, nationality.as_str()).await?;
                RecordOutcome::Created
            }
            Some(prev) if prev == nationality.as_str() => RecordOutcome::Refreshed,
            Some(prev) => {
                decrement(&mut tx, &prev).await?;
                increment(&mut tx, nationality.as_str()).await?;
                let from = Nationality::new(prev).map_err(|_| {
                    StoreError::Corrupt(format!("empty nationality stored for {address}"))
                })?;
                RecordOutcome::Moved { from }
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn stats(&self) -> Result<CensusStats, StoreError> {
        let mut tx = self.begin(Some("ISOLATION LEVEL REPEATABLE READ, READ ONLY")).await?;

        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT nationality, count FROM country_tallies WHERE count > 0")
                .fetch_all(&mut *tx)
                .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM census_entries")
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        let total = to_count(total, "participant total")?;
        let mut tallies = Vec::with_capacity(rows.len());
        for (nationality, count) in rows {
            let count = to_count(count, &nationality)?;
            tallies.push((nationality, count));
        }
        Ok(CensusStats::from_tallies(tallies, total))
    }

    async fn entry(&self, address: &Address) -> Result<Option<CensusEntry>, StoreError> {
        let row: Option<(String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT nationality, recorded_at FROM census_entries WHERE address = $1",
        )
        .bind(address.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(nationality, recorded_at)| {
            let nationality = Nationality::new(nationality).map_err(|_| {
                StoreError::Corrupt(format!("empty nationality stored for {address}"))
            })?;
            Ok(CensusEntry {
                nationality,
                recorded_at,
            })
        })
        .transpose()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn database_url(config: &StoreConfig) -> Result<&str, StoreError> {
    config
        .database_url
        .as_deref()
        .ok_or(StoreError::Config(ConfigError::MissingDatabaseUrl))
}

fn pool_options(config: &StoreConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(0)
        .acquire_timeout(config.acquire_timeout)
}

async fn increment(conn: &mut PgConnection, nationality: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO country_tallies (nationality, count) VALUES ($1, 1)
         ON CONFLICT (nationality) DO UPDATE SET count = country_tallies.count + 1",
    )
    .bind(nationality)
    .execute(conn)
    .await?;
    Ok(())
}

async fn decrement(conn: &mut PgConnection, nationality: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE country_tallies SET count = GREATEST(count - 1, 0) WHERE nationality = $1",
    )
    .bind(nationality)
    .execute(conn)
    .await?;
    Ok(())
}

fn to_count(value: i64, what: &str) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative count for {what}: {value}")))
}
