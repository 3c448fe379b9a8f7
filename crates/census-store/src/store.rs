//! # Census Store Handle
//!
//! [`CensusStore`] is constructed once per process and cloned into every
//! request handler. It stamps submissions with the current time, dispatches
//! to the configured [`TallyBackend`], and logs what happened.

use std::sync::Arc;

use census_core::{Address, CensusEntry, CensusStats, Nationality, RecordOutcome};
use chrono::Utc;

use crate::backend::TallyBackend;
use crate::config::{BackendKind, StoreConfig};
use crate::error::StoreError;
use crate::memory::MemoryBackend;
use crate::postgres::PostgresBackend;

#[derive(Debug)]
enum Backend {
    Memory(MemoryBackend),
    Postgres(PostgresBackend),
}

/// Shared handle to the census tally.
///
/// Cheaply cloneable; all clones talk to the same backend.
#[derive(Debug, Clone)]
pub struct CensusStore {
    backend: Arc<Backend>,
}

impl CensusStore {
    /// Ephemeral store backed by process memory.
    pub fn in_memory() -> Self {
        Self::from(MemoryBackend::new())
    }

    /// Open the backend selected by `config`.
    ///
    /// For Postgres this connects and runs migrations; failures are returned,
    /// never papered over with the in-memory backend.
    pub async fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        match config.backend {
            BackendKind::Memory => {
                tracing::warn!(
                    "census backend is in-memory: entries and tallies will not survive a restart"
                );
                Ok(Self::in_memory())
            }
            BackendKind::Postgres => Ok(Self::from(PostgresBackend::connect(config).await?)),
        }
    }

    /// Which backend this store dispatches to.
    pub fn kind(&self) -> BackendKind {
        match self.backend.as_ref() {
            Backend::Memory(b) => b.kind(),
            Backend::Postgres(b) => b.kind(),
        }
    }

    /// Record `address` as holding `nationality`.
    ///
    /// Creates the entry on first submission, refreshes its timestamp on an
    /// identical resubmission, and moves one count between countries when the
    /// nationality changes.
    pub async fn record(
        &self,
        address: &Address,
        nationality: &Nationality,
    ) -> Result<RecordOutcome, StoreError> {
        let at = Utc::now();
        let result = match self.backend.as_ref() {
            Backend::Memory(b) => b.record(address, nationality, at).await,
            Backend::Postgres(b) => b.record(address, nationality, at).await,
        };

        match &result {
            Ok(RecordOutcome::Moved { from }) => tracing::info!(
                %address,
                from = %from,
                to = %nationality,
                "census entry moved to a new nationality"
            ),
            Ok(outcome) => tracing::debug!(
                %address,
                %nationality,
                outcome = outcome.as_str(),
                "census entry recorded"
            ),
            Err(e) => tracing::error!(%address, error = %e, "failed to record census entry"),
        }
        result
    }

    /// Ranked snapshot of the tally.
    pub async fn get_stats(&self) -> Result<CensusStats, StoreError> {
        let result = match self.backend.as_ref() {
            Backend::Memory(b) => b.stats().await,
            Backend::Postgres(b) => b.stats().await,
        };
        if let Err(e) = &result {
            tracing::error!(error = %e, "failed to read census stats");
        }
        result
    }

    /// Current entry for an address.
    pub async fn entry(&self, address: &Address) -> Result<Option<CensusEntry>, StoreError> {
        match self.backend.as_ref() {
            Backend::Memory(b) => b.entry(address).await,
            Backend::Postgres(b) => b.entry(address).await,
        }
    }

    /// Backend reachability check for readiness probes.
    pub async fn ping(&self) -> Result<(), StoreError> {
        match self.backend.as_ref() {
            Backend::Memory(b) => b.ping().await,
            Backend::Postgres(b) => b.ping().await,
        }
    }
}

impl From<MemoryBackend> for CensusStore {
    fn from(backend: MemoryBackend) -> Self {
        Self {
            backend: Arc::new(Backend::Memory(backend)),
        }
    }
}

impl From<PostgresBackend> for CensusStore {
    fn from(backend: PostgresBackend) -> Self {
        Self {
            backend: Arc::new(Backend::Postgres(backend)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    fn nat(s: &str) -> Nationality {
        Nationality::new(s).unwrap()
    }

    #[tokio::test]
    async fn open_memory_backend() {
        let store = CensusStore::open(&StoreConfig::default()).await.unwrap();
        assert_eq!(store.kind(), BackendKind::Memory);
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn open_postgres_without_url_fails() {
        let config = StoreConfig {
            backend: BackendKind::Postgres,
            ..StoreConfig::default()
        };
        let err = CensusStore::open(&config).await.unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[tokio::test]
    async fn case_insensitive_scenario() {
        let store = CensusStore::in_memory();

        store.record(&addr("0xABC"), &nat("Germany")).await.unwrap();
        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats, CensusStats::from_tallies([("Germany", 1)], 1));

        let outcome = store.record(&addr("0xabc"), &nat("Germany")).await.unwrap();
        assert_eq!(outcome, RecordOutcome::Refreshed);
        assert_eq!(store.get_stats().await.unwrap(), stats);

        let outcome = store.record(&addr("0xabc"), &nat("Spain")).await.unwrap();
        assert_eq!(
            outcome,
            RecordOutcome::Moved {
                from: nat("Germany")
            }
        );
        assert_eq!(
            store.get_stats().await.unwrap(),
            CensusStats::from_tallies([("Spain", 1)], 1)
        );
    }

    #[tokio::test]
    async fn resubmission_updates_timestamp() {
        let store = CensusStore::in_memory();
        store.record(&addr("0xA"), &nat("Peru")).await.unwrap();
        let first = store.entry(&addr("0xa")).await.unwrap().unwrap();
        store.record(&addr("0xA"), &nat("Peru")).await.unwrap();
        let second = store.entry(&addr("0xa")).await.unwrap().unwrap();
        assert!(second.recorded_at >= first.recorded_at);
        assert_eq!(second.nationality, first.nationality);
    }

    #[tokio::test]
    async fn unknown_address_has_no_entry() {
        let store = CensusStore::in_memory();
        assert!(store.entry(&addr("0xnobody")).await.unwrap().is_none());
    }
}
