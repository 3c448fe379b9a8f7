//! # In-Memory Backend
//!
//! A [`Ledger`] behind one `parking_lot::RwLock`. The lock is synchronous
//! and never held across an `.await`, so each `record` is a single critical
//! section and `stats` always reads a fully applied state.
//!
//! Data is lost when the process exits.

use std::collections::HashMap;
use std::sync::Arc;

use census_core::{Address, CensusEntry, CensusStats, Nationality, RecordOutcome};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::backend::TallyBackend;
use crate::config::BackendKind;
use crate::error::StoreError;

/// Entries keyed by normalized address, plus one counter per nationality.
///
/// Counters that drop to zero are kept; [`Ledger::snapshot`] hides them.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    entries: HashMap<Address, CensusEntry>,
    tallies: HashMap<Nationality, u64>,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one submission.
    pub fn apply(
        &mut self,
        address: &Address,
        nationality: &Nationality,
        at: DateTime<Utc>,
    ) -> RecordOutcome {
        let previous = self.entries.insert(
            address.clone(),
            CensusEntry {
                nationality: nationality.clone(),
                recorded_at: at,
            },
        );

        match previous {
            None => {
                *self.tallies.entry(nationality.clone()).or_insert(0) += 1;
                RecordOutcome::Created
            }
            Some(prev) if prev.nationality == *nationality => RecordOutcome::Refreshed,
            Some(prev) => {
                if let Some(old) = self.tallies.get_mut(&prev.nationality) {
                    *old = old.saturating_sub(1);
                }
                *self.tallies.entry(nationality.clone()).or_insert(0) += 1;
                RecordOutcome::Moved {
                    from: prev.nationality,
                }
            }
        }
    }

    /// Ranked view of the current counters.
    pub fn snapshot(&self) -> CensusStats {
        CensusStats::from_tallies(
            self.tallies
                .iter()
                .map(|(nationality, count)| (nationality.as_str(), *count)),
            self.entries.len() as u64,
        )
    }

    /// Entry for an address.
    pub fn entry(&self, address: &Address) -> Option<&CensusEntry> {
        self.entries.get(address)
    }

    /// Raw counter for a label, including retained zeros.
    pub fn tally(&self, nationality: &Nationality) -> Option<u64> {
        self.tallies.get(nationality).copied()
    }

    /// Number of distinct addresses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries.
    pub fn entries(&self) -> impl Iterator<Item = (&Address, &CensusEntry)> {
        self.entries.iter()
    }
}

/// Process-local tally backend.
///
/// Cheaply cloneable via `Arc`; all clones share the same ledger.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    ledger: Arc<RwLock<Ledger>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TallyBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn record(
        &self,
        address: &Address,
        nationality: &Nationality,
        at: DateTime<Utc>,
    ) -> Result<RecordOutcome, StoreError> {
        Ok(self.ledger.write().apply(address, nationality, at))
    }

    async fn stats(&self) -> Result<CensusStats, StoreError> {
        Ok(self.ledger.read().snapshot())
    }

    async fn entry(&self, address: &Address) -> Result<Option<CensusEntry>, StoreError> {
        Ok(self.ledger.read().entry(address).cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
