//! # Tally Backend Capability
//!
//! The seam between the census store handle and its storage. Each method is
//! one atomic unit with respect to the others: a `record` is either fully
//! visible to `stats` or not visible at all.

use std::future::Future;

use census_core::{Address, CensusEntry, CensusStats, Nationality, RecordOutcome};
use chrono::{DateTime, Utc};

use crate::config::BackendKind;
use crate::error::StoreError;

/// Storage capability behind [`crate::CensusStore`].
pub trait TallyBackend: Send + Sync {
    /// Which implementation this is.
    fn kind(&self) -> BackendKind;

    /// Upsert the entry for `address` and adjust the country counters.
    ///
    /// `at` becomes the entry's `recorded_at`. Concurrent calls for the same
    /// address are serialized; calls for different addresses are not.
    fn record(
        &self,
        address: &Address,
        nationality: &Nationality,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<RecordOutcome, StoreError>> + Send;

    /// Ranked snapshot of all positive counters plus the participant total.
    fn stats(&self) -> impl Future<Output = Result<CensusStats, StoreError>> + Send;

    /// Current entry for `address`, if one was ever recorded.
    fn entry(
        &self,
        address: &Address,
    ) -> impl Future<Output = Result<Option<CensusEntry>, StoreError>> + Send;

    /// Cheap reachability check.
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
