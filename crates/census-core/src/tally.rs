//! # Census Entries and Tally Snapshots
//!
//! [`CensusEntry`] is the per-address record. [`CensusStats`] is the ranked,
//! public view of the country tally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Nationality;

/// One participant's current census record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensusEntry {
    pub nationality: Nationality,
    pub recorded_at: DateTime<Utc>,
}

/// What a `record` call did to the tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// First submission for this address; the nationality gained one count.
    Created,
    /// Same address, same nationality; only the timestamp moved.
    Refreshed,
    /// Same address, new nationality; one count moved from `from`.
    Moved { from: Nationality },
}

impl RecordOutcome {
    /// Stable lowercase name, used as a metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Refreshed => "refreshed",
            Self::Moved { .. } => "moved",
        }
    }
}

/// A single row of the public tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryCount {
    pub country: String,
    pub count: u64,
}

/// Ranked snapshot of the tally.
///
/// `countries` holds only labels with a positive count, sorted by count
/// descending and then by label ascending (byte-wise). `total` is the number
/// of distinct addresses recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensusStats {
    pub countries: Vec<CountryCount>,
    pub total: u64,
}

impl CensusStats {
    /// The empty-safe snapshot: no countries, zero participants.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a ranked snapshot from raw `(label, count)` counters.
    ///
    /// Zero counters are dropped. Input order does not matter.
    pub fn from_tallies<I, S>(tallies: I, total: u64) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut countries: Vec<CountryCount> = tallies
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(country, count)| CountryCount {
                country: country.into(),
                count,
            })
            .collect();
        countries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.country.cmp(&b.country)));
        Self { countries, total }
    }

    /// Count for a label, or 0 if the label is absent.
    pub fn count_of(&self, country: &str) -> u64 {
        self.countries
            .iter()
            .find(|c| c.country == country)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    /// Sum of all listed counts. Equals `total` for a consistent snapshot.
    pub fn tallied(&self) -> u64 {
        self.countries.iter().map(|c| c.count).sum()
    }
}
