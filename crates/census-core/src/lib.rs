//! # census-core: Foundational Types for the Census Tally
//!
//! Defines the type-system primitives shared by the tally store and the
//! HTTP service. Depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** [`Address`] is always
//!    lower-cased at construction, so two spellings of the same participant
//!    can never become two entries. [`Nationality`] is an exact,
//!    case-sensitive label.
//!
//! 2. **Ranking lives in one place.** [`CensusStats::from_tallies`] is the
//!    only function that filters zero counts and orders the snapshot. Every
//!    backend funnels its raw counters through it.
//!
//! ## Crate Policy
//!
//! - No I/O, no async.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod tally;

pub use error::ValidationError;
pub use identity::{Address, Nationality};
pub use tally::{CensusEntry, CensusStats, CountryCount, RecordOutcome};
