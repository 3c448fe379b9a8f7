//! # census-store: Census Tally Store
//!
//! Records one nationality per participant address and keeps a per-country
//! counter consistent with those entries.
//!
//! ## Backends
//!
//! | Backend    | Module          | Durability | Atomicity per `record` |
//! |------------|-----------------|------------|------------------------|
//! | `memory`   | [`memory`]      | none, lost on restart | one `parking_lot::RwLock` write section |
//! | `postgres` | [`postgres`]    | durable   | one transaction + per-address advisory lock |
//!
//! Both implement [`TallyBackend`]. The backend is chosen once at startup from
//! [`StoreConfig`] and wrapped in a cloneable [`CensusStore`] handle that the
//! HTTP layer shares across requests.
//!
//! ## Failure Policy
//!
//! The store never substitutes defaults and never retries. Every backend
//! failure comes back as a [`StoreError`] scoped to the call that hit it.

pub mod backend;
pub mod config;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use backend::TallyBackend;
pub use config::{BackendKind, ConfigError, StoreConfig};
pub use error::StoreError;
pub use memory::{Ledger, MemoryBackend};
pub use postgres::PostgresBackend;
pub use store::CensusStore;
