//! # Route Modules
//!
//! - [`census`]: submission and stats endpoints under `/api`.

pub mod census;
