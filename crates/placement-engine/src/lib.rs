//! Eligibility decisions and placement analytics over a collection-oriented document store.

pub mod config;
pub mod error;
pub mod placement;
pub mod store;
pub mod telemetry;
