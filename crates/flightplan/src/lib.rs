//! `flightplan` - A record-keeping service for aviation flight plans
//!
//! This library provides the flight plan entity, its mapping onto stored
//! documents, pluggable document stores, and the persistence adapter that
//! files, reads, amends and withdraws plans.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod adapter;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod plan;
pub mod store;

pub use adapter::{FileOutcome, FlightPlanAdapter, TransactionResult};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use plan::FlightPlan;
pub use store::{DocumentStore, MemoryStore, SqliteStore};
