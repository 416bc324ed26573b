//! In-memory period service for Periodo.
//!
//! This crate provides:
//! - `InMemoryPeriodStore`, the `PeriodService` implementation
//! - Journal entry bookkeeping for period statistics
//! - Demo data seeding

pub mod error;
pub mod memory;
pub mod seed;

pub use error::StoreError;
pub use memory::{InMemoryPeriodStore, JournalEntry, ReopenRecord};
pub use seed::{DEMO_USER_ID, DemoSeed, seed_demo};
