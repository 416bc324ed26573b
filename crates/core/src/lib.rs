//! Core business logic for Periodo.
//!
//! This crate contains the fiscal period lifecycle with ZERO web or storage
//! dependencies. Persistence is reached only through the `PeriodService`
//! trait.
//!
//! # Modules
//!
//! - `fiscal` - Fiscal years, monthly periods and their lifecycle

pub mod fiscal;
