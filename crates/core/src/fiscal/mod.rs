//! Fiscal year and monthly period lifecycle.
//!
//! This module implements:
//! - Fiscal year and monthly period records
//! - The year and period state machines
//! - Cascading transitions over a year and its periods
//! - Monthly period generation
//! - The derived view (ordering, current period, auto-expansion, statistics)
//! - The period service seam and the lifecycle manager driving it

pub mod aggregate;
pub mod calendar;
pub mod clock;
pub mod error;
pub mod lifecycle;
pub mod service;
pub mod state;
pub mod types;
pub mod view;
pub mod view_model;

#[cfg(test)]
mod aggregate_props;

pub use aggregate::{FiscalYearAggregate, InvariantViolation};
pub use calendar::generate_monthly_periods;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{FiscalError, Operation, ServiceError};
pub use lifecycle::{Confirmation, LifecycleManager, Outcome};
pub use service::{PeriodService, ServiceResult};
pub use state::{
    FiscalYearState, FiscalYearTransition, MonthlyPeriodState, MonthlyPeriodTransition,
};
pub use types::{
    CreateFiscalYearForm, FiscalYear, FiscalYearRecord, FiscalYearRef, FiscalYearSummary,
    FiscalYearType, JournalEntryRef, MAX_FISCAL_YEAR_MONTHS, MonthlyPeriod, MonthlyPeriodWithYear,
    NewFiscalYear, ReopenReason,
};
pub use view::{PeriodAction, PeriodStats, ViewSnapshot, YearAction};
pub use view_model::{FiscalYearsViewModel, ProcessingGuard, ProcessingKey, ProcessingMarkers};
