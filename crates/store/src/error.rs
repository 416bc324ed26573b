//! Store error types.

use periodo_core::fiscal::{FiscalError, ServiceError};
use periodo_shared::types::{FiscalYearId, MonthlyPeriodId};
use thiserror::Error;

/// Errors raised by the in-memory store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Fiscal year not found.
    #[error("Fiscal year not found: {0}")]
    YearNotFound(FiscalYearId),

    /// Monthly period not found.
    #[error("Monthly period not found: {0}")]
    PeriodNotFound(MonthlyPeriodId),

    /// New fiscal year overlaps an existing one.
    #[error("Fiscal year overlaps with existing year: {0}")]
    OverlappingYear(String),

    /// Calendar year outside the supported date range.
    #[error("Year {0} is out of range")]
    YearOutOfRange(i32),

    /// Journal entry recorded against a closed period.
    #[error("Monthly period {0} is closed; no new journal entries can be recorded")]
    PeriodClosedForEntries(MonthlyPeriodId),

    /// Lifecycle rule violated.
    #[error(transparent)]
    Lifecycle(#[from] FiscalError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        Self::Rejected(err.to_string())
    }
}
