//! Period service seam.

use std::future::Future;

use periodo_shared::types::{FiscalYearId, MonthlyPeriodId, UserId};

use super::error::ServiceError;
use super::types::{
    FiscalYearRecord, FiscalYearSummary, JournalEntryRef, MonthlyPeriodWithYear, NewFiscalYear,
};

/// Result type for period service calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Backend that persists fiscal years and monthly periods.
///
/// Implemented by the store crate. Every mutation is all-or-nothing: a call
/// that returns an error has changed nothing.
pub trait PeriodService: Send + Sync {
    /// Creates a fiscal year and its monthly periods.
    ///
    /// `Ok(None)` means the backend accepted the call but returned no record.
    fn create_fiscal_year(
        &self,
        input: NewFiscalYear,
        actor: UserId,
    ) -> impl Future<Output = ServiceResult<Option<FiscalYearRecord>>> + Send;

    /// Lists every fiscal year with its period count.
    fn fetch_fiscal_years(
        &self,
    ) -> impl Future<Output = ServiceResult<Vec<FiscalYearSummary>>> + Send;

    /// Lists every monthly period joined with its owning year's flags.
    fn fetch_monthly_periods(
        &self,
    ) -> impl Future<Output = ServiceResult<Vec<MonthlyPeriodWithYear>>> + Send;

    /// Lists every journal entry, reduced to its period reference.
    fn fetch_journal_entry_refs(
        &self,
    ) -> impl Future<Output = ServiceResult<Vec<JournalEntryRef>>> + Send;

    /// Closes a fiscal year and all of its open periods.
    fn close_fiscal_year(
        &self,
        id: FiscalYearId,
        actor: UserId,
    ) -> impl Future<Output = ServiceResult<()>> + Send;

    /// Reopens a closed fiscal year and its periods.
    fn reopen_fiscal_year(
        &self,
        id: FiscalYearId,
        actor: UserId,
        reason: &str,
    ) -> impl Future<Output = ServiceResult<()>> + Send;

    /// Activates or deactivates a fiscal year, cascading to its periods.
    fn toggle_fiscal_year_active(
        &self,
        id: FiscalYearId,
        activate: bool,
        actor: UserId,
    ) -> impl Future<Output = ServiceResult<()>> + Send;

    /// Closes one monthly period.
    fn close_monthly_period(
        &self,
        id: MonthlyPeriodId,
        actor: UserId,
    ) -> impl Future<Output = ServiceResult<()>> + Send;

    /// Activates or deactivates one monthly period.
    fn toggle_monthly_period_active(
        &self,
        id: MonthlyPeriodId,
        activate: bool,
        actor: UserId,
    ) -> impl Future<Output = ServiceResult<()>> + Send;

    /// Generates the monthly periods of a year that has none.
    fn initialize_monthly_periods(
        &self,
        id: FiscalYearId,
        actor: UserId,
    ) -> impl Future<Output = ServiceResult<()>> + Send;
}
