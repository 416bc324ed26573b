//! In-memory period service.
//!
//! All state lives behind one `RwLock`; every mutation computes the next
//! aggregate with the core cascades and swaps it in under a single write
//! guard, so a failed call leaves nothing half-applied.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use periodo_core::fiscal::{
    Clock, FiscalError, FiscalYearAggregate, FiscalYearRecord, FiscalYearState, FiscalYearSummary,
    JournalEntryRef, MonthlyPeriodWithYear, NewFiscalYear, PeriodService, ReopenReason,
    ServiceResult, SystemClock,
};
use periodo_shared::types::{FiscalYearId, JournalEntryId, MonthlyPeriodId, UserId};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::StoreError;

/// A journal entry as stored; only its period reference matters here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalEntry {
    /// Unique identifier.
    pub id: JournalEntryId,
    /// Period the entry is recorded against.
    pub monthly_period_id: Option<MonthlyPeriodId>,
    /// Free-form description.
    pub description: String,
    /// When the entry was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Audit record of a fiscal year reopen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReopenRecord {
    /// Reopened year.
    pub fiscal_year_id: FiscalYearId,
    /// User who reopened it.
    pub reopened_by: UserId,
    /// Justification given.
    pub reason: String,
    /// When it happened.
    pub reopened_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreState {
    years: BTreeMap<FiscalYearId, FiscalYearAggregate>,
    entries: Vec<JournalEntry>,
    reopen_log: Vec<ReopenRecord>,
}

impl StoreState {
    fn year(&self, id: FiscalYearId) -> Result<&FiscalYearAggregate, StoreError> {
        self.years.get(&id).ok_or(StoreError::YearNotFound(id))
    }

    fn owner_of(&self, period_id: MonthlyPeriodId) -> Result<&FiscalYearAggregate, StoreError> {
        self.years
            .values()
            .find(|a| a.period(period_id).is_some())
            .ok_or(StoreError::PeriodNotFound(period_id))
    }

    fn replace(&mut self, next: FiscalYearAggregate) {
        self.years.insert(next.id(), next);
    }
}

/// Period service keeping everything in process memory.
#[derive(Clone)]
pub struct InMemoryPeriodStore {
    state: Arc<RwLock<StoreState>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for InMemoryPeriodStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryPeriodStore").finish_non_exhaustive()
    }
}

impl Default for InMemoryPeriodStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPeriodStore {
    /// Creates an empty store using the local date.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Creates an empty store with the given clock.
    #[must_use]
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            clock: Arc::new(clock),
        }
    }

    /// Creates a fiscal year, with or without its monthly periods.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::OverlappingYear` if the window overlaps an
    /// existing year.
    pub async fn insert_fiscal_year(
        &self,
        input: NewFiscalYear,
        actor: UserId,
        with_periods: bool,
    ) -> Result<FiscalYearRecord, StoreError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .years
            .values()
            .find(|a| a.overlaps(input.start_date, input.end_date))
        {
            return Err(StoreError::OverlappingYear(existing.year.name.clone()));
        }

        let aggregate = if with_periods {
            FiscalYearAggregate::create(input, actor, Utc::now())
        } else {
            FiscalYearAggregate::without_periods(input, actor, Utc::now())
        };
        let record = aggregate.year.clone();
        info!(
            fiscal_year_id = %record.id,
            name = %record.name,
            periods = aggregate.periods.len(),
            "Fiscal year stored"
        );
        state.replace(aggregate);
        Ok(record)
    }

    /// Records a journal entry.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::PeriodNotFound` for an unknown period and
    /// `StoreError::PeriodClosedForEntries` for a closed one.
    pub async fn record_journal_entry(
        &self,
        monthly_period_id: Option<MonthlyPeriodId>,
        description: impl Into<String>,
    ) -> Result<JournalEntryId, StoreError> {
        let mut state = self.state.write().await;
        if let Some(period_id) = monthly_period_id {
            let owner = state.owner_of(period_id)?;
            if owner.period(period_id).is_some_and(|p| p.is_closed) {
                return Err(StoreError::PeriodClosedForEntries(period_id));
            }
        }

        let entry = JournalEntry {
            id: JournalEntryId::new(),
            monthly_period_id,
            description: description.into(),
            recorded_at: Utc::now(),
        };
        let id = entry.id;
        state.entries.push(entry);
        Ok(id)
    }

    /// Returns a copy of one fiscal year and its periods.
    pub async fn fiscal_year(&self, id: FiscalYearId) -> Option<FiscalYearAggregate> {
        self.state.read().await.years.get(&id).cloned()
    }

    /// Returns every active fiscal year.
    pub async fn active_fiscal_years(&self) -> Vec<FiscalYearId> {
        self.state
            .read()
            .await
            .years
            .values()
            .filter(|a| a.state().is_active())
            .map(FiscalYearAggregate::id)
            .collect()
    }

    /// Returns the reopen audit trail of a year, oldest first.
    pub async fn reopen_history(&self, id: FiscalYearId) -> Vec<ReopenRecord> {
        self.state
            .read()
            .await
            .reopen_log
            .iter()
            .filter(|r| r.fiscal_year_id == id)
            .cloned()
            .collect()
    }

    pub(crate) async fn close_year(
        &self,
        id: FiscalYearId,
        actor: UserId,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let next = state.year(id)?.close(actor, Utc::now())?;
        state.replace(next);
        info!(fiscal_year_id = %id, user_id = %actor, "Fiscal year and its periods closed");
        Ok(())
    }

    async fn reopen_year(
        &self,
        id: FiscalYearId,
        actor: UserId,
        reason: &str,
    ) -> Result<(), StoreError> {
        let reason = ReopenReason::parse(reason)?;
        let mut state = self.state.write().await;
        let next = state.year(id)?.reopen()?;
        state.replace(next);
        state.reopen_log.push(ReopenRecord {
            fiscal_year_id: id,
            reopened_by: actor,
            reason: reason.as_str().to_string(),
            reopened_at: Utc::now(),
        });
        info!(
            fiscal_year_id = %id,
            user_id = %actor,
            reason = reason.as_str(),
            "Fiscal year reopened"
        );
        Ok(())
    }

    pub(crate) async fn set_year_active(
        &self,
        id: FiscalYearId,
        activate: bool,
        actor: UserId,
    ) -> Result<(), StoreError> {
        let today = self.clock.today();
        let mut state = self.state.write().await;
        let target = state.year(id)?;

        if !activate {
            let next = target.deactivate()?;
            state.replace(next);
            info!(fiscal_year_id = %id, user_id = %actor, "Fiscal year deactivated");
            return Ok(());
        }

        let next = target.activate(today)?;
        // At most one active year: every other active year steps down first.
        let others: Vec<FiscalYearAggregate> = state
            .years
            .values()
            .filter(|a| a.id() != id && a.state() == FiscalYearState::OpenActive)
            .map(FiscalYearAggregate::deactivate)
            .collect::<Result<_, _>>()?;
        for other in others {
            debug!(fiscal_year_id = %other.id(), "Deactivating previously active fiscal year");
            state.replace(other);
        }
        state.replace(next);
        info!(fiscal_year_id = %id, user_id = %actor, %today, "Fiscal year activated");
        Ok(())
    }

    async fn close_period(&self, id: MonthlyPeriodId, actor: UserId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let next = state.owner_of(id)?.close_period(id, actor, Utc::now())?;
        state.replace(next);
        info!(monthly_period_id = %id, user_id = %actor, "Monthly period closed");
        Ok(())
    }

    async fn set_period_active(
        &self,
        id: MonthlyPeriodId,
        activate: bool,
        actor: UserId,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let next = state.owner_of(id)?.set_period_active(id, activate)?;
        state.replace(next);
        info!(
            monthly_period_id = %id,
            user_id = %actor,
            activate,
            "Monthly period activation changed"
        );
        Ok(())
    }

    async fn initialize_periods(&self, id: FiscalYearId, actor: UserId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let year = state.year(id)?;
        if year.state() == FiscalYearState::Closed {
            return Err(FiscalError::YearClosed.into());
        }
        let next = year.initialize_periods()?;
        let count = next.periods.len();
        state.replace(next);
        info!(
            fiscal_year_id = %id,
            user_id = %actor,
            periods = count,
            "Monthly periods initialized"
        );
        Ok(())
    }
}

impl PeriodService for InMemoryPeriodStore {
    async fn create_fiscal_year(
        &self,
        input: NewFiscalYear,
        actor: UserId,
    ) -> ServiceResult<Option<FiscalYearRecord>> {
        Ok(Some(self.insert_fiscal_year(input, actor, true).await?))
    }

    async fn fetch_fiscal_years(&self) -> ServiceResult<Vec<FiscalYearSummary>> {
        let state = self.state.read().await;
        let mut years: Vec<FiscalYearSummary> =
            state.years.values().map(FiscalYearAggregate::summary).collect();
        years.sort_by(|a, b| b.record.start_date.cmp(&a.record.start_date));
        Ok(years)
    }

    async fn fetch_monthly_periods(&self) -> ServiceResult<Vec<MonthlyPeriodWithYear>> {
        let state = self.state.read().await;
        let mut periods: Vec<MonthlyPeriodWithYear> = state
            .years
            .values()
            .flat_map(FiscalYearAggregate::periods_with_year)
            .collect();
        periods.sort_by(|a, b| b.period.start_date.cmp(&a.period.start_date));
        Ok(periods)
    }

    async fn fetch_journal_entry_refs(&self) -> ServiceResult<Vec<JournalEntryRef>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .map(|e| JournalEntryRef {
                monthly_period_id: e.monthly_period_id,
            })
            .collect())
    }

    async fn close_fiscal_year(&self, id: FiscalYearId, actor: UserId) -> ServiceResult<()> {
        Ok(self.close_year(id, actor).await?)
    }

    async fn reopen_fiscal_year(
        &self,
        id: FiscalYearId,
        actor: UserId,
        reason: &str,
    ) -> ServiceResult<()> {
        Ok(self.reopen_year(id, actor, reason).await?)
    }

    async fn toggle_fiscal_year_active(
        &self,
        id: FiscalYearId,
        activate: bool,
        actor: UserId,
    ) -> ServiceResult<()> {
        Ok(self.set_year_active(id, activate, actor).await?)
    }

    async fn close_monthly_period(&self, id: MonthlyPeriodId, actor: UserId) -> ServiceResult<()> {
        Ok(self.close_period(id, actor).await?)
    }

    async fn toggle_monthly_period_active(
        &self,
        id: MonthlyPeriodId,
        activate: bool,
        actor: UserId,
    ) -> ServiceResult<()> {
        Ok(self.set_period_active(id, activate, actor).await?)
    }

    async fn initialize_monthly_periods(
        &self,
        id: FiscalYearId,
        actor: UserId,
    ) -> ServiceResult<()> {
        Ok(self.initialize_periods(id, actor).await?)
    }
}
