//! Fiscal year aggregate: a year together with its monthly periods.
//!
//! Every cascade (close, reopen, activate, deactivate, period generation) is a
//! pure function from one aggregate snapshot to the next. Backends apply the
//! returned snapshot as a single all-or-nothing write.

use chrono::{DateTime, NaiveDate, Utc};
use periodo_shared::types::{FiscalYearId, MonthlyPeriodId, UserId};
use serde::{Deserialize, Serialize};

use super::calendar::generate_monthly_periods;
use super::error::FiscalError;
use super::state::{
    FiscalYearState, FiscalYearTransition, MonthlyPeriodState, MonthlyPeriodTransition,
};
use super::types::{
    FiscalYearRecord, FiscalYearRef, FiscalYearSummary, MonthlyPeriod, MonthlyPeriodWithYear,
    NewFiscalYear,
};

/// A fiscal year and the monthly periods it owns, oldest period first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYearAggregate {
    /// The year record.
    pub year: FiscalYearRecord,
    /// Child periods.
    pub periods: Vec<MonthlyPeriod>,
}

/// A broken lifecycle invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Start date after end date.
    InvertedDateRange(FiscalYearId),
    /// Year flagged both closed and active.
    ClosedYearActive(FiscalYearId),
    /// Period flagged both closed and active.
    ClosedPeriodActive(MonthlyPeriodId),
    /// Period active while its year is not.
    ActivePeriodUnderInactiveYear(MonthlyPeriodId),
    /// Period pointing at another year.
    ForeignPeriod(MonthlyPeriodId),
}

impl FiscalYearAggregate {
    /// Creates an open, inactive year with its monthly periods.
    #[must_use]
    pub fn create(input: NewFiscalYear, actor: UserId, at: DateTime<Utc>) -> Self {
        let aggregate = Self::without_periods(input, actor, at);
        let periods = generate_monthly_periods(
            aggregate.year.id,
            aggregate.year.start_date,
            aggregate.year.end_date,
        );
        Self { periods, ..aggregate }
    }

    /// Creates an open, inactive year with no periods yet.
    #[must_use]
    pub fn without_periods(input: NewFiscalYear, actor: UserId, at: DateTime<Utc>) -> Self {
        Self {
            year: FiscalYearRecord {
                id: FiscalYearId::new(),
                name: input.name,
                start_date: input.start_date,
                end_date: input.end_date,
                fiscal_year_type: input.fiscal_year_type,
                is_closed: false,
                is_active: false,
                notes: input.notes,
                created_by: actor,
                created_at: at,
                closed_at: None,
                closed_by: None,
            },
            periods: Vec::new(),
        }
    }

    /// Returns the year identifier.
    #[must_use]
    pub const fn id(&self) -> FiscalYearId {
        self.year.id
    }

    /// Returns the year's lifecycle state.
    #[must_use]
    pub const fn state(&self) -> FiscalYearState {
        FiscalYearState::from_flags(self.year.is_closed, self.year.is_active)
    }

    /// Returns the period with the given ID, if this year owns it.
    #[must_use]
    pub fn period(&self, id: MonthlyPeriodId) -> Option<&MonthlyPeriod> {
        self.periods.iter().find(|p| p.id == id)
    }

    /// Closes the year and every period that is not closed yet.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::YearAlreadyClosed` if the year is closed.
    pub fn close(&self, actor: UserId, at: DateTime<Utc>) -> Result<Self, FiscalError> {
        let state = self.state().apply(FiscalYearTransition::Close)?;
        let mut next = self.with_year_state(state);
        next.year.closed_at = Some(at);
        next.year.closed_by = Some(actor);

        for period in next.periods.iter_mut().filter(|p| !p.is_closed) {
            period.is_closed = true;
            period.is_active = false;
            period.closed_at = Some(at);
            period.closed_by = Some(actor);
        }
        Ok(next)
    }

    /// Reopens a closed year, leaving it inactive, and reopens its periods.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::YearNotClosed` if the year is open.
    pub fn reopen(&self) -> Result<Self, FiscalError> {
        let state = self.state().apply(FiscalYearTransition::Reopen)?;
        let mut next = self.with_year_state(state);

        for period in &mut next.periods {
            period.is_closed = false;
            period.is_active = false;
            period.closed_at = None;
            period.closed_by = None;
        }
        Ok(next)
    }

    /// Activates the year and the open period covering `today`'s month.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::YearClosed` for a closed year and
    /// `FiscalError::InvalidYearTransition` if it is already active.
    pub fn activate(&self, today: NaiveDate) -> Result<Self, FiscalError> {
        let state = self.state().apply(FiscalYearTransition::Activate)?;
        let mut next = self.with_year_state(state);

        if let Some(current) = next
            .periods
            .iter_mut()
            .find(|p| p.is_month_of(today) && !p.is_closed)
        {
            current.is_active = true;
        }
        Ok(next)
    }

    /// Deactivates the year and every one of its periods.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::YearClosed` for a closed year and
    /// `FiscalError::InvalidYearTransition` if it is already inactive.
    pub fn deactivate(&self) -> Result<Self, FiscalError> {
        let state = self.state().apply(FiscalYearTransition::Deactivate)?;
        let mut next = self.with_year_state(state);

        for period in &mut next.periods {
            period.is_active = false;
        }
        Ok(next)
    }

    /// Generates the year's monthly periods.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::PeriodsAlreadyInitialized` if the year owns any
    /// period.
    pub fn initialize_periods(&self) -> Result<Self, FiscalError> {
        if !self.periods.is_empty() {
            return Err(FiscalError::PeriodsAlreadyInitialized);
        }
        Ok(Self {
            year: self.year.clone(),
            periods: generate_monthly_periods(
                self.year.id,
                self.year.start_date,
                self.year.end_date,
            ),
        })
    }

    /// Closes one period.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::PeriodNotFound` for a foreign period and
    /// `FiscalError::PeriodAlreadyClosed` if it is closed.
    pub fn close_period(
        &self,
        period_id: MonthlyPeriodId,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> Result<Self, FiscalError> {
        let mut next = self.transition_period(period_id, MonthlyPeriodTransition::Close)?;
        if let Some(period) = next.periods.iter_mut().find(|p| p.id == period_id) {
            period.closed_at = Some(at);
            period.closed_by = Some(actor);
        }
        Ok(next)
    }

    /// Activates or deactivates one period.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::PeriodNotFound` for a foreign period,
    /// `FiscalError::PeriodClosed` for a closed one and
    /// `FiscalError::YearInactive` when activating under an inactive year.
    pub fn set_period_active(
        &self,
        period_id: MonthlyPeriodId,
        activate: bool,
    ) -> Result<Self, FiscalError> {
        let transition = if activate {
            MonthlyPeriodTransition::Activate
        } else {
            MonthlyPeriodTransition::Deactivate
        };
        self.transition_period(period_id, transition)
    }

    /// Summary record with the period count.
    #[must_use]
    pub fn summary(&self) -> FiscalYearSummary {
        FiscalYearSummary {
            record: self.year.clone(),
            monthly_periods_count: u32::try_from(self.periods.len()).unwrap_or(u32::MAX),
        }
    }

    /// Periods joined with this year's flags.
    pub fn periods_with_year(&self) -> impl Iterator<Item = MonthlyPeriodWithYear> + '_ {
        let year_ref = FiscalYearRef {
            name: self.year.name.clone(),
            is_closed: self.year.is_closed,
            is_active: self.year.is_active,
        };
        self.periods.iter().map(move |period| MonthlyPeriodWithYear {
            period: period.clone(),
            fiscal_year: Some(year_ref.clone()),
        })
    }

    /// Returns true if the year's window overlaps `[start, end]`.
    #[must_use]
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.year.start_date <= end && self.year.end_date >= start
    }

    /// Lists every broken lifecycle invariant.
    #[must_use]
    pub fn violations(&self) -> Vec<InvariantViolation> {
        let mut found = Vec::new();
        if self.year.start_date > self.year.end_date {
            found.push(InvariantViolation::InvertedDateRange(self.year.id));
        }
        if self.year.is_closed && self.year.is_active {
            found.push(InvariantViolation::ClosedYearActive(self.year.id));
        }
        for period in &self.periods {
            if period.fiscal_year_id != self.year.id {
                found.push(InvariantViolation::ForeignPeriod(period.id));
            }
            if period.is_closed && period.is_active {
                found.push(InvariantViolation::ClosedPeriodActive(period.id));
            }
            if period.is_active && !self.state().is_active() {
                found.push(InvariantViolation::ActivePeriodUnderInactiveYear(period.id));
            }
        }
        found
    }

    fn with_year_state(&self, state: FiscalYearState) -> Self {
        let mut next = self.clone();
        let (is_closed, is_active) = state.flags();
        next.year.is_closed = is_closed;
        next.year.is_active = is_active;
        next
    }

    fn transition_period(
        &self,
        period_id: MonthlyPeriodId,
        transition: MonthlyPeriodTransition,
    ) -> Result<Self, FiscalError> {
        let year_state = self.state();
        let mut next = self.clone();
        let period = next
            .periods
            .iter_mut()
            .find(|p| p.id == period_id)
            .ok_or(FiscalError::PeriodNotFound(period_id))?;

        let state = MonthlyPeriodState::from_flags(period.is_closed, period.is_active)
            .apply(transition, year_state)?;
        (period.is_closed, period.is_active) = state.flags();
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiscal::types::FiscalYearType;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar_year(year: i32) -> FiscalYearAggregate {
        FiscalYearAggregate::create(
            NewFiscalYear {
                name: format!("FY {year}"),
                fiscal_year_type: FiscalYearType::Calendar,
                start_date: date(year, 1, 1),
                end_date: date(year, 12, 31),
                notes: None,
            },
            UserId::new(),
            Utc::now(),
        )
    }

    #[test]
    fn test_create_generates_periods() {
        let fy = calendar_year(2026);
        assert_eq!(fy.periods.len(), 12);
        assert_eq!(fy.state(), FiscalYearState::OpenInactive);
        assert_eq!(fy.summary().monthly_periods_count, 12);
        assert!(fy.violations().is_empty());
    }

    #[test]
    fn test_activate_cascades_to_current_month_only() {
        let fy = calendar_year(2026).activate(date(2026, 5, 20)).unwrap();

        let active: Vec<_> = fy.periods.iter().filter(|p| p.is_active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].month, 5);
        assert!(fy.year.is_active);
    }

    #[test]
    fn test_activate_outside_window_activates_no_period() {
        let fy = calendar_year(2024).activate(date(2026, 5, 20)).unwrap();
        assert!(fy.year.is_active);
        assert!(fy.periods.iter().all(|p| !p.is_active));
    }

    #[test]
    fn test_activate_skips_closed_current_period() {
        let fy = calendar_year(2026);
        let may = fy.periods[4].id;
        let fy = fy
            .close_period(may, UserId::new(), Utc::now())
            .unwrap()
            .activate(date(2026, 5, 20))
            .unwrap();

        assert!(fy.periods.iter().all(|p| !p.is_active));
        assert!(fy.violations().is_empty());
    }

    #[test]
    fn test_deactivate_cascades_to_all_periods() {
        let fy = calendar_year(2026).activate(date(2026, 5, 20)).unwrap();
        let june = fy.periods[5].id;
        let fy = fy.set_period_active(june, true).unwrap().deactivate().unwrap();

        assert!(!fy.year.is_active);
        assert!(fy.periods.iter().all(|p| !p.is_active));
    }

    #[test]
    fn test_close_cascades_to_every_open_period() {
        let actor = UserId::new();
        let fy = calendar_year(2026).activate(date(2026, 5, 20)).unwrap();
        let march = fy.periods[2].id;
        let earlier_closer = UserId::new();
        let fy = fy
            .close_period(march, earlier_closer, Utc::now())
            .unwrap()
            .close(actor, Utc::now())
            .unwrap();

        assert_eq!(fy.state(), FiscalYearState::Closed);
        assert!(fy.periods.iter().all(|p| p.is_closed && !p.is_active));
        assert_eq!(fy.period(march).unwrap().closed_by, Some(earlier_closer));
        assert_eq!(fy.periods[0].closed_by, Some(actor));
        assert_eq!(fy.year.closed_by, Some(actor));
    }

    #[test]
    fn test_close_twice_rejected() {
        let fy = calendar_year(2026).close(UserId::new(), Utc::now()).unwrap();
        assert!(matches!(
            fy.close(UserId::new(), Utc::now()),
            Err(FiscalError::YearAlreadyClosed)
        ));
    }

    #[test]
    fn test_reopen_cascades_and_leaves_year_inactive() {
        let fy = calendar_year(2026)
            .activate(date(2026, 5, 20))
            .unwrap()
            .close(UserId::new(), Utc::now())
            .unwrap()
            .reopen()
            .unwrap();

        assert_eq!(fy.state(), FiscalYearState::OpenInactive);
        assert!(fy.periods.iter().all(|p| !p.is_closed && !p.is_active));
        assert!(fy.periods.iter().all(|p| p.closed_at.is_none()));
    }

    #[test]
    fn test_reopen_open_year_rejected() {
        assert!(matches!(
            calendar_year(2026).reopen(),
            Err(FiscalError::YearNotClosed)
        ));
    }

    #[test]
    fn test_period_activation_under_inactive_year_rejected() {
        let fy = calendar_year(2026);
        let jan = fy.periods[0].id;
        assert!(matches!(
            fy.set_period_active(jan, true),
            Err(FiscalError::YearInactive)
        ));
    }

    #[test]
    fn test_foreign_period_rejected() {
        let fy = calendar_year(2026);
        let foreign = MonthlyPeriodId::new();
        assert!(matches!(
            fy.set_period_active(foreign, false),
            Err(FiscalError::PeriodNotFound(id)) if id == foreign
        ));
    }

    #[test]
    fn test_initialize_periods() {
        let input = NewFiscalYear {
            name: "Legacy".into(),
            fiscal_year_type: FiscalYearType::Custom,
            start_date: date(2025, 4, 1),
            end_date: date(2026, 3, 31),
            notes: None,
        };
        let fy = FiscalYearAggregate::without_periods(input, UserId::new(), Utc::now());
        assert!(fy.periods.is_empty());

        let fy = fy.initialize_periods().unwrap();
        assert_eq!(fy.periods.len(), 12);
        assert!(matches!(
            fy.initialize_periods(),
            Err(FiscalError::PeriodsAlreadyInitialized)
        ));
    }

    #[test]
    fn test_violations_detected() {
        let mut fy = calendar_year(2026);
        fy.periods[0].is_active = true;
        fy.year.is_closed = true;
        fy.year.is_active = true;

        let violations = fy.violations();
        assert!(violations.contains(&InvariantViolation::ClosedYearActive(fy.id())));
        assert!(violations.contains(&InvariantViolation::ActivePeriodUnderInactiveYear(
            fy.periods[0].id
        )));
    }
}
