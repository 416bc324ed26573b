//! Fiscal period lifecycle manager.
//!
//! Every mutating operation follows the same sequence: authentication,
//! target lookup in the caller's snapshot, state precondition, confirmation,
//! remote call, full reload. Anything rejected before the remote call leaves
//! the backend untouched.

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use periodo_shared::types::{FiscalYearId, MonthlyPeriodId, UserId};
use serde::Serialize;
use tracing::{error, info, warn};

use super::clock::Clock;
use super::error::{FiscalError, Operation, ServiceError};
use super::service::{PeriodService, ServiceResult};
use super::state::{
    FiscalYearState, FiscalYearTransition, MonthlyPeriodState, MonthlyPeriodTransition,
};
use super::types::{CreateFiscalYearForm, FiscalYear, MonthlyPeriodWithYear, ReopenReason};
use super::view::ViewSnapshot;

/// Prompt the caller must accept before a destructive operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    /// Operation awaiting confirmation.
    pub operation: Operation,
    /// Question to put to the user.
    pub prompt: String,
}

/// Result of a confirmable operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing was done; call again with `confirmed = true`.
    NeedsConfirmation(Confirmation),
    /// The operation ran and the view was reloaded.
    Completed {
        /// Freshly derived view.
        snapshot: ViewSnapshot,
        /// Year to expand in addition to the auto-expanded one.
        expand: Option<FiscalYearId>,
    },
}

impl Outcome {
    /// Returns the new snapshot if the operation ran.
    #[must_use]
    pub fn snapshot(&self) -> Option<&ViewSnapshot> {
        match self {
            Self::NeedsConfirmation(_) => None,
            Self::Completed { snapshot, .. } => Some(snapshot),
        }
    }
}

/// Stateless lifecycle manager over a period service.
#[derive(Debug)]
pub struct LifecycleManager<S, C> {
    service: Arc<S>,
    clock: C,
}

impl<S: PeriodService, C: Clock> LifecycleManager<S, C> {
    /// Creates a manager.
    #[must_use]
    pub const fn new(service: Arc<S>, clock: C) -> Self {
        Self { service, clock }
    }

    /// The underlying period service.
    #[must_use]
    pub const fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Today's date according to the manager's clock.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Loads everything from the backend and derives a fresh view.
    ///
    /// A failure to load journal entries degrades to all-zero statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the years or periods cannot be loaded.
    pub async fn reload(&self) -> Result<ViewSnapshot, FiscalError> {
        let years = remote(Operation::Reload, self.service.fetch_fiscal_years()).await?;
        let periods = remote(Operation::Reload, self.service.fetch_monthly_periods()).await?;
        let entries = match self.service.fetch_journal_entry_refs().await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "Could not load journal entries, statistics reset");
                Vec::new()
            }
        };

        Ok(ViewSnapshot::derive(years, periods, &entries, self.today()))
    }

    /// Creates a fiscal year together with its monthly periods.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` without an actor, a validation error for a
    /// bad form, and the backend's error otherwise.
    pub async fn create_fiscal_year(
        &self,
        actor: Option<UserId>,
        form: &CreateFiscalYearForm,
    ) -> Result<ViewSnapshot, FiscalError> {
        let operation = Operation::CreateFiscalYear;
        let actor = authenticated(operation, actor)?;
        let input = form.validate().map_err(|e| rejected(operation, e))?;

        let created = remote(operation, self.service.create_fiscal_year(input, actor)).await?;
        let Some(record) = created else {
            warn!(?operation, "Period service returned no fiscal year record");
            return Err(FiscalError::from_service(operation, ServiceError::Silent));
        };

        info!(
            fiscal_year_id = %record.id,
            name = %record.name,
            user_id = %actor,
            "Fiscal year created"
        );
        self.reload().await
    }

    /// Generates the monthly periods of a year that has none.
    ///
    /// # Errors
    ///
    /// Returns `PeriodsAlreadyInitialized` if the year has periods,
    /// `YearClosed` for a closed year, and the backend's error otherwise.
    pub async fn initialize_monthly_periods(
        &self,
        view: &ViewSnapshot,
        actor: Option<UserId>,
        id: FiscalYearId,
        confirmed: bool,
    ) -> Result<Outcome, FiscalError> {
        let operation = Operation::InitializeMonthlyPeriods;
        let actor = authenticated(operation, actor)?;
        let year = find_year(view, operation, id)?;
        if year.has_monthly_periods {
            return Err(rejected(operation, FiscalError::PeriodsAlreadyInitialized));
        }
        if year_state(year) == FiscalYearState::Closed {
            return Err(rejected(operation, FiscalError::YearClosed));
        }
        if !confirmed {
            return Ok(needs_confirmation(
                operation,
                format!(
                    "Initialize the monthly periods of fiscal year {}? One period will be created for every month of the year.",
                    year.record.name
                ),
            ));
        }

        remote(operation, self.service.initialize_monthly_periods(id, actor)).await?;
        info!(fiscal_year_id = %id, user_id = %actor, "Monthly periods initialized");
        self.completed(Some(id)).await
    }

    /// Closes a fiscal year and every open period it owns.
    ///
    /// # Errors
    ///
    /// Returns `YearAlreadyClosed` for a closed year and the backend's error
    /// otherwise.
    pub async fn close_fiscal_year(
        &self,
        view: &ViewSnapshot,
        actor: Option<UserId>,
        id: FiscalYearId,
        confirmed: bool,
    ) -> Result<Outcome, FiscalError> {
        let operation = Operation::CloseFiscalYear;
        let actor = authenticated(operation, actor)?;
        let year = find_year(view, operation, id)?;
        year_state(year)
            .apply(FiscalYearTransition::Close)
            .map_err(|e| rejected(operation, e))?;
        if !confirmed {
            return Ok(needs_confirmation(
                operation,
                format!(
                    "Close fiscal year {} and all of its monthly periods? Every period that is still open will be closed.",
                    year.record.name
                ),
            ));
        }

        remote(operation, self.service.close_fiscal_year(id, actor)).await?;
        info!(fiscal_year_id = %id, user_id = %actor, "Fiscal year closed");
        self.completed(None).await
    }

    /// Reopens a closed fiscal year.
    ///
    /// The reason doubles as confirmation, so no separate prompt is issued.
    ///
    /// # Errors
    ///
    /// Returns `ReasonRequired` for a blank reason, `YearNotClosed` for an
    /// open year, and the backend's error otherwise.
    pub async fn reopen_fiscal_year(
        &self,
        view: &ViewSnapshot,
        actor: Option<UserId>,
        id: FiscalYearId,
        reason: &str,
    ) -> Result<ViewSnapshot, FiscalError> {
        let operation = Operation::ReopenFiscalYear;
        let actor = authenticated(operation, actor)?;
        let reason = ReopenReason::parse(reason).map_err(|e| rejected(operation, e))?;
        let year = find_year(view, operation, id)?;
        year_state(year)
            .apply(FiscalYearTransition::Reopen)
            .map_err(|e| rejected(operation, e))?;

        remote(
            operation,
            self.service.reopen_fiscal_year(id, actor, reason.as_str()),
        )
        .await?;
        info!(
            fiscal_year_id = %id,
            user_id = %actor,
            reason = reason.as_str(),
            "Fiscal year reopened"
        );
        self.reload().await
    }

    /// Activates or deactivates a fiscal year.
    ///
    /// # Errors
    ///
    /// Returns `YearClosed` for a closed year, `InvalidYearTransition` for a
    /// redundant toggle, and the backend's error otherwise.
    pub async fn toggle_fiscal_year_active(
        &self,
        view: &ViewSnapshot,
        actor: Option<UserId>,
        id: FiscalYearId,
        activate: bool,
        confirmed: bool,
    ) -> Result<Outcome, FiscalError> {
        let (operation, transition) = if activate {
            (Operation::ActivateFiscalYear, FiscalYearTransition::Activate)
        } else {
            (Operation::DeactivateFiscalYear, FiscalYearTransition::Deactivate)
        };
        let actor = authenticated(operation, actor)?;
        let year = find_year(view, operation, id)?;
        year_state(year)
            .apply(transition)
            .map_err(|e| rejected(operation, e))?;
        if !confirmed {
            let prompt = if activate {
                format!(
                    "Activate fiscal year {} and the monthly period of the current month?",
                    year.record.name
                )
            } else {
                format!(
                    "Deactivate fiscal year {} and all of its monthly periods?",
                    year.record.name
                )
            };
            return Ok(needs_confirmation(operation, prompt));
        }

        remote(
            operation,
            self.service.toggle_fiscal_year_active(id, activate, actor),
        )
        .await?;
        info!(fiscal_year_id = %id, user_id = %actor, activate, "Fiscal year activation changed");
        self.completed(activate.then_some(id)).await
    }

    /// Closes one monthly period for good.
    ///
    /// # Errors
    ///
    /// Returns `PeriodAlreadyClosed` for a closed period and the backend's
    /// error otherwise.
    pub async fn close_monthly_period(
        &self,
        view: &ViewSnapshot,
        actor: Option<UserId>,
        id: MonthlyPeriodId,
        confirmed: bool,
    ) -> Result<Outcome, FiscalError> {
        let operation = Operation::CloseMonthlyPeriod;
        let actor = authenticated(operation, actor)?;
        let period = find_period(view, operation, id)?;
        let year = owning_year_state(view, period);
        period_state(period)
            .apply(MonthlyPeriodTransition::Close, year)
            .map_err(|e| rejected(operation, e))?;
        if !confirmed {
            return Ok(needs_confirmation(
                operation,
                format!(
                    "Close monthly period {}? No new journal entries can be recorded in it.",
                    period.period.name
                ),
            ));
        }

        remote(operation, self.service.close_monthly_period(id, actor)).await?;
        info!(monthly_period_id = %id, user_id = %actor, "Monthly period closed");
        self.completed(None).await
    }

    /// Activates or deactivates one monthly period.
    ///
    /// Activation under an inactive year is refused here, before any remote
    /// call and before asking for confirmation.
    ///
    /// # Errors
    ///
    /// Returns `YearInactive` when activating under an inactive year,
    /// `PeriodClosed` for a closed period, and the backend's error otherwise.
    pub async fn toggle_monthly_period_active(
        &self,
        view: &ViewSnapshot,
        actor: Option<UserId>,
        id: MonthlyPeriodId,
        activate: bool,
        confirmed: bool,
    ) -> Result<Outcome, FiscalError> {
        let (operation, transition) = if activate {
            (Operation::ActivateMonthlyPeriod, MonthlyPeriodTransition::Activate)
        } else {
            (Operation::DeactivateMonthlyPeriod, MonthlyPeriodTransition::Deactivate)
        };
        let actor = authenticated(operation, actor)?;
        let period = find_period(view, operation, id)?;
        let year = owning_year_state(view, period);
        period_state(period)
            .apply(transition, year)
            .map_err(|e| rejected(operation, e))?;
        if !confirmed {
            let verb = if activate { "Activate" } else { "Deactivate" };
            return Ok(needs_confirmation(
                operation,
                format!("{verb} monthly period {}?", period.period.name),
            ));
        }

        remote(
            operation,
            self.service.toggle_monthly_period_active(id, activate, actor),
        )
        .await?;
        info!(
            monthly_period_id = %id,
            user_id = %actor,
            activate,
            "Monthly period activation changed"
        );
        self.completed(None).await
    }

    async fn completed(&self, expand: Option<FiscalYearId>) -> Result<Outcome, FiscalError> {
        let snapshot = self.reload().await?;
        Ok(Outcome::Completed { snapshot, expand })
    }
}

async fn remote<T>(
    operation: Operation,
    call: impl Future<Output = ServiceResult<T>>,
) -> Result<T, FiscalError> {
    call.await.map_err(|err| {
        match &err {
            ServiceError::Unexpected(detail) => {
                error!(?operation, detail = %detail, "Period service call failed");
            }
            ServiceError::Rejected(_) | ServiceError::Silent => {
                warn!(?operation, error = %err, "Period service rejected the call");
            }
        }
        FiscalError::from_service(operation, err)
    })
}

fn rejected(operation: Operation, err: FiscalError) -> FiscalError {
    warn!(?operation, error = %err, "Fiscal action rejected");
    err
}

fn authenticated(operation: Operation, actor: Option<UserId>) -> Result<UserId, FiscalError> {
    actor.ok_or_else(|| rejected(operation, FiscalError::Unauthenticated))
}

fn find_year(
    view: &ViewSnapshot,
    operation: Operation,
    id: FiscalYearId,
) -> Result<&FiscalYear, FiscalError> {
    view.fiscal_year(id)
        .ok_or_else(|| rejected(operation, FiscalError::YearNotFound(id)))
}

fn find_period(
    view: &ViewSnapshot,
    operation: Operation,
    id: MonthlyPeriodId,
) -> Result<&MonthlyPeriodWithYear, FiscalError> {
    view.monthly_period(id)
        .ok_or_else(|| rejected(operation, FiscalError::PeriodNotFound(id)))
}

const fn year_state(year: &FiscalYear) -> FiscalYearState {
    FiscalYearState::from_flags(year.record.is_closed, year.record.is_active)
}

const fn period_state(period: &MonthlyPeriodWithYear) -> MonthlyPeriodState {
    MonthlyPeriodState::from_flags(period.period.is_closed, period.period.is_active)
}

/// State of the period's owning year, preferring the joined flags. A period
/// whose year cannot be resolved counts as living under an inactive year.
fn owning_year_state(view: &ViewSnapshot, period: &MonthlyPeriodWithYear) -> FiscalYearState {
    period
        .fiscal_year
        .as_ref()
        .map(|y| FiscalYearState::from_flags(y.is_closed, y.is_active))
        .or_else(|| view.year_state(period.period.fiscal_year_id))
        .unwrap_or(FiscalYearState::OpenInactive)
}

fn needs_confirmation(operation: Operation, prompt: String) -> Outcome {
    Outcome::NeedsConfirmation(Confirmation { operation, prompt })
}
