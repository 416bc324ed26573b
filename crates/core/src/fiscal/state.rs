//! Lifecycle state machines for fiscal years and monthly periods.
//!
//! Persisted records only carry `is_closed` / `is_active` flags; these enums
//! are the state those flags encode. A closed flag dominates: a record that is
//! somehow both closed and active is treated as closed.

use serde::Serialize;

use super::error::FiscalError;

/// Lifecycle state of a fiscal year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FiscalYearState {
    /// Open, not the operative year.
    OpenInactive,
    /// Open and operative.
    OpenActive,
    /// Closed; only an explicit reopen leaves this state.
    Closed,
}

/// Transitions a fiscal year accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FiscalYearTransition {
    /// Open-Inactive → Open-Active.
    Activate,
    /// Open-Active → Open-Inactive.
    Deactivate,
    /// Any open state → Closed.
    Close,
    /// Closed → Open-Inactive.
    Reopen,
}

impl FiscalYearState {
    /// Decodes the persisted flags.
    #[must_use]
    pub const fn from_flags(is_closed: bool, is_active: bool) -> Self {
        match (is_closed, is_active) {
            (true, _) => Self::Closed,
            (false, true) => Self::OpenActive,
            (false, false) => Self::OpenInactive,
        }
    }

    /// Encodes the state as `(is_closed, is_active)`.
    #[must_use]
    pub const fn flags(self) -> (bool, bool) {
        match self {
            Self::OpenInactive => (false, false),
            Self::OpenActive => (false, true),
            Self::Closed => (true, false),
        }
    }

    /// Returns true for `OpenActive`.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::OpenActive)
    }

    /// Transitions accepted from this state.
    #[must_use]
    pub const fn allowed_transitions(self) -> &'static [FiscalYearTransition] {
        match self {
            Self::OpenInactive => &[FiscalYearTransition::Activate, FiscalYearTransition::Close],
            Self::OpenActive => &[FiscalYearTransition::Deactivate, FiscalYearTransition::Close],
            Self::Closed => &[FiscalYearTransition::Reopen],
        }
    }

    /// Applies a transition.
    ///
    /// # Errors
    ///
    /// Returns the specific error for the rejected transition:
    /// `YearAlreadyClosed` when closing a closed year, `YearNotClosed` when
    /// reopening an open one, `YearClosed` when toggling a closed year, and
    /// `InvalidYearTransition` for redundant toggles.
    pub fn apply(self, transition: FiscalYearTransition) -> Result<Self, FiscalError> {
        match (self, transition) {
            (Self::OpenInactive, FiscalYearTransition::Activate) => Ok(Self::OpenActive),
            (Self::OpenActive, FiscalYearTransition::Deactivate) => Ok(Self::OpenInactive),
            (Self::OpenInactive | Self::OpenActive, FiscalYearTransition::Close) => {
                Ok(Self::Closed)
            }
            (Self::Closed, FiscalYearTransition::Reopen) => Ok(Self::OpenInactive),
            (Self::Closed, FiscalYearTransition::Close) => Err(FiscalError::YearAlreadyClosed),
            (Self::Closed, FiscalYearTransition::Activate | FiscalYearTransition::Deactivate) => {
                Err(FiscalError::YearClosed)
            }
            (_, FiscalYearTransition::Reopen) => Err(FiscalError::YearNotClosed),
            (from, transition) => Err(FiscalError::InvalidYearTransition { from, transition }),
        }
    }
}

/// Lifecycle state of a monthly period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthlyPeriodState {
    /// Open, not accepting entries as the operative period.
    Inactive,
    /// Open and operative.
    Active,
    /// Closed; terminal for period-level operations.
    Closed,
}

/// Transitions a monthly period accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthlyPeriodTransition {
    /// Inactive → Active, only under an active year.
    Activate,
    /// Active → Inactive.
    Deactivate,
    /// Any open state → Closed.
    Close,
}

impl MonthlyPeriodState {
    /// Decodes the persisted flags.
    #[must_use]
    pub const fn from_flags(is_closed: bool, is_active: bool) -> Self {
        match (is_closed, is_active) {
            (true, _) => Self::Closed,
            (false, true) => Self::Active,
            (false, false) => Self::Inactive,
        }
    }

    /// Encodes the state as `(is_closed, is_active)`.
    #[must_use]
    pub const fn flags(self) -> (bool, bool) {
        match self {
            Self::Inactive => (false, false),
            Self::Active => (false, true),
            Self::Closed => (true, false),
        }
    }

    /// Transitions accepted from this state given the owning year's state.
    #[must_use]
    pub fn allowed_transitions(self, year: FiscalYearState) -> Vec<MonthlyPeriodTransition> {
        MonthlyPeriodTransition::ALL
            .into_iter()
            .filter(|t| self.apply(*t, year).is_ok())
            .collect()
    }

    /// Applies a transition under the owning year's state.
    ///
    /// # Errors
    ///
    /// Returns `PeriodAlreadyClosed` / `PeriodClosed` for closed periods,
    /// `YearInactive` when activating under an inactive year, and
    /// `InvalidPeriodTransition` for redundant toggles.
    pub fn apply(
        self,
        transition: MonthlyPeriodTransition,
        year: FiscalYearState,
    ) -> Result<Self, FiscalError> {
        match (self, transition) {
            (Self::Closed, MonthlyPeriodTransition::Close) => Err(FiscalError::PeriodAlreadyClosed),
            (Self::Closed, _) => Err(FiscalError::PeriodClosed),
            (Self::Inactive | Self::Active, MonthlyPeriodTransition::Close) => Ok(Self::Closed),
            (Self::Inactive, MonthlyPeriodTransition::Activate) => {
                if year.is_active() {
                    Ok(Self::Active)
                } else {
                    Err(FiscalError::YearInactive)
                }
            }
            (Self::Active, MonthlyPeriodTransition::Deactivate) => Ok(Self::Inactive),
            (from, transition) => Err(FiscalError::InvalidPeriodTransition { from, transition }),
        }
    }
}

impl MonthlyPeriodTransition {
    /// Every period transition.
    pub const ALL: [Self; 3] = [Self::Activate, Self::Deactivate, Self::Close];
}
