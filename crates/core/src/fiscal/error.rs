//! Fiscal lifecycle error types.

use chrono::NaiveDate;
use periodo_shared::AppError;
use periodo_shared::types::{FiscalYearId, MonthlyPeriodId};
use thiserror::Error;

use super::state::{
    FiscalYearState, FiscalYearTransition, MonthlyPeriodState, MonthlyPeriodTransition,
};
use super::view_model::ProcessingKey;

/// Operations that reach the period service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Full reload of years, periods and entry counts.
    Reload,
    /// Fiscal year creation.
    CreateFiscalYear,
    /// Bulk creation of a year's monthly periods.
    InitializeMonthlyPeriods,
    /// Fiscal year close (cascading).
    CloseFiscalYear,
    /// Fiscal year reopen (cascading).
    ReopenFiscalYear,
    /// Fiscal year activation.
    ActivateFiscalYear,
    /// Fiscal year deactivation.
    DeactivateFiscalYear,
    /// Monthly period close.
    CloseMonthlyPeriod,
    /// Monthly period activation.
    ActivateMonthlyPeriod,
    /// Monthly period deactivation.
    DeactivateMonthlyPeriod,
}

impl Operation {
    /// Message shown when the backend fails without saying why.
    #[must_use]
    pub const fn fallback_message(self) -> &'static str {
        match self {
            Self::Reload => "Could not load the fiscal years",
            Self::CreateFiscalYear => "Could not create the fiscal year",
            Self::InitializeMonthlyPeriods => "Could not initialize the monthly periods",
            Self::CloseFiscalYear => "Could not close the fiscal year",
            Self::ReopenFiscalYear => "Could not reopen the fiscal year",
            Self::ActivateFiscalYear => "Could not activate the fiscal year",
            Self::DeactivateFiscalYear => "Could not deactivate the fiscal year",
            Self::CloseMonthlyPeriod => "Could not close the monthly period",
            Self::ActivateMonthlyPeriod => "Could not activate the monthly period",
            Self::DeactivateMonthlyPeriod => "Could not deactivate the monthly period",
        }
    }
}

/// Failure reported by the period service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The backend refused the call and said why.
    #[error("{0}")]
    Rejected(String),

    /// The backend reported failure without details.
    #[error("the period service reported a failure without details")]
    Silent,

    /// Transport or other unexpected failure.
    #[error("unexpected period service failure: {0}")]
    Unexpected(String),
}

/// Fiscal lifecycle errors.
#[derive(Debug, Error)]
pub enum FiscalError {
    /// No authenticated caller.
    #[error("You must be signed in to perform this action")]
    Unauthenticated,

    /// A required form field is blank.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// End date before start date.
    #[error("Invalid date range: end {end} is before start {start}")]
    InvalidDateRange {
        /// Start date.
        start: NaiveDate,
        /// End date.
        end: NaiveDate,
    },

    /// Window covers more calendar months than a fiscal year may.
    #[error("A fiscal year may span at most {max} calendar months, got {months}")]
    WindowTooLong {
        /// Calendar months the window touches.
        months: u32,
        /// Allowed maximum.
        max: u32,
    },

    /// Reopen attempted without a justification.
    #[error("A reason is required to reopen a fiscal year")]
    ReasonRequired,

    /// Fiscal year not found.
    #[error("Fiscal year not found: {0}")]
    YearNotFound(FiscalYearId),

    /// Monthly period not found.
    #[error("Monthly period not found: {0}")]
    PeriodNotFound(MonthlyPeriodId),

    /// Close attempted on a closed year.
    #[error("Fiscal year is already closed")]
    YearAlreadyClosed,

    /// Reopen attempted on an open year.
    #[error("Fiscal year is not closed")]
    YearNotClosed,

    /// Activation change attempted on a closed year.
    #[error("Fiscal year is closed")]
    YearClosed,

    /// Period activation attempted while the owning year is inactive.
    #[error("Cannot activate a monthly period while its fiscal year is inactive; activate the fiscal year first")]
    YearInactive,

    /// Close attempted on a closed period.
    #[error("Monthly period is already closed")]
    PeriodAlreadyClosed,

    /// Activation change attempted on a closed period.
    #[error("Monthly period is closed")]
    PeriodClosed,

    /// Period initialization attempted on a year that already has periods.
    #[error("Fiscal year already has monthly periods")]
    PeriodsAlreadyInitialized,

    /// Any other fiscal year transition the state machine forbids.
    #[error("Cannot {transition:?} a fiscal year in state {from:?}")]
    InvalidYearTransition {
        /// Current state.
        from: FiscalYearState,
        /// Requested transition.
        transition: FiscalYearTransition,
    },

    /// Any other monthly period transition the state machine forbids.
    #[error("Cannot {transition:?} a monthly period in state {from:?}")]
    InvalidPeriodTransition {
        /// Current state.
        from: MonthlyPeriodState,
        /// Requested transition.
        transition: MonthlyPeriodTransition,
    },

    /// Another action on the same target has not finished.
    #[error("{0} is already being processed")]
    Busy(ProcessingKey),

    /// The period service rejected the call.
    #[error("{}", service_message(.operation, .message))]
    Service {
        /// Operation that failed.
        operation: Operation,
        /// Backend message, if any.
        message: Option<String>,
    },

    /// The call failed unexpectedly; details are logged, not shown.
    #[error("{}", fallback(.operation))]
    Unexpected {
        /// Operation that failed.
        operation: Operation,
    },
}

fn service_message(operation: &Operation, message: &Option<String>) -> String {
    message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| operation.fallback_message())
        .to_string()
}

fn fallback(operation: &Operation) -> &'static str {
    operation.fallback_message()
}

impl FiscalError {
    /// Returns true if the error was raised before any remote call.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        !matches!(self, Self::Service { .. } | Self::Unexpected { .. })
    }

    /// Builds the error for a failed service call.
    #[must_use]
    pub fn from_service(operation: Operation, err: ServiceError) -> Self {
        match err {
            ServiceError::Rejected(message) => Self::Service {
                operation,
                message: Some(message),
            },
            ServiceError::Silent => Self::Service {
                operation,
                message: None,
            },
            ServiceError::Unexpected(_) => Self::Unexpected { operation },
        }
    }
}

impl From<FiscalError> for AppError {
    fn from(err: FiscalError) -> Self {
        let message = err.to_string();
        match err {
            FiscalError::Unauthenticated => Self::Unauthorized(message),
            FiscalError::MissingField(_)
            | FiscalError::InvalidDateRange { .. }
            | FiscalError::WindowTooLong { .. }
            | FiscalError::ReasonRequired => Self::Validation(message),
            FiscalError::YearNotFound(_) | FiscalError::PeriodNotFound(_) => {
                Self::NotFound(message)
            }
            FiscalError::YearAlreadyClosed
            | FiscalError::YearNotClosed
            | FiscalError::YearClosed
            | FiscalError::YearInactive
            | FiscalError::PeriodAlreadyClosed
            | FiscalError::PeriodClosed
            | FiscalError::PeriodsAlreadyInitialized
            | FiscalError::InvalidYearTransition { .. }
            | FiscalError::InvalidPeriodTransition { .. } => Self::BusinessRule(message),
            FiscalError::Busy(_) => Self::Conflict(message),
            FiscalError::Service { .. } => Self::ExternalService(message),
            FiscalError::Unexpected { .. } => Self::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_surfaces_backend_message() {
        let err = FiscalError::from_service(
            Operation::CloseFiscalYear,
            ServiceError::Rejected("period 3 has pending entries".into()),
        );
        assert_eq!(err.to_string(), "period 3 has pending entries");
        assert!(!err.is_local());
    }

    #[test]
    fn test_silent_service_error_uses_fallback() {
        let err = FiscalError::from_service(Operation::CloseFiscalYear, ServiceError::Silent);
        assert_eq!(err.to_string(), "Could not close the fiscal year");
    }

    #[test]
    fn test_blank_backend_message_uses_fallback() {
        let err = FiscalError::from_service(
            Operation::ReopenFiscalYear,
            ServiceError::Rejected("  ".into()),
        );
        assert_eq!(err.to_string(), "Could not reopen the fiscal year");
    }

    #[test]
    fn test_unexpected_error_hides_details() {
        let err = FiscalError::from_service(
            Operation::ActivateMonthlyPeriod,
            ServiceError::Unexpected("connection reset by peer".into()),
        );
        assert_eq!(err.to_string(), "Could not activate the monthly period");
        assert!(matches!(AppError::from(err), AppError::Internal(_)));
    }

    #[test]
    fn test_local_errors_map_to_client_errors() {
        assert_eq!(AppError::from(FiscalError::Unauthenticated).status_code(), 401);
        assert_eq!(AppError::from(FiscalError::ReasonRequired).status_code(), 400);
        assert_eq!(AppError::from(FiscalError::YearInactive).status_code(), 422);
        assert_eq!(
            AppError::from(FiscalError::YearNotFound(FiscalYearId::new())).status_code(),
            404
        );
        assert!(FiscalError::YearInactive.is_local());
    }
}
