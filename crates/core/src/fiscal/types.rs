//! Fiscal year and monthly period records.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use periodo_shared::types::{FiscalYearId, MonthlyPeriodId, UserId};
use serde::{Deserialize, Serialize};

use super::error::FiscalError;

/// Longest window, in calendar months, a new fiscal year may cover.
pub const MAX_FISCAL_YEAR_MONTHS: u32 = 24;

/// How a fiscal year window was chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FiscalYearType {
    /// January 1st to December 31st.
    #[default]
    Calendar,
    /// Any other window.
    Custom,
}

/// Persisted fiscal year record, as returned by the period service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYearRecord {
    /// Unique identifier.
    pub id: FiscalYearId,
    /// Display name (e.g., "FY 2026").
    pub name: String,
    /// First day of the fiscal year.
    pub start_date: NaiveDate,
    /// Last day of the fiscal year.
    pub end_date: NaiveDate,
    /// Calendar or custom window.
    pub fiscal_year_type: FiscalYearType,
    /// Whether the year is closed.
    pub is_closed: bool,
    /// Whether the year is the operative one for new entries.
    pub is_active: bool,
    /// Free-form notes entered on creation.
    #[serde(default)]
    pub notes: Option<String>,
    /// User who created the year.
    pub created_by: UserId,
    /// When the year was created.
    pub created_at: DateTime<Utc>,
    /// When the year was last closed.
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    /// User who last closed the year.
    #[serde(default)]
    pub closed_by: Option<UserId>,
}

/// Fiscal year record together with the number of monthly periods it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYearSummary {
    /// The persisted record.
    #[serde(flatten)]
    pub record: FiscalYearRecord,
    /// Number of monthly periods attached to the year.
    pub monthly_periods_count: u32,
}

/// A one-month accounting sub-period of a fiscal year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyPeriod {
    /// Unique identifier.
    pub id: MonthlyPeriodId,
    /// Owning fiscal year.
    pub fiscal_year_id: FiscalYearId,
    /// Display name (e.g., "January 2026").
    pub name: String,
    /// First day of the period.
    pub start_date: NaiveDate,
    /// Last day of the period.
    pub end_date: NaiveDate,
    /// Calendar year the period falls in.
    pub year: i32,
    /// Calendar month, 1-12.
    pub month: u32,
    /// Whether the period is closed.
    pub is_closed: bool,
    /// Whether the period is active.
    pub is_active: bool,
    /// When the period was closed.
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    /// User who closed the period.
    #[serde(default)]
    pub closed_by: Option<UserId>,
}

impl MonthlyPeriod {
    /// Returns true if the period is the calendar month of `date`.
    #[must_use]
    pub fn is_month_of(&self, date: NaiveDate) -> bool {
        self.year == date.year() && self.month == date.month()
    }
}

/// Owning-year flags joined onto a monthly period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYearRef {
    /// Year display name.
    pub name: String,
    /// Whether the year is closed.
    pub is_closed: bool,
    /// Whether the year is active.
    pub is_active: bool,
}

/// Monthly period joined with its owning year's flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyPeriodWithYear {
    /// The period record.
    #[serde(flatten)]
    pub period: MonthlyPeriod,
    /// Owning year, if the join resolved.
    pub fiscal_year: Option<FiscalYearRef>,
}

/// A journal entry reduced to the period it is recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntryRef {
    /// Period the entry belongs to, if any.
    pub monthly_period_id: Option<MonthlyPeriodId>,
}

/// Fiscal year as presented in the view: record plus derived period data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYear {
    /// The persisted record.
    #[serde(flatten)]
    pub record: FiscalYearRecord,
    /// Child periods, newest first, when loaded.
    pub monthly_periods: Option<Vec<MonthlyPeriod>>,
    /// Whether the year owns any periods.
    pub has_monthly_periods: bool,
    /// Number of periods the year owns.
    pub monthly_periods_count: u32,
}

impl FiscalYear {
    /// Returns the year identifier.
    #[must_use]
    pub const fn id(&self) -> FiscalYearId {
        self.record.id
    }
}

/// Fiscal year creation form, as filled in by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateFiscalYearForm {
    /// Year name (required).
    #[serde(default)]
    pub name: String,
    /// Calendar or custom window.
    #[serde(default)]
    pub fiscal_year_type: FiscalYearType,
    /// First day (required).
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last day (required, not before `start_date`).
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Optional notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateFiscalYearForm {
    /// Checks required fields and date ordering.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::MissingField` for a blank name or missing date and
    /// `FiscalError::InvalidDateRange` when the end date precedes the start date,
    /// and `FiscalError::WindowTooLong` past `MAX_FISCAL_YEAR_MONTHS`.
    pub fn validate(&self) -> Result<NewFiscalYear, FiscalError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FiscalError::MissingField("name"));
        }
        let start_date = self.start_date.ok_or(FiscalError::MissingField("start_date"))?;
        let end_date = self.end_date.ok_or(FiscalError::MissingField("end_date"))?;
        if end_date < start_date {
            return Err(FiscalError::InvalidDateRange {
                start: start_date,
                end: end_date,
            });
        }
        let months = calendar_months(start_date, end_date);
        if months > MAX_FISCAL_YEAR_MONTHS {
            return Err(FiscalError::WindowTooLong {
                months,
                max: MAX_FISCAL_YEAR_MONTHS,
            });
        }

        Ok(NewFiscalYear {
            name: name.to_string(),
            fiscal_year_type: self.fiscal_year_type,
            start_date,
            end_date,
            notes: self
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(ToString::to_string),
        })
    }
}

/// Calendar months touched by `[start, end]`, counting partial months.
fn calendar_months(start: NaiveDate, end: NaiveDate) -> u32 {
    let span = (i64::from(end.year()) - i64::from(start.year())) * 12
        + i64::from(end.month())
        - i64::from(start.month())
        + 1;
    u32::try_from(span).unwrap_or(u32::MAX)
}

/// Validated fiscal year creation input handed to the period service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFiscalYear {
    /// Year name, trimmed.
    pub name: String,
    /// Calendar or custom window.
    pub fiscal_year_type: FiscalYearType,
    /// First day.
    pub start_date: NaiveDate,
    /// Last day.
    pub end_date: NaiveDate,
    /// Notes, trimmed, `None` when blank.
    pub notes: Option<String>,
}

/// Justification for reopening a closed fiscal year.
///
/// Always non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReopenReason(String);

impl ReopenReason {
    /// Parses a free-text reason.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::ReasonRequired` if the text is blank.
    pub fn parse(text: &str) -> Result<Self, FiscalError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(FiscalError::ReasonRequired);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the reason text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
