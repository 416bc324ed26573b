//! Monthly period generation for a fiscal year window.

use chrono::{Datelike, Months, NaiveDate};
use periodo_shared::types::{FiscalYearId, MonthlyPeriodId};

use super::types::MonthlyPeriod;

/// Generates one open, inactive period per calendar month touched by
/// `[start_date, end_date]`, oldest first.
///
/// The first and last periods are clipped to the window, so a year starting on
/// April 15th gets an "April" period running from the 15th to the 30th.
#[must_use]
pub fn generate_monthly_periods(
    fiscal_year_id: FiscalYearId,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Vec<MonthlyPeriod> {
    let mut periods = Vec::new();
    let mut current = start_date;

    while current <= end_date {
        let period_end = last_day_of_month(current).map_or(end_date, |d| d.min(end_date));

        periods.push(MonthlyPeriod {
            id: MonthlyPeriodId::new(),
            fiscal_year_id,
            name: format!("{} {}", month_name(current.month()), current.year()),
            start_date: current,
            end_date: period_end,
            year: current.year(),
            month: current.month(),
            is_closed: false,
            is_active: false,
            closed_at: None,
            closed_by: None,
        });

        let Some(next) = first_day_of_next_month(current) else {
            break;
        };
        current = next;
    }

    periods
}

fn first_day_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)?.checked_add_months(Months::new(1))
}

fn last_day_of_month(date: NaiveDate) -> Option<NaiveDate> {
    first_day_of_next_month(date)?.pred_opt()
}

/// Returns the English month name.
#[must_use]
pub const fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_generate_monthly_periods_full_year() {
        let fy_id = FiscalYearId::new();
        let periods = generate_monthly_periods(fy_id, date(2026, 1, 1), date(2026, 12, 31));

        assert_eq!(periods.len(), 12);
        assert_eq!(periods[0].name, "January 2026");
        assert_eq!(periods[0].start_date, date(2026, 1, 1));
        assert_eq!(periods[0].end_date, date(2026, 1, 31));
        assert_eq!(periods[1].end_date, date(2026, 2, 28));
        assert_eq!(periods[11].name, "December 2026");
        assert_eq!(periods[11].end_date, date(2026, 12, 31));
        assert!(periods.iter().all(|p| p.fiscal_year_id == fy_id));
        assert!(periods.iter().all(|p| !p.is_closed && !p.is_active));
    }

    #[test]
    fn test_generate_monthly_periods_custom_window() {
        let periods =
            generate_monthly_periods(FiscalYearId::new(), date(2025, 7, 15), date(2026, 6, 10));

        assert_eq!(periods.len(), 12);
        assert_eq!(periods[0].name, "July 2025");
        assert_eq!(periods[0].start_date, date(2025, 7, 15));
        assert_eq!(periods[0].end_date, date(2025, 7, 31));
        assert_eq!((periods[6].year, periods[6].month), (2026, 1));
        assert_eq!(periods[11].start_date, date(2026, 6, 1));
        assert_eq!(periods[11].end_date, date(2026, 6, 10));
    }

    #[test]
    fn test_generate_monthly_periods_leap_february() {
        let periods =
            generate_monthly_periods(FiscalYearId::new(), date(2024, 2, 1), date(2024, 2, 29));

        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].end_date, date(2024, 2, 29));
    }

    #[test]
    fn test_generate_monthly_periods_single_day() {
        let day = date(2026, 3, 9);
        let periods = generate_monthly_periods(FiscalYearId::new(), day, day);

        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].start_date, day);
        assert_eq!(periods[0].end_date, day);
    }

    #[test]
    fn test_generate_monthly_periods_are_contiguous() {
        let periods =
            generate_monthly_periods(FiscalYearId::new(), date(2025, 11, 20), date(2027, 2, 3));

        for pair in periods.windows(2) {
            assert_eq!(pair[0].end_date.succ_opt(), Some(pair[1].start_date));
        }
    }
}
