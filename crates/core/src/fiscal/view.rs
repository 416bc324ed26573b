//! Derived view of all fiscal years, rebuilt from scratch on every reload.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use periodo_shared::types::{FiscalYearId, MonthlyPeriodId};
use serde::Serialize;

use super::state::{
    FiscalYearState, FiscalYearTransition, MonthlyPeriodState, MonthlyPeriodTransition,
};
use super::types::{
    FiscalYear, FiscalYearSummary, JournalEntryRef, MonthlyPeriod, MonthlyPeriodWithYear,
};

/// Journal entry counts per monthly period.
///
/// Every known period is present, with zero when nothing was recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PeriodStats(BTreeMap<MonthlyPeriodId, u64>);

impl PeriodStats {
    /// Counts `entries` per period. Entries without a period, or pointing at
    /// an unknown period, are ignored.
    #[must_use]
    pub fn compute<'a>(
        periods: impl IntoIterator<Item = &'a MonthlyPeriod>,
        entries: &[JournalEntryRef],
    ) -> Self {
        let mut counts: BTreeMap<MonthlyPeriodId, u64> =
            periods.into_iter().map(|p| (p.id, 0)).collect();

        for period_id in entries.iter().filter_map(|e| e.monthly_period_id) {
            if let Some(count) = counts.get_mut(&period_id) {
                *count += 1;
            }
        }
        Self(counts)
    }

    /// Entry count for a period; `None` for an unknown period.
    #[must_use]
    pub fn get(&self, period_id: MonthlyPeriodId) -> Option<u64> {
        self.0.get(&period_id).copied()
    }

    /// Entry count for a period, zero when unknown.
    #[must_use]
    pub fn entry_count(&self, period_id: MonthlyPeriodId) -> u64 {
        self.get(period_id).unwrap_or(0)
    }

    /// Number of periods tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no period is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Actions offered on a fiscal year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum YearAction {
    /// Make the year operative.
    Activate,
    /// Make the year non-operative.
    Deactivate,
    /// Close the year and its periods.
    Close,
    /// Reopen the year with a reason.
    Reopen,
    /// Create the year's monthly periods.
    InitializePeriods,
}

/// Actions offered on a monthly period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodAction {
    /// Make the period operative.
    Activate,
    /// Make the period non-operative.
    Deactivate,
    /// Close the period for good.
    Close,
}

/// Immutable projection of the period service's state at one reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewSnapshot {
    /// Date the snapshot was derived for.
    pub today: NaiveDate,
    /// Fiscal years, newest start date first.
    pub fiscal_years: Vec<FiscalYear>,
    /// All monthly periods, newest start date first.
    pub monthly_periods: Vec<MonthlyPeriodWithYear>,
    /// Period covering today's calendar month, if any.
    pub current_period_id: Option<MonthlyPeriodId>,
    /// Year to expand after this reload.
    pub auto_expanded: Option<FiscalYearId>,
    /// Journal entry counts.
    pub stats: PeriodStats,
}

impl ViewSnapshot {
    /// A snapshot with no data, used before the first load.
    #[must_use]
    pub fn empty(today: NaiveDate) -> Self {
        Self {
            today,
            fiscal_years: Vec::new(),
            monthly_periods: Vec::new(),
            current_period_id: None,
            auto_expanded: None,
            stats: PeriodStats::default(),
        }
    }

    /// Derives the full view from freshly loaded backend data.
    #[must_use]
    pub fn derive(
        years: Vec<FiscalYearSummary>,
        mut periods: Vec<MonthlyPeriodWithYear>,
        entries: &[JournalEntryRef],
        today: NaiveDate,
    ) -> Self {
        // Stable sorts: equal start dates keep the backend's order.
        periods.sort_by(|a, b| b.period.start_date.cmp(&a.period.start_date));

        let mut fiscal_years: Vec<FiscalYear> = years
            .into_iter()
            .map(|summary| {
                let id = summary.record.id;
                let children: Vec<MonthlyPeriod> = periods
                    .iter()
                    .filter(|p| p.period.fiscal_year_id == id)
                    .map(|p| p.period.clone())
                    .collect();
                FiscalYear {
                    record: summary.record,
                    has_monthly_periods: summary.monthly_periods_count > 0,
                    monthly_periods_count: summary.monthly_periods_count,
                    monthly_periods: Some(children),
                }
            })
            .collect();
        fiscal_years.sort_by(|a, b| b.record.start_date.cmp(&a.record.start_date));

        let current_period_id = find_current_period(&periods, today).map(|p| p.period.id);
        let auto_expanded = auto_expand_target(&fiscal_years, &periods, today);
        let stats = PeriodStats::compute(periods.iter().map(|p| &p.period), entries);

        Self {
            today,
            fiscal_years,
            monthly_periods: periods,
            current_period_id,
            auto_expanded,
            stats,
        }
    }

    /// Returns true if there are no fiscal years.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fiscal_years.is_empty()
    }

    /// Looks up a fiscal year.
    #[must_use]
    pub fn fiscal_year(&self, id: FiscalYearId) -> Option<&FiscalYear> {
        self.fiscal_years.iter().find(|y| y.id() == id)
    }

    /// Looks up a monthly period.
    #[must_use]
    pub fn monthly_period(&self, id: MonthlyPeriodId) -> Option<&MonthlyPeriodWithYear> {
        self.monthly_periods.iter().find(|p| p.period.id == id)
    }

    /// Periods owned by a year, newest first.
    pub fn periods_for_year(&self, id: FiscalYearId) -> impl Iterator<Item = &MonthlyPeriod> {
        self.monthly_periods
            .iter()
            .map(|p| &p.period)
            .filter(move |p| p.fiscal_year_id == id)
    }

    /// State of a year as of this snapshot.
    #[must_use]
    pub fn year_state(&self, id: FiscalYearId) -> Option<FiscalYearState> {
        self.fiscal_year(id)
            .map(|y| FiscalYearState::from_flags(y.record.is_closed, y.record.is_active))
    }

    /// Actions currently permitted on a year.
    #[must_use]
    pub fn year_actions(&self, year: &FiscalYear) -> Vec<YearAction> {
        let state = FiscalYearState::from_flags(year.record.is_closed, year.record.is_active);
        let mut actions: Vec<YearAction> = state
            .allowed_transitions()
            .iter()
            .map(|t| match t {
                FiscalYearTransition::Activate => YearAction::Activate,
                FiscalYearTransition::Deactivate => YearAction::Deactivate,
                FiscalYearTransition::Close => YearAction::Close,
                FiscalYearTransition::Reopen => YearAction::Reopen,
            })
            .collect();
        if !year.has_monthly_periods && state != FiscalYearState::Closed {
            actions.push(YearAction::InitializePeriods);
        }
        actions
    }

    /// Actions currently permitted on a period.
    ///
    /// A period whose owning year is missing from the snapshot is treated as
    /// living under an inactive year.
    #[must_use]
    pub fn period_actions(&self, period: &MonthlyPeriod) -> Vec<PeriodAction> {
        let year_state = self
            .year_state(period.fiscal_year_id)
            .unwrap_or(FiscalYearState::OpenInactive);
        MonthlyPeriodState::from_flags(period.is_closed, period.is_active)
            .allowed_transitions(year_state)
            .into_iter()
            .map(|t| match t {
                MonthlyPeriodTransition::Activate => PeriodAction::Activate,
                MonthlyPeriodTransition::Deactivate => PeriodAction::Deactivate,
                MonthlyPeriodTransition::Close => PeriodAction::Close,
            })
            .collect()
    }
}

/// Finds the period whose calendar month is `today`'s.
#[must_use]
pub fn find_current_period(
    periods: &[MonthlyPeriodWithYear],
    today: NaiveDate,
) -> Option<&MonthlyPeriodWithYear> {
    periods.iter().find(|p| p.period.is_month_of(today))
}

/// Picks the year to expand: the owner of the current period, otherwise the
/// most recently started year.
///
/// `years` must already be ordered newest start date first.
#[must_use]
pub fn auto_expand_target(
    years: &[FiscalYear],
    periods: &[MonthlyPeriodWithYear],
    today: NaiveDate,
) -> Option<FiscalYearId> {
    find_current_period(periods, today)
        .map(|p| p.period.fiscal_year_id)
        .or_else(|| years.first().map(FiscalYear::id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use periodo_shared::types::UserId;

    use crate::fiscal::aggregate::FiscalYearAggregate;
    use crate::fiscal::types::{FiscalYearType, NewFiscalYear};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn aggregate(
        name: &str,
        start: NaiveDate,
        end: NaiveDate,
        with_periods: bool,
    ) -> FiscalYearAggregate {
        let input = NewFiscalYear {
            name: name.to_string(),
            fiscal_year_type: FiscalYearType::Custom,
            start_date: start,
            end_date: end,
            notes: None,
        };
        if with_periods {
            FiscalYearAggregate::create(input, UserId::new(), Utc::now())
        } else {
            FiscalYearAggregate::without_periods(input, UserId::new(), Utc::now())
        }
    }

    fn snapshot(
        aggregates: &[FiscalYearAggregate],
        entries: &[JournalEntryRef],
        today: NaiveDate,
    ) -> ViewSnapshot {
        let years = aggregates.iter().map(FiscalYearAggregate::summary).collect();
        let periods = aggregates
            .iter()
            .flat_map(FiscalYearAggregate::periods_with_year)
            .collect();
        ViewSnapshot::derive(years, periods, entries, today)
    }

    fn entry(id: MonthlyPeriodId) -> JournalEntryRef {
        JournalEntryRef {
            monthly_period_id: Some(id),
        }
    }

    #[test]
    fn test_expands_year_owning_current_period() {
        let fy2024 = aggregate("FY 2024", date(2024, 1, 1), date(2024, 12, 31), true);
        let fy2023 = aggregate("FY 2023", date(2023, 1, 1), date(2023, 12, 31), true);

        let view = snapshot(&[fy2023, fy2024.clone()], &[], date(2024, 6, 15));

        assert_eq!(view.auto_expanded, Some(fy2024.id()));
        let current = view.current_period_id.unwrap();
        assert_eq!(view.monthly_period(current).unwrap().period.month, 6);
    }

    #[test]
    fn test_current_period_wins_over_newer_year() {
        let older = aggregate("FY 2024", date(2024, 1, 1), date(2024, 12, 31), true);
        let newer_empty = aggregate("FY 2025", date(2025, 1, 1), date(2025, 12, 31), false);

        let view = snapshot(&[newer_empty, older.clone()], &[], date(2024, 6, 15));
        assert_eq!(view.auto_expanded, Some(older.id()));
    }

    #[test]
    fn test_expands_most_recent_year_without_current_period() {
        let fy2023 = aggregate("FY 2023", date(2023, 1, 1), date(2023, 12, 31), true);
        let fy2024 = aggregate("FY 2024", date(2024, 1, 1), date(2024, 12, 31), true);

        let view = snapshot(&[fy2023, fy2024.clone()], &[], date(2030, 1, 10));

        assert_eq!(view.current_period_id, None);
        assert_eq!(view.auto_expanded, Some(fy2024.id()));
    }

    #[test]
    fn test_no_years_no_expansion() {
        let view = ViewSnapshot::derive(Vec::new(), Vec::new(), &[], date(2026, 1, 1));
        assert!(view.is_empty());
        assert_eq!(view.auto_expanded, None);
        assert!(view.stats.is_empty());
    }

    #[test]
    fn test_years_and_periods_sorted_newest_first() {
        let a = aggregate("A", date(2022, 1, 1), date(2022, 12, 31), true);
        let b = aggregate("B", date(2024, 1, 1), date(2024, 12, 31), true);
        let c = aggregate("C", date(2023, 1, 1), date(2023, 12, 31), true);

        let view = snapshot(&[a, b, c], &[], date(2030, 1, 1));
        let names: Vec<_> = view.fiscal_years.iter().map(|y| y.record.name.as_str()).collect();
        assert_eq!(names, ["B", "C", "A"]);
        assert!(view
            .monthly_periods
            .windows(2)
            .all(|w| w[0].period.start_date >= w[1].period.start_date));
    }

    #[test]
    fn test_entry_count_statistic() {
        let fy = aggregate("FY", date(2026, 1, 1), date(2026, 3, 31), true);
        let (p1, p2, p3) = (fy.periods[0].id, fy.periods[1].id, fy.periods[2].id);
        let entries = [entry(p1), entry(p1), entry(p2)];

        let stats = PeriodStats::compute(&fy.periods, &entries);

        assert_eq!(stats.get(p1), Some(2));
        assert_eq!(stats.get(p2), Some(1));
        assert_eq!(stats.get(p3), Some(0));
        assert_eq!(stats.len(), 3);
    }

    #[test]
    fn test_stats_ignore_unknown_and_missing_periods() {
        let fy = aggregate("FY", date(2026, 1, 1), date(2026, 1, 31), true);
        let unknown = MonthlyPeriodId::new();
        let entries = [
            entry(unknown),
            JournalEntryRef {
                monthly_period_id: None,
            },
        ];

        let stats = PeriodStats::compute(&fy.periods, &entries);
        assert_eq!(stats.get(unknown), None);
        assert_eq!(stats.entry_count(fy.periods[0].id), 0);
    }

    #[test]
    fn test_year_has_periods_flags() {
        let with = aggregate("With", date(2026, 1, 1), date(2026, 12, 31), true);
        let without = aggregate("Without", date(2025, 1, 1), date(2025, 12, 31), false);

        let view = snapshot(&[with.clone(), without.clone()], &[], date(2026, 2, 1));

        let with_view = view.fiscal_year(with.id()).unwrap();
        assert!(with_view.has_monthly_periods);
        assert_eq!(with_view.monthly_periods_count, 12);
        assert_eq!(with_view.monthly_periods.as_ref().map(Vec::len), Some(12));
        assert_eq!(view.periods_for_year(with.id()).count(), 12);

        let without_view = view.fiscal_year(without.id()).unwrap();
        assert!(!without_view.has_monthly_periods);
        assert!(view.year_actions(without_view).contains(&YearAction::InitializePeriods));
    }

    #[test]
    fn test_year_actions_follow_state() {
        let open = aggregate("Open", date(2026, 1, 1), date(2026, 12, 31), true);
        let active = open.activate(date(2026, 2, 1)).unwrap();
        let closed = aggregate("Closed", date(2025, 1, 1), date(2025, 12, 31), true)
            .close(UserId::new(), Utc::now())
            .unwrap();

        let view = snapshot(&[active.clone(), closed.clone()], &[], date(2026, 2, 1));

        assert_eq!(
            view.year_actions(view.fiscal_year(active.id()).unwrap()),
            vec![YearAction::Deactivate, YearAction::Close]
        );
        assert_eq!(
            view.year_actions(view.fiscal_year(closed.id()).unwrap()),
            vec![YearAction::Reopen]
        );
    }

    #[test]
    fn test_period_actions_hide_activation_under_inactive_year() {
        let fy = aggregate("FY", date(2026, 1, 1), date(2026, 12, 31), true);
        let view = snapshot(&[fy.clone()], &[], date(2026, 2, 1));

        assert_eq!(view.period_actions(&fy.periods[0]), vec![PeriodAction::Close]);

        let active = fy.activate(date(2026, 2, 1)).unwrap();
        let view = snapshot(&[active.clone()], &[], date(2026, 2, 1));
        assert_eq!(
            view.period_actions(&active.periods[0]),
            vec![PeriodAction::Activate, PeriodAction::Close]
        );
        assert_eq!(
            view.period_actions(&active.periods[1]),
            vec![PeriodAction::Deactivate, PeriodAction::Close]
        );
    }
}
