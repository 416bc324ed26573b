//! Property-based tests for fiscal year cascades.
//!
//! Random action sequences are applied to an aggregate; rejected actions are
//! skipped, and the lifecycle invariants must hold after every step.

use chrono::{Datelike, Months, NaiveDate, Utc};
use periodo_shared::types::{FiscalYearId, UserId};
use proptest::prelude::*;

use super::aggregate::FiscalYearAggregate;
use super::calendar::generate_monthly_periods;
use super::state::FiscalYearState;
use super::types::{FiscalYearType, NewFiscalYear};

/// One action against an aggregate. Period actions carry an index that is
/// reduced modulo the number of periods.
#[derive(Debug, Clone, Copy)]
enum Action {
    Activate,
    Deactivate,
    Close,
    Reopen,
    ClosePeriod(usize),
    ActivatePeriod(usize),
    DeactivatePeriod(usize),
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::Activate),
        Just(Action::Deactivate),
        Just(Action::Close),
        Just(Action::Reopen),
        (0usize..24).prop_map(Action::ClosePeriod),
        (0usize..24).prop_map(Action::ActivatePeriod),
        (0usize..24).prop_map(Action::DeactivatePeriod),
    ]
}

/// Strategy for a fiscal year window of 1 to 24 months starting 2000..2040.
fn window_strategy() -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
    (2000i32..2040, 1u32..=12, 1u32..=28, 0u32..24, 0u32..28).prop_map(
        |(year, month, day, months, extra_days)| {
            let start = NaiveDate::from_ymd_opt(year, month, day).unwrap();
            let end = start
                .checked_add_months(Months::new(months))
                .unwrap()
                .checked_add_days(chrono::Days::new(u64::from(extra_days)))
                .unwrap();
            (start, end)
        },
    )
}

fn aggregate(start: NaiveDate, end: NaiveDate) -> FiscalYearAggregate {
    FiscalYearAggregate::create(
        NewFiscalYear {
            name: "Prop".into(),
            fiscal_year_type: FiscalYearType::Custom,
            start_date: start,
            end_date: end,
            notes: None,
        },
        UserId::new(),
        Utc::now(),
    )
}

fn step(fy: &FiscalYearAggregate, action: Action, today: NaiveDate) -> Option<FiscalYearAggregate> {
    let actor = UserId::new();
    let period = |i: usize| fy.periods.get(i % fy.periods.len().max(1)).map(|p| p.id);
    match action {
        Action::Activate => fy.activate(today).ok(),
        Action::Deactivate => fy.deactivate().ok(),
        Action::Close => fy.close(actor, Utc::now()).ok(),
        Action::Reopen => fy.reopen().ok(),
        Action::ClosePeriod(i) => fy.close_period(period(i)?, actor, Utc::now()).ok(),
        Action::ActivatePeriod(i) => fy.set_period_active(period(i)?, true).ok(),
        Action::DeactivatePeriod(i) => fy.set_period_active(period(i)?, false).ok(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// No transition sequence breaks a lifecycle invariant: a closed year is
    /// never active, and no period is active under an inactive year.
    #[test]
    fn prop_invariants_hold_after_any_sequence(
        (start, end) in window_strategy(),
        actions in prop::collection::vec(action_strategy(), 0..40),
        today_offset in 0u32..24,
    ) {
        let today = start.checked_add_months(Months::new(today_offset)).unwrap();
        let mut fy = aggregate(start, end);

        for action in actions {
            if let Some(next) = step(&fy, action, today) {
                fy = next;
            }
            prop_assert!(fy.violations().is_empty(), "violations: {:?}", fy.violations());
        }
    }

    /// Closing a year closes every one of its periods, whatever state they
    /// were in.
    #[test]
    fn prop_close_cascades_completely(
        (start, end) in window_strategy(),
        actions in prop::collection::vec(action_strategy(), 0..30),
    ) {
        let mut fy = aggregate(start, end);
        for action in actions {
            if let Some(next) = step(&fy, action, start) {
                fy = next;
            }
        }

        if fy.state() != FiscalYearState::Closed {
            fy = fy.close(UserId::new(), Utc::now()).unwrap();
        }
        prop_assert!(fy.periods.iter().all(|p| p.is_closed && !p.is_active));
        prop_assert!(!fy.year.is_active);
    }

    /// Reopening always leaves the year inactive with every period open.
    #[test]
    fn prop_reopen_restores_open_periods(
        (start, end) in window_strategy(),
    ) {
        let fy = aggregate(start, end)
            .activate(start)
            .unwrap()
            .close(UserId::new(), Utc::now())
            .unwrap()
            .reopen()
            .unwrap();

        prop_assert_eq!(fy.state(), FiscalYearState::OpenInactive);
        prop_assert!(fy.periods.iter().all(|p| !p.is_closed && !p.is_active));
    }

    /// Generated periods cover the window day by day, one per calendar month.
    #[test]
    fn prop_generated_periods_are_contiguous(
        (start, end) in window_strategy(),
    ) {
        let periods = generate_monthly_periods(FiscalYearId::new(), start, end);

        prop_assert!(!periods.is_empty());
        prop_assert_eq!(periods[0].start_date, start);
        prop_assert_eq!(periods[periods.len() - 1].end_date, end);
        for pair in periods.windows(2) {
            prop_assert_eq!(pair[0].end_date.succ_opt().unwrap(), pair[1].start_date);
            prop_assert_ne!(
                (pair[0].year, pair[0].month),
                (pair[1].year, pair[1].month)
            );
        }
        for period in &periods {
            prop_assert_eq!(period.start_date.month(), period.month);
            prop_assert_eq!(period.end_date.month(), period.month);
        }
    }
}
