//! Demo data for local development.

use chrono::{Datelike, NaiveDate};
use periodo_core::fiscal::{FiscalYearType, NewFiscalYear};
use periodo_shared::types::{FiscalYearId, UserId};
use tracing::info;
use uuid::Uuid;

use crate::error::StoreError;
use crate::memory::InMemoryPeriodStore;

/// Demo user ID (consistent across runs).
pub const DEMO_USER_ID: UserId = UserId::from_uuid(Uuid::from_u128(2));

/// Years created by [`seed_demo`].
#[derive(Debug, Clone, Copy)]
pub struct DemoSeed {
    /// Previous calendar year, closed.
    pub previous: FiscalYearId,
    /// Current calendar year, active.
    pub current: FiscalYearId,
}

/// Seeds a closed previous calendar year and an active current one, each
/// with a few journal entries.
///
/// # Errors
///
/// Returns an error if the store already holds an overlapping year.
pub async fn seed_demo(
    store: &InMemoryPeriodStore,
    today: NaiveDate,
) -> Result<DemoSeed, StoreError> {
    let previous = store
        .insert_fiscal_year(calendar_year(today.year() - 1)?, DEMO_USER_ID, true)
        .await?;
    let current = store
        .insert_fiscal_year(calendar_year(today.year())?, DEMO_USER_ID, true)
        .await?;

    for (year, per_period) in [(previous.id, 3), (current.id, 2)] {
        let Some(aggregate) = store.fiscal_year(year).await else {
            return Err(StoreError::YearNotFound(year));
        };
        for period in aggregate.periods.iter().filter(|p| p.start_date <= today) {
            for n in 1..=per_period {
                store
                    .record_journal_entry(Some(period.id), format!("{} entry {n}", period.name))
                    .await?;
            }
        }
    }

    store.close_year(previous.id, DEMO_USER_ID).await?;
    store.set_year_active(current.id, true, DEMO_USER_ID).await?;

    info!(
        previous = %previous.id,
        current = %current.id,
        "Demo fiscal years seeded"
    );
    Ok(DemoSeed {
        previous: previous.id,
        current: current.id,
    })
}

fn calendar_year(year: i32) -> Result<NewFiscalYear, StoreError> {
    let (Some(start_date), Some(end_date)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return Err(StoreError::YearOutOfRange(year));
    };
    Ok(NewFiscalYear {
        name: format!("FY {year}"),
        fiscal_year_type: FiscalYearType::Calendar,
        start_date,
        end_date,
        notes: Some("Demo data".to_string()),
    })
}
