//! Session-level view state: the latest snapshot, which years are expanded,
//! and which targets have an action in flight.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use periodo_shared::types::{FiscalYearId, MonthlyPeriodId};
use serde::Serialize;

use super::error::FiscalError;
use super::view::ViewSnapshot;

/// Target of an in-flight action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ProcessingKey {
    /// A fiscal year.
    Year(FiscalYearId),
    /// A monthly period.
    Period(MonthlyPeriodId),
}

impl fmt::Display for ProcessingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year(id) => write!(f, "Fiscal year {id}"),
            Self::Period(id) => write!(f, "Monthly period {id}"),
        }
    }
}

/// Shared set of targets with an action in flight.
#[derive(Debug, Clone, Default)]
pub struct ProcessingMarkers {
    inner: Arc<Mutex<HashSet<ProcessingKey>>>,
}

impl ProcessingMarkers {
    /// Marks `key` as processing until the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::Busy` if `key` is already marked.
    pub fn try_acquire(&self, key: ProcessingKey) -> Result<ProcessingGuard, FiscalError> {
        let mut set = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(key) {
            return Err(FiscalError::Busy(key));
        }
        Ok(ProcessingGuard {
            markers: self.clone(),
            key,
        })
    }

    /// Returns true if `key` has an action in flight.
    #[must_use]
    pub fn is_processing(&self, key: ProcessingKey) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key)
    }

    /// Every marked target.
    #[must_use]
    pub fn active(&self) -> Vec<ProcessingKey> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    fn release(&self, key: ProcessingKey) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
    }
}

/// Clears its processing marker when dropped, whatever the outcome.
#[derive(Debug)]
#[must_use = "the marker is released as soon as the guard is dropped"]
pub struct ProcessingGuard {
    markers: ProcessingMarkers,
    key: ProcessingKey,
}

impl ProcessingGuard {
    /// The marked target.
    #[must_use]
    pub const fn key(&self) -> ProcessingKey {
        self.key
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.markers.release(self.key);
    }
}

/// The fiscal years screen: current snapshot plus expansion state.
#[derive(Debug, Clone)]
pub struct FiscalYearsViewModel {
    snapshot: Arc<ViewSnapshot>,
    expanded: BTreeSet<FiscalYearId>,
    markers: ProcessingMarkers,
}

impl FiscalYearsViewModel {
    /// An empty view, before the first load.
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        Self {
            snapshot: Arc::new(ViewSnapshot::empty(today)),
            expanded: BTreeSet::new(),
            markers: ProcessingMarkers::default(),
        }
    }

    /// Latest snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ViewSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Expanded years.
    #[must_use]
    pub const fn expanded(&self) -> &BTreeSet<FiscalYearId> {
        &self.expanded
    }

    /// Returns true if the year is expanded.
    #[must_use]
    pub fn is_expanded(&self, id: FiscalYearId) -> bool {
        self.expanded.contains(&id)
    }

    /// Flips a year's expansion and returns the new state.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::YearNotFound` for a year not in the snapshot.
    pub fn toggle_expansion(&mut self, id: FiscalYearId) -> Result<bool, FiscalError> {
        if self.snapshot.fiscal_year(id).is_none() {
            return Err(FiscalError::YearNotFound(id));
        }
        if self.expanded.remove(&id) {
            Ok(false)
        } else {
            self.expanded.insert(id);
            Ok(true)
        }
    }

    /// Expands a year without collapsing anything.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::YearNotFound` for a year not in the snapshot.
    pub fn expand(&mut self, id: FiscalYearId) -> Result<(), FiscalError> {
        if self.snapshot.fiscal_year(id).is_none() {
            return Err(FiscalError::YearNotFound(id));
        }
        self.expanded.insert(id);
        Ok(())
    }

    /// Installs a fresh snapshot and resets expansion to its auto target.
    pub fn apply_reload(&mut self, snapshot: ViewSnapshot) {
        self.expanded = snapshot.auto_expanded.into_iter().collect();
        self.snapshot = Arc::new(snapshot);
    }

    /// Installs the snapshot produced by a mutation, additionally expanding
    /// `expand` when it is still present.
    pub fn apply_mutation(&mut self, snapshot: ViewSnapshot, expand: Option<FiscalYearId>) {
        self.apply_reload(snapshot);
        if let Some(id) = expand.filter(|id| self.snapshot.fiscal_year(*id).is_some()) {
            self.expanded.insert(id);
        }
    }

    /// Processing markers shared with every clone of this view.
    #[must_use]
    pub fn markers(&self) -> ProcessingMarkers {
        self.markers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_guard_clears_marker_on_drop() {
        let markers = ProcessingMarkers::default();
        let key = ProcessingKey::Year(FiscalYearId::new());

        {
            let guard = markers.try_acquire(key).unwrap();
            assert_eq!(guard.key(), key);
            assert!(markers.is_processing(key));
        }
        assert!(!markers.is_processing(key));
    }

    #[test]
    fn test_second_acquire_is_busy() {
        let markers = ProcessingMarkers::default();
        let key = ProcessingKey::Period(MonthlyPeriodId::new());

        let _guard = markers.try_acquire(key).unwrap();
        let err = markers.clone().try_acquire(key).unwrap_err();
        assert!(matches!(err, FiscalError::Busy(k) if k == key));
        assert!(err.to_string().starts_with("Monthly period "));
    }

    #[test]
    fn test_distinct_targets_do_not_block() {
        let markers = ProcessingMarkers::default();
        let _a = markers.try_acquire(ProcessingKey::Year(FiscalYearId::new())).unwrap();
        let _b = markers.try_acquire(ProcessingKey::Year(FiscalYearId::new())).unwrap();
        assert_eq!(markers.active().len(), 2);
    }

    #[test]
    fn test_toggle_unknown_year_rejected() {
        let mut view = FiscalYearsViewModel::new(date(2026, 1, 1));
        let id = FiscalYearId::new();
        assert!(matches!(
            view.toggle_expansion(id),
            Err(FiscalError::YearNotFound(_))
        ));
        assert!(view.expanded().is_empty());
    }

    #[test]
    fn test_mutation_ignores_vanished_year() {
        let mut view = FiscalYearsViewModel::new(date(2026, 1, 1));
        view.apply_mutation(
            ViewSnapshot::empty(date(2026, 1, 1)),
            Some(FiscalYearId::new()),
        );
        assert!(view.expanded().is_empty());
    }

    #[test]
    fn test_empty_reload_clears_expansion() {
        let mut view = FiscalYearsViewModel::new(date(2026, 1, 1));
        view.apply_reload(ViewSnapshot::empty(date(2026, 1, 2)));
        assert!(view.expanded().is_empty());
        assert_eq!(view.snapshot().today, date(2026, 1, 2));
    }
}
