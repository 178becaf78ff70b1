//! Memoized answers to the two candidate-course queries.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::catalog::CourseId;

/// Thread-safe memo of fit and conflict answers keyed by candidate course.
///
/// Each map entry is read and replaced atomically. Eviction is selective:
/// growing the selection can only turn fits into misfits, shrinking it can
/// only do the opposite, so only the entries that may have flipped are dropped.
#[derive(Debug, Default)]
pub struct FitCache {
    fits: DashMap<CourseId, bool>,
    conflicts: DashMap<CourseId, Vec<CourseId>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl FitCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&self, course: CourseId) -> Option<bool> {
        let found = self.fits.get(&course).map(|entry| *entry);
        self.record(found.is_some());
        found
    }

    pub fn insert_fit(&self, course: CourseId, fits: bool) {
        self.fits.insert(course, fits);
    }

    pub fn conflicts(&self, course: CourseId) -> Option<Vec<CourseId>> {
        let found = self.conflicts.get(&course).map(|entry| entry.value().clone());
        self.record(found.is_some());
        found
    }

    pub fn insert_conflicts(&self, course: CourseId, conflicts: Vec<CourseId>) {
        self.conflicts.insert(course, conflicts);
    }

    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// A course joined the selection as required or extra.
    pub fn handle_course_added(&self) {
        let evicted = self.evict_fits(true);
        self.conflicts.clear();
        debug!(evicted_fits = evicted, "Evicted fits after a course was added");
    }

    /// A course left the selection.
    pub fn handle_course_removed(&self, removed: CourseId) {
        let evicted = self.evict_fits(false);
        for mut entry in self.conflicts.iter_mut() {
            entry.value_mut().retain(|course| *course != removed);
        }
        debug!(
            course = %removed,
            evicted_fits = evicted,
            "Evicted misfits after a course was removed"
        );
    }

    /// A selected course switched role. Becoming extra loosens the selection
    /// like a removal; becoming required tightens it like an addition.
    /// Conflict sets do not depend on roles.
    pub fn handle_status_changed(&self, course: CourseId, extra: bool) {
        let evicted = self.evict_fits(!extra);
        debug!(
            course = %course,
            extra = extra,
            evicted_fits = evicted,
            "Evicted fits after a role change"
        );
    }

    /// Drops every fit answer, keeping conflict sets.
    pub fn clear_fits(&self) {
        self.fits.clear();
    }

    /// Drops everything.
    pub fn clear(&self) {
        self.fits.clear();
        self.conflicts.clear();
    }

    /// Removes fit entries holding `value`, returning how many went.
    fn evict_fits(&self, value: bool) -> usize {
        let before = self.fits.len();
        self.fits.retain(|_, fits| *fits != value);
        before.saturating_sub(self.fits.len())
    }

    /// Gets cache statistics.
    pub fn stats(&self) -> CacheStats {
        let fitting = self.fits.iter().filter(|entry| *entry.value()).count();
        let fit_entries = self.fits.len();
        CacheStats {
            fit_entries,
            fitting,
            not_fitting: fit_entries.saturating_sub(fitting),
            conflict_entries: self.conflicts.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub fit_entries: usize,
    pub fitting: usize,
    pub not_fitting: usize,
    pub conflict_entries: usize,
    pub hits: u64,
    pub misses: u64,
}
