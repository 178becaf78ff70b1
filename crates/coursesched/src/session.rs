//! One user's scheduling session: the synchronous engine for final results
//! and the conflict detector for interactive "can I add this" hints.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::catalog::{Catalog, CourseId, SectionId};
use crate::config::EngineConfig;
use crate::conflict::{CacheStats, ConflictDetector, ConflictEvent};
use crate::engine::{
    self, Schedule, ScheduleOrder, SchedulerEngine, SearchError, SectionGroups, SelectedCourse,
};
use crate::mask::WeekMask;

/// Keeps the engine and the detector on the same selection.
///
/// Every edit is validated by the engine first, so a rejected edit leaves
/// both sides untouched.
pub struct SchedulingSession {
    engine: SchedulerEngine,
    detector: ConflictDetector,
}

impl SchedulingSession {
    /// Creates a session with an empty selection.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, or if the catalog grid
    /// does not match `config.minutes_per_block`.
    pub fn new(catalog: Arc<Catalog>, config: EngineConfig) -> Self {
        let groups = Arc::new(SectionGroups::new(catalog));
        Self {
            engine: SchedulerEngine::with_groups(Arc::clone(&groups), config.clone()),
            detector: ConflictDetector::with_groups(groups, config),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        self.engine.catalog()
    }

    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    pub fn selected(&self) -> &[SelectedCourse] {
        self.engine.selected()
    }

    /// Resolves a `"DEPT NUMBER"` code such as `"CSCI 1200"`.
    pub fn course_id(&self, code: &str) -> Option<CourseId> {
        self.catalog().lookup(code).map(|course| course.id())
    }

    pub fn set_selected_courses(
        &mut self,
        required: &[CourseId],
        extra: &[CourseId],
    ) -> Result<(), SearchError> {
        self.engine.set_selected_courses(required, extra)?;
        self.detector.set_selected_courses(required, extra)
    }

    pub fn add_course(&mut self, course: CourseId, extra: bool) -> Result<(), SearchError> {
        self.engine.add_course(course, extra)?;
        self.detector.add_course(course, extra)
    }

    pub fn remove_course(&mut self, course: CourseId) -> Result<(), SearchError> {
        self.engine.remove_course(course);
        self.detector.remove_course(course)
    }

    pub fn set_course_extra(&mut self, course: CourseId, extra: bool) -> Result<(), SearchError> {
        self.engine.set_course_extra(course, extra);
        self.detector.set_course_extra(course, extra)
    }

    /// # Panics
    ///
    /// Panics if the mask was built on a different grid.
    pub fn set_blocked_time(&mut self, time: WeekMask) {
        self.engine.set_blocked_time(time.clone());
        self.detector.set_blocked_time(time);
    }

    pub fn set_blocked_sections(&mut self, sections: HashSet<SectionId>) -> Result<(), SearchError> {
        self.engine.set_blocked_sections(sections.clone())?;
        self.detector.set_blocked_sections(sections)
    }

    /// Enumerates every schedule for the current selection, in search order.
    ///
    /// An empty result means no schedule is possible; hitting a ceiling is
    /// an error instead.
    pub fn generate_schedules(&self) -> Result<Vec<Schedule>, SearchError> {
        self.engine.generate_schedules()
    }

    /// Stably re-sorts already generated schedules by `order`.
    pub fn sort_schedules(&self, schedules: &mut [Schedule], order: ScheduleOrder) {
        engine::sort_schedules(schedules, order);
    }

    /// Stably re-sorts already generated schedules with a custom comparator.
    pub fn sort_by<F>(&self, schedules: &mut [Schedule], compare: F)
    where
        F: FnMut(&Schedule, &Schedule) -> Ordering,
    {
        engine::sort_by(schedules, compare);
    }

    pub fn would_fit_any_schedule(&self, candidate: CourseId) -> Result<bool, SearchError> {
        self.detector.would_fit_any_schedule(candidate)
    }

    pub fn selected_conflicts(&self, candidate: CourseId) -> Result<Vec<CourseId>, SearchError> {
        self.detector.selected_conflicts(candidate)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConflictEvent> {
        self.detector.subscribe()
    }

    pub fn is_settled(&self) -> bool {
        self.detector.is_settled()
    }

    /// Waits until fit answers reflect the latest edit.
    pub async fn settled(&self) {
        self.detector.settled().await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.detector.cache_stats()
    }
}
