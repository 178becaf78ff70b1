//! Schedule generation over the current selection.

mod error;
mod generator;
mod rank;
mod schedule;
mod unique;

pub use error::SearchError;
pub use generator::{
    generate, generate_all, CourseChoices, ExtraPolicy, SearchInput, SearchLimits,
};
pub use rank::{
    by_class_days, by_class_minutes, by_daily_load, by_largest_gap, sort_by, sort_schedules,
    ScheduleOrder,
};
pub use schedule::{Schedule, ScheduleMetrics};
pub use unique::{always_conflict, group_sections, SectionGroups, UniqueSection};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::catalog::{Catalog, CourseId, SectionId};
use crate::config::EngineConfig;
use crate::mask::WeekMask;

/// A course in the selection and whether it may be left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedCourse {
    pub course: CourseId,
    pub extra: bool,
}

/// Times and sections the user has ruled out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedState {
    pub time: WeekMask,
    pub sections: HashSet<SectionId>,
}

impl BlockedState {
    /// True when `option` avoids both blocked time and blocked sections.
    pub fn admits(&self, option: &UniqueSection) -> bool {
        option.is_usable(&self.time, &self.sections)
    }
}

/// What a selection edit did, used to invalidate derived state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionChange {
    Unchanged,
    Added(CourseId),
    Removed(CourseId),
    /// The course stays selected but switched between required and extra
    StatusChanged { course: CourseId, extra: bool },
    Replaced,
}

/// Selection and blocked state plus the synchronous search over them.
#[derive(Debug)]
pub struct SchedulerEngine {
    groups: Arc<SectionGroups>,
    config: EngineConfig,
    selected: Vec<SelectedCourse>,
    blocked: BlockedState,
}

impl SchedulerEngine {
    /// Creates an engine with nothing selected and nothing blocked.
    ///
    /// # Panics
    ///
    /// Panics if the catalog was built on a different block grid than the
    /// configuration describes.
    pub fn new(catalog: Arc<Catalog>, config: EngineConfig) -> Self {
        Self::with_groups(Arc::new(SectionGroups::new(catalog)), config)
    }

    /// Creates an engine sharing an existing grouping cache.
    pub fn with_groups(groups: Arc<SectionGroups>, config: EngineConfig) -> Self {
        let grid = config.grid();
        assert_eq!(
            groups.catalog().grid(),
            grid,
            "catalog grid does not match the configured block granularity"
        );
        Self {
            groups,
            config,
            selected: Vec::new(),
            blocked: BlockedState {
                time: grid.new_week_mask(),
                sections: HashSet::new(),
            },
        }
    }

    /// Catalog the engine schedules from.
    pub fn catalog(&self) -> &Arc<Catalog> {
        self.groups.catalog()
    }

    /// Shared identical-mask grouping of every course.
    pub fn groups(&self) -> &Arc<SectionGroups> {
        &self.groups
    }

    /// Grid and search limits in effect.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Selected courses in insertion order.
    pub fn selected(&self) -> &[SelectedCourse] {
        &self.selected
    }

    /// True when `course` is in the selection under either role.
    pub fn is_selected(&self, course: CourseId) -> bool {
        self.selected.iter().any(|s| s.course == course)
    }

    /// Blocked time and blocked sections.
    pub fn blocked(&self) -> &BlockedState {
        &self.blocked
    }

    fn check_course(&self, course: CourseId) -> Result<(), SearchError> {
        self.catalog()
            .course(course)
            .map(|_| ())
            .ok_or(SearchError::UnknownCourse { course })
    }

    /// Replaces the whole selection. A course listed twice keeps its first role.
    pub fn set_selected_courses(
        &mut self,
        required: &[CourseId],
        extra: &[CourseId],
    ) -> Result<SelectionChange, SearchError> {
        let mut selected: Vec<SelectedCourse> =
            Vec::with_capacity(required.len() + extra.len());
        let tagged = required
            .iter()
            .map(|c| (*c, false))
            .chain(extra.iter().map(|c| (*c, true)));
        for (course, extra) in tagged {
            self.check_course(course)?;
            if !selected.iter().any(|s| s.course == course) {
                selected.push(SelectedCourse { course, extra });
            }
        }
        self.selected = selected;
        Ok(SelectionChange::Replaced)
    }

    /// Adds one course. Adding a course that is already selected changes nothing.
    pub fn add_course(
        &mut self,
        course: CourseId,
        extra: bool,
    ) -> Result<SelectionChange, SearchError> {
        self.check_course(course)?;
        if self.is_selected(course) {
            return Ok(SelectionChange::Unchanged);
        }
        self.selected.push(SelectedCourse { course, extra });
        Ok(SelectionChange::Added(course))
    }

    /// Drops a course from the selection. Removing an unselected course changes nothing.
    pub fn remove_course(&mut self, course: CourseId) -> SelectionChange {
        let before = self.selected.len();
        self.selected.retain(|s| s.course != course);
        if self.selected.len() == before {
            SelectionChange::Unchanged
        } else {
            SelectionChange::Removed(course)
        }
    }

    /// Switches a selected course between required and extra.
    pub fn set_course_extra(&mut self, course: CourseId, extra: bool) -> SelectionChange {
        match self.selected.iter_mut().find(|s| s.course == course) {
            Some(selected) if selected.extra != extra => {
                selected.extra = extra;
                SelectionChange::StatusChanged { course, extra }
            }
            _ => SelectionChange::Unchanged,
        }
    }

    /// Replaces the blocked time.
    ///
    /// # Panics
    ///
    /// Panics if the mask was built on a different grid.
    pub fn set_blocked_time(&mut self, time: WeekMask) {
        assert!(
            time.is_compatible(&self.blocked.time),
            "blocked time was built on a different block grid"
        );
        self.blocked.time = time;
    }

    /// Replaces the set of sections the user refuses to take.
    pub fn set_blocked_sections(
        &mut self,
        sections: HashSet<SectionId>,
    ) -> Result<(), SearchError> {
        if let Some(section) = sections
            .iter()
            .find(|id| self.catalog().section(**id).is_none())
        {
            return Err(SearchError::UnknownSection { section: *section });
        }
        self.blocked.sections = sections;
        Ok(())
    }

    /// Resource ceilings for one search run.
    pub fn limits(&self) -> SearchLimits {
        self.config.limits()
    }

    /// Snapshots everything a search run needs.
    pub fn search_input(&self) -> Result<SearchInput, SearchError> {
        let mut input = SearchInput::new(self.catalog().grid());
        for selected in &self.selected {
            let choices = CourseChoices {
                course: selected.course,
                options: self.groups.get(selected.course)?.to_vec(),
            };
            if selected.extra {
                input.extra.push(choices);
            } else {
                input.required.push(choices);
            }
        }
        input.blocked_time = self.blocked.time.clone();
        input.blocked_sections = self.blocked.sections.clone();
        Ok(input)
    }

    /// Enumerates every schedule for the current selection.
    ///
    /// # Returns
    /// * `Ok(schedules)` - Empty when no schedule is possible
    /// * `Err(SearchError)` - If the search exceeded a resource ceiling
    pub fn generate_schedules(&self) -> Result<Vec<Schedule>, SearchError> {
        let start = Instant::now();
        let input = self.search_input()?;
        match generate_all(&input, &self.limits()) {
            Ok(schedules) => {
                info!(
                    required = input.required.len(),
                    extra = input.extra.len(),
                    schedules = schedules.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Generated schedules"
                );
                Ok(schedules)
            }
            Err(e) => {
                warn!(
                    required = input.required.len(),
                    extra = input.extra.len(),
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Schedule generation failed"
                );
                Err(e)
            }
        }
    }

    /// Selected courses that `candidate` can never be scheduled alongside.
    pub fn conflicting_selected(
        &self,
        candidate: CourseId,
    ) -> Result<Vec<CourseId>, SearchError> {
        let mine = self.groups.get(candidate)?;
        let mut conflicts = Vec::new();
        for selected in &self.selected {
            if selected.course == candidate {
                continue;
            }
            let theirs = self.groups.get(selected.course)?;
            if always_conflict(&mine, &theirs) {
                conflicts.push(selected.course);
            }
        }
        Ok(conflicts)
    }
}
