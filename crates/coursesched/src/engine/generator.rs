//! Exhaustive backtracking search for conflict-free schedules.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::{Course, CourseId, SectionId};
use crate::mask::WeekMask;
use crate::time::TimeGrid;

use super::error::SearchError;
use super::schedule::Schedule;
use super::unique::{group_sections, UniqueSection};

/// How schedules treat extra (optional) courses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraPolicy {
    /// Every subset of extras that fits is its own schedule
    #[default]
    AnySubset,
    /// Drop schedules that leave out an extra course which would still fit
    MaximalOnly,
}

/// The unique sections one course can be scheduled in, in the order they are tried.
#[derive(Debug, Clone)]
pub struct CourseChoices {
    pub course: CourseId,
    pub options: Vec<Arc<UniqueSection>>,
}

impl CourseChoices {
    pub fn for_course(course: &Course) -> Self {
        Self {
            course: course.id(),
            options: group_sections(course),
        }
    }
}

/// Everything a search run reads. Built as a snapshot, so later edits to
/// the selection or blocked state never reach a run in progress.
#[derive(Debug, Clone)]
pub struct SearchInput {
    pub grid: TimeGrid,
    pub required: Vec<CourseChoices>,
    pub extra: Vec<CourseChoices>,
    pub blocked_time: WeekMask,
    pub blocked_sections: HashSet<SectionId>,
}

impl SearchInput {
    pub fn new(grid: TimeGrid) -> Self {
        Self {
            grid,
            required: Vec::new(),
            extra: Vec::new(),
            blocked_time: grid.new_week_mask(),
            blocked_sections: HashSet::new(),
        }
    }

    pub fn is_usable(&self, option: &UniqueSection) -> bool {
        option.is_usable(&self.blocked_time, &self.blocked_sections)
    }
}

/// Resource ceilings and knobs for one run.
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    pub max_schedules: usize,
    pub max_nodes: u64,
    /// Nodes visited between two cancellation checks
    pub cancel_check_interval: u64,
    pub extra_policy: ExtraPolicy,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_schedules: 100_000,
            max_nodes: 20_000_000,
            cancel_check_interval: 4096,
            extra_policy: ExtraPolicy::AnySubset,
        }
    }
}

/// One course's surviving options during a run.
struct Level<'a> {
    course: CourseId,
    extra: bool,
    options: Vec<&'a Arc<UniqueSection>>,
}

struct Search<'a, F> {
    levels: &'a [Level<'a>],
    limits: SearchLimits,
    check: F,
    nodes: u64,
    found: Vec<Schedule>,
}

/// Enumerates every schedule for the input.
///
/// Required courses are visited in input order, then extras in input order.
/// Within a course the unique sections are tried in their stored order; for
/// an extra course, leaving it out is tried last.
///
/// `check` is polled every `cancel_check_interval` nodes and aborts the run
/// by returning an error.
///
/// # Returns
/// * `Ok(schedules)` - Possibly empty when no assignment fits
/// * `Err(SearchError)` - A resource ceiling was hit or `check` failed
pub fn generate<F>(
    input: &SearchInput,
    limits: &SearchLimits,
    check: F,
) -> Result<Vec<Schedule>, SearchError>
where
    F: Fn() -> Result<(), SearchError>,
{
    let mut levels = Vec::with_capacity(input.required.len() + input.extra.len());
    for (choices, extra) in input
        .required
        .iter()
        .map(|c| (c, false))
        .chain(input.extra.iter().map(|c| (c, true)))
    {
        let options: Vec<_> = choices
            .options
            .iter()
            .filter(|option| input.is_usable(option))
            .collect();
        if options.is_empty() && !extra {
            debug!(course = %choices.course, "Required course has no usable section");
            return Ok(Vec::new());
        }
        levels.push(Level {
            course: choices.course,
            extra,
            options,
        });
    }

    if levels.is_empty() {
        return Ok(Vec::new());
    }

    let mut search = Search {
        levels: &levels,
        limits: *limits,
        check,
        nodes: 0,
        found: Vec::new(),
    };
    let mut chosen = Vec::with_capacity(levels.len());
    search.visit(0, &input.grid.new_week_mask(), &mut chosen)?;

    debug!(
        nodes = search.nodes,
        schedules = search.found.len(),
        "Search finished"
    );
    Ok(search.found)
}

/// Runs a search that can only stop on a resource ceiling.
pub fn generate_all(
    input: &SearchInput,
    limits: &SearchLimits,
) -> Result<Vec<Schedule>, SearchError> {
    generate(input, limits, || Ok(()))
}

impl<'a, F> Search<'a, F>
where
    F: Fn() -> Result<(), SearchError>,
{
    /// `occupied` is never modified: each branch gets its own merged copy.
    fn visit(
        &mut self,
        depth: usize,
        occupied: &WeekMask,
        chosen: &mut Vec<Arc<UniqueSection>>,
    ) -> Result<(), SearchError> {
        self.nodes += 1;
        if self.nodes > self.limits.max_nodes {
            return Err(SearchError::SearchTooLarge { nodes: self.nodes });
        }
        if self.limits.cancel_check_interval > 0
            && self.nodes % self.limits.cancel_check_interval == 0
        {
            (self.check)()?;
        }

        let levels = self.levels;
        let Some(level) = levels.get(depth) else {
            return self.emit(occupied, chosen);
        };

        for option in &level.options {
            if !option.week_mask().is_disjoint(occupied) {
                continue;
            }
            let merged = occupied.merged(option.week_mask());
            chosen.push(Arc::clone(*option));
            self.visit(depth + 1, &merged, chosen)?;
            chosen.pop();
        }

        if level.extra {
            self.visit(depth + 1, occupied, chosen)?;
        }
        Ok(())
    }

    fn emit(
        &mut self,
        occupied: &WeekMask,
        chosen: &[Arc<UniqueSection>],
    ) -> Result<(), SearchError> {
        if chosen.is_empty() {
            return Ok(());
        }
        if self.limits.extra_policy == ExtraPolicy::MaximalOnly
            && self.omits_fitting_extra(occupied, chosen)
        {
            return Ok(());
        }
        if self.found.len() >= self.limits.max_schedules {
            return Err(SearchError::TooManySchedules {
                limit: self.limits.max_schedules,
            });
        }
        self.found.push(Schedule::new(chosen.to_vec(), occupied.clone()));
        Ok(())
    }

    fn omits_fitting_extra(&self, occupied: &WeekMask, chosen: &[Arc<UniqueSection>]) -> bool {
        self.levels
            .iter()
            .filter(|level| level.extra)
            .filter(|level| !chosen.iter().any(|section| section.course() == level.course))
            .any(|level| {
                level
                    .options
                    .iter()
                    .any(|option| option.week_mask().is_disjoint(occupied))
            })
    }
}
