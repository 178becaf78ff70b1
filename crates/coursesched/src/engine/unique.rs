use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::catalog::{Catalog, Course, CourseId, Period, SectionId, SectionNumber};
use crate::mask::WeekMask;

use super::error::SearchError;

/// Sections of one course that meet at exactly the same blocks.
///
/// Such sections are interchangeable for scheduling, so the search treats
/// the whole group as a single choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueSection {
    course: CourseId,
    mask: WeekMask,
    sections: Vec<SectionId>,
    lowest: SectionNumber,
    periods: Vec<Period>,
}

impl UniqueSection {
    pub fn course(&self) -> CourseId {
        self.course
    }

    pub fn week_mask(&self) -> &WeekMask {
        &self.mask
    }

    /// Member sections, ordered by section number.
    pub fn sections(&self) -> &[SectionId] {
        &self.sections
    }

    pub fn contains(&self, section: SectionId) -> bool {
        self.sections.contains(&section)
    }

    /// Lowest section number among the members, used for display ordering.
    pub fn lowest_section_number(&self) -> &SectionNumber {
        &self.lowest
    }

    /// Meeting periods of the lowest-numbered member.
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// True when every member section has been individually excluded.
    pub fn is_fully_blocked(&self, blocked: &HashSet<SectionId>) -> bool {
        self.sections.iter().all(|section| blocked.contains(section))
    }

    /// True if this group can appear in some schedule: it occupies some
    /// time, avoids blocked time, and has a member that is not blocked.
    pub fn is_usable(
        &self,
        blocked_time: &WeekMask,
        blocked_sections: &HashSet<SectionId>,
    ) -> bool {
        !self.mask.is_empty()
            && !self.is_fully_blocked(blocked_sections)
            && self.mask.is_disjoint(blocked_time)
    }
}

/// Partitions a course's sections by identical week mask.
///
/// Groups come back ordered by their lowest section number; within a group
/// the members are ordered the same way.
pub fn group_sections(course: &Course) -> Vec<Arc<UniqueSection>> {
    let mut by_mask: HashMap<&WeekMask, usize> = HashMap::new();
    let mut groups: Vec<UniqueSection> = Vec::new();

    let mut sections: Vec<_> = course.sections().iter().collect();
    sections.sort_by(|a, b| a.number().cmp(b.number()));

    for section in sections {
        let mask = section.week_mask();
        match by_mask.get(mask) {
            Some(&index) => groups[index].sections.push(section.id()),
            None => {
                by_mask.insert(mask, groups.len());
                groups.push(UniqueSection {
                    course: course.id(),
                    mask: mask.clone(),
                    sections: vec![section.id()],
                    lowest: section.number().clone(),
                    periods: section.periods().to_vec(),
                });
            }
        }
    }

    groups.into_iter().map(Arc::new).collect()
}

/// True when no unique section of `a` can be scheduled alongside any of `b`.
///
/// A course without sections never conflicts with anything.
pub fn always_conflict(a: &[Arc<UniqueSection>], b: &[Arc<UniqueSection>]) -> bool {
    !a.is_empty()
        && !b.is_empty()
        && a.iter()
            .all(|x| b.iter().all(|y| !x.week_mask().is_disjoint(y.week_mask())))
}

/// Per-course grouping, computed once per course and shared between runs.
#[derive(Debug)]
pub struct SectionGroups {
    catalog: Arc<Catalog>,
    groups: DashMap<CourseId, Arc<[Arc<UniqueSection>]>>,
}

impl SectionGroups {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            groups: DashMap::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Unique sections of `course`, ordered by lowest section number.
    pub fn get(&self, course: CourseId) -> Result<Arc<[Arc<UniqueSection>]>, SearchError> {
        if let Some(groups) = self.groups.get(&course) {
            return Ok(Arc::clone(groups.value()));
        }
        let found = self
            .catalog
            .course(course)
            .ok_or(SearchError::UnknownCourse { course })?;
        let groups: Arc<[Arc<UniqueSection>]> = group_sections(found).into();
        self.groups.insert(course, Arc::clone(&groups));
        Ok(groups)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
