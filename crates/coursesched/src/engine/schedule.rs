use chrono::Weekday;
use std::sync::{Arc, OnceLock};

use crate::catalog::CourseId;
use crate::mask::WeekMask;
use crate::time::WEEKDAYS;

use super::unique::UniqueSection;

/// One conflict-free assignment of unique sections to the selected courses.
///
/// Immutable once built. The combined mask is the union of every member's
/// mask and exists for fit testing against candidate courses.
#[derive(Debug, Clone)]
pub struct Schedule {
    sections: Vec<Arc<UniqueSection>>,
    mask: WeekMask,
    metrics: OnceLock<ScheduleMetrics>,
}

/// Presentation metrics, computed on first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleMetrics {
    /// Total minutes spent in class per week
    pub class_minutes: u32,
    /// Number of weekdays with at least one class
    pub class_days: usize,
    /// Occupied blocks per day, largest first
    pub day_sums: [usize; 7],
    /// Shortest break between two consecutive classes on the same day, if
    /// any day has more than one class
    pub smallest_gap: Option<u32>,
}

impl Schedule {
    pub(crate) fn new(sections: Vec<Arc<UniqueSection>>, mask: WeekMask) -> Self {
        Self {
            sections,
            mask,
            metrics: OnceLock::new(),
        }
    }

    /// Chosen unique sections, in search order.
    pub fn sections(&self) -> impl Iterator<Item = &UniqueSection> {
        self.sections.iter().map(|section| section.as_ref())
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// The unique section chosen for `course`, or None if the course was left out.
    pub fn section_for(&self, course: CourseId) -> Option<&UniqueSection> {
        self.sections()
            .find(|section| section.course() == course)
    }

    pub fn includes(&self, course: CourseId) -> bool {
        self.section_for(course).is_some()
    }

    pub fn week_mask(&self) -> &WeekMask {
        &self.mask
    }

    pub fn metrics(&self) -> &ScheduleMetrics {
        self.metrics.get_or_init(|| self.compute_metrics())
    }

    fn compute_metrics(&self) -> ScheduleMetrics {
        let mut class_minutes = 0u32;
        let mut by_day: [Vec<(u16, u16)>; 7] = Default::default();

        for section in &self.sections {
            for period in section.periods() {
                let time = &period.time;
                class_minutes += u32::from(time.duration_minutes()) * time.day_count() as u32;
                for day in time.days() {
                    by_day[day_index(day)].push((
                        time.start().minutes_from_midnight(),
                        time.end().minutes_from_midnight(),
                    ));
                }
            }
        }

        let mut smallest_gap: Option<u32> = None;
        for periods in by_day.iter_mut() {
            periods.sort_unstable();
            for pair in periods.windows(2) {
                let gap = u32::from(pair[1].0.saturating_sub(pair[0].1));
                smallest_gap = Some(smallest_gap.map_or(gap, |g| g.min(gap)));
            }
        }

        let mut day_sums = [0usize; 7];
        for (sum, day) in day_sums.iter_mut().zip(WEEKDAYS) {
            *sum = self.mask.day(day).count_ones();
        }
        let class_days = day_sums.iter().filter(|sum| **sum > 0).count();
        day_sums.sort_unstable_by(|a, b| b.cmp(a));

        ScheduleMetrics {
            class_minutes,
            class_days,
            day_sums,
            smallest_gap,
        }
    }
}

fn day_index(day: Weekday) -> usize {
    day.num_days_from_monday() as usize
}
