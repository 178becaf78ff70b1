//! Bitset masks recording which time blocks of a week are occupied.

mod day;

pub use day::DayMask;

use chrono::Weekday;
use std::ops::Range;

use crate::time::{TimeGrid, WEEKDAYS};

/// Seven day masks, Monday first, all of the same variant and width.
///
/// The fixed-size array keeps the week complete: a week mask is never
/// partially constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WeekMask {
    days: [DayMask; 7],
}

fn index(day: Weekday) -> usize {
    day.num_days_from_monday() as usize
}

impl WeekMask {
    /// Creates an empty week sized for the grid.
    pub fn new(grid: &TimeGrid) -> Self {
        Self {
            days: std::array::from_fn(|_| DayMask::for_grid(grid)),
        }
    }

    /// Occupied blocks of one weekday.
    pub fn day(&self, day: Weekday) -> &DayMask {
        &self.days[index(day)]
    }

    /// Iterates `(weekday, mask)` pairs, Monday first.
    pub fn days(&self) -> impl Iterator<Item = (Weekday, &DayMask)> {
        WEEKDAYS.iter().copied().zip(self.days.iter())
    }

    /// Returns true if `block` on `day` is occupied.
    pub fn test(&self, day: Weekday, block: usize) -> bool {
        self.days[index(day)].test(block)
    }

    /// Marks one block occupied. Panics past the end of the day.
    pub fn set(&mut self, day: Weekday, block: usize) {
        self.days[index(day)].set(block);
    }

    /// Marks one block free.
    pub fn clear(&mut self, day: Weekday, block: usize) {
        self.days[index(day)].clear(block);
    }

    /// Marks every block of `range` on `day` occupied.
    pub fn set_range(&mut self, day: Weekday, range: Range<usize>) {
        self.days[index(day)].set_range(range);
    }

    /// Marks all of `day` occupied.
    pub fn fill(&mut self, day: Weekday) {
        self.days[index(day)].fill();
    }

    /// Marks all of `day` free.
    pub fn clear_day(&mut self, day: Weekday) {
        self.days[index(day)].clear_all();
    }

    /// True when no block is occupied on any day.
    pub fn is_empty(&self) -> bool {
        self.days.iter().all(DayMask::is_empty)
    }

    /// True when `day` has no occupied block.
    pub fn is_day_empty(&self, day: Weekday) -> bool {
        self.days[index(day)].is_empty()
    }

    /// Total occupied blocks across the week.
    pub fn count_ones(&self) -> usize {
        self.days.iter().map(DayMask::count_ones).sum()
    }

    /// True when both weeks were built on the same grid.
    pub fn is_compatible(&self, other: &WeekMask) -> bool {
        self.days
            .iter()
            .zip(other.days.iter())
            .all(|(mine, theirs)| mine.is_compatible(theirs))
    }

    /// Returns true if the masks share no occupied block on any day.
    pub fn is_disjoint(&self, other: &WeekMask) -> bool {
        self.days
            .iter()
            .zip(other.days.iter())
            .all(|(mine, theirs)| mine.is_disjoint(theirs))
    }

    /// Unions `other` into this mask, day by day.
    pub fn merge(&mut self, other: &WeekMask) {
        for (mine, theirs) in self.days.iter_mut().zip(other.days.iter()) {
            mine.union_with(theirs);
        }
    }

    /// Returns the union of both masks, leaving `self` untouched.
    pub fn merged(&self, other: &WeekMask) -> WeekMask {
        let mut union = self.clone();
        union.merge(other);
        union
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::DailyTimePeriod;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn mask(grid: &TimeGrid, periods: &[&str]) -> WeekMask {
        let mut mask = grid.new_week_mask();
        for period in periods {
            let period: DailyTimePeriod = period.parse().unwrap();
            mask.merge(&grid.week_mask_for(&period));
        }
        mask
    }

    fn random_mask(grid: &TimeGrid, rng: &mut StdRng) -> WeekMask {
        let mut mask = grid.new_week_mask();
        for day in WEEKDAYS {
            for _ in 0..rng.gen_range(0..4) {
                mask.set(day, rng.gen_range(0..grid.blocks_per_day()));
            }
        }
        mask
    }

    #[test]
    fn test_week_disjoint_checks_every_day() {
        let grid = TimeGrid::new(30);
        let mw = mask(&grid, &["MW 9:00AM-9:50AM"]);
        let tr = mask(&grid, &["TR 9:00AM-9:50AM"]);
        let w = mask(&grid, &["W 9:30AM-10:00AM"]);

        assert!(mw.is_disjoint(&tr));
        assert!(!mw.is_disjoint(&w));
        assert!(tr.is_disjoint(&w));
    }

    #[test]
    fn test_day_operations_delegate() {
        let grid = TimeGrid::new(5);
        let mut week = grid.new_week_mask();
        week.set(Weekday::Fri, 100);
        assert!(week.test(Weekday::Fri, 100));
        assert!(!week.test(Weekday::Thu, 100));
        week.fill(Weekday::Sun);
        assert_eq!(week.day(Weekday::Sun).count_ones(), 288);
        week.clear_day(Weekday::Sun);
        week.clear(Weekday::Fri, 100);
        assert!(week.is_empty());
        assert_eq!(week.days().count(), 7);
    }

    #[test]
    fn test_merged_leaves_operands_untouched() {
        let grid = TimeGrid::new(30);
        let a = mask(&grid, &["M 9:00AM-10:00AM"]);
        let b = mask(&grid, &["M 1:00PM-2:00PM"]);
        let union = a.merged(&b);
        assert_eq!(union.count_ones(), 4);
        assert_eq!(a.count_ones(), 2);
        assert_eq!(b.count_ones(), 2);
    }

    #[test]
    fn test_disjoint_symmetry_and_self() {
        let mut rng = StdRng::seed_from_u64(7);
        for grid in [TimeGrid::new(30), TimeGrid::new(5)] {
            for _ in 0..200 {
                let a = random_mask(&grid, &mut rng);
                let b = random_mask(&grid, &mut rng);
                assert_eq!(a.is_disjoint(&b), b.is_disjoint(&a));
                assert_eq!(a.is_disjoint(&a), a.is_empty());
            }
        }
    }

    #[test]
    fn test_merge_laws() {
        let mut rng = StdRng::seed_from_u64(11);
        for grid in [TimeGrid::new(30), TimeGrid::new(5)] {
            let empty = grid.new_week_mask();
            for _ in 0..100 {
                let a = random_mask(&grid, &mut rng);
                let b = random_mask(&grid, &mut rng);
                let c = random_mask(&grid, &mut rng);

                assert_eq!(a.merged(&b), b.merged(&a));
                assert_eq!(a.merged(&b).merged(&c), a.merged(&b.merged(&c)));
                assert_eq!(a.merged(&empty), a);
            }
        }
    }

    #[test]
    #[should_panic(expected = "day mask variant mismatch")]
    fn test_mixed_grids_panic() {
        let narrow = TimeGrid::new(30).new_week_mask();
        let wide = TimeGrid::new(5).new_week_mask();
        assert!(!narrow.is_compatible(&wide));
        assert!(narrow.is_compatible(&TimeGrid::new(30).new_week_mask()));
        narrow.is_disjoint(&wide);
    }
}
