//! Orderings used to present generated schedules.
//!
//! Every comparator is a total order over one metric, so equal metrics
//! compare `Equal` and a stable sort keeps search order among them.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::schedule::Schedule;

/// Fewest weekly class minutes first.
pub fn by_class_minutes(a: &Schedule, b: &Schedule) -> Ordering {
    a.metrics().class_minutes.cmp(&b.metrics().class_minutes)
}

/// Fewest days with class first.
pub fn by_class_days(a: &Schedule, b: &Schedule) -> Ordering {
    a.metrics().class_days.cmp(&b.metrics().class_days)
}

/// Biggest smallest break first. A schedule that never has two classes on
/// the same day has no break at all and ranks ahead of every other.
pub fn by_largest_gap(a: &Schedule, b: &Schedule) -> Ordering {
    match (a.metrics().smallest_gap, b.metrics().smallest_gap) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => y.cmp(&x),
    }
}

/// Lightest busiest day first, comparing per-day loads from heaviest to lightest.
pub fn by_daily_load(a: &Schedule, b: &Schedule) -> Ordering {
    a.metrics().day_sums.cmp(&b.metrics().day_sums)
}

/// A named ordering, as chosen on the command line or in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleOrder {
    #[default]
    ClassMinutes,
    ClassDays,
    LargestGap,
    DailyLoad,
}

impl ScheduleOrder {
    pub fn compare(&self, a: &Schedule, b: &Schedule) -> Ordering {
        match self {
            ScheduleOrder::ClassMinutes => by_class_minutes(a, b),
            ScheduleOrder::ClassDays => by_class_days(a, b),
            ScheduleOrder::LargestGap => by_largest_gap(a, b),
            ScheduleOrder::DailyLoad => by_daily_load(a, b),
        }
    }
}

impl FromStr for ScheduleOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minutes" | "class_minutes" => Ok(ScheduleOrder::ClassMinutes),
            "days" | "class_days" => Ok(ScheduleOrder::ClassDays),
            "gaps" | "largest_gap" => Ok(ScheduleOrder::LargestGap),
            "load" | "daily_load" => Ok(ScheduleOrder::DailyLoad),
            other => Err(format!(
                "unknown sort order {:?} (expected minutes, days, gaps or load)",
                other
            )),
        }
    }
}

impl fmt::Display for ScheduleOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScheduleOrder::ClassMinutes => "minutes",
            ScheduleOrder::ClassDays => "days",
            ScheduleOrder::LargestGap => "gaps",
            ScheduleOrder::DailyLoad => "load",
        };
        f.write_str(name)
    }
}

/// Stable sort with an arbitrary comparator.
pub fn sort_by<F>(schedules: &mut [Schedule], compare: F)
where
    F: FnMut(&Schedule, &Schedule) -> Ordering,
{
    schedules.sort_by(compare);
}

/// Stable sort by a named ordering.
pub fn sort_schedules(schedules: &mut [Schedule], order: ScheduleOrder) {
    sort_by(schedules, |a, b| order.compare(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::catalog;
    use crate::engine::generator::{generate_all, CourseChoices, SearchInput, SearchLimits};
    use crate::time::TimeGrid;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Schedules for one required course whose sections differ in shape.
    fn schedules() -> Vec<Schedule> {
        let catalog = catalog(
            TimeGrid::new(5),
            &[
                &[
                    // 1: 150 minutes over 3 days, no breaks
                    &["MWF 9:00AM-9:50AM"],
                    // 2: 150 minutes over 1 day, 10 minute break
                    &["T 9:00AM-9:50AM", "T 10:00AM-10:50AM", "T 11:00AM-11:50AM"],
                    // 3: 100 minutes over 1 day, 70 minute break
                    &["R 9:00AM-9:50AM", "R 11:00AM-11:50AM"],
                    // 4: 160 minutes over 2 days, no breaks
                    &["MW 1:00PM-2:20PM"],
                ],
            ],
        );
        let mut input = SearchInput::new(catalog.grid());
        input.required = vec![CourseChoices::for_course(&catalog.courses()[0])];
        generate_all(&input, &SearchLimits::default()).unwrap()
    }

    fn order_of(schedules: &[Schedule]) -> Vec<&str> {
        schedules
            .iter()
            .map(|s| s.sections().next().unwrap().lowest_section_number().as_str())
            .collect()
    }

    #[test]
    fn test_sort_by_class_minutes_is_stable() {
        let mut schedules = schedules();
        sort_schedules(&mut schedules, ScheduleOrder::ClassMinutes);
        assert_eq!(order_of(&schedules), vec!["3", "1", "2", "4"]);
    }

    #[test]
    fn test_sort_by_class_days() {
        let mut schedules = schedules();
        sort_schedules(&mut schedules, ScheduleOrder::ClassDays);
        assert_eq!(order_of(&schedules), vec!["2", "3", "4", "1"]);
    }

    #[test]
    fn test_sort_by_largest_gap() {
        let mut schedules = schedules();
        sort_schedules(&mut schedules, ScheduleOrder::LargestGap);
        assert_eq!(order_of(&schedules), vec!["1", "4", "3", "2"]);
    }

    #[test]
    fn test_sort_by_daily_load() {
        let mut schedules = schedules();
        sort_schedules(&mut schedules, ScheduleOrder::DailyLoad);
        // busiest days: 1 -> 10 blocks, 4 -> 16, 3 -> 20, 2 -> 30
        assert_eq!(order_of(&schedules), vec!["1", "4", "3", "2"]);
    }

    #[test]
    fn test_comparators_are_consistent() {
        let schedules = schedules();
        let mut rng = StdRng::seed_from_u64(3);
        for order in [
            ScheduleOrder::ClassMinutes,
            ScheduleOrder::ClassDays,
            ScheduleOrder::LargestGap,
            ScheduleOrder::DailyLoad,
        ] {
            for _ in 0..50 {
                let a = &schedules[rng.gen_range(0..schedules.len())];
                let b = &schedules[rng.gen_range(0..schedules.len())];
                let c = &schedules[rng.gen_range(0..schedules.len())];
                assert_eq!(order.compare(a, a), Ordering::Equal);
                assert_eq!(order.compare(a, b), order.compare(b, a).reverse());
                if order.compare(a, b) != Ordering::Greater
                    && order.compare(b, c) != Ordering::Greater
                {
                    assert_ne!(order.compare(a, c), Ordering::Greater);
                }
            }
        }
    }

    #[test]
    fn test_parse_order() {
        assert_eq!("gaps".parse::<ScheduleOrder>().unwrap(), ScheduleOrder::LargestGap);
        assert_eq!("Days".parse::<ScheduleOrder>().unwrap(), ScheduleOrder::ClassDays);
        assert_eq!(ScheduleOrder::ClassMinutes.to_string(), "minutes");
        assert!("fastest".parse::<ScheduleOrder>().is_err());
    }
}
