//! Wall-clock times and their quantization into fixed-size time blocks.

mod period;

pub use period::{DailyTimePeriod, WEEKDAYS};

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::mask::WeekMask;

/// Number of minutes in one day.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Errors produced while building or parsing times and periods.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeError {
    /// Hour outside of the accepted range
    #[error("Hour {hour} is out of range")]
    HourOutOfRange { hour: u8 },

    /// Minute outside of 0-59
    #[error("Minute {minute} is out of range")]
    MinuteOutOfRange { minute: u8 },

    /// The input string is not a recognizable time or period
    #[error("Malformed time input: {input:?}")]
    Malformed { input: String },

    /// Unknown weekday letter in a period's day list
    #[error("Unknown weekday code {code:?}")]
    UnknownWeekday { code: char },

    /// A period whose start is after its end
    #[error("Period start {start} is after its end {end}")]
    InvertedPeriod { start: Time, end: Time },
}

/// Ante or post meridiem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Meridiem {
    Am,
    Pm,
}

/// A wall-clock time of day on a 12-hour clock.
///
/// Times are ordered by minutes from midnight, so `12:00AM < 1:00AM < 12:00PM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Time {
    hour: u8,
    minute: u8,
    meridiem: Meridiem,
}

impl Time {
    /// Creates a time from a 12-hour clock reading.
    ///
    /// # Arguments
    /// * `hour` - Hour in 1-12
    /// * `minute` - Minute in 0-59
    /// * `meridiem` - AM or PM
    pub fn new(hour: u8, minute: u8, meridiem: Meridiem) -> Result<Self, TimeError> {
        if !(1..=12).contains(&hour) {
            return Err(TimeError::HourOutOfRange { hour });
        }
        if minute > 59 {
            return Err(TimeError::MinuteOutOfRange { minute });
        }
        Ok(Self {
            hour,
            minute,
            meridiem,
        })
    }

    /// Creates a time from a 24-hour clock reading (hour in 0-23).
    pub fn from_24h(hour: u8, minute: u8) -> Result<Self, TimeError> {
        if hour > 23 {
            return Err(TimeError::HourOutOfRange { hour });
        }
        let meridiem = if hour >= 12 { Meridiem::Pm } else { Meridiem::Am };
        let twelve = match hour % 12 {
            0 => 12,
            h => h,
        };
        Self::new(twelve, minute, meridiem)
    }

    /// Recovers a time from minutes past midnight, clamping to the last minute of the day.
    pub fn from_minutes(minutes: u16) -> Self {
        let minutes = minutes.min(MINUTES_PER_DAY - 1);
        let hour = (minutes / 60) as u8;
        let minute = (minutes % 60) as u8;
        let meridiem = if hour >= 12 { Meridiem::Pm } else { Meridiem::Am };
        let hour = match hour % 12 {
            0 => 12,
            h => h,
        };
        Self {
            hour,
            minute,
            meridiem,
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn meridiem(&self) -> Meridiem {
        self.meridiem
    }

    /// Minutes elapsed since midnight. Hour 12 counts as 0 before the PM offset is applied.
    pub fn minutes_from_midnight(&self) -> u16 {
        let mut hours = u16::from(self.hour % 12);
        if self.meridiem == Meridiem::Pm {
            hours += 12;
        }
        hours * 60 + u16::from(self.minute)
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.minutes_from_midnight()
            .cmp(&other.minutes_from_midnight())
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.meridiem {
            Meridiem::Am => "AM",
            Meridiem::Pm => "PM",
        };
        write!(f, "{}:{:02}{}", self.hour, self.minute, suffix)
    }
}

impl FromStr for Time {
    type Err = TimeError;

    /// Parses `9:00AM`, `12:30 pm`, or a 24-hour `13:30`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let meridiem = upper
            .strip_suffix("AM")
            .map(|clock| (clock, "AM"))
            .or_else(|| upper.strip_suffix("PM").map(|clock| (clock, "PM")));

        let parsed = match meridiem {
            Some((clock, suffix)) => {
                let clock = format!("{}{}", clock.trim_end(), suffix);
                NaiveTime::parse_from_str(&clock, "%I:%M%p")
            }
            None => NaiveTime::parse_from_str(&upper, "%H:%M"),
        };
        parsed.map(Time::from).map_err(|_| TimeError::Malformed {
            input: s.to_string(),
        })
    }
}

impl TryFrom<String> for Time {
    type Error = TimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Time> for String {
    fn from(value: Time) -> Self {
        value.to_string()
    }
}

impl From<NaiveTime> for Time {
    /// Seconds are truncated.
    fn from(value: NaiveTime) -> Self {
        Self::from_minutes((value.hour() * 60 + value.minute()) as u16)
    }
}

impl From<Time> for NaiveTime {
    fn from(value: Time) -> Self {
        let minutes = u32::from(value.minutes_from_midnight());
        NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap_or(NaiveTime::MIN)
    }
}

/// Rounding direction used when a time falls between two block boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// The block starting at or before the time
    Earlier,
    /// The block starting at or after the time
    Later,
    /// Whichever boundary is nearer; ties go to the later block
    Closest,
}

/// The block quantization of a day.
///
/// A grid is fixed for the lifetime of a loaded catalog: every mask built
/// from it has `blocks_per_day` bits per weekday, and the grid decides
/// whether masks use the narrow (single word) or wide representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeGrid {
    minutes_per_block: u16,
    blocks_per_day: u16,
}

impl TimeGrid {
    /// Creates a grid with the given granularity.
    ///
    /// # Panics
    ///
    /// Panics if `minutes_per_block` is zero or longer than a day. A bad
    /// granularity is a caller contract violation, not bad input data.
    pub fn new(minutes_per_block: u16) -> Self {
        assert!(
            minutes_per_block > 0 && minutes_per_block <= MINUTES_PER_DAY,
            "invalid block granularity: {} minutes",
            minutes_per_block
        );
        Self {
            minutes_per_block,
            blocks_per_day: MINUTES_PER_DAY / minutes_per_block,
        }
    }

    pub fn minutes_per_block(&self) -> u16 {
        self.minutes_per_block
    }

    pub fn blocks_per_day(&self) -> usize {
        usize::from(self.blocks_per_day)
    }

    /// Index of the last block in a day.
    pub fn last_block(&self) -> usize {
        self.blocks_per_day() - 1
    }

    /// True when a whole day fits in one machine word.
    pub fn is_narrow(&self) -> bool {
        self.blocks_per_day() <= u64::BITS as usize
    }

    fn normalize(&self, block: usize) -> usize {
        block.min(self.last_block())
    }

    fn minutes_from_block(&self, block: usize) -> u16 {
        (self.normalize(block) as u16) * self.minutes_per_block
    }

    /// Start time of a block. Out-of-range blocks are clamped to the last block.
    pub fn time_for(&self, block: usize) -> Time {
        Time::from_minutes(self.minutes_from_block(block))
    }

    /// Maps a time to a block index.
    ///
    /// Times past the start of the last block clamp to it, so this never fails.
    pub fn block_for(&self, time: Time, bias: Bias) -> usize {
        let minutes = time.minutes_from_midnight();
        let earlier = self.normalize(usize::from(minutes / self.minutes_per_block));
        let earlier_minutes = self.minutes_from_block(earlier);

        if earlier_minutes == minutes {
            return earlier;
        }

        match bias {
            Bias::Earlier => {
                debug_assert!(earlier_minutes <= minutes);
                earlier
            }
            Bias::Later => {
                let later = self.normalize(earlier + 1);
                debug_assert!(
                    self.minutes_from_block(later) >= minutes || later == self.last_block()
                );
                later
            }
            Bias::Closest => {
                let later = self.normalize(earlier + 1);
                let earlier_diff = minutes.abs_diff(earlier_minutes);
                let later_diff = minutes.abs_diff(self.minutes_from_block(later));
                if later_diff <= earlier_diff {
                    later
                } else {
                    earlier
                }
            }
        }
    }

    /// Exclusive end block for a period ending at `time`.
    ///
    /// Unlike [`TimeGrid::block_for`] this may return `blocks_per_day`, so a
    /// period running to the end of the day still covers the final block.
    fn end_block_for(&self, time: Time) -> usize {
        let minutes = usize::from(time.minutes_from_midnight());
        let per_block = usize::from(self.minutes_per_block);
        minutes.div_ceil(per_block).min(self.blocks_per_day())
    }

    /// Creates an empty week mask sized for this grid.
    pub fn new_week_mask(&self) -> WeekMask {
        WeekMask::new(self)
    }

    /// Computes the blocks a recurring period occupies.
    ///
    /// A period covers the half-open range from the block containing its
    /// start up to the first block boundary at or after its end, on every
    /// day it meets. Back-to-back periods (`9:00-9:50`, `10:00-10:50`) stay
    /// disjoint when the boundary is block aligned.
    pub fn week_mask_for(&self, period: &DailyTimePeriod) -> WeekMask {
        let mut mask = self.new_week_mask();
        let first = self.block_for(period.start(), Bias::Earlier);
        let end = self.end_block_for(period.end());
        if first >= end {
            return mask;
        }
        for day in period.days() {
            mask.set_range(day, first..end);
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Time {
        s.parse().unwrap()
    }

    #[test]
    fn test_time_ordering_uses_minutes_from_midnight() {
        assert!(t("12:00AM") < t("1:00AM"));
        assert!(t("11:59AM") < t("12:00PM"));
        assert!(t("12:30PM") < t("1:00PM"));
        assert_eq!(t("12:00AM").minutes_from_midnight(), 0);
        assert_eq!(t("12:00PM").minutes_from_midnight(), 720);
        assert_eq!(t("11:59PM").minutes_from_midnight(), 1439);
    }

    #[test]
    fn test_time_parse_and_display() {
        assert_eq!(t("9:05am").to_string(), "9:05AM");
        assert_eq!(t(" 12:30 PM ").to_string(), "12:30PM");
        assert_eq!(t("13:30"), t("1:30PM"));
        assert_eq!(t("0:15"), t("12:15AM"));
        assert!("13:00PM".parse::<Time>().is_err());
        assert!("9".parse::<Time>().is_err());
        assert!("9:75AM".parse::<Time>().is_err());
    }

    #[test]
    fn test_time_parse_rejects_out_of_range_clock() {
        assert_eq!(t("1:05PM"), Time::from_24h(13, 5).unwrap());
        assert_eq!(t("12:00 am"), Time::from_minutes(0));
        assert!(matches!(
            "9:60AM".parse::<Time>(),
            Err(TimeError::Malformed { .. })
        ));
        assert!(matches!(
            "0:30PM".parse::<Time>(),
            Err(TimeError::Malformed { .. })
        ));
        assert!("24:00".parse::<Time>().is_err());
        assert!("9:00XM".parse::<Time>().is_err());
        assert!("".parse::<Time>().is_err());
    }

    #[test]
    fn test_time_chrono_conversion() {
        let naive = NaiveTime::from_hms_opt(14, 45, 30).unwrap();
        let time = Time::from(naive);
        assert_eq!(time, t("2:45PM"));
        assert_eq!(NaiveTime::from(time), NaiveTime::from_hms_opt(14, 45, 0).unwrap());
    }

    #[test]
    fn test_block_for_biases() {
        let grid = TimeGrid::new(30);
        assert_eq!(grid.blocks_per_day(), 48);
        assert!(grid.is_narrow());

        // exact boundary ignores the bias
        assert_eq!(grid.block_for(t("9:00AM"), Bias::Earlier), 18);
        assert_eq!(grid.block_for(t("9:00AM"), Bias::Later), 18);
        assert_eq!(grid.block_for(t("9:00AM"), Bias::Closest), 18);

        assert_eq!(grid.block_for(t("9:10AM"), Bias::Earlier), 18);
        assert_eq!(grid.block_for(t("9:10AM"), Bias::Later), 19);
        assert_eq!(grid.block_for(t("9:10AM"), Bias::Closest), 18);
        assert_eq!(grid.block_for(t("9:20AM"), Bias::Closest), 19);
        // ties go to the later block
        assert_eq!(grid.block_for(t("9:15AM"), Bias::Closest), 19);
    }

    #[test]
    fn test_block_for_clamps_at_end_of_day() {
        let grid = TimeGrid::new(30);
        assert_eq!(grid.block_for(t("11:50PM"), Bias::Later), 47);
        assert_eq!(grid.block_for(t("11:50PM"), Bias::Closest), 47);

        let uneven = TimeGrid::new(7);
        assert_eq!(uneven.blocks_per_day(), 205);
        assert_eq!(uneven.block_for(t("11:59PM"), Bias::Earlier), 204);
    }

    #[test]
    fn test_time_for_round_trips_block_starts() {
        let grid = TimeGrid::new(5);
        assert!(!grid.is_narrow());
        for block in [0, 1, 108, 287] {
            assert_eq!(grid.block_for(grid.time_for(block), Bias::Earlier), block);
        }
        assert_eq!(grid.time_for(108), t("9:00AM"));
        assert_eq!(grid.time_for(10_000), t("11:55PM"));
    }

    #[test]
    #[should_panic(expected = "invalid block granularity")]
    fn test_zero_granularity_panics() {
        TimeGrid::new(0);
    }

    #[test]
    fn test_week_mask_for_period() {
        let grid = TimeGrid::new(30);
        let period: DailyTimePeriod = "MW 9:00AM-9:50AM".parse().unwrap();
        let mask = grid.week_mask_for(&period);
        assert_eq!(mask.count_ones(), 4);
        assert!(mask.test(chrono::Weekday::Mon, 18));
        assert!(mask.test(chrono::Weekday::Mon, 19));
        assert!(!mask.test(chrono::Weekday::Mon, 20));
        assert!(mask.test(chrono::Weekday::Wed, 19));
        assert!(mask.is_day_empty(chrono::Weekday::Tue));

        let next: DailyTimePeriod = "MW 10:00AM-10:50AM".parse().unwrap();
        assert!(mask.is_disjoint(&grid.week_mask_for(&next)));
    }

    #[test]
    fn test_week_mask_for_late_and_empty_periods() {
        let grid = TimeGrid::new(30);
        let late: DailyTimePeriod = "F 11:00PM-11:59PM".parse().unwrap();
        assert_eq!(grid.week_mask_for(&late).count_ones(), 2);

        let instant: DailyTimePeriod = "F 9:00AM-9:00AM".parse().unwrap();
        assert!(grid.week_mask_for(&instant).is_empty());
    }
}
