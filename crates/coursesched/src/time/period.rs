use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Time, TimeError};

/// Weekdays in mask order, Monday first.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Registrar-style day letters, indexed like [`WEEKDAYS`].
const DAY_CODES: [char; 7] = ['M', 'T', 'W', 'R', 'F', 'S', 'U'];

/// A recurring weekly meeting slot: a set of weekdays and a start/end time.
///
/// Serialized as a compact string such as `"MWF 9:00AM-9:50AM"`. Thursday is
/// `R` and Sunday is `U`; a period that meets on no day uses `-` for its days.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DailyTimePeriod {
    days: [bool; 7],
    start: Time,
    end: Time,
}

impl DailyTimePeriod {
    /// Creates a period, rejecting one that wraps past midnight.
    pub fn try_new(days: [bool; 7], start: Time, end: Time) -> Result<Self, TimeError> {
        if start > end {
            return Err(TimeError::InvertedPeriod { start, end });
        }
        Ok(Self { days, start, end })
    }

    /// Creates a period meeting on the given weekdays.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(weekdays: &[Weekday], start: Time, end: Time) -> Self {
        let mut days = [false; 7];
        for day in weekdays {
            days[day.num_days_from_monday() as usize] = true;
        }
        match Self::try_new(days, start, end) {
            Ok(period) => period,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn start(&self) -> Time {
        self.start
    }

    pub fn end(&self) -> Time {
        self.end
    }

    pub fn is_on(&self, day: Weekday) -> bool {
        self.days[day.num_days_from_monday() as usize]
    }

    /// The weekdays this period meets on, Monday first.
    pub fn days(&self) -> impl Iterator<Item = Weekday> + '_ {
        WEEKDAYS
            .iter()
            .copied()
            .filter(move |day| self.is_on(*day))
    }

    pub fn day_count(&self) -> usize {
        self.days.iter().filter(|on| **on).count()
    }

    /// Length of one meeting in minutes.
    pub fn duration_minutes(&self) -> u16 {
        self.end.minutes_from_midnight() - self.start.minutes_from_midnight()
    }
}

impl fmt::Display for DailyTimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: String = DAY_CODES
            .iter()
            .zip(self.days.iter())
            .filter(|(_, on)| **on)
            .map(|(code, _)| *code)
            .collect();
        let codes = if codes.is_empty() { "-".to_string() } else { codes };
        write!(f, "{} {}-{}", codes, self.start, self.end)
    }
}

impl FromStr for DailyTimePeriod {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || TimeError::Malformed {
            input: s.to_string(),
        };

        let (codes, range) = s.trim().split_once(char::is_whitespace).ok_or_else(malformed)?;
        let (start, end) = range.split_once('-').ok_or_else(malformed)?;

        let mut days = [false; 7];
        if codes != "-" {
            for code in codes.chars() {
                let upper = code.to_ascii_uppercase();
                let index = DAY_CODES
                    .iter()
                    .position(|c| *c == upper)
                    .ok_or(TimeError::UnknownWeekday { code })?;
                days[index] = true;
            }
        }

        Self::try_new(days, start.parse()?, end.parse()?)
    }
}

impl TryFrom<String> for DailyTimePeriod {
    type Error = TimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DailyTimePeriod> for String {
    fn from(value: DailyTimePeriod) -> Self {
        value.to_string()
    }
}
