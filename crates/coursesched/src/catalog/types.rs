//! Types for the course catalog
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use crate::mask::WeekMask;
use crate::time::{DailyTimePeriod, TimeGrid};

/// Dense identifier of a course within one catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourseId(pub(crate) u32);

impl CourseId {
    /// Position of the course in its catalog.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "course#{}", self.0)
    }
}

/// Identifier of a section: its course and its position within that course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionId {
    pub course: CourseId,
    pub(crate) index: u32,
}

impl SectionId {
    /// Position of the section within its course.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/section#{}", self.course, self.index)
    }
}

/// A section number as printed by the registrar ("01", "2", "L3").
///
/// Numeric labels order numerically and sort before non-numeric ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionNumber(String);

impl SectionNumber {
    /// Wraps a registrar section label.
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// The label as printed.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<u32> {
        self.0.trim().parse().ok()
    }
}

impl Ord for SectionNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        let mine = self.numeric().unwrap_or(u32::MAX);
        let theirs = other.numeric().unwrap_or(u32::MAX);
        mine.cmp(&theirs).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for SectionNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SectionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusive credit-hour range of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreditRange {
    pub min: u8,
    pub max: u8,
}

impl CreditRange {
    /// A range whose minimum and maximum are both `credits`.
    pub fn fixed(credits: u8) -> Self {
        Self {
            min: credits,
            max: credits,
        }
    }
}

/// One weekly meeting of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub time: DailyTimePeriod,
    /// e.g. "LEC", "LAB"
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub professor: Option<String>,
}

impl Period {
    /// A meeting with no kind, location or professor attached.
    pub fn new(time: DailyTimePeriod) -> Self {
        Self {
            time,
            kind: None,
            location: None,
            professor: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_professor(mut self, professor: impl Into<String>) -> Self {
        self.professor = Some(professor.into());
        self
    }
}

/// An offering of a course.
///
/// The week mask is derived on first use and memoized. Callers only ever
/// see it through a shared reference, so it cannot be altered after it is
/// computed.
#[derive(Debug)]
pub struct Section {
    pub(crate) id: SectionId,
    pub(crate) call_number: String,
    pub(crate) number: SectionNumber,
    pub(crate) location: Option<String>,
    pub(crate) seats: u32,
    pub(crate) periods: Vec<Period>,
    pub(crate) notes: Option<String>,
    pub(crate) grid: TimeGrid,
    pub(crate) mask: OnceLock<WeekMask>,
}

impl Section {
    /// Catalog-wide identifier of this section.
    pub fn id(&self) -> SectionId {
        self.id
    }

    /// Registrar call number used for enrollment.
    pub fn call_number(&self) -> &str {
        &self.call_number
    }

    /// Section label within the course.
    pub fn number(&self) -> &SectionNumber {
        &self.number
    }

    /// Room of the section, if the registrar lists one.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Seat capacity.
    pub fn seats(&self) -> u32 {
        self.seats
    }

    /// Weekly meetings of this section.
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// Free-form registrar notes.
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Union of the masks of every period of this section.
    pub fn week_mask(&self) -> &WeekMask {
        self.mask.get_or_init(|| {
            let mut mask = self.grid.new_week_mask();
            for period in &self.periods {
                mask.merge(&self.grid.week_mask_for(&period.time));
            }
            mask
        })
    }
}

/// A course and all of its sections.
#[derive(Debug)]
pub struct Course {
    pub(crate) id: CourseId,
    pub(crate) department: String,
    pub(crate) number: String,
    pub(crate) name: String,
    pub(crate) grade_type: Option<String>,
    pub(crate) credits: CreditRange,
    pub(crate) notes: Option<String>,
    pub(crate) sections: Vec<Section>,
}

impl Course {
    /// Catalog-wide identifier of this course.
    pub fn id(&self) -> CourseId {
        self.id
    }

    /// Abbreviation of the owning department.
    pub fn department(&self) -> &str {
        &self.department
    }

    /// Course number within the department, e.g. `"1100"`.
    pub fn number(&self) -> &str {
        &self.number
    }

    /// Full course title.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grading basis such as letter or pass/fail.
    pub fn grade_type(&self) -> Option<&str> {
        self.grade_type.as_deref()
    }

    /// Credit hours awarded.
    pub fn credits(&self) -> CreditRange {
        self.credits
    }

    /// Free-form registrar notes.
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Sections ordered by section number.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Code such as `"CSCI 1100"`.
    pub fn code(&self) -> String {
        format!("{} {}", self.department, self.number)
    }
}

/// A department and the courses it owns.
#[derive(Debug, Clone)]
pub struct Department {
    pub abbrev: String,
    pub name: String,
    pub courses: Vec<CourseId>,
}

/// Catalog file layout: departments → courses → sections → periods.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSpec {
    #[serde(default)]
    pub departments: Vec<DepartmentSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentSpec {
    pub abbrev: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub courses: Vec<CourseSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSpec {
    pub number: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub grade_type: Option<String>,
    #[serde(default)]
    pub credits: CreditRange,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
}

impl CourseSpec {
    pub fn new(number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            name: name.into(),
            grade_type: None,
            credits: CreditRange::default(),
            notes: None,
            sections: Vec::new(),
        }
    }

    pub fn with_credits(mut self, credits: CreditRange) -> Self {
        self.credits = credits;
        self
    }

    pub fn with_section(mut self, section: SectionSpec) -> Self {
        self.sections.push(section);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionSpec {
    pub number: SectionNumber,
    /// Registrar call number; defaults to the section number
    #[serde(default)]
    pub call_number: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub seats: u32,
    #[serde(default)]
    pub periods: Vec<Period>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SectionSpec {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: SectionNumber::new(number),
            call_number: None,
            location: None,
            seats: 0,
            periods: Vec::new(),
            notes: None,
        }
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.periods.push(period);
        self
    }

    pub fn with_seats(mut self, seats: u32) -> Self {
        self.seats = seats;
        self
    }

    pub fn with_call_number(mut self, call_number: impl Into<String>) -> Self {
        self.call_number = Some(call_number.into());
        self
    }
}
