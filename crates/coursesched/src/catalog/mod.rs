//! The read-only course catalog: departments, courses, sections and their meeting periods.

mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use types::{
    CatalogSpec, Course, CourseId, CourseSpec, CreditRange, Department, DepartmentSpec, Period,
    Section, SectionId, SectionNumber, SectionSpec,
};

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::info;

use crate::time::TimeGrid;

/// Errors raised while loading or assembling a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    /// The catalog file is not valid JSON, or a time/period string in it is malformed
    #[error("Failed to parse catalog: {0}")]
    Json(#[from] serde_json::Error),

    /// Two courses share a department and number
    #[error("Duplicate course {code}")]
    DuplicateCourse { code: String },

    /// Two sections of one course share a section number
    #[error("Duplicate section {number} in {code}")]
    DuplicateSection { code: String, number: String },

    /// A course was added to a department that was never declared
    #[error("Unknown department {abbrev}")]
    UnknownDepartment { abbrev: String },
}

/// Immutable catalog shared by the engine and the conflict detector.
///
/// Ids are dense: `CourseId(n)` indexes `courses` and a section's index
/// is its position inside its course.
#[derive(Debug)]
pub struct Catalog {
    grid: TimeGrid,
    departments: Vec<Department>,
    courses: Vec<Course>,
    by_code: HashMap<String, CourseId>,
}

impl Catalog {
    pub fn grid(&self) -> TimeGrid {
        self.grid
    }

    pub fn departments(&self) -> &[Department] {
        &self.departments
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn course(&self, id: CourseId) -> Option<&Course> {
        self.courses.get(id.index())
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.course(id.course)?.sections.get(id.index())
    }

    /// Finds a course by its code, e.g. `"CSCI 1100"`. Case and spacing are normalized.
    pub fn lookup(&self, code: &str) -> Option<&Course> {
        self.by_code
            .get(&normalize_code(code))
            .and_then(|id| self.course(*id))
    }

    /// Builds a catalog from its file representation.
    pub fn from_spec(spec: CatalogSpec, grid: TimeGrid) -> Result<Self, CatalogError> {
        let mut builder = CatalogBuilder::new(grid);
        for department in spec.departments {
            builder.department(&department.abbrev, &department.name);
            for course in department.courses {
                builder.add_course(&department.abbrev, course)?;
            }
        }
        Ok(builder.build())
    }

    pub fn from_json_str(json: &str, grid: TimeGrid) -> Result<Self, CatalogError> {
        let spec: CatalogSpec = serde_json::from_str(json)?;
        Self::from_spec(spec, grid)
    }

    /// Loads a JSON catalog file
    ///
    /// # Arguments
    /// * `path` - Path to a file laid out as departments → courses → sections → periods
    /// * `grid` - Block granularity every section mask will use
    ///
    /// # Returns
    /// * `Ok(Catalog)` - Catalog with dense ids assigned in file order
    /// * `Err` - If the file can't be read, parsed, or contains duplicates
    pub fn load_json(path: &Path, grid: TimeGrid) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&content, grid)?;
        info!(
            path = %path.display(),
            departments = catalog.departments.len(),
            courses = catalog.courses.len(),
            minutes_per_block = grid.minutes_per_block(),
            "Loaded catalog"
        );
        Ok(catalog)
    }
}

fn normalize_code(code: &str) -> String {
    code.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

/// Assembles a [`Catalog`], assigning ids in insertion order.
pub struct CatalogBuilder {
    grid: TimeGrid,
    departments: Vec<Department>,
    courses: Vec<Course>,
    by_code: HashMap<String, CourseId>,
}

impl CatalogBuilder {
    pub fn new(grid: TimeGrid) -> Self {
        Self {
            grid,
            departments: Vec::new(),
            courses: Vec::new(),
            by_code: HashMap::new(),
        }
    }

    /// Declares a department. Declaring the same abbreviation twice is a no-op.
    pub fn department(&mut self, abbrev: &str, name: &str) -> &mut Self {
        if !self.departments.iter().any(|d| d.abbrev == abbrev) {
            self.departments.push(Department {
                abbrev: abbrev.to_string(),
                name: name.to_string(),
                courses: Vec::new(),
            });
        }
        self
    }

    /// Adds a course to a previously declared department.
    pub fn add_course(&mut self, department: &str, spec: CourseSpec) -> Result<CourseId, CatalogError> {
        let dept_index = self
            .departments
            .iter()
            .position(|d| d.abbrev == department)
            .ok_or_else(|| CatalogError::UnknownDepartment {
                abbrev: department.to_string(),
            })?;

        let code = format!("{} {}", department, spec.number);
        let key = normalize_code(&code);
        if self.by_code.contains_key(&key) {
            return Err(CatalogError::DuplicateCourse { code });
        }

        let id = CourseId(self.courses.len() as u32);
        let mut seen = HashSet::new();
        let mut sections = Vec::with_capacity(spec.sections.len());
        for (index, section) in spec.sections.into_iter().enumerate() {
            if !seen.insert(section.number.clone()) {
                return Err(CatalogError::DuplicateSection {
                    code,
                    number: section.number.to_string(),
                });
            }
            sections.push(Section {
                id: SectionId {
                    course: id,
                    index: index as u32,
                },
                call_number: section
                    .call_number
                    .unwrap_or_else(|| section.number.to_string()),
                number: section.number,
                location: section.location,
                seats: section.seats,
                periods: section.periods,
                notes: section.notes,
                grid: self.grid,
                mask: OnceLock::new(),
            });
        }

        self.courses.push(Course {
            id,
            department: department.to_string(),
            number: spec.number,
            name: spec.name,
            grade_type: spec.grade_type,
            credits: spec.credits,
            notes: spec.notes,
            sections,
        });
        self.departments[dept_index].courses.push(id);
        self.by_code.insert(key, id);
        Ok(id)
    }

    pub fn build(self) -> Catalog {
        Catalog {
            grid: self.grid,
            departments: self.departments,
            courses: self.courses,
            by_code: self.by_code,
        }
    }
}
