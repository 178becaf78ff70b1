//! Small in-memory catalogs for tests.

use super::{Catalog, CatalogBuilder, CourseSpec, Period, SectionSpec};
use crate::time::TimeGrid;

/// Builds a catalog with one department, `TEST`.
///
/// Course `i` is numbered `1000 + i`; its sections are numbered from 1 in
/// the order given, and each section meets at the listed period strings.
pub(crate) fn catalog(grid: TimeGrid, courses: &[&[&[&str]]]) -> Catalog {
    let mut builder = CatalogBuilder::new(grid);
    builder.department("TEST", "Test Department");
    for (i, sections) in courses.iter().enumerate() {
        let mut course = CourseSpec::new((1000 + i).to_string(), format!("Course {}", i));
        for (j, periods) in sections.iter().enumerate() {
            let mut section = SectionSpec::new((j + 1).to_string());
            for period in periods.iter() {
                section = section.with_period(Period::new(period.parse().unwrap()));
            }
            course = course.with_section(section);
        }
        builder.add_course("TEST", course).unwrap();
    }
    builder.build()
}

/// Like [`catalog`], but from owned period strings.
pub(crate) fn catalog_owned(grid: TimeGrid, courses: &[Vec<Vec<String>>]) -> Catalog {
    let borrowed: Vec<Vec<Vec<&str>>> = courses
        .iter()
        .map(|sections| {
            sections
                .iter()
                .map(|periods| periods.iter().map(String::as_str).collect())
                .collect()
        })
        .collect();
    let sections: Vec<Vec<&[&str]>> = borrowed
        .iter()
        .map(|sections| sections.iter().map(Vec::as_slice).collect())
        .collect();
    let courses: Vec<&[&[&str]]> = sections.iter().map(Vec::as_slice).collect();
    catalog(grid, &courses)
}
