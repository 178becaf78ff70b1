//! Error types for schedule generation.

use thiserror::Error;

use crate::catalog::{CourseId, SectionId};

/// Errors that can occur while enumerating schedules.
///
/// An empty result is not an error: "no schedule possible" is `Ok(vec![])`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// More schedules exist than the configured ceiling allows
    #[error("Too many schedules: more than {limit} possible combinations")]
    TooManySchedules { limit: usize },

    /// The search visited more nodes than the configured ceiling allows
    #[error("Search too large: gave up after {nodes} nodes")]
    SearchTooLarge { nodes: u64 },

    /// The selection references a course that is not in the catalog
    #[error("Unknown course {course}")]
    UnknownCourse { course: CourseId },

    /// A blocked section is not in the catalog
    #[error("Unknown section {section}")]
    UnknownSection { section: SectionId },

    /// The run was superseded by a newer selection
    #[error("Search for generation {generation} was superseded")]
    Cancelled { generation: u64 },
}

impl SearchError {
    /// Returns true if the search hit one of its resource ceilings.
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(
            self,
            SearchError::TooManySchedules { .. } | SearchError::SearchTooLarge { .. }
        )
    }

    /// Message suitable for showing to the person building a schedule.
    pub fn user_message(&self) -> String {
        match self {
            SearchError::TooManySchedules { .. } | SearchError::SearchTooLarge { .. } => {
                "Too many schedules. Block out some times or sections and try again.".to_string()
            }
            SearchError::UnknownCourse { .. } | SearchError::UnknownSection { .. } => {
                "The selection refers to a course that is no longer available.".to_string()
            }
            SearchError::Cancelled { .. } => "The search was interrupted.".to_string(),
        }
    }
}
