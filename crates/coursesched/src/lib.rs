//! Course schedule generation over bitmask week grids.
//!
//! Meeting times are quantized into fixed-size blocks, every section gets a
//! [`WeekMask`], and schedules are found by backtracking over disjoint masks.
//! [`SchedulingSession`] ties the synchronous search to a background
//! [`ConflictDetector`] that answers "would this course still fit?" while the
//! selection is being edited.

pub mod catalog;
pub mod config;
pub mod conflict;
pub mod engine;
pub mod mask;
pub mod session;
pub mod time;

pub use catalog::{Catalog, CatalogError, Course, CourseId, Section, SectionId};
pub use config::{ConfigError, EngineConfig};
pub use conflict::{CacheStats, ConflictDetector, ConflictEvent};
pub use engine::{Schedule, ScheduleOrder, SchedulerEngine, SearchError};
pub use mask::{DayMask, WeekMask};
pub use session::SchedulingSession;
pub use time::{DailyTimePeriod, Time, TimeGrid};
