//! Incremental answers to "can this course still be added?" while the
//! selection is being edited.

mod cache;
mod worker;

pub use cache::{CacheStats, FitCache};

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{broadcast, mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::catalog::{Catalog, CourseId, SectionId};
use crate::config::EngineConfig;
use crate::engine::{
    ExtraPolicy, Schedule, SchedulerEngine, SearchError, SearchInput, SearchLimits,
    SectionGroups, SelectionChange,
};
use crate::mask::WeekMask;

use worker::RegenerateTask;

/// Notification sent to subscribers when cached answers change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictEvent {
    /// The selection changed; answers are optimistic until the next recompute
    Invalidated { generation: u64 },
    /// The pre-schedule for `generation` finished
    Recomputed { generation: u64, schedules: usize },
    /// The pre-schedule for `generation` hit a resource ceiling
    Exhausted { generation: u64 },
}

/// The background-computed schedule set for the current selection.
#[derive(Debug, Clone)]
pub(crate) enum PreSchedule {
    Pending,
    Ready {
        generation: u64,
        schedules: Arc<Vec<Schedule>>,
    },
    Exhausted {
        generation: u64,
    },
}

impl PreSchedule {
    fn generation(&self) -> Option<u64> {
        match self {
            PreSchedule::Pending => None,
            PreSchedule::Ready { generation, .. } | PreSchedule::Exhausted { generation } => {
                Some(*generation)
            }
        }
    }
}

pub(crate) struct DetectorState {
    engine: SchedulerEngine,
    pre: PreSchedule,
}

/// State shared between the detector handle and its worker.
///
/// Queries hold the read lock from cache lookup to cache insert, and every
/// mutation or publish holds the write lock, so an answer computed against
/// one selection can never be stored after that selection changed.
pub(crate) struct Shared {
    state: RwLock<DetectorState>,
    /// Bumped under the write lock; read lock-free by running searches
    generation: AtomicU64,
    cache: FitCache,
    events: broadcast::Sender<ConflictEvent>,
    settled: Notify,
}

impl Shared {
    fn read(&self) -> RwLockReadGuard<'_, DetectorState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DetectorState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshots the selection for `generation`, or None if it was superseded.
    pub(crate) fn snapshot(
        &self,
        generation: u64,
    ) -> Option<Result<(SearchInput, SearchLimits), SearchError>> {
        let state = self.read();
        if self.generation.load(Ordering::Acquire) != generation {
            return None;
        }
        Some(
            state
                .engine
                .search_input()
                .map(|input| (input, state.engine.limits())),
        )
    }

    /// Installs a finished pre-schedule unless a newer selection replaced it.
    pub(crate) fn publish(&self, generation: u64, outcome: PreSchedule) {
        let mut state = self.write();
        if self.generation.load(Ordering::Acquire) != generation {
            debug!(generation = generation, "Dropping stale pre-schedule");
            return;
        }

        let event = match &outcome {
            PreSchedule::Ready { schedules, .. } => {
                // with no schedule every usable candidate fits, which is not
                // monotonic in the selection, so nothing cached survives
                if schedules.is_empty() {
                    self.cache.clear_fits();
                }
                ConflictEvent::Recomputed {
                    generation,
                    schedules: schedules.len(),
                }
            }
            PreSchedule::Exhausted { .. } => ConflictEvent::Exhausted { generation },
            PreSchedule::Pending => return,
        };
        state.pre = outcome;
        drop(state);

        let _ = self.events.send(event);
        self.settled.notify_waiters();
    }
}

/// Fit of `candidate` against a finished pre-schedule.
///
/// A selected candidate fits if some schedule actually includes it. Any
/// other candidate needs a usable unique section disjoint from at least one
/// schedule; with no schedules at all, any usable section fits.
pub(crate) fn fits_pre_schedule(
    engine: &SchedulerEngine,
    candidate: CourseId,
    schedules: &[Schedule],
) -> Result<bool, SearchError> {
    let options = engine.groups().get(candidate)?;
    if engine.is_selected(candidate) {
        return Ok(schedules.is_empty() || schedules.iter().any(|s| s.includes(candidate)));
    }

    let blocked = engine.blocked();
    let usable: Vec<_> = options.iter().filter(|o| blocked.admits(o)).collect();
    if usable.is_empty() {
        return Ok(false);
    }
    if schedules.is_empty() {
        return Ok(true);
    }
    Ok(schedules.iter().any(|schedule| {
        usable
            .iter()
            .any(|option| option.week_mask().is_disjoint(schedule.week_mask()))
    }))
}

fn has_required(engine: &SchedulerEngine) -> bool {
    engine.selected().iter().any(|selected| !selected.extra)
}

/// Cached conflict and fit queries over a selection that keeps changing.
///
/// Every mutation bumps a generation counter, evicts the cache entries it
/// may have invalidated and queues a background recompute of the
/// pre-schedule. Until that finishes, uncached fit queries answer `true`.
pub struct ConflictDetector {
    shared: Arc<Shared>,
    tasks: mpsc::UnboundedSender<RegenerateTask>,
    worker: JoinHandle<()>,
}

impl ConflictDetector {
    /// Creates a detector and starts its worker.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, or if the catalog grid
    /// does not match the configuration.
    pub fn new(catalog: Arc<Catalog>, config: EngineConfig) -> Self {
        Self::with_groups(Arc::new(SectionGroups::new(catalog)), config)
    }

    pub fn with_groups(groups: Arc<SectionGroups>, config: EngineConfig) -> Self {
        let debounce = config.debounce();
        let engine = SchedulerEngine::with_groups(groups, config);
        let (events, _) = broadcast::channel(64);
        let shared = Arc::new(Shared {
            state: RwLock::new(DetectorState {
                engine,
                pre: PreSchedule::Ready {
                    generation: 0,
                    schedules: Arc::new(Vec::new()),
                },
            }),
            generation: AtomicU64::new(0),
            cache: FitCache::new(),
            events,
            settled: Notify::new(),
        });

        let (tasks, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(worker::run(Arc::clone(&shared), receiver, debounce));
        Self {
            shared,
            tasks,
            worker,
        }
    }

    /// Would `candidate` fit into at least one schedule of the current selection?
    ///
    /// Answers `true` without caching while the pre-schedule is being
    /// recomputed or when it hit a resource ceiling.
    pub fn would_fit_any_schedule(&self, candidate: CourseId) -> Result<bool, SearchError> {
        let state = self.shared.read();
        if let Some(fits) = self.shared.cache.fit(candidate) {
            return Ok(fits);
        }
        let schedules = match &state.pre {
            PreSchedule::Ready { schedules, .. } => Arc::clone(schedules),
            PreSchedule::Pending | PreSchedule::Exhausted { .. } => {
                // still validate the id
                state.engine.groups().get(candidate)?;
                return Ok(true);
            }
        };

        let fits = fits_pre_schedule(&state.engine, candidate, &schedules)?;
        if !schedules.is_empty() {
            self.shared.cache.insert_fit(candidate, fits);
        }
        Ok(fits)
    }

    /// Selected courses that `candidate` can never be scheduled alongside.
    ///
    /// Computed straight from the selection, so it is exact even while a
    /// recompute is pending.
    pub fn selected_conflicts(&self, candidate: CourseId) -> Result<Vec<CourseId>, SearchError> {
        let state = self.shared.read();
        if let Some(conflicts) = self.shared.cache.conflicts(candidate) {
            return Ok(conflicts);
        }
        let conflicts = state.engine.conflicting_selected(candidate)?;
        self.shared
            .cache
            .insert_conflicts(candidate, conflicts.clone());
        Ok(conflicts)
    }

    pub fn set_selected_courses(
        &self,
        required: &[CourseId],
        extra: &[CourseId],
    ) -> Result<(), SearchError> {
        self.mutate(|engine| engine.set_selected_courses(required, extra))
    }

    pub fn add_course(&self, course: CourseId, extra: bool) -> Result<(), SearchError> {
        self.mutate(|engine| engine.add_course(course, extra))
    }

    pub fn remove_course(&self, course: CourseId) -> Result<(), SearchError> {
        self.mutate(|engine| Ok(engine.remove_course(course)))
    }

    pub fn set_course_extra(&self, course: CourseId, extra: bool) -> Result<(), SearchError> {
        self.mutate(|engine| Ok(engine.set_course_extra(course, extra)))
    }

    /// # Panics
    ///
    /// Panics if the mask was built on a different grid.
    pub fn set_blocked_time(&self, time: WeekMask) {
        let mut state = self.shared.write();
        state.engine.set_blocked_time(time);
        self.shared.cache.clear_fits();
        self.invalidate(state);
    }

    pub fn set_blocked_sections(&self, sections: HashSet<SectionId>) -> Result<(), SearchError> {
        let mut state = self.shared.write();
        state.engine.set_blocked_sections(sections)?;
        self.shared.cache.clear_fits();
        self.invalidate(state);
        Ok(())
    }

    fn mutate<F>(&self, edit: F) -> Result<(), SearchError>
    where
        F: FnOnce(&mut SchedulerEngine) -> Result<SelectionChange, SearchError>,
    {
        let mut state = self.shared.write();
        let had_required = has_required(&state.engine);
        let change = edit(&mut state.engine)?;
        let cache = &self.shared.cache;
        match change {
            SelectionChange::Unchanged => return Ok(()),
            SelectionChange::Added(_) => cache.handle_course_added(),
            SelectionChange::Removed(course) => cache.handle_course_removed(course),
            SelectionChange::StatusChanged { course, extra } => {
                cache.handle_status_changed(course, extra)
            }
            SelectionChange::Replaced => cache.clear(),
        }
        // Selective eviction relies on every schedule keeping a required
        // course across the edit. An extras-only selection can lose its last
        // shared course, and under MaximalOnly omitting a fitting extra is
        // not allowed, so either way the schedule sets stop nesting.
        if !had_required
            || !has_required(&state.engine)
            || state.engine.config().extra_policy == ExtraPolicy::MaximalOnly
        {
            cache.clear_fits();
        }
        self.invalidate(state);
        Ok(())
    }

    /// Bumps the generation and queues a recompute. Consumes the write guard.
    fn invalidate(&self, mut state: RwLockWriteGuard<'_, DetectorState>) {
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        state.pre = PreSchedule::Pending;
        drop(state);

        debug!(generation = generation, "Selection changed");
        let _ = self
            .shared
            .events
            .send(ConflictEvent::Invalidated { generation });
        if self.tasks.send(RegenerateTask { generation }).is_err() {
            warn!(generation = generation, "Pre-schedule worker is gone");
        }
    }

    /// Receives an event for every invalidation and every finished recompute.
    pub fn subscribe(&self) -> broadcast::Receiver<ConflictEvent> {
        self.shared.events.subscribe()
    }

    /// Current selection generation; 0 before the first edit.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    /// True once the pre-schedule matches the latest selection.
    pub fn is_settled(&self) -> bool {
        let state = self.shared.read();
        state.pre.generation() == Some(self.generation())
    }

    /// Waits until the pre-schedule matches the latest selection.
    pub async fn settled(&self) {
        loop {
            let notified = self.shared.settled.notified();
            if self.is_settled() {
                return;
            }
            notified.await;
        }
    }

    /// The finished pre-schedule, if it is current and complete.
    pub fn pre_schedule(&self) -> Option<Arc<Vec<Schedule>>> {
        let state = self.shared.read();
        match &state.pre {
            PreSchedule::Ready {
                generation,
                schedules,
            } if *generation == self.generation() => Some(Arc::clone(schedules)),
            _ => None,
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.shared.cache.stats()
    }
}

impl Drop for ConflictDetector {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{catalog, catalog_owned};
    use crate::engine::generate_all;
    use crate::time::{Time, TimeGrid};
    use chrono::Weekday;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::time::Duration;

    fn config(debounce_ms: u64) -> EngineConfig {
        EngineConfig {
            minutes_per_block: 30,
            debounce_ms,
            ..EngineConfig::default()
        }
    }

    fn detector(courses: &[&[&[&str]]], debounce_ms: u64) -> (ConflictDetector, Vec<CourseId>) {
        let catalog = Arc::new(catalog(TimeGrid::new(30), courses));
        let ids = catalog.courses().iter().map(|c| c.id()).collect();
        (ConflictDetector::new(catalog, config(debounce_ms)), ids)
    }

    async fn settle(detector: &ConflictDetector) {
        tokio::time::timeout(Duration::from_secs(30), detector.settled())
            .await
            .expect("pre-schedule never settled");
    }

    const COURSES: &[&[&[&str]]] = &[
        // 0: Monday or Tuesday morning
        &[&["M 9:00AM-9:50AM"], &["T 9:00AM-9:50AM"]],
        // 1: Monday morning only
        &[&["M 9:00AM-9:50AM"]],
        // 2: Tuesday morning only
        &[&["T 9:00AM-9:50AM"]],
        // 3: Wednesday afternoon
        &[&["W 1:00PM-1:50PM"]],
    ];

    #[tokio::test]
    async fn test_optimistic_until_recomputed() {
        let (detector, ids) = detector(COURSES, 50);
        assert!(detector.is_settled());

        detector.set_selected_courses(&[ids[0], ids[1]], &[]).unwrap();
        assert!(!detector.is_settled());
        // course 2 cannot fit (0 is pushed to Tuesday by 1) but the answer is optimistic
        assert!(detector.would_fit_any_schedule(ids[2]).unwrap());
        assert_eq!(detector.cache_stats().fit_entries, 0);

        settle(&detector).await;
        assert!(!detector.would_fit_any_schedule(ids[2]).unwrap());
        assert!(detector.would_fit_any_schedule(ids[3]).unwrap());
        assert_eq!(detector.pre_schedule().unwrap().len(), 1);
        assert_eq!(detector.cache_stats().fit_entries, 2);
    }

    #[tokio::test]
    async fn test_selected_conflicts_are_exact_while_pending() {
        let (detector, ids) = detector(COURSES, 1_000);
        detector.set_selected_courses(&[ids[1]], &[ids[3]]).unwrap();
        assert!(!detector.is_settled());

        assert!(detector.selected_conflicts(ids[0]).unwrap().is_empty());
        assert!(detector.selected_conflicts(ids[1]).unwrap().is_empty());
        detector.add_course(ids[2], false).unwrap();
        assert!(detector.selected_conflicts(ids[0]).unwrap().is_empty());

        let (both_days, ids) =
            self::detector(&[&[&["MT 9:00AM-9:50AM"]], COURSES[1], COURSES[2]], 1_000);
        both_days.set_selected_courses(&[ids[1], ids[2]], &[]).unwrap();
        assert_eq!(both_days.selected_conflicts(ids[0]).unwrap(), vec![ids[1], ids[2]]);
        both_days.remove_course(ids[1]).unwrap();
        assert_eq!(both_days.selected_conflicts(ids[0]).unwrap(), vec![ids[2]]);
        assert_eq!(both_days.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn test_dropping_last_required_course_reevaluates_fits() {
        let (detector, ids) = detector(
            &[
                &[&["M 9:00AM-9:50AM"]],
                &[&["T 9:00AM-9:50AM"]],
                &[&["T 9:00AM-9:50AM"]],
            ],
            0,
        );
        detector.set_selected_courses(&[ids[0]], &[ids[1]]).unwrap();
        settle(&detector).await;
        // fits next to the Monday course alone
        assert!(detector.would_fit_any_schedule(ids[2]).unwrap());

        detector.remove_course(ids[0]).unwrap();
        settle(&detector).await;
        assert!(!detector.would_fit_any_schedule(ids[2]).unwrap());
    }

    #[tokio::test]
    async fn test_events_follow_mutations() {
        let (detector, ids) = detector(COURSES, 0);
        let mut events = detector.subscribe();

        detector.add_course(ids[0], false).unwrap();
        assert_eq!(events.recv().await.unwrap(), ConflictEvent::Invalidated { generation: 1 });
        assert_eq!(
            events.recv().await.unwrap(),
            ConflictEvent::Recomputed {
                generation: 1,
                schedules: 2
            }
        );

        // adding a course twice is not an edit
        detector.add_course(ids[0], true).unwrap();
        assert_eq!(detector.generation(), 1);
    }

    #[tokio::test]
    async fn test_burst_of_edits_settles_on_latest() {
        let (detector, ids) = detector(COURSES, 20);
        for _ in 0..10 {
            detector.add_course(ids[1], false).unwrap();
            detector.remove_course(ids[1]).unwrap();
        }
        detector.add_course(ids[0], false).unwrap();
        detector.add_course(ids[2], false).unwrap();
        settle(&detector).await;

        assert_eq!(detector.generation(), 22);
        let schedules = detector.pre_schedule().unwrap();
        assert_eq!(schedules.len(), 1);
        assert!(!detector.would_fit_any_schedule(ids[1]).unwrap());
    }

    #[tokio::test]
    async fn test_exhausted_pre_schedule_answers_optimistically() {
        let catalog = Arc::new(catalog(TimeGrid::new(30), COURSES));
        let config = EngineConfig {
            max_schedules: 1,
            ..config(0)
        };
        let detector = ConflictDetector::new(catalog, config);
        let mut events = detector.subscribe();
        detector.add_course(CourseId(0), false).unwrap();

        assert_eq!(events.recv().await.unwrap(), ConflictEvent::Invalidated { generation: 1 });
        assert_eq!(events.recv().await.unwrap(), ConflictEvent::Exhausted { generation: 1 });
        assert!(detector.is_settled());
        assert!(detector.pre_schedule().is_none());
        assert!(detector.would_fit_any_schedule(CourseId(1)).unwrap());
        assert!(detector.would_fit_any_schedule(CourseId(40)).is_err());
    }

    #[tokio::test]
    async fn test_blocked_time_and_sections() {
        let (detector, ids) = detector(COURSES, 0);
        detector.add_course(ids[3], false).unwrap();
        settle(&detector).await;
        assert!(detector.would_fit_any_schedule(ids[1]).unwrap());

        let mut blocked = TimeGrid::new(30).new_week_mask();
        blocked.fill(Weekday::Mon);
        detector.set_blocked_time(blocked);
        settle(&detector).await;
        assert!(!detector.would_fit_any_schedule(ids[1]).unwrap());
        assert!(detector.would_fit_any_schedule(ids[0]).unwrap());

        let tuesday = SectionId { course: ids[0], index: 1 };
        detector
            .set_blocked_sections(HashSet::from([tuesday]))
            .unwrap();
        settle(&detector).await;
        assert!(!detector.would_fit_any_schedule(ids[0]).unwrap());
    }

    fn random_courses(rng: &mut StdRng) -> Vec<Vec<Vec<String>>> {
        (0..6)
            .map(|_| {
                (0..rng.gen_range(1..=3))
                    .map(|_| {
                        let day = ["M", "T", "W"][rng.gen_range(0..3)];
                        let start = rng.gen_range(16..20) * 30;
                        vec![format!(
                            "{} {}-{}",
                            day,
                            Time::from_minutes(start),
                            Time::from_minutes(start + 50)
                        )]
                    })
                    .collect()
            })
            .collect()
    }

    /// Mirrors every edit on a plain engine and checks that cached answers
    /// equal answers computed from scratch.
    #[tokio::test]
    async fn test_cached_answers_match_fresh_recomputation() {
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..8 {
            let catalog = Arc::new(catalog_owned(TimeGrid::new(30), &random_courses(&mut rng)));
            let ids: Vec<CourseId> = catalog.courses().iter().map(|c| c.id()).collect();
            let detector = ConflictDetector::new(Arc::clone(&catalog), config(0));
            let mut mirror = SchedulerEngine::new(Arc::clone(&catalog), config(0));

            for _ in 0..25 {
                let course = ids[rng.gen_range(0..ids.len())];
                match rng.gen_range(0..10) {
                    0..=3 => {
                        let extra = rng.gen_bool(0.3);
                        detector.add_course(course, extra).unwrap();
                        mirror.add_course(course, extra).unwrap();
                    }
                    4..=6 => {
                        detector.remove_course(course).unwrap();
                        mirror.remove_course(course);
                    }
                    7 | 8 => {
                        let extra = rng.gen_bool(0.5);
                        detector.set_course_extra(course, extra).unwrap();
                        mirror.set_course_extra(course, extra);
                    }
                    _ => {
                        let mut blocked = TimeGrid::new(30).new_week_mask();
                        if rng.gen_bool(0.5) {
                            let start = rng.gen_range(16..22);
                            blocked.set_range(Weekday::Tue, start..start + 2);
                        }
                        detector.set_blocked_time(blocked.clone());
                        mirror.set_blocked_time(blocked);
                    }
                }

                // queries while pending must never be cached
                let _ = detector.would_fit_any_schedule(ids[0]);
                settle(&detector).await;

                let schedules = generate_all(&mirror.search_input().unwrap(), &mirror.limits()).unwrap();
                for id in &ids {
                    let expected = fits_pre_schedule(&mirror, *id, &schedules).unwrap();
                    assert_eq!(detector.would_fit_any_schedule(*id).unwrap(), expected);
                    assert_eq!(
                        detector.selected_conflicts(*id).unwrap(),
                        mirror.conflicting_selected(*id).unwrap()
                    );
                }
            }
            assert!(detector.cache_stats().hits > 0);
        }
    }
}
