//! Background pre-scheduler: one search at a time, newest selection wins.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::engine::{generate, SearchError};

use super::{PreSchedule, Shared};

/// Request to recompute the pre-schedule for a selection generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RegenerateTask {
    pub generation: u64,
}

/// Drains the task queue until every sender is gone.
///
/// Each task waits out the debounce window, then folds in anything queued
/// meanwhile so a burst of edits costs a single search. A task whose
/// generation is already stale is dropped, and a running search polls the
/// generation counter and gives up once it falls behind.
pub(crate) async fn run(
    shared: Arc<Shared>,
    mut tasks: UnboundedReceiver<RegenerateTask>,
    debounce: Duration,
) {
    info!(debounce_ms = debounce.as_millis() as u64, "Pre-schedule worker started");

    while let Some(mut task) = tasks.recv().await {
        if !debounce.is_zero() {
            tokio::time::sleep(debounce).await;
        }
        while let Ok(newer) = tasks.try_recv() {
            task = newer;
        }

        let generation = task.generation;
        let (input, limits) = match shared.snapshot(generation) {
            Some(Ok(snapshot)) => snapshot,
            Some(Err(e)) => {
                warn!(generation = generation, error = %e, "Could not snapshot selection");
                shared.publish(generation, PreSchedule::Exhausted { generation });
                continue;
            }
            None => {
                debug!(generation = generation, "Skipping superseded pre-schedule");
                continue;
            }
        };

        let start = Instant::now();
        let watcher = Arc::clone(&shared);
        let result = tokio::task::spawn_blocking(move || {
            generate(&input, &limits, || {
                if watcher.generation.load(Ordering::Acquire) == generation {
                    Ok(())
                } else {
                    Err(SearchError::Cancelled { generation })
                }
            })
        })
        .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(schedules)) => {
                info!(
                    generation = generation,
                    schedules = schedules.len(),
                    duration_ms = duration_ms,
                    "Pre-schedule ready"
                );
                shared.publish(
                    generation,
                    PreSchedule::Ready {
                        generation,
                        schedules: Arc::new(schedules),
                    },
                );
            }
            Ok(Err(SearchError::Cancelled { .. })) => {
                debug!(
                    generation = generation,
                    duration_ms = duration_ms,
                    "Abandoned superseded pre-schedule"
                );
            }
            Ok(Err(e)) => {
                warn!(
                    generation = generation,
                    error = %e,
                    duration_ms = duration_ms,
                    "Pre-schedule search failed"
                );
                shared.publish(generation, PreSchedule::Exhausted { generation });
            }
            Err(e) => {
                warn!(generation = generation, error = %e, "Pre-schedule task panicked");
                shared.publish(generation, PreSchedule::Exhausted { generation });
            }
        }
    }

    info!("Pre-schedule worker stopped");
}
