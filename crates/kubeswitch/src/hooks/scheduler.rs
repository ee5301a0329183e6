//! Hook scheduler
//!
//! Loads the persisted records once, walks each hook through the state
//! machine and persists `lastRunAt` after every attempted run.

use super::executor::{HookExecutionError, HookExecutor};
use super::state::{HookStateError, HookStateStore};
use super::{Hook, HookOutcome, HookRecord, HookState};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// What happened to one hook in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookRun {
    /// Not due and not forced.
    Skipped {
        name: String,
        next_due_at: DateTime<Utc>,
    },
    Ran {
        name: String,
        started_at: DateTime<Utc>,
        result: Result<(), HookExecutionError>,
    },
}

impl HookRun {
    pub fn name(&self) -> &str {
        match self {
            HookRun::Skipped { name, .. } | HookRun::Ran { name, .. } => name,
        }
    }

    pub fn failed(&self) -> bool {
        matches!(self, HookRun::Ran { result: Err(_), .. })
    }
}

pub struct HookScheduler<E: HookExecutor> {
    store: HookStateStore,
    executor: E,
    clock: Clock,
}

impl<E: HookExecutor> HookScheduler<E> {
    pub fn new(store: HookStateStore, executor: E) -> Self {
        Self {
            store,
            executor,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Evaluate every hook; run the due ones, or all of them with `force`.
    ///
    /// A failing hook does not stop the batch. Only state persistence
    /// failures are returned as errors.
    pub async fn run(&self, hooks: &[Hook], force: bool) -> Result<Vec<HookRun>, HookStateError> {
        let records = self.store.load()?;
        let mut runs = Vec::with_capacity(hooks.len());

        for hook in hooks {
            let last_run_at = records.get(&hook.name).and_then(|r| r.last_run_at);
            let state = HookState::evaluate(last_run_at, hook.interval_seconds, (self.clock)());

            let Some(running) = state.start(force) else {
                let base = last_run_at.unwrap_or_else(|| (self.clock)());
                let next_due_at = due_at(base, hook.interval_seconds);
                tracing::info!(hook = %hook.name, "Not due until {}", next_due_at);
                runs.push(HookRun::Skipped {
                    name: hook.name.clone(),
                    next_due_at,
                });
                continue;
            };

            runs.push(self.run_one(hook, running).await?);
        }

        Ok(runs)
    }

    async fn run_one(&self, hook: &Hook, running: HookState) -> Result<HookRun, HookStateError> {
        let started_at = (self.clock)();
        let result = self.executor.execute(hook).await;
        let finished = running.finish(result.is_ok());

        match &result {
            Ok(()) => tracing::info!(hook = %hook.name, "Hook succeeded"),
            Err(err) => tracing::warn!(hook = %hook.name, "Hook failed: {}", err),
        }

        let mut record = HookRecord::new(&hook.name, hook.interval_seconds);
        record.last_run_at = Some(started_at);
        record.last_outcome = Some(match finished {
            HookState::Succeeded => HookOutcome::Succeeded,
            _ => HookOutcome::Failed,
        });
        record.last_error = result.as_ref().err().map(|e| e.to_string());
        self.store.update(record)?;

        let settled = finished.settle();
        tracing::debug!(hook = %hook.name, "{} -> {}", finished.as_str(), settled.as_str());

        Ok(HookRun::Ran {
            name: hook.name.clone(),
            started_at,
            result,
        })
    }
}

/// `base + interval`, pinned to the latest representable instant when the
/// interval is beyond chrono's range.
fn due_at(base: DateTime<Utc>, interval_seconds: u64) -> DateTime<Utc> {
    i64::try_from(interval_seconds)
        .ok()
        .and_then(ChronoDuration::try_seconds)
        .and_then(|interval| base.checked_add_signed(interval))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
