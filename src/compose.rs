use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::keymap::KeyMap;
use crate::resolver::SerialResolver;
use crate::types::{CubeId, SerialNumber};

const STATE_RUNNING: u8 = 0;
const STATE_FINISHED: u8 = 1;
const STATE_CANCELLED: u8 = 2;

/// Lifecycle states of a composition job. There is no transition out of a
/// terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    /// The worker is still processing items.
    Running,
    /// The worker completed and published its result into the key map.
    Finished,
    /// The job observed its cancellation flag and stopped without publishing.
    Cancelled,
}

/// Telemetry captured for one terminal composition run.
#[derive(Clone, Debug)]
pub struct CompositionStats {
    /// Number of identifiers in the input batch.
    pub total: usize,
    /// Items whose serial resolved and entered the result.
    pub composed: usize,
    /// Items skipped after a resolver failure.
    pub skipped: usize,
    /// Most recent resolver error message, if any.
    pub last_error: Option<String>,
    /// Wall-clock duration of the run in milliseconds.
    pub elapsed_ms: u128,
    /// Time the worker started.
    pub started_at: DateTime<Utc>,
    /// Time the worker reached its terminal state.
    pub finished_at: DateTime<Utc>,
}

/// Cross-thread job state shared by the worker, its handle, and the bridge.
pub(crate) struct JobShared {
    total: usize,
    completed: AtomicUsize,
    cancelled: AtomicBool,
    state: AtomicU8,
    outcome: Mutex<JobOutcome>,
}

/// Write-once terminal payload guarded by `JobShared.outcome`.
#[derive(Default)]
struct JobOutcome {
    result: Option<Vec<(CubeId, SerialNumber)>>,
    stats: Option<CompositionStats>,
}

impl JobShared {
    fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            state: AtomicU8::new(STATE_RUNNING),
            outcome: Mutex::new(JobOutcome::default()),
        }
    }

    pub(crate) fn total(&self) -> usize {
        self.total
    }

    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub(crate) fn state_snapshot(&self) -> JobState {
        match self.state.load(Ordering::SeqCst) {
            STATE_FINISHED => JobState::Finished,
            STATE_CANCELLED => JobState::Cancelled,
            _ => JobState::Running,
        }
    }

    /// Single Running -> terminal transition, performed only by the worker.
    fn mark_terminal(&self, terminal: u8) {
        let _ = self
            .state
            .compare_exchange(STATE_RUNNING, terminal, Ordering::SeqCst, Ordering::SeqCst);
    }
}

/// One background composition run over a batch of cube ids.
///
/// The worker resolves each id in input order, accumulates the successful
/// pairings locally, and publishes them into the key map in a single gated
/// swap at the end. Cancellation is cooperative: the flag is checked between
/// items, so stopping is bounded by at most one in-flight resolution.
pub struct ComposeJob {
    ids: Vec<CubeId>,
    resolver: Arc<dyn SerialResolver>,
    keymap: KeyMap,
    shared: Arc<JobShared>,
}

impl ComposeJob {
    /// Spawn a worker processing `ids` and return the owner-facing handle.
    pub fn spawn(
        ids: Vec<CubeId>,
        resolver: Arc<dyn SerialResolver>,
        keymap: KeyMap,
    ) -> JobHandle {
        let shared = Arc::new(JobShared::new(ids.len()));
        let job = ComposeJob {
            ids,
            resolver,
            keymap,
            shared: Arc::clone(&shared),
        };
        let worker = thread::spawn(move || job.run());
        JobHandle {
            shared,
            worker: Mutex::new(Some(worker)),
        }
    }

    fn run(self) {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut composed: Vec<(CubeId, SerialNumber)> = Vec::with_capacity(self.ids.len());
        let mut skipped = 0usize;
        let mut last_error = None;

        for cube_id in &self.ids {
            if self.shared.cancelled.load(Ordering::SeqCst) {
                break;
            }
            match self.resolver.resolve(cube_id) {
                Ok(serial) => composed.push((cube_id.clone(), serial)),
                Err(err) => {
                    skipped += 1;
                    debug!(cube_id = %cube_id, error = %err, "serial resolution failed, skipping cube");
                    last_error = Some(err.to_string());
                }
            }
            self.shared.completed.fetch_add(1, Ordering::SeqCst);
        }

        let shared = Arc::clone(&self.shared);
        let published = !self.shared.cancelled.load(Ordering::SeqCst)
            && self.keymap.replace_all_if(composed.clone(), move || {
                !shared.cancelled.load(Ordering::SeqCst)
            });

        let elapsed = start.elapsed();
        let stats = CompositionStats {
            total: self.shared.total,
            composed: composed.len(),
            skipped,
            last_error,
            elapsed_ms: elapsed.as_millis(),
            started_at,
            finished_at: Utc::now(),
        };
        debug!(
            total = stats.total,
            composed = stats.composed,
            skipped = stats.skipped,
            elapsed_ms = elapsed.as_millis() as u64,
            published,
            "composition worker stopped"
        );

        let mut outcome = self.shared.outcome.lock().expect("job outcome poisoned");
        if published {
            outcome.result = Some(composed);
        }
        outcome.stats = Some(stats);
        drop(outcome);

        self.shared.mark_terminal(if published {
            STATE_FINISHED
        } else {
            STATE_CANCELLED
        });
    }
}

/// Owner-facing handle to a composition worker.
///
/// Dropping the handle does not stop or join the worker; a superseded job
/// winds down on its own once it observes its cancellation flag.
pub struct JobHandle {
    shared: Arc<JobShared>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl JobHandle {
    /// Number of identifiers in this job's input batch.
    pub fn total(&self) -> usize {
        self.shared.total()
    }

    /// Lock-free monotonic count of items processed so far. Safe to poll
    /// from any thread at any rate.
    pub fn completed_count(&self) -> usize {
        self.shared.completed()
    }

    /// Raise the cancellation flag. Idempotent; never cleared once set. The
    /// worker observes it between items and stops without publishing.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once the cancellation flag has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> JobState {
        self.shared.state_snapshot()
    }

    /// Returns `true` once the job completed and published its result.
    pub fn is_finished(&self) -> bool {
        self.state() == JobState::Finished
    }

    /// The published pairings; present only in the `Finished` state.
    pub fn result(&self) -> Option<Vec<(CubeId, SerialNumber)>> {
        let outcome = self.shared.outcome.lock().expect("job outcome poisoned");
        outcome.result.clone()
    }

    /// Run telemetry; present once the job reached a terminal state.
    pub fn stats(&self) -> Option<CompositionStats> {
        let outcome = self.shared.outcome.lock().expect("job outcome poisoned");
        outcome.stats.clone()
    }

    /// Block until the worker thread exits. Intended for tests and teardown;
    /// the supersede path never calls this.
    pub fn join(&self) {
        let worker = self.worker.lock().expect("job worker slot poisoned").take();
        if let Some(worker) = worker {
            let _ = worker.join();
        }
    }

    pub(crate) fn shared(&self) -> Arc<JobShared> {
        Arc::clone(&self.shared)
    }
}
