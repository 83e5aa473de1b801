use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::compose::{JobHandle, JobState};

/// Progress notification emitted by a `ProgressBridge`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Denominator announcement; sent exactly once per job, before any other
    /// event for that job.
    RangeChanged {
        /// Lower bound of the progress range, always 0.
        min: usize,
        /// Upper bound of the progress range: the input batch size.
        max: usize,
    },
    /// The completed-item count moved since the previous sample.
    Changed(usize),
    /// The job finished and its result is readable; last event for the job.
    Finished,
}

/// Timer-driven poller converting a job's lock-free counters into discrete,
/// rate-limited events.
///
/// Polling decouples the worker from observer code: the worker never calls
/// out, and notification frequency is bounded by the interval no matter how
/// fast items complete. All events for a job are emitted from the bridge's
/// own thread, in order. A job that terminates `Cancelled` stops the bridge
/// silently: its events belong to a superseded run nobody should act on.
pub struct ProgressBridge {
    poller: Option<thread::JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl ProgressBridge {
    /// Spawn a poller sampling `handle` every `interval`, passing each event
    /// to `emit`.
    pub fn spawn<F>(handle: &JobHandle, interval: Duration, mut emit: F) -> Self
    where
        F: FnMut(ProgressEvent) + Send + 'static,
    {
        let shared = handle.shared();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let poller = thread::spawn(move || {
            emit(ProgressEvent::RangeChanged {
                min: 0,
                max: shared.total(),
            });
            let mut last_seen = 0usize;
            loop {
                if stop_flag.load(Ordering::SeqCst) {
                    return;
                }
                let state = shared.state_snapshot();
                let completed = shared.completed();
                if completed != last_seen {
                    emit(ProgressEvent::Changed(completed));
                    last_seen = completed;
                }
                match state {
                    JobState::Running => thread::sleep(interval),
                    JobState::Finished => {
                        emit(ProgressEvent::Finished);
                        debug!(completed, "composition finished, progress bridge stopping");
                        return;
                    }
                    JobState::Cancelled => {
                        debug!(completed, "job cancelled, progress bridge stopping silently");
                        return;
                    }
                }
            }
        });
        Self {
            poller: Some(poller),
            stop,
        }
    }

    /// Flag the poller to stop and detach it without blocking the caller.
    /// The thread exits within one interval; used when a job is superseded.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.poller.take();
    }
}

impl Drop for ProgressBridge {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(poller) = self.poller.take() {
            let _ = poller.join();
        }
    }
}
