//! Bounded work scheduler.
//!
//! A fixed number of merge tasks run concurrently on a dedicated rayon pool.
//! [`Scheduler::drain`] blocks until nothing is queued or running. The first
//! task failure poisons the run: tasks still waiting in the queue are skipped,
//! new submissions are dropped and `drain` hands the failure back.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Duration,
};

use log::{debug, error, info};
use parking_lot::{Condvar, Mutex};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::MergeError;

pub const DEFAULT_WORKERS: usize = 4;

/// How often `drain` reports the number of outstanding tasks.
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

pub struct Scheduler {
    pool: ThreadPool,
    shared: Arc<Shared>,
    progress_interval: Duration,
}

struct Shared {
    state: Mutex<State>,
    idle: Condvar,
}

#[derive(Default)]
struct State {
    queued: usize,
    running: usize,
    failed: bool,
    failure: Option<MergeError>,
}

impl State {
    fn outstanding(&self) -> usize {
        self.queued + self.running
    }
}

impl Scheduler {
    pub fn new(workers: usize) -> Result<Self, MergeError> {
        if workers == 0 {
            return Err(MergeError::InvalidConfig(
                "at least one worker is required".into(),
            ));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("merge-worker-{i}"))
            .build()?;

        Ok(Self {
            pool,
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                idle: Condvar::new(),
            }),
            progress_interval: PROGRESS_INTERVAL,
        })
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Queues `job` and returns immediately. Outcomes are only observable
    /// through [`drain`](Self::drain).
    pub fn submit<F>(&self, label: impl Into<String>, job: F)
    where
        F: FnOnce() -> Result<(), MergeError> + Send + 'static,
    {
        let label = label.into();
        {
            let mut state = self.shared.state.lock();
            if state.failed {
                debug!("Dropping {label}: run already failed");
                return;
            }
            state.queued += 1;
        }

        let shared = Arc::clone(&self.shared);
        self.pool.spawn(move || shared.execute(label, job));
    }

    /// Tasks queued or running right now.
    pub fn outstanding(&self) -> usize {
        self.shared.state.lock().outstanding()
    }

    pub fn has_failed(&self) -> bool {
        self.shared.state.lock().failed
    }

    /// Blocks until every submitted task has finished or been skipped.
    ///
    /// Returns the first task failure of the run, if any. Once a run has
    /// failed every later drain fails too.
    pub fn drain(&self) -> Result<(), MergeError> {
        let mut state = self.shared.state.lock();
        while state.outstanding() > 0 {
            let wait = self.shared.idle.wait_for(&mut state, self.progress_interval);
            if wait.timed_out() && state.outstanding() > 0 {
                info!("Remaining tasks: {}", state.outstanding());
            }
        }

        if state.failed {
            return Err(state.failure.take().unwrap_or(MergeError::Aborted));
        }
        Ok(())
    }
}

impl Shared {
    fn execute<F>(&self, label: String, job: F)
    where
        F: FnOnce() -> Result<(), MergeError>,
    {
        {
            let mut state = self.state.lock();
            state.queued -= 1;
            if state.failed {
                debug!("Skipping {label}: run already failed");
                self.notify_if_idle(&state);
                return;
            }
            state.running += 1;
        }

        let result = match panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(result) => result,
            Err(payload) => Err(MergeError::TaskPanicked {
                task: label.clone(),
                message: panic_message(payload.as_ref()),
            }),
        };

        let mut state = self.state.lock();
        state.running -= 1;
        if let Err(e) = result {
            if state.failed {
                debug!("{label} also failed: {e}");
            } else {
                error!("{e}, aborting run");
                state.failed = true;
                state.failure = Some(e);
            }
        }
        self.notify_if_idle(&state);
    }

    fn notify_if_idle(&self, state: &State) {
        if state.outstanding() == 0 {
            self.idle.notify_all();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
