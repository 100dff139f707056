use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Mutex};
use std::thread;

use caselaw_core::{FailedJob, FailureKind, Job, JobResult};
use caselaw_logging::{harvest_debug, harvest_error};

use crate::download::FetchUnit;

/// Fixed-size pool of worker threads sharing one job queue.
///
/// Workers pull the next job as soon as they finish the previous one, so fast
/// workers take more jobs; nothing is assigned up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    workers: NonZeroUsize,
}

impl WorkerPool {
    pub fn new(workers: NonZeroUsize) -> Self {
        Self { workers }
    }

    /// One worker per execution unit the host reports, or one if unknown.
    pub fn with_available_parallelism() -> Self {
        Self::new(thread::available_parallelism().unwrap_or(NonZeroUsize::MIN))
    }

    pub fn workers(&self) -> usize {
        self.workers.get()
    }

    /// Run every job exactly once and return one result per job, unordered.
    ///
    /// Blocks until all workers have joined. A fetch unit that panics yields a
    /// [`FailureKind::Panicked`] result for that job; its worker keeps going.
    pub fn run(&self, jobs: Vec<Job>, unit: &dyn FetchUnit) -> Vec<JobResult> {
        let job_count = jobs.len();
        if job_count == 0 {
            return Vec::new();
        }

        let queue = Mutex::new(VecDeque::from(jobs));
        let (result_tx, result_rx) = mpsc::channel();
        let worker_count = self.workers.get().min(job_count);
        harvest_debug!("Running {} jobs on {} workers", job_count, worker_count);

        thread::scope(|scope| {
            for worker in 0..worker_count {
                let queue = &queue;
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    while let Some(job) = next_job(queue) {
                        let result = run_guarded(unit, job);
                        if result_tx.send(result).is_err() {
                            harvest_error!("Worker {} lost its result sink", worker);
                            break;
                        }
                    }
                });
            }
        });
        // Every worker has joined; dropping the last sender ends the receive loop.
        drop(result_tx);

        let results: Vec<JobResult> = result_rx.into_iter().collect();
        debug_assert_eq!(results.len(), job_count);
        results
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}

fn next_job(queue: &Mutex<VecDeque<Job>>) -> Option<Job> {
    // A worker that panicked while holding the lock leaves the queue intact.
    let mut guard = queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.pop_front()
}

fn run_guarded(unit: &dyn FetchUnit, job: Job) -> JobResult {
    match panic::catch_unwind(AssertUnwindSafe(|| unit.run(&job))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "fetch unit panicked".to_string());
            harvest_error!("Fetch of {} panicked: {}", job.url, message);
            JobResult::Failed(FailedJob::new(job, FailureKind::Panicked, message))
        }
    }
}
