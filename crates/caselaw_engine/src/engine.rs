use std::thread;

use caselaw_core::{partition, FailedJob, HarvestOutcome, Job, RetryPolicy, RetryState};
use caselaw_logging::{harvest_info, harvest_warn};

use crate::download::FetchUnit;
use crate::pool::WorkerPool;

/// Runs rounds of jobs through a [`WorkerPool`] and retries failures.
///
/// Rounds are strictly sequential: a round returns only after every worker
/// has joined, and the next round starts from that round's failures.
pub struct Engine<U> {
    pool: WorkerPool,
    unit: U,
    policy: RetryPolicy,
}

impl<U: FetchUnit> Engine<U> {
    pub fn new(pool: WorkerPool, unit: U, policy: RetryPolicy) -> Self {
        Self { pool, unit, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn unit(&self) -> &U {
        &self.unit
    }

    /// One round: run `jobs` and return the ones that failed.
    pub fn run_round(&self, jobs: Vec<Job>) -> Vec<FailedJob> {
        let submitted = jobs.len();
        let results = self.pool.run(jobs, &self.unit);
        let summary = partition(results);
        debug_assert_eq!(summary.total(), submitted);
        summary.failed
    }

    /// First pass over a freshly discovered batch (attempt 0).
    pub fn first_pass(&self, jobs: Vec<Job>) -> Vec<FailedJob> {
        let failed = self.run_round(jobs);
        for failure in &failed {
            harvest_warn!("Download failed: {}", failure);
        }
        failed
    }

    /// Drive the retry state machine until it terminates.
    pub fn retry(&self, mut state: RetryState) -> HarvestOutcome {
        loop {
            let attempt = match &state {
                RetryState::Done(_) => break,
                RetryState::Active { attempt, .. } => *attempt,
            };
            let jobs = state.pending().to_vec();
            if attempt > 0 {
                let delay = self.policy.delay_before(attempt);
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                harvest_info!(
                    "Retry attempt {} at {} failed downloads.",
                    attempt,
                    jobs.len()
                );
            }
            let failed = self.run_round(jobs);
            if attempt > 0 {
                harvest_info!("Cases still failed: {}", failed.len());
            }
            state = state.advance(failed, &self.policy);
        }

        // The loop only exits in the done state.
        state.into_outcome().unwrap_or_default()
    }

    /// First pass over `jobs` followed by retry rounds.
    pub fn harvest(&self, jobs: Vec<Job>) -> HarvestOutcome {
        self.retry(RetryState::start(jobs))
    }
}
