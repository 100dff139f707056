use std::time::Duration;

use crate::{FailedJob, FailureKind, Job};

/// Bounds and pacing for the retry rounds that follow a first pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry rounds after the first pass. The first pass is
    /// attempt 0 and never counts against this budget.
    pub max_retries: u32,
    /// Whether a page missing its expected markup is worth fetching again.
    pub retry_missing_structure: bool,
    /// Base delay before a retry round; zero disables waiting.
    pub backoff_base: Duration,
    /// Upper bound on the delay before any retry round.
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_missing_structure: true,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Policy with the given retry budget and no waiting between rounds.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff_base: Duration::ZERO,
            backoff_max: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn is_retryable(&self, kind: &FailureKind) -> bool {
        match kind {
            FailureKind::InvalidUrl => false,
            FailureKind::MissingStructure => self.retry_missing_structure,
            _ => true,
        }
    }

    /// Delay to wait before running retry round `attempt` (1-based).
    ///
    /// Exponential: `base * 2^(attempt-1)`, capped at `backoff_max`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.backoff_base.is_zero() {
            return Duration::ZERO;
        }
        let exp = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(exp).min(self.backoff_max)
    }
}

/// Terminal report of a harvest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestOutcome {
    /// Attempt number of the last round that ran (0 = first pass only).
    pub last_attempt: u32,
    /// Jobs that will not be tried again, with their last failure.
    pub permanent: Vec<FailedJob>,
}

impl HarvestOutcome {
    /// True when nothing is left undownloaded.
    pub fn is_complete(&self) -> bool {
        self.permanent.is_empty()
    }

    /// Rounds in the retry chain, counting the first pass once.
    pub fn total_rounds(&self) -> u32 {
        self.last_attempt + 1
    }
}

/// The retry loop as a pure state machine.
///
/// `Active` holds the jobs the next round must run; `advance` consumes that
/// round's failures and decides whether another round is due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState {
    Active {
        remaining: Vec<Job>,
        attempt: u32,
        /// Failures that were not retryable, collected as they occur.
        permanent: Vec<FailedJob>,
    },
    Done(HarvestOutcome),
}

impl RetryState {
    /// Initial state: the first pass over `jobs`, attempt 0.
    pub fn start(jobs: Vec<Job>) -> Self {
        RetryState::Active {
            remaining: jobs,
            attempt: 0,
            permanent: Vec::new(),
        }
    }

    /// State after first passes already ran elsewhere and produced `failures`.
    ///
    /// Used when discovery yields several batches that each get their own first
    /// pass, and only the combined failures enter the retry rounds.
    pub fn after_first_pass(failures: Vec<FailedJob>, policy: &RetryPolicy) -> Self {
        RetryState::start(Vec::new()).advance(failures, policy)
    }

    /// Jobs the next round must run; empty once done.
    pub fn pending(&self) -> &[Job] {
        match self {
            RetryState::Active { remaining, .. } => remaining,
            RetryState::Done(_) => &[],
        }
    }

    pub fn attempt(&self) -> Option<u32> {
        match self {
            RetryState::Active { attempt, .. } => Some(*attempt),
            RetryState::Done(_) => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, RetryState::Done(_))
    }

    /// Feed the failures of the round that just ran over `pending()`.
    pub fn advance(self, failures: Vec<FailedJob>, policy: &RetryPolicy) -> Self {
        let (attempt, mut permanent) = match self {
            RetryState::Active {
                attempt, permanent, ..
            } => (attempt, permanent),
            done @ RetryState::Done(_) => return done,
        };

        let (retryable, fatal): (Vec<FailedJob>, Vec<FailedJob>) = failures
            .into_iter()
            .partition(|failed| policy.is_retryable(&failed.kind));
        permanent.extend(fatal);

        if retryable.is_empty() {
            return RetryState::Done(HarvestOutcome {
                last_attempt: attempt,
                permanent,
            });
        }

        if attempt >= policy.max_retries {
            permanent.extend(retryable);
            return RetryState::Done(HarvestOutcome {
                last_attempt: attempt,
                permanent,
            });
        }

        RetryState::Active {
            remaining: retryable.into_iter().map(|failed| failed.job).collect(),
            attempt: attempt + 1,
            permanent,
        }
    }

    /// Final outcome, if the machine has terminated.
    pub fn into_outcome(self) -> Option<HarvestOutcome> {
        match self {
            RetryState::Done(outcome) => Some(outcome),
            RetryState::Active { .. } => None,
        }
    }
}
