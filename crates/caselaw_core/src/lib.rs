//! Caselaw core: pure job model, round classification and the retry state machine.
mod job;
mod retry;
mod round;

pub use job::{build_jobs, normalize_url_for_dedupe, FailedJob, FailureKind, Job, JobResult};
pub use retry::{HarvestOutcome, RetryPolicy, RetryState};
pub use round::{partition, RoundSummary};
