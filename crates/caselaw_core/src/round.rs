use crate::{FailedJob, JobResult};

/// Classified results of one round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundSummary {
    pub succeeded: usize,
    pub failed: Vec<FailedJob>,
}

impl RoundSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }
}

/// Split a round's results into a success count and the failed jobs.
///
/// Successes carry nothing the caller needs: the artifact is already on disk.
pub fn partition(results: Vec<JobResult>) -> RoundSummary {
    let mut summary = RoundSummary::default();
    for result in results {
        match result {
            JobResult::Succeeded { .. } => summary.succeeded += 1,
            JobResult::Failed(failed) => summary.failed.push(failed),
        }
    }
    summary
}
