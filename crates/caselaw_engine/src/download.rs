use std::sync::Arc;

use caselaw_core::{FailedJob, FailureKind, Job, JobResult};
use caselaw_logging::{harvest_debug, harvest_trace};

use crate::decode::decode_html;
use crate::extract::TitleExtractor;
use crate::fetch::Fetcher;
use crate::filename::case_filename;
use crate::store::{save_record, CaseRecord};

/// Timestamp source for `fetched_utc`, injectable for deterministic tests.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

/// The per-job operation run by pool workers.
///
/// Implementations never fail outward: every error becomes
/// [`JobResult::Failed`] carrying the job unchanged.
pub trait FetchUnit: Send + Sync {
    fn run(&self, job: &Job) -> JobResult;
}

/// Downloads one judgment page, extracts its title and saves a [`CaseRecord`]
/// into the job's destination directory.
pub struct CaseDownloader<F, E> {
    fetcher: F,
    extractor: E,
    clock: Clock,
}

impl<F, E> CaseDownloader<F, E>
where
    F: Fetcher,
    E: TitleExtractor,
{
    pub fn new(fetcher: F, extractor: E, clock: Clock) -> Self {
        Self {
            fetcher,
            extractor,
            clock,
        }
    }

    fn download(&self, job: &Job) -> Result<JobResult, FailedJob> {
        let fail = |kind: FailureKind, message: String| FailedJob::new(job.clone(), kind, message);

        let output = self
            .fetcher
            .get(&job.url)
            .map_err(|err| fail(err.kind, err.message))?;
        harvest_trace!("Fetched {} ({} bytes)", job.url, output.metadata.byte_len);

        let decoded = decode_html(&output.bytes, output.metadata.content_type.as_deref())
            .map_err(|err| fail(FailureKind::Decode, err.to_string()))?;
        let title = self
            .extractor
            .extract_title(&decoded.html)
            .map_err(|err| fail(FailureKind::MissingStructure, err.to_string()))?;

        let record = CaseRecord {
            title,
            url: job.url.clone(),
            fetched_utc: (self.clock)(),
            status: output.metadata.status,
            content_type: output.metadata.content_type,
            raw_response: decoded.html,
        };
        let saved_to = save_record(&job.dest, &case_filename(&job.url), &record)
            .map_err(|err| fail(FailureKind::Persist, err.to_string()))?;
        harvest_debug!("Saved {} to {:?}", job.url, saved_to);

        Ok(JobResult::Succeeded {
            url: job.url.clone(),
            saved_to,
        })
    }
}

impl<F, E> FetchUnit for CaseDownloader<F, E>
where
    F: Fetcher,
    E: TitleExtractor,
{
    fn run(&self, job: &Job) -> JobResult {
        self.download(job).unwrap_or_else(JobResult::Failed)
    }
}
