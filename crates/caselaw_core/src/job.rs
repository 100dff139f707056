use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

/// One download task: the case URL and the court directory it is saved into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Job {
    pub url: String,
    pub dest: PathBuf,
}

impl Job {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
        }
    }
}

/// Outcome of processing one [`Job`] in one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    Succeeded { url: String, saved_to: PathBuf },
    Failed(FailedJob),
}

impl JobResult {
    /// URL of the job this result belongs to.
    pub fn url(&self) -> &str {
        match self {
            JobResult::Succeeded { url, .. } => url,
            JobResult::Failed(failed) => &failed.job.url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Succeeded { .. })
    }
}

/// A failed job, carrying the original [`Job`] unchanged so it can be resubmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedJob {
    pub job: Job,
    pub kind: FailureKind,
    pub message: String,
}

impl FailedJob {
    pub fn new(job: Job, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            job,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FailedJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}: {})", self.job.url, self.kind, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    Network,
    Timeout,
    HttpStatus(u16),
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Decode,
    /// The page was fetched but the expected markup was not there.
    MissingStructure,
    Persist,
    Panicked,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Decode => write!(f, "decode error"),
            FailureKind::MissingStructure => write!(f, "expected page structure missing"),
            FailureKind::Persist => write!(f, "persist error"),
            FailureKind::Panicked => write!(f, "worker panicked"),
        }
    }
}

/// Key used to decide whether two case URLs name the same document.
///
/// Drops the fragment and lets `url` normalise scheme and host case. Unparsable
/// input is compared verbatim (trimmed).
pub fn normalize_url_for_dedupe(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}

/// Build the job batch for one court directory.
///
/// Candidates already present in `already_saved` (compared by
/// [`normalize_url_for_dedupe`]) are skipped, as are repeats within the batch.
/// Discovery order is preserved.
pub fn build_jobs<I, S>(candidates: I, already_saved: &HashSet<String>, dest: &Path) -> Vec<Job>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let saved: HashSet<String> = already_saved
        .iter()
        .map(|url| normalize_url_for_dedupe(url))
        .collect();
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter_map(|candidate| {
            let url = candidate.as_ref().trim();
            let key = normalize_url_for_dedupe(url);
            if url.is_empty() || saved.contains(&key) || !seen.insert(key) {
                return None;
            }
            Some(Job::new(url, dest))
        })
        .collect()
}
