use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use caselaw_core::{FailureKind, Job, JobResult};
use caselaw_engine::{
    load_record, saved_urls, CaseDownloader, CaseTitleExtractor, Clock, FetchError,
    FetchMetadata, FetchOutput, FetchUnit, Fetcher,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const CASE_PAGE: &str = r#"<html><head><title>ignored</title></head><body>
<div id="page-main"><h1>Smith v Jones [2019] NSWSC 12; (2019) 1 ABC 2</h1><p>Reasons</p></div>
</body></html>"#;

/// Serves canned pages; unknown URLs fail like a dropped connection.
struct CannedFetcher {
    pages: HashMap<String, &'static str>,
}

impl CannedFetcher {
    fn with(url: &str, body: &'static str) -> Self {
        Self {
            pages: HashMap::from([(url.to_string(), body)]),
        }
    }
}

impl Fetcher for CannedFetcher {
    fn get(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let body = self.pages.get(url).ok_or_else(|| FetchError {
            kind: FailureKind::Network,
            message: "connection reset".to_string(),
        })?;
        Ok(FetchOutput {
            bytes: body.as_bytes().to_vec(),
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url: url.to_string(),
                status: 200,
                content_type: Some("text/html; charset=utf-8".to_string()),
                byte_len: body.len() as u64,
            },
        })
    }
}

fn fixed_clock() -> Clock {
    Arc::new(|| "2024-01-01T00:00:00Z".to_string())
}

const URL: &str = "http://example.com/au/cases/nsw/NSWSC/2019/12.html";

#[test]
fn successful_download_saves_record() {
    let temp = TempDir::new().unwrap();
    let downloader = CaseDownloader::new(
        CannedFetcher::with(URL, CASE_PAGE),
        CaseTitleExtractor,
        fixed_clock(),
    );
    let job = Job::new(URL, temp.path());

    let result = downloader.run(&job);
    let expected_path = temp.path().join("2019_12.json");
    assert_eq!(
        result,
        JobResult::Succeeded {
            url: URL.to_string(),
            saved_to: expected_path.clone(),
        }
    );

    let record = load_record(&expected_path).unwrap();
    assert_eq!(record.title, "Smith_v_Jones_2019_NSWSC_12");
    assert_eq!(record.url, URL);
    assert_eq!(record.fetched_utc, "2024-01-01T00:00:00Z");
    assert_eq!(record.status, 200);
    assert!(record.raw_response.contains("Reasons"));
}

#[test]
fn network_failure_returns_original_job() {
    let temp = TempDir::new().unwrap();
    let downloader = CaseDownloader::new(
        CannedFetcher {
            pages: HashMap::new(),
        },
        CaseTitleExtractor,
        fixed_clock(),
    );
    let job = Job::new(URL, temp.path());

    match downloader.run(&job) {
        JobResult::Failed(failed) => {
            assert_eq!(failed.job, job);
            assert_eq!(failed.kind, FailureKind::Network);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn missing_heading_is_failure_without_artifact() {
    let temp = TempDir::new().unwrap();
    let downloader = CaseDownloader::new(
        CannedFetcher::with(URL, "<html><body><h1>No main div</h1></body></html>"),
        CaseTitleExtractor,
        fixed_clock(),
    );
    let job = Job::new(URL, temp.path());

    match downloader.run(&job) {
        JobResult::Failed(failed) => {
            assert_eq!(failed.job, job);
            assert_eq!(failed.kind, FailureKind::MissingStructure);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn unwritable_destination_is_persist_failure() {
    let temp = TempDir::new().unwrap();
    let not_a_dir = temp.path().join("court");
    fs::write(&not_a_dir, "x").unwrap();
    let downloader = CaseDownloader::new(
        CannedFetcher::with(URL, CASE_PAGE),
        CaseTitleExtractor,
        fixed_clock(),
    );

    match downloader.run(&Job::new(URL, &not_a_dir)) {
        JobResult::Failed(failed) => assert_eq!(failed.kind, FailureKind::Persist),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn downloading_same_case_twice_keeps_one_record() {
    let temp = TempDir::new().unwrap();
    let downloader = CaseDownloader::new(
        CannedFetcher::with(URL, CASE_PAGE),
        CaseTitleExtractor,
        fixed_clock(),
    );
    let job = Job::new(URL, temp.path());

    assert!(downloader.run(&job).is_success());
    let before = fs::read(temp.path().join("2019_12.json")).unwrap();
    assert!(downloader.run(&job).is_success());
    let after = fs::read(temp.path().join("2019_12.json")).unwrap();

    assert_eq!(before, after);
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    assert_eq!(
        saved_urls(temp.path()).unwrap().into_iter().collect::<Vec<_>>(),
        vec![URL.to_string()]
    );
}
