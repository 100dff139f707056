use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use caselaw_core::{FailedJob, FailureKind, Job, JobResult, RetryPolicy, RetryState};
use caselaw_engine::{Engine, FetchUnit, WorkerPool};
use pretty_assertions::assert_eq;

/// Fake fetch unit whose failures depend on the job index and on how often
/// that job has been attempted.
struct Scripted<F> {
    attempts: Mutex<HashMap<String, u32>>,
    calls: AtomicU32,
    fails: F,
}

impl<F> Scripted<F>
where
    F: Fn(usize, u32) -> Option<FailureKind> + Send + Sync,
{
    fn new(fails: F) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            calls: AtomicU32::new(0),
            fails,
        }
    }
}

impl<F> FetchUnit for Scripted<F>
where
    F: Fn(usize, u32) -> Option<FailureKind> + Send + Sync,
{
    fn run(&self, job: &Job) -> JobResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let entry = attempts.entry(job.url.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        let index: usize = job.url.rsplit('/').next().unwrap().parse().unwrap();
        match (self.fails)(index, attempt) {
            Some(kind) => JobResult::Failed(FailedJob::new(job.clone(), kind, "scripted")),
            None => JobResult::Succeeded {
                url: job.url.clone(),
                saved_to: job.dest.clone(),
            },
        }
    }
}

fn jobs(count: usize) -> Vec<Job> {
    (0..count)
        .map(|i| Job::new(format!("http://example.com/case/{i}"), "out"))
        .collect()
}

fn engine<F>(workers: usize, max_retries: u32, fails: F) -> Engine<Scripted<F>>
where
    F: Fn(usize, u32) -> Option<FailureKind> + Send + Sync,
{
    Engine::new(
        WorkerPool::new(NonZeroUsize::new(workers).unwrap()),
        Scripted::new(fails),
        RetryPolicy::immediate(max_retries),
    )
}

#[test]
fn odd_jobs_failing_first_attempt_finish_in_two_rounds() {
    let odd_fail_once =
        |index: usize, attempt: u32| (index % 2 == 1 && attempt == 1).then_some(FailureKind::Network);

    let rounds = engine(4, 5, odd_fail_once);
    let first = rounds.run_round(jobs(10));
    assert_eq!(first.len(), 5);
    let second = rounds.run_round(first.into_iter().map(|f| f.job).collect());
    assert!(second.is_empty());

    let harvester = engine(4, 5, odd_fail_once);
    let outcome = harvester.harvest(jobs(10));
    assert!(outcome.is_complete());
    assert_eq!(outcome.total_rounds(), 2);
}

#[test]
fn always_failing_jobs_use_whole_budget() {
    let engine = engine(2, 2, |_, _| Some(FailureKind::Timeout));
    let input = jobs(3);
    let outcome = engine.harvest(input.clone());

    assert_eq!(outcome.total_rounds(), 3);
    assert_eq!(engine_calls(&engine), 9);
    let mut failed: Vec<Job> = outcome.permanent.into_iter().map(|f| f.job).collect();
    failed.sort_by(|a, b| a.url.cmp(&b.url));
    assert_eq!(failed, input);
}

#[test]
fn recovered_job_is_not_reported() {
    // Job 0 fails twice then succeeds; budget of 5 covers it.
    let engine = engine(3, 5, |index, attempt| {
        (index == 0 && attempt <= 2).then_some(FailureKind::HttpStatus(503))
    });
    let outcome = engine.harvest(jobs(4));
    assert!(outcome.is_complete());
    assert_eq!(outcome.total_rounds(), 3);
    assert_eq!(engine_calls(&engine), 6);
}

#[test]
fn invalid_url_failures_are_not_retried() {
    let engine = engine(2, 5, |index, _| {
        (index == 1).then_some(FailureKind::InvalidUrl)
    });
    let outcome = engine.harvest(jobs(3));
    assert_eq!(engine_calls(&engine), 3);
    assert_eq!(outcome.permanent.len(), 1);
    assert_eq!(outcome.permanent[0].kind, FailureKind::InvalidUrl);
}

#[test]
fn retry_resumes_from_combined_first_pass_failures() {
    let engine = engine(2, 3, |index, attempt| {
        (index >= 2 && attempt == 1).then_some(FailureKind::Network)
    });
    let all = jobs(6);
    let mut failures = engine.first_pass(all[..3].to_vec());
    failures.extend(engine.first_pass(all[3..].to_vec()));
    assert_eq!(failures.len(), 4);

    let state = RetryState::after_first_pass(failures, engine.policy());
    let outcome = engine.retry(state);
    assert!(outcome.is_complete());
    assert_eq!(outcome.last_attempt, 1);
    assert_eq!(engine_calls(&engine), 10);
}

#[test]
fn empty_harvest_is_complete() {
    let engine = engine(4, 5, |_, _| Some(FailureKind::Network));
    let outcome = engine.harvest(Vec::new());
    assert!(outcome.is_complete());
    assert_eq!(engine_calls(&engine), 0);
}

fn engine_calls<F>(engine: &Engine<Scripted<F>>) -> u32
where
    F: Fn(usize, u32) -> Option<FailureKind> + Send + Sync,
{
    engine.unit().calls.load(Ordering::SeqCst)
}
