use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::thread;
use std::time::Duration;

use caselaw_core::{FailedJob, FailureKind, Job, JobResult};
use caselaw_engine::{FetchUnit, WorkerPool};
use pretty_assertions::assert_eq;

/// Fails every job whose URL ends in an odd number; otherwise succeeds.
struct OddFails {
    calls: AtomicUsize,
}

impl FetchUnit for OddFails {
    fn run(&self, job: &Job) -> JobResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let index: usize = job.url.rsplit('/').next().unwrap().parse().unwrap();
        if index % 2 == 1 {
            JobResult::Failed(FailedJob::new(job.clone(), FailureKind::Network, "odd"))
        } else {
            JobResult::Succeeded {
                url: job.url.clone(),
                saved_to: job.dest.join(format!("{index}.json")),
            }
        }
    }
}

fn jobs(count: usize) -> Vec<Job> {
    (0..count)
        .map(|i| Job::new(format!("http://example.com/cases/{i}"), "out"))
        .collect()
}

fn pool(workers: usize) -> WorkerPool {
    WorkerPool::new(NonZeroUsize::new(workers).unwrap())
}

fn outcome_set(results: &[JobResult]) -> Vec<(String, bool)> {
    let mut set: Vec<(String, bool)> = results
        .iter()
        .map(|result| (result.url().to_string(), result.is_success()))
        .collect();
    set.sort();
    set
}

#[test]
fn every_job_yields_exactly_one_result() {
    for workers in [1, 2, 3, 8, 64] {
        let unit = OddFails {
            calls: AtomicUsize::new(0),
        };
        let input = jobs(37);
        let results = pool(workers).run(input.clone(), &unit);

        assert_eq!(results.len(), input.len(), "workers={workers}");
        assert_eq!(unit.calls.load(Ordering::SeqCst), input.len());
        let urls: HashSet<&str> = results.iter().map(JobResult::url).collect();
        assert_eq!(urls.len(), input.len(), "duplicate result with workers={workers}");
    }
}

#[test]
fn result_set_does_not_depend_on_worker_count() {
    let unit = OddFails {
        calls: AtomicUsize::new(0),
    };
    let baseline = outcome_set(&pool(1).run(jobs(25), &unit));
    for workers in [2, 8, 64] {
        let results = pool(workers).run(jobs(25), &unit);
        assert_eq!(outcome_set(&results), baseline, "workers={workers}");
    }
}

#[test]
fn empty_job_list_returns_immediately() {
    let unit = OddFails {
        calls: AtomicUsize::new(0),
    };
    let results = pool(4).run(Vec::new(), &unit);
    assert!(results.is_empty());
    assert_eq!(unit.calls.load(Ordering::SeqCst), 0);
}

/// Sleeps per job and records which threads did the work.
struct SlowUnit {
    threads: Mutex<HashSet<thread::ThreadId>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FetchUnit for SlowUnit {
    fn run(&self, job: &Job) -> JobResult {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.threads.lock().unwrap().insert(thread::current().id());
        thread::sleep(Duration::from_millis(20));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        JobResult::Succeeded {
            url: job.url.clone(),
            saved_to: job.dest.clone(),
        }
    }
}

#[test]
fn concurrency_never_exceeds_worker_count() {
    let unit = SlowUnit {
        threads: Mutex::new(HashSet::new()),
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    };
    let results = pool(3).run(jobs(12), &unit);
    assert_eq!(results.len(), 12);
    assert!(unit.peak.load(Ordering::SeqCst) <= 3);
    assert!(unit.threads.lock().unwrap().len() <= 3);
}

#[test]
fn workers_are_capped_by_job_count() {
    let unit = SlowUnit {
        threads: Mutex::new(HashSet::new()),
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    };
    let results = pool(64).run(jobs(2), &unit);
    assert_eq!(results.len(), 2);
    assert!(unit.threads.lock().unwrap().len() <= 2);
}

/// Job 0 holds its worker until every other job has finished elsewhere.
struct FirstJobWaits {
    others_done: Mutex<usize>,
    finished: Condvar,
    others: usize,
    first_saw_all_done: AtomicBool,
    threads: Mutex<Vec<(String, thread::ThreadId)>>,
}

impl FetchUnit for FirstJobWaits {
    fn run(&self, job: &Job) -> JobResult {
        self.threads
            .lock()
            .unwrap()
            .push((job.url.clone(), thread::current().id()));
        if job.url.ends_with("/0") {
            let done = self.others_done.lock().unwrap();
            let (done, _) = self
                .finished
                .wait_timeout_while(done, Duration::from_secs(5), |done| *done < self.others)
                .unwrap();
            if *done == self.others {
                self.first_saw_all_done.store(true, Ordering::SeqCst);
            }
        } else {
            *self.others_done.lock().unwrap() += 1;
            self.finished.notify_all();
        }
        JobResult::Succeeded {
            url: job.url.clone(),
            saved_to: job.dest.clone(),
        }
    }
}

#[test]
fn idle_worker_drains_queue_while_another_is_busy() {
    let unit = FirstJobWaits {
        others_done: Mutex::new(0),
        finished: Condvar::new(),
        others: 5,
        first_saw_all_done: AtomicBool::new(false),
        threads: Mutex::new(Vec::new()),
    };
    let results = pool(2).run(jobs(6), &unit);
    assert_eq!(results.len(), 6);
    assert!(unit.first_saw_all_done.load(Ordering::SeqCst));

    let threads = unit.threads.lock().unwrap();
    let blocked = threads
        .iter()
        .find(|(url, _)| url.ends_with("/0"))
        .map(|(_, id)| *id)
        .unwrap();
    let others: HashSet<thread::ThreadId> = threads
        .iter()
        .filter(|(url, _)| !url.ends_with("/0"))
        .map(|(_, id)| *id)
        .collect();
    assert_eq!(others.len(), 1);
    assert!(!others.contains(&blocked));
}

struct PanicsOnThree;

impl FetchUnit for PanicsOnThree {
    fn run(&self, job: &Job) -> JobResult {
        if job.url.ends_with("/3") {
            panic!("parser blew up");
        }
        JobResult::Succeeded {
            url: job.url.clone(),
            saved_to: job.dest.clone(),
        }
    }
}

#[test]
fn panicking_job_becomes_failure_without_losing_others() {
    let results = pool(2).run(jobs(6), &PanicsOnThree);
    assert_eq!(results.len(), 6);
    let failed: Vec<&FailedJob> = results
        .iter()
        .filter_map(|result| match result {
            JobResult::Failed(failed) => Some(failed),
            JobResult::Succeeded { .. } => None,
        })
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].job.url, "http://example.com/cases/3");
    assert_eq!(failed[0].kind, FailureKind::Panicked);
    assert_eq!(failed[0].message, "parser blew up");
}
