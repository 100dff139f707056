//! One harvest run: walk the corpus courts, first-pass each year's new cases,
//! then retry the combined failures.

use std::sync::Arc;

use anyhow::{Context, Result};
use caselaw_core::{build_jobs, HarvestOutcome, RetryState};
use caselaw_engine::{
    list_courts, saved_urls, CaseDownloader, CaseTitleExtractor, Clock, Discoverer, Engine,
    Fetcher, ReqwestFetcher, SiteLayout, WorkerPool,
};
use caselaw_logging::{harvest_info, harvest_warn};
use chrono::Utc;

use crate::config::HarvestConfig;

#[derive(Debug, Default)]
pub struct HarvestSummary {
    pub courts: usize,
    pub already_saved: usize,
    pub discovered: usize,
    /// Court directories or listing pages that could not be read; their cases
    /// were never queued.
    pub listing_failures: Vec<String>,
    pub outcome: HarvestOutcome,
}

impl HarvestSummary {
    pub fn downloaded(&self) -> usize {
        self.discovered.saturating_sub(self.outcome.permanent.len())
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.is_complete() && self.listing_failures.is_empty()
    }

    pub fn print(&self) {
        println!(
            "{} courts, {} cases already saved, {} new cases downloaded.",
            self.courts,
            self.already_saved,
            self.downloaded()
        );
        if !self.listing_failures.is_empty() {
            println!(
                "{} listing pages could not be read:",
                self.listing_failures.len()
            );
            for failure in &self.listing_failures {
                println!("  {failure}");
            }
        }
        if self.outcome.is_complete() {
            println!("Corpus obtained.");
        } else {
            println!(
                "Failed on {} urls after {} rounds:",
                self.outcome.permanent.len(),
                self.outcome.total_rounds()
            );
            for failed in &self.outcome.permanent {
                println!("  {failed}");
            }
        }
    }
}

pub fn run(config: &HarvestConfig) -> Result<HarvestSummary> {
    let fetcher =
        ReqwestFetcher::new(config.fetch_settings()).context("building the HTTP client")?;
    let clock: Clock = Arc::new(|| Utc::now().to_rfc3339());
    run_with(config, fetcher, clock)
}

/// [`run`] with the HTTP collaborator and clock supplied by the caller.
pub fn run_with<F>(config: &HarvestConfig, fetcher: F, clock: Clock) -> Result<HarvestSummary>
where
    F: Fetcher + Clone,
{
    let layout = SiteLayout::new(&config.base_url)?;
    let pool = config
        .worker_count()
        .map(WorkerPool::new)
        .unwrap_or_default();
    harvest_info!("Using {} workers per round", pool.workers());

    let downloader = CaseDownloader::new(fetcher.clone(), CaseTitleExtractor, clock);
    let engine = Engine::new(pool, downloader, config.retry_policy());
    let discoverer = Discoverer::new(&fetcher, &layout);

    let courts = list_courts(&config.root)?;
    let mut summary = HarvestSummary {
        courts: courts.len(),
        ..HarvestSummary::default()
    };
    let mut failures = Vec::new();

    for court in &courts {
        let saved = match saved_urls(&court.path) {
            Ok(saved) => saved,
            Err(err) => {
                let reason = describe(err);
                harvest_warn!("Skipping {} - {}: {}", court.jurisdiction, court.court, reason);
                summary.listing_failures.push(reason);
                continue;
            }
        };
        summary.already_saved += saved.len();
        harvest_info!(
            "{} - {} cases already saved: {}",
            court.jurisdiction,
            court.court,
            saved.len()
        );

        let years = match discoverer.years(&court.jurisdiction, &court.court) {
            Ok(years) => years,
            Err(err) => {
                let reason = describe(err);
                harvest_warn!("Skipping {} - {}: {}", court.jurisdiction, court.court, reason);
                summary.listing_failures.push(reason);
                continue;
            }
        };

        for year in &years {
            let urls = match discoverer.case_urls(&court.jurisdiction, &court.court, year) {
                Ok(urls) => urls,
                Err(err) => {
                    let reason = describe(err);
                    harvest_warn!("Skipping {} - {} {}: {}", court.jurisdiction, court.court, year, reason);
                    summary.listing_failures.push(reason);
                    continue;
                }
            };
            let jobs = build_jobs(urls, &saved, &court.path);
            if jobs.is_empty() {
                continue;
            }
            harvest_info!(
                "{} - {} {}: downloading {} new cases",
                court.jurisdiction,
                court.court,
                year,
                jobs.len()
            );
            summary.discovered += jobs.len();
            failures.extend(engine.first_pass(jobs));
        }
    }

    harvest_info!(
        "First pass done: {} new cases, {} failed",
        summary.discovered,
        failures.len()
    );
    summary.outcome = engine.retry(RetryState::after_first_pass(failures, engine.policy()));
    Ok(summary)
}

/// The error and its causes on one line.
fn describe<E>(err: E) -> String
where
    E: std::error::Error + Send + Sync + 'static,
{
    format!("{:#}", anyhow::Error::new(err))
}
