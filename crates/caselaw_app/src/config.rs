//! Harvest configuration: an optional `caselaw.ron` file, then CLI overrides.

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use caselaw_core::RetryPolicy;
use caselaw_engine::{FetchSettings, SiteLayout};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILENAME: &str = "caselaw.ron";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Corpus root laid out as `<jurisdiction>/<court>/`.
    pub root: PathBuf,
    pub base_url: String,
    pub user_agent: String,
    /// Worker threads per round; `None` uses the host's available parallelism.
    pub workers: Option<usize>,
    /// Retry rounds after the first pass.
    pub max_retries: u32,
    /// Retry pages that downloaded fine but lacked the case heading.
    pub retry_missing_structure: bool,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_page_bytes: u64,
    pub log_file: Option<PathBuf>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        let retry = RetryPolicy::default();
        Self {
            root: PathBuf::from("data").join("output").join("cases"),
            base_url: "http://www.austlii.edu.au".to_string(),
            user_agent: fetch.user_agent,
            workers: None,
            max_retries: retry.max_retries,
            retry_missing_structure: retry.retry_missing_structure,
            backoff_base_ms: retry.backoff_base.as_millis() as u64,
            backoff_max_ms: retry.backoff_max.as_millis() as u64,
            connect_timeout_secs: fetch.connect_timeout.as_secs(),
            request_timeout_secs: fetch.request_timeout.as_secs(),
            max_page_bytes: fetch.max_bytes,
            log_file: None,
        }
    }
}

impl HarvestConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILENAME`] if present, or defaults.
    ///
    /// An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILENAME), false),
        };
        if !required && !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        ron::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Apply command-line overrides on top of file values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(root) = &cli.root {
            self.root = root.clone();
        }
        if let Some(base_url) = &cli.base_url {
            self.base_url = base_url.clone();
        }
        if let Some(workers) = cli.workers {
            self.workers = Some(workers);
        }
        if let Some(max_retries) = cli.max_retries {
            self.max_retries = max_retries;
        }
        if let Some(log_file) = &cli.log_file {
            self.log_file = Some(log_file.clone());
        }
    }

    /// Reject settings that would make every round fail before it starts.
    pub fn validate(&self) -> Result<()> {
        if self.workers == Some(0) {
            bail!("workers must be at least 1");
        }
        if self.connect_timeout_secs == 0 {
            bail!("connect_timeout_secs must be at least 1");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be at least 1");
        }
        if self.max_page_bytes == 0 {
            bail!("max_page_bytes must be at least 1");
        }
        SiteLayout::new(&self.base_url)
            .with_context(|| format!("base_url {:?}", self.base_url))?;
        if !self.root.is_dir() {
            bail!(
                "corpus root {} is not a directory (expected <root>/<jurisdiction>/<court>/)",
                self.root.display()
            );
        }
        Ok(())
    }

    pub fn worker_count(&self) -> Option<NonZeroUsize> {
        self.workers.and_then(NonZeroUsize::new)
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_bytes: self.max_page_bytes,
            user_agent: self.user_agent.clone(),
            ..FetchSettings::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            retry_missing_structure: self.retry_missing_structure,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            backoff_max: Duration::from_millis(self.backoff_max_ms),
        }
    }
}
