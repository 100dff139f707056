use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Download every case judgment not yet in the local corpus.
#[derive(Debug, Parser)]
#[command(name = "caselaw")]
#[command(about = "Bulk-download case judgments into a local corpus", long_about = None)]
pub struct Cli {
    /// RON config file (default: ./caselaw.ron if present).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Corpus root laid out as <jurisdiction>/<court>/.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Site to harvest from.
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Concurrent downloads per round (default: available CPUs).
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Retry rounds after the first pass (default 5).
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Also write the log to this file.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
